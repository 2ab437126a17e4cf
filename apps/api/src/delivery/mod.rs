// Background delivery: jobs, the convert-then-dispatch pipeline, the mail
// dispatcher and the bounded worker pool that runs them.
// Nothing in this module reports failure back to the HTTP caller.

pub mod job;
pub mod mailer;
pub mod orchestrator;
pub mod pipeline;

pub use job::{DeliveryJob, Recipient};
pub use mailer::{Dispatcher, MailDispatcher};
pub use orchestrator::{DeliveryOrchestrator, DeliveryStats, OrchestratorConfig, SubmitError};
