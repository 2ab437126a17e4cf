//! Delivery Dispatcher: best-effort e-mail notification.
//!
//! Attaches the PDF when a valid one exists, otherwise embeds the rendered report
//! inline (degraded delivery). Without mail credentials it simulates the send and
//! logs it. Errors never escape `dispatch`: they are logged and reported as
//! `DispatchOutcome::Failed`.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Local;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, error, info, warn};

use crate::config::MailSettings;
use crate::delivery::job::Recipient;
use crate::report::templates::{EMAIL_HTML_TEMPLATE, EMAIL_TEXT_TEMPLATE};

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum DeliveryError {
    #[error("invalid e-mail address: {0}")]
    Address(#[from] lettre::address::AddressError),

    #[error("failed to build message: {0}")]
    Message(#[from] lettre::error::Error),

    #[error("invalid content type: {0}")]
    ContentType(String),

    #[error("SMTP error: {0}")]
    Smtp(#[from] lettre::transport::smtp::Error),

    #[error("transport error: {0}")]
    Transport(String),
}

/// How the report reached (or would reach) the recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMode {
    Attachment,
    Inline,
}

impl DeliveryMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMode::Attachment => "attachment",
            DeliveryMode::Inline => "inline",
        }
    }
}

/// What a dispatch attempt ended in. `Delivered` carries the mode actually used,
/// which is `Inline` whenever the PDF was absent or unusable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchOutcome {
    Delivered(DeliveryMode),
    Failed,
}

/// Sends the notification for a finished job. Never fails past its boundary.
#[async_trait]
pub trait Dispatcher: Send + Sync {
    async fn dispatch(
        &self,
        recipient: &Recipient,
        html: &str,
        pdf_path: Option<&Path>,
        overall_score: f64,
    ) -> DispatchOutcome;
}

/// Wire-level mail transport.
#[async_trait]
pub trait MailTransport: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), DeliveryError>;
}

/// Authenticated SMTP over implicit TLS.
pub struct SmtpMailTransport {
    inner: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpMailTransport {
    pub fn new(settings: &MailSettings) -> Result<Self, DeliveryError> {
        let inner = AsyncSmtpTransport::<Tokio1Executor>::relay(&settings.server)?
            .port(settings.port)
            .credentials(Credentials::new(
                settings.username.clone(),
                settings.password.clone(),
            ))
            .timeout(Some(SMTP_TIMEOUT))
            .build();
        Ok(Self { inner })
    }
}

#[async_trait]
impl MailTransport for SmtpMailTransport {
    async fn send(&self, message: Message) -> Result<(), DeliveryError> {
        self.inner.send(message).await?;
        Ok(())
    }
}

pub struct MailDispatcher {
    sender: Mailbox,
    /// `None` means demo mode: sends are simulated.
    transport: Option<Arc<dyn MailTransport>>,
    min_pdf_bytes: u64,
}

impl MailDispatcher {
    pub fn new(
        sender: Mailbox,
        transport: Option<Arc<dyn MailTransport>>,
        min_pdf_bytes: u64,
    ) -> Self {
        Self {
            sender,
            transport,
            min_pdf_bytes,
        }
    }

    /// SMTP dispatcher when settings exist, demo mode otherwise.
    pub fn from_settings(
        settings: Option<&MailSettings>,
        min_pdf_bytes: u64,
    ) -> Result<Self, DeliveryError> {
        match settings {
            Some(settings) => {
                let sender = Mailbox::new(
                    Some(settings.sender_name.clone()),
                    settings.username.parse::<Address>()?,
                );
                let transport: Arc<dyn MailTransport> = Arc::new(SmtpMailTransport::new(settings)?);
                Ok(Self::new(sender, Some(transport), min_pdf_bytes))
            }
            None => {
                warn!("Mail credentials not configured; e-mail delivery runs in demo mode");
                let sender = Mailbox::new(
                    Some("Faça Bem".to_string()),
                    Address::new("no-reply", "localhost")?,
                );
                Ok(Self::new(sender, None, min_pdf_bytes))
            }
        }
    }

    pub fn is_demo(&self) -> bool {
        self.transport.is_none()
    }

    /// Builds the message, attaching the PDF only if it exists and passes the size check.
    pub async fn compose(
        &self,
        recipient: &Recipient,
        html: &str,
        pdf_path: Option<&Path>,
        overall_score: f64,
    ) -> Result<(Message, DeliveryMode), DeliveryError> {
        let attachment = match pdf_path {
            Some(path) => self.read_attachment(path).await,
            None => None,
        };
        let mode = if attachment.is_some() {
            DeliveryMode::Attachment
        } else {
            DeliveryMode::Inline
        };

        let generated_at = Local::now().format("%d/%m/%Y às %H:%M").to_string();
        let score = format!("{overall_score:.2}");
        let report_note = match mode {
            DeliveryMode::Attachment => "✓ Relatório em PDF anexado",
            DeliveryMode::Inline => "✓ Relatório em HTML incluído neste email",
        };
        let text = EMAIL_TEXT_TEMPLATE
            .replace("{{name}}", &recipient.name)
            .replace("{{overall_score}}", &score)
            .replace("{{report_note}}", report_note)
            .replace("{{generated_at}}", &generated_at);
        let html_body = EMAIL_HTML_TEMPLATE
            .replace("{{name}}", &crate::report::renderer::escape_html(&recipient.name))
            .replace("{{overall_score}}", &score)
            .replace("{{generated_at}}", &generated_at)
            .replace("{{content}}", html);

        let to = Mailbox::new(
            Some(recipient.name.clone()),
            recipient.email.trim().parse::<Address>()?,
        );
        let builder = Message::builder()
            .from(self.sender.clone())
            .to(to)
            .subject(format!(
                "Diagnóstico de Competências - {} - Pontuação: {score}/5.00",
                recipient.name
            ));
        let body = MultiPart::alternative_plain_html(text, html_body);

        let message = match attachment {
            Some(bytes) => {
                let content_type = ContentType::parse("application/pdf")
                    .map_err(|e| DeliveryError::ContentType(e.to_string()))?;
                let filename = format!(
                    "diagnostico_competencias_{}.pdf",
                    recipient.name.trim().replace(' ', "_")
                );
                builder.multipart(
                    MultiPart::mixed()
                        .multipart(body)
                        .singlepart(Attachment::new(filename).body(bytes, content_type)),
                )?
            }
            None => builder.multipart(body)?,
        };

        Ok((message, mode))
    }

    async fn read_attachment(&self, path: &Path) -> Option<Vec<u8>> {
        match tokio::fs::metadata(path).await {
            Ok(meta) if meta.is_file() && meta.len() > self.min_pdf_bytes => {}
            Ok(meta) => {
                debug!(path = %path.display(), bytes = meta.len(), "PDF unusable; not attaching");
                return None;
            }
            Err(e) => {
                debug!(path = %path.display(), error = %e, "PDF missing; not attaching");
                return None;
            }
        }
        match tokio::fs::read(path).await {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Failed to read PDF; not attaching");
                None
            }
        }
    }
}

#[async_trait]
impl Dispatcher for MailDispatcher {
    async fn dispatch(
        &self,
        recipient: &Recipient,
        html: &str,
        pdf_path: Option<&Path>,
        overall_score: f64,
    ) -> DispatchOutcome {
        let (message, mode) = match self.compose(recipient, html, pdf_path, overall_score).await {
            Ok(composed) => composed,
            Err(e) => {
                error!(recipient = %recipient.email, error = %e, "Failed to compose e-mail");
                return DispatchOutcome::Failed;
            }
        };

        if let Some(transport) = &self.transport {
            if let Err(e) = transport.send(message).await {
                error!(recipient = %recipient.email, error = %e, "E-mail delivery failed");
                return DispatchOutcome::Failed;
            }
        }

        match mode {
            DeliveryMode::Inline => warn!(
                recipient = %recipient.email,
                mode = mode.as_str(),
                simulated = self.is_demo(),
                "Degraded delivery: report sent inline"
            ),
            DeliveryMode::Attachment => info!(
                recipient = %recipient.email,
                mode = mode.as_str(),
                simulated = self.is_demo(),
                "E-mail sent"
            ),
        }
        DispatchOutcome::Delivered(mode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct RecordingTransport {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    #[async_trait]
    impl MailTransport for RecordingTransport {
        async fn send(&self, message: Message) -> Result<(), DeliveryError> {
            self.sent.lock().unwrap().push(message.formatted());
            Ok(())
        }
    }

    struct FailingTransport;

    #[async_trait]
    impl MailTransport for FailingTransport {
        async fn send(&self, _message: Message) -> Result<(), DeliveryError> {
            Err(DeliveryError::Transport("relay unreachable".to_string()))
        }
    }

    fn recipient() -> Recipient {
        Recipient {
            name: "Ana Souza".to_string(),
            email: "ana@example.com".to_string(),
        }
    }

    fn sender() -> Mailbox {
        Mailbox::new(
            Some("Faça Bem".to_string()),
            "consultoria@example.com".parse().unwrap(),
        )
    }

    fn demo() -> MailDispatcher {
        MailDispatcher::from_settings(None, 1000).unwrap()
    }

    fn recording() -> Arc<RecordingTransport> {
        Arc::new(RecordingTransport {
            sent: Mutex::new(Vec::new()),
        })
    }

    /// Formatted message with quoted-printable soft line breaks removed.
    fn unfolded(raw: &[u8]) -> String {
        String::from_utf8_lossy(raw).replace("=\r\n", "")
    }

    #[tokio::test]
    async fn test_nonexistent_pdf_falls_back_to_inline() {
        let dispatcher = demo();
        let missing = Path::new("/nonexistent/relatorio.pdf");

        let (_, mode) = dispatcher
            .compose(&recipient(), "<p>report</p>", Some(missing), 3.2)
            .await
            .unwrap();
        assert_eq!(mode, DeliveryMode::Inline);

        assert_eq!(
            dispatcher
                .dispatch(&recipient(), "<p>report</p>", Some(missing), 3.2)
                .await,
            DispatchOutcome::Delivered(DeliveryMode::Inline)
        );
    }

    #[tokio::test]
    async fn test_valid_pdf_is_attached() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("r.pdf");
        std::fs::write(&pdf, vec![b'%'; 2048]).unwrap();

        let transport = recording();
        let dispatcher = MailDispatcher::new(sender(), Some(transport.clone()), 1000);

        assert_eq!(
            dispatcher
                .dispatch(&recipient(), "<p>report</p>", Some(&pdf), 4.0)
                .await,
            DispatchOutcome::Delivered(DeliveryMode::Attachment)
        );
        let sent = transport.sent.lock().unwrap();
        let raw = unfolded(&sent[0]);
        assert!(raw.contains("diagnostico_competencias_Ana_Souza.pdf"));
        assert!(raw.contains("application/pdf"));
    }

    #[tokio::test]
    async fn test_undersized_pdf_is_sent_inline() {
        let dir = tempfile::tempdir().unwrap();
        let pdf = dir.path().join("r.pdf");
        std::fs::write(&pdf, b"%PDF").unwrap();

        let transport = recording();
        let dispatcher = MailDispatcher::new(sender(), Some(transport.clone()), 1000);

        assert_eq!(
            dispatcher
                .dispatch(&recipient(), "<p>relatorio-pequeno</p>", Some(&pdf), 4.0)
                .await,
            DispatchOutcome::Delivered(DeliveryMode::Inline)
        );
        let raw = unfolded(&transport.sent.lock().unwrap()[0]);
        assert!(!raw.contains("application/pdf"));
        assert!(raw.contains("<p>relatorio-pequeno</p>"));
    }

    #[tokio::test]
    async fn test_inline_body_carries_report() {
        let transport = recording();
        let dispatcher = MailDispatcher::new(sender(), Some(transport.clone()), 1000);

        assert_eq!(
            dispatcher
                .dispatch(&recipient(), "<p>relatorio-inline</p>", None, 2.75)
                .await,
            DispatchOutcome::Delivered(DeliveryMode::Inline)
        );
        let sent = transport.sent.lock().unwrap();
        assert_eq!(sent.len(), 1);
        let raw = unfolded(&sent[0]);
        assert!(raw.contains("<p>relatorio-inline</p>"));
        assert!(raw.contains("text/html"));
        assert!(!raw.contains("application/pdf"));
    }

    #[tokio::test]
    async fn test_transport_failure_is_reported() {
        let dispatcher = MailDispatcher::new(sender(), Some(Arc::new(FailingTransport)), 1000);
        assert_eq!(
            dispatcher.dispatch(&recipient(), "<p/>", None, 3.0).await,
            DispatchOutcome::Failed
        );
    }

    #[tokio::test]
    async fn test_invalid_recipient_is_reported() {
        let bad = Recipient {
            name: "Ana".to_string(),
            email: "not-an-address".to_string(),
        };
        assert_eq!(
            demo().dispatch(&bad, "<p/>", None, 3.0).await,
            DispatchOutcome::Failed
        );
    }

    #[test]
    fn test_demo_mode_without_settings() {
        assert!(demo().is_demo());
    }
}
