use std::path::Path;
use std::time::Instant;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::delivery::job::{DeliveryJob, JobReport, JobState};
use crate::delivery::mailer::{DispatchOutcome, Dispatcher};
use crate::report::converter::DocumentConverter;

/// Runs one job to `Done`: convert, then dispatch with whatever the conversion
/// produced. Neither stage can abort the other.
///
/// Every record emitted while the job runs, including the converter's and the
/// dispatcher's, sits inside a `delivery_job` span carrying the job id.
///
/// Retention: the PDF is removed once the report has been delivered. It stays in
/// `reports_dir` only when delivery failed, so it can be resent by hand.
pub async fn run_job(
    job: DeliveryJob,
    converter: &dyn DocumentConverter,
    dispatcher: &dyn Dispatcher,
    reports_dir: &Path,
) -> JobReport {
    let span = info_span!("delivery_job", job_id = %job.id);
    run_stages(job, converter, dispatcher, reports_dir)
        .instrument(span)
        .await
}

async fn run_stages(
    job: DeliveryJob,
    converter: &dyn DocumentConverter,
    dispatcher: &dyn Dispatcher,
    reports_dir: &Path,
) -> JobReport {
    let started = Instant::now();
    let mut report = JobReport::new(job.id);
    info!(recipient = %job.recipient.email, "Delivery job started");

    report.advance(JobState::Converting);
    let destination = reports_dir.join(job.pdf_file_name());
    match converter.convert(&job.html, &destination).await {
        Ok(path) => {
            report.pdf_path = Some(path);
            report.advance(JobState::Converted);
        }
        Err(e) => {
            warn!(error = %e, "PDF conversion failed; continuing without attachment");
            // A failed renderer may leave a partial file behind.
            remove_report(&destination).await;
            report.advance(JobState::ConversionFailed);
        }
    }

    report.advance(JobState::Dispatching);
    let outcome = dispatcher
        .dispatch(
            &job.recipient,
            &job.html,
            report.pdf_path.as_deref(),
            job.overall_score,
        )
        .await;
    report.outcome = Some(outcome);

    match outcome {
        DispatchOutcome::Delivered(_) => {
            report.advance(JobState::Delivered);
            if let Some(path) = &report.pdf_path {
                remove_report(path).await;
            }
        }
        DispatchOutcome::Failed => report.advance(JobState::DeliveryFailed),
    }

    report.advance(JobState::Done);
    info!(
        delivered = report.delivered(),
        degraded = report.degraded(),
        retained_pdf = ?report.pdf_path.as_deref().filter(|_| !report.delivered()),
        elapsed_ms = started.elapsed().as_millis() as u64,
        "Delivery job finished"
    );
    report
}

async fn remove_report(path: &Path) {
    match tokio::fs::remove_file(path).await {
        Ok(()) => debug!(path = %path.display(), "Report file removed"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => debug!(path = %path.display(), error = %e, "Failed to remove report file"),
    }
}
