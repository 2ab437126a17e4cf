//! Asynchronous Delivery Orchestrator.
//!
//! Accepts jobs without blocking the request path and runs them on a bounded
//! worker pool. The queue is bounded too: a full queue rejects the job rather
//! than growing without limit. `shutdown` stops intake and waits for every
//! accepted job to reach `Done`.

use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use serde::Serialize;
use thiserror::Error;
use tokio::sync::{mpsc, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::delivery::job::DeliveryJob;
use crate::delivery::mailer::Dispatcher;
use crate::delivery::pipeline::run_job;
use crate::report::converter::DocumentConverter;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    #[error("delivery queue is full")]
    QueueFull,

    #[error("delivery orchestrator is shutting down")]
    ShuttingDown,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub workers: usize,
    pub queue_capacity: usize,
    pub reports_dir: PathBuf,
}

#[derive(Debug, Default)]
struct Counters {
    queued: AtomicU64,
    delivered: AtomicU64,
    degraded: AtomicU64,
    failed: AtomicU64,
    abandoned: AtomicU64,
}

/// Point-in-time counters, exposed on `/status`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DeliveryStats {
    /// Accepted and not yet finished.
    pub queued: u64,
    pub delivered: u64,
    /// Delivered inline because no usable PDF was available. Also counted in `delivered`.
    pub degraded: u64,
    pub failed: u64,
    /// Dropped before or during processing (queue full, worker panic).
    pub abandoned: u64,
}

pub struct DeliveryOrchestrator {
    sender: Mutex<Option<mpsc::Sender<DeliveryJob>>>,
    dispatch_loop: tokio::sync::Mutex<Option<JoinHandle<()>>>,
    counters: Arc<Counters>,
    workers: usize,
}

impl DeliveryOrchestrator {
    /// Spawns the dispatch loop. Must be called inside a tokio runtime.
    pub fn start(
        config: OrchestratorConfig,
        converter: Arc<dyn DocumentConverter>,
        dispatcher: Arc<dyn Dispatcher>,
    ) -> Self {
        let workers = config.workers.max(1);
        let (sender, receiver) = mpsc::channel(config.queue_capacity.max(1));
        let counters = Arc::new(Counters::default());

        let dispatch_loop = tokio::spawn(dispatch_loop(
            receiver,
            workers,
            Arc::new(config.reports_dir),
            converter,
            dispatcher,
            counters.clone(),
        ));

        info!(
            workers,
            queue_capacity = config.queue_capacity,
            "Delivery orchestrator started"
        );

        Self {
            sender: Mutex::new(Some(sender)),
            dispatch_loop: tokio::sync::Mutex::new(Some(dispatch_loop)),
            counters,
            workers,
        }
    }

    /// Enqueues a job and returns immediately.
    pub fn submit(&self, job: DeliveryJob) -> Result<Uuid, SubmitError> {
        let guard = self.sender.lock().unwrap_or_else(PoisonError::into_inner);
        let Some(sender) = guard.as_ref() else {
            return Err(SubmitError::ShuttingDown);
        };

        let id = job.id;
        // Count before sending so a fast worker never decrements first.
        self.counters.queued.fetch_add(1, Ordering::Relaxed);
        match sender.try_send(job) {
            Ok(()) => {
                debug!(job_id = %id, "Delivery job queued");
                Ok(id)
            }
            Err(mpsc::error::TrySendError::Full(job)) => {
                self.counters.queued.fetch_sub(1, Ordering::Relaxed);
                self.counters.abandoned.fetch_add(1, Ordering::Relaxed);
                warn!(job_id = %job.id, recipient = %job.recipient.email, "Delivery queue full; job abandoned");
                Err(SubmitError::QueueFull)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.counters.queued.fetch_sub(1, Ordering::Relaxed);
                Err(SubmitError::ShuttingDown)
            }
        }
    }

    pub fn stats(&self) -> DeliveryStats {
        DeliveryStats {
            queued: self.counters.queued.load(Ordering::Relaxed),
            delivered: self.counters.delivered.load(Ordering::Relaxed),
            degraded: self.counters.degraded.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            abandoned: self.counters.abandoned.load(Ordering::Relaxed),
        }
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Closes intake and waits until every accepted job has finished.
    /// Idempotent.
    pub async fn shutdown(&self) {
        let sender = self
            .sender
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        drop(sender);

        let handle = self.dispatch_loop.lock().await.take();
        if let Some(handle) = handle {
            info!("Draining delivery queue");
            if let Err(e) = handle.await {
                error!(error = %e, "Delivery dispatch loop panicked");
            }
            info!(stats = ?self.stats(), "Delivery orchestrator stopped");
        }
    }
}

async fn dispatch_loop(
    mut receiver: mpsc::Receiver<DeliveryJob>,
    workers: usize,
    reports_dir: Arc<PathBuf>,
    converter: Arc<dyn DocumentConverter>,
    dispatcher: Arc<dyn Dispatcher>,
    counters: Arc<Counters>,
) {
    let permits = Arc::new(Semaphore::new(workers));

    while let Some(job) = receiver.recv().await {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };

        let converter = converter.clone();
        let dispatcher = dispatcher.clone();
        let reports_dir = reports_dir.clone();
        let counters = counters.clone();
        tokio::spawn(async move {
            let _permit = permit;
            let job_id = job.id;

            // Inner task so a panic in the pipeline is observed here instead of
            // silently losing the job.
            let outcome = tokio::spawn(async move {
                run_job(job, converter.as_ref(), dispatcher.as_ref(), &reports_dir).await
            })
            .await;

            counters.queued.fetch_sub(1, Ordering::Relaxed);
            match outcome {
                Ok(report) if report.delivered() => {
                    counters.delivered.fetch_add(1, Ordering::Relaxed);
                    if report.degraded() {
                        counters.degraded.fetch_add(1, Ordering::Relaxed);
                    }
                }
                Ok(_) => {
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                }
                Err(e) => {
                    counters.abandoned.fetch_add(1, Ordering::Relaxed);
                    error!(job_id = %job_id, error = %e, "Delivery job panicked; job abandoned");
                }
            }
        });
    }

    // Intake closed: wait for in-flight workers.
    if let Ok(all) = permits.acquire_many_owned(workers as u32).await {
        drop(all);
    }
}
