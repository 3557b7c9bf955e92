//! Ingest worker pool
//!
//! The webhook handler enqueues upload events here and returns immediately;
//! a small pool of workers drains the queue and runs the pipeline. Runs for
//! different events never block one another beyond queue ordering, and
//! nothing can cancel a run once it is picked up.

use std::sync::Arc;

use tokio::sync::{Mutex, mpsc};
use tracing::{error, info, warn};

use super::ingest::{IngestOutcome, IngestPipeline, UploadEvent};

/// Handle for fire-and-forget dispatch into the worker pool
#[derive(Clone)]
pub struct IngestQueue {
    tx: mpsc::Sender<UploadEvent>,
}

impl IngestQueue {
    /// Spawn `workers` consumers over a queue of the given capacity
    pub fn spawn(pipeline: Arc<IngestPipeline>, workers: usize, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel::<UploadEvent>(capacity);
        let rx = Arc::new(Mutex::new(rx));

        for worker in 0..workers.max(1) {
            let rx = rx.clone();
            let pipeline = pipeline.clone();

            tokio::spawn(async move {
                loop {
                    // Hold the lock only for the receive so other workers
                    // keep draining while this one processes.
                    let event = { rx.lock().await.recv().await };
                    let Some(event) = event else {
                        info!(worker = worker, "Ingest queue closed, worker exiting");
                        break;
                    };

                    let filename = event.file_name.clone();
                    match pipeline.run(event).await {
                        Ok(IngestOutcome::Created(id)) => {
                            info!(worker = worker, filename = %filename, id = %id, "Ingestion complete");
                        }
                        Ok(outcome) => {
                            info!(worker = worker, filename = %filename, outcome = ?outcome, "Ingestion ended without a record");
                        }
                        // A failed run is local to its event; the worker
                        // carries on with the next one.
                        Err(e) => {
                            error!(worker = worker, filename = %filename, error = %e, "Ingestion run failed");
                        }
                    }
                }
            });
        }

        Self { tx }
    }

    /// Enqueue an event without waiting. A full queue drops the event with
    /// a warning; Telegram redelivers unacknowledged updates.
    pub fn dispatch(&self, event: UploadEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!(error = %e, "Dropping upload event, ingest queue unavailable");
        }
    }
}
