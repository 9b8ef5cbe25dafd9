use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::domain::PairKey;
use super::repository::AdmissionsRepository;
use super::rescore::{Rescorer, ScoreOutcome};

/// Why a recomputation was requested; carried into the logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScoreTrigger {
    ApplicationCreated,
    EventRecorded,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScoreJob {
    pub pair: PairKey,
    pub trigger: ScoreTrigger,
}

enum QueueMessage {
    Job(ScoreJob),
    Flush(oneshot::Sender<()>),
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("scoring queue is full")]
    Full,
    #[error("scoring worker has stopped")]
    Closed,
}

/// Counters describing what the worker has done so far.
#[derive(Debug, Default)]
struct Counters {
    updated: AtomicU64,
    skipped: AtomicU64,
    failed: AtomicU64,
    dropped: AtomicU64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueStats {
    pub updated: u64,
    pub skipped: u64,
    pub failed: u64,
    pub dropped: u64,
}

/// Handle to the background scoring worker.
///
/// Submissions never wait for the recomputation: readers may see the
/// previous score until the worker catches up.
#[derive(Clone)]
pub struct ScoringQueue {
    sender: mpsc::Sender<QueueMessage>,
    counters: Arc<Counters>,
}

impl ScoringQueue {
    /// Spawn the worker on the current Tokio runtime.
    pub fn spawn<R>(rescorer: Arc<Rescorer<R>>, capacity: usize) -> (Self, JoinHandle<()>)
    where
        R: AdmissionsRepository + 'static,
    {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        let counters = Arc::new(Counters::default());
        let worker = tokio::spawn(run_worker(rescorer, receiver, counters.clone()));
        (Self { sender, counters }, worker)
    }

    /// Enqueue without blocking. A full queue drops the job and the score
    /// stays stale until the pair is triggered again.
    pub fn submit(&self, job: ScoreJob) -> Result<(), QueueError> {
        match self.sender.try_send(QueueMessage::Job(job)) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
                Err(QueueError::Full)
            }
            Err(mpsc::error::TrySendError::Closed(_)) => Err(QueueError::Closed),
        }
    }

    /// Resolves once every job submitted before this call has been processed.
    pub async fn flush(&self) -> Result<(), QueueError> {
        let (reply, done) = oneshot::channel();
        self.sender
            .send(QueueMessage::Flush(reply))
            .await
            .map_err(|_| QueueError::Closed)?;
        done.await.map_err(|_| QueueError::Closed)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            updated: self.counters.updated.load(Ordering::Relaxed),
            skipped: self.counters.skipped.load(Ordering::Relaxed),
            failed: self.counters.failed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
        }
    }
}

async fn run_worker<R>(
    rescorer: Arc<Rescorer<R>>,
    mut receiver: mpsc::Receiver<QueueMessage>,
    counters: Arc<Counters>,
) where
    R: AdmissionsRepository + 'static,
{
    while let Some(message) = receiver.recv().await {
        match message {
            QueueMessage::Job(job) => match rescorer.recalculate_with_retry(job.pair).await {
                Ok(ScoreOutcome::Updated(score)) => {
                    counters.updated.fetch_add(1, Ordering::Relaxed);
                    debug!(
                        pair = %job.pair,
                        trigger = ?job.trigger,
                        engagement = score.engagement_score,
                        fit = score.fit_score,
                        yield_risk = score.yield_risk_score,
                        "score updated"
                    );
                }
                Ok(ScoreOutcome::Skipped { .. }) => {
                    counters.skipped.fetch_add(1, Ordering::Relaxed);
                }
                Err(err) => {
                    // The application and event writes are already committed.
                    counters.failed.fetch_add(1, Ordering::Relaxed);
                    warn!(pair = %job.pair, trigger = ?job.trigger, error = %err, "score recomputation failed");
                }
            },
            QueueMessage::Flush(reply) => {
                let _ = reply.send(());
            }
        }
    }
    debug!("scoring worker stopped");
}
