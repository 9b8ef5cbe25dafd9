use std::sync::Arc;

use tracing::{debug, warn};

use super::domain::{PairKey, StudentProgramScore};
use super::repository::{AdmissionsRepository, RepositoryError};
use super::scoring::{ScoreEngine, ScoreInputs};
use crate::config::ScoringConfig;

/// Result of one recomputation.
#[derive(Debug, Clone, PartialEq)]
pub enum ScoreOutcome {
    Updated(StudentProgramScore),
    Skipped { reason: SkipReason },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    MissingProfile,
    MissingProgram,
}

/// Loads a pair's current state, runs the engine and persists the result.
pub struct Rescorer<R> {
    repository: Arc<R>,
    engine: ScoreEngine,
    config: ScoringConfig,
}

impl<R> Rescorer<R>
where
    R: AdmissionsRepository + 'static,
{
    pub fn new(repository: Arc<R>, config: ScoringConfig) -> Self {
        Self {
            repository,
            engine: ScoreEngine::new(),
            config,
        }
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    /// Recompute and upsert the pair's score once. Missing entities skip the
    /// write entirely; they never produce a zero score.
    pub fn recalculate(&self, pair: PairKey) -> Result<ScoreOutcome, RepositoryError> {
        let Some(program) = self.repository.program(pair.program_id)? else {
            return Ok(ScoreOutcome::Skipped {
                reason: SkipReason::MissingProgram,
            });
        };
        let Some(profile) = self.repository.student_profile(pair.student_id)? else {
            return Ok(ScoreOutcome::Skipped {
                reason: SkipReason::MissingProfile,
            });
        };
        let events = self.repository.events_for(pair)?;
        let application = self.repository.application(pair)?;

        let inputs = ScoreInputs {
            profile: Some(&profile),
            program: Some(&program),
            events: &events,
            application: application.as_ref(),
        };
        let scores = self.engine.score(&inputs);
        debug_assert!(scores.is_some(), "engine scores when profile and program exist");

        scores
            .map(|scores| self.repository.upsert_score(pair, scores))
            .transpose()
            .map(|stored| match stored {
                Some(stored) => ScoreOutcome::Updated(stored),
                None => ScoreOutcome::Skipped {
                    reason: SkipReason::MissingProfile,
                },
            })
    }

    /// [`Self::recalculate`] with bounded retries on transient store failures.
    /// Recomputation is idempotent, so repeating a partially failed attempt is safe.
    pub async fn recalculate_with_retry(
        &self,
        pair: PairKey,
    ) -> Result<ScoreOutcome, RepositoryError> {
        let mut attempt = 0;
        loop {
            match self.recalculate(pair) {
                Ok(outcome) => {
                    if let ScoreOutcome::Skipped { reason } = &outcome {
                        debug!(%pair, ?reason, "score recomputation skipped");
                    }
                    return Ok(outcome);
                }
                Err(err) if err.is_transient() && attempt < self.config.retry_attempts => {
                    attempt += 1;
                    warn!(%pair, attempt, error = %err, "retrying score recomputation");
                    tokio::time::sleep(self.config.backoff_for(attempt)).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
