use std::sync::Arc;

use axum::http::StatusCode;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::dashboard::{
    FunnelEntry, HighRiskEntry, HighRiskQuery, PageRequest, ScoreWithProgram, STUDENT_SCORE_LIMIT,
};
use super::domain::{
    Application, ApplicationStatus, Event, EventType, Institution, InstitutionId, NewApplication,
    NewEvent, PairKey, Program, ProgramId, StudentProfile, UserId,
};
use super::queue::{QueueError, ScoreJob, ScoreTrigger, ScoringQueue};
use super::repository::{AdmissionsRepository, CatalogRepository, RepositoryError};
use super::rescore::Rescorer;
use crate::config::ScoringConfig;

/// Application intake plus the dashboard reads, backed by one repository.
pub struct AdmissionsService<R> {
    repository: Arc<R>,
    queue: ScoringQueue,
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + 'static,
{
    pub fn new(repository: Arc<R>, queue: ScoringQueue) -> Self {
        Self { repository, queue }
    }

    /// Build the rescorer and spawn its queue worker on the current runtime.
    pub fn start(repository: Arc<R>, config: &ScoringConfig) -> (Self, JoinHandle<()>) {
        let rescorer = Arc::new(Rescorer::new(repository.clone(), config.clone()));
        let (queue, worker) = ScoringQueue::spawn(rescorer, config.queue_capacity);
        (Self::new(repository, queue), worker)
    }

    pub fn repository(&self) -> &Arc<R> {
        &self.repository
    }

    pub fn queue(&self) -> &ScoringQueue {
        &self.queue
    }

    /// Create the pair's application, log an APPLY event and schedule a rescore.
    ///
    /// Returns as soon as the writes commit. The score is recomputed in the
    /// background, so a read straight after this call can still return the
    /// previous score (or none).
    pub fn apply(
        &self,
        student: UserId,
        program: ProgramId,
    ) -> Result<Application, ApplicationServiceError> {
        let pair = PairKey::new(student, program);
        let application = self
            .repository
            .insert_application(NewApplication {
                pair,
                status: ApplicationStatus::Applied,
            })
            .map_err(|err| match err {
                RepositoryError::Conflict => ApplicationServiceError::AlreadyApplied(program),
                RepositoryError::NotFound => ApplicationServiceError::ProgramNotFound(program),
                other => ApplicationServiceError::Repository(other),
            })?;

        self.repository
            .append_event(NewEvent::new(pair, EventType::Apply))?;

        self.schedule(pair, ScoreTrigger::ApplicationCreated);
        info!(%pair, application_id = %application.id, "application received");
        Ok(application)
    }

    /// Append an interaction event and schedule a rescore for its pair.
    pub fn record_event(
        &self,
        student: UserId,
        program: ProgramId,
        kind: EventType,
    ) -> Result<Event, ApplicationServiceError> {
        let pair = PairKey::new(student, program);
        let event = self
            .repository
            .append_event(NewEvent::new(pair, kind))
            .map_err(|err| match err {
                RepositoryError::NotFound => ApplicationServiceError::ProgramNotFound(program),
                other => ApplicationServiceError::Repository(other),
            })?;

        self.schedule(pair, ScoreTrigger::EventRecorded);
        Ok(event)
    }

    fn schedule(&self, pair: PairKey, trigger: ScoreTrigger) {
        match self.queue.submit(ScoreJob { pair, trigger }) {
            Ok(()) => {}
            Err(QueueError::Full) => {
                warn!(%pair, "scoring queue full; score left stale until next trigger")
            }
            Err(QueueError::Closed) => warn!(%pair, "scoring worker unavailable"),
        }
    }

    pub fn student_profile(
        &self,
        student: UserId,
    ) -> Result<StudentProfile, ApplicationServiceError> {
        self.repository
            .student_profile(student)?
            .ok_or(ApplicationServiceError::Repository(RepositoryError::NotFound))
    }
}

impl<R> AdmissionsService<R>
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    pub fn student_scores(
        &self,
        student: UserId,
    ) -> Result<Vec<ScoreWithProgram>, ApplicationServiceError> {
        Ok(self
            .repository
            .scores_for_student(student, STUDENT_SCORE_LIMIT)?)
    }

    pub fn institution_for_admin(
        &self,
        admin: UserId,
    ) -> Result<Institution, ApplicationServiceError> {
        self.repository
            .institution_for_admin(admin)?
            .ok_or(ApplicationServiceError::Repository(RepositoryError::NotFound))
    }

    pub fn programs(
        &self,
        institution: InstitutionId,
        page: PageRequest,
    ) -> Result<Vec<Program>, ApplicationServiceError> {
        Ok(self.repository.programs_for_institution(institution, page)?)
    }

    pub fn funnel(
        &self,
        institution: InstitutionId,
    ) -> Result<Vec<FunnelEntry>, ApplicationServiceError> {
        Ok(self.repository.application_funnel(institution)?)
    }

    pub fn high_risk_students(
        &self,
        institution: InstitutionId,
        query: HighRiskQuery,
    ) -> Result<Vec<HighRiskEntry>, ApplicationServiceError> {
        Ok(self.repository.high_risk_students(institution, query)?)
    }
}

/// Error raised by the admissions service.
#[derive(Debug, thiserror::Error)]
pub enum ApplicationServiceError {
    #[error("already applied to program {0}")]
    AlreadyApplied(ProgramId),
    #[error("program {0} not found")]
    ProgramNotFound(ProgramId),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl ApplicationServiceError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApplicationServiceError::AlreadyApplied(_) => StatusCode::BAD_REQUEST,
            ApplicationServiceError::ProgramNotFound(_)
            | ApplicationServiceError::Repository(RepositoryError::NotFound) => {
                StatusCode::NOT_FOUND
            }
            ApplicationServiceError::Repository(RepositoryError::Conflict) => StatusCode::CONFLICT,
            ApplicationServiceError::Repository(RepositoryError::Unavailable(_)) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}
