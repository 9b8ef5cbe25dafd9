use super::dashboard::{FunnelEntry, HighRiskEntry, HighRiskQuery, PageRequest, ScoreWithProgram};
use super::domain::{
    Application, Event, Institution, InstitutionId, NewApplication, NewEvent, NewProgram, PairKey,
    Program, ProgramId, Role, StudentProfile, StudentProgramScore, UserId,
};
use super::scoring::ProgramScores;

/// Storage the scoring engine and intake path depend on.
///
/// Implementations must make `insert_application` atomic with respect to the
/// (student, program) uniqueness constraint, and `upsert_score` atomic per key.
pub trait AdmissionsRepository: Send + Sync {
    fn student_profile(&self, student: UserId) -> Result<Option<StudentProfile>, RepositoryError>;
    fn program(&self, program: ProgramId) -> Result<Option<Program>, RepositoryError>;
    fn events_for(&self, pair: PairKey) -> Result<Vec<Event>, RepositoryError>;
    fn application(&self, pair: PairKey) -> Result<Option<Application>, RepositoryError>;

    /// Fails with [`RepositoryError::Conflict`] when the pair already has an
    /// application and [`RepositoryError::NotFound`] when the program is unknown.
    fn insert_application(&self, draft: NewApplication) -> Result<Application, RepositoryError>;
    fn append_event(&self, draft: NewEvent) -> Result<Event, RepositoryError>;

    /// Insert-or-overwrite keyed by pair; last write wins.
    fn upsert_score(
        &self,
        pair: PairKey,
        scores: ProgramScores,
    ) -> Result<StudentProgramScore, RepositoryError>;
}

/// Catalog writes used by the seeder and the dashboard read models.
pub trait CatalogRepository: Send + Sync {
    /// Fails with [`RepositoryError::Conflict`] on a duplicate email.
    fn register_user(&self, email: &str, role: Role) -> Result<UserId, RepositoryError>;
    fn insert_student(&self, profile: StudentProfile) -> Result<StudentProfile, RepositoryError>;
    fn insert_institution(
        &self,
        name: &str,
        admin_user_id: UserId,
    ) -> Result<Institution, RepositoryError>;
    fn insert_program(&self, draft: NewProgram) -> Result<Program, RepositoryError>;
    fn program_ids(&self) -> Result<Vec<ProgramId>, RepositoryError>;

    fn scores_for_student(
        &self,
        student: UserId,
        limit: usize,
    ) -> Result<Vec<ScoreWithProgram>, RepositoryError>;
    fn institution_for_admin(&self, admin: UserId) -> Result<Option<Institution>, RepositoryError>;
    fn programs_for_institution(
        &self,
        institution: InstitutionId,
        page: PageRequest,
    ) -> Result<Vec<Program>, RepositoryError>;
    fn application_funnel(
        &self,
        institution: InstitutionId,
    ) -> Result<Vec<FunnelEntry>, RepositoryError>;
    fn high_risk_students(
        &self,
        institution: InstitutionId,
        query: HighRiskQuery,
    ) -> Result<Vec<HighRiskEntry>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    /// Only transient failures are worth retrying.
    pub fn is_transient(&self) -> bool {
        matches!(self, RepositoryError::Unavailable(_))
    }
}
