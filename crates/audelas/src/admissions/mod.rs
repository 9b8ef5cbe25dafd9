//! Admissions intake and the per-(student, program) scoring engine.
//!
//! `service` commits applications and events synchronously, then hands the
//! affected pair to the background `queue`, whose worker runs the `rescore`
//! pipeline (load inputs, `scoring`, upsert). Scores are therefore eventually
//! consistent with the writes that triggered them.

pub mod dashboard;
pub mod domain;
pub mod memory;
pub mod principal;
pub mod queue;
pub mod repository;
pub mod rescore;
pub mod router;
pub mod scoring;
pub mod seed;
pub mod service;

#[cfg(test)]
mod tests;

pub use dashboard::{FunnelEntry, HighRiskEntry, HighRiskQuery, PageRequest, ScoreWithProgram};
pub use domain::{
    Application, ApplicationId, ApplicationStatus, Event, EventId, EventType, Institution,
    InstitutionId, NewApplication, NewEvent, NewProgram, PairKey, Principal, Program, ProgramId,
    Role, StudentProfile, StudentProgramScore, UserId,
};
pub use memory::InMemoryAdmissionsRepository;
pub use principal::{PrincipalRejection, USER_ID_HEADER, USER_ROLE_HEADER};
pub use queue::{QueueError, QueueStats, ScoreJob, ScoreTrigger, ScoringQueue};
pub use repository::{AdmissionsRepository, CatalogRepository, RepositoryError};
pub use rescore::{Rescorer, ScoreOutcome, SkipReason};
pub use router::admissions_router;
pub use scoring::{ProgramScores, ScoreEngine, ScoreInputs};
pub use seed::{seed_catalog, SeedReport, SeedRng};
pub use service::{AdmissionsService, ApplicationServiceError};
