use std::collections::{BTreeMap, BTreeSet};
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;
use tokio::task::JoinHandle;

use crate::admissions::dashboard::{
    FunnelEntry, HighRiskEntry, HighRiskQuery, PageRequest, ScoreWithProgram,
};
use crate::admissions::domain::{
    Application, ApplicationId, ApplicationStatus, Event, EventId, EventType, Institution,
    InstitutionId, NewApplication, NewEvent, NewProgram, PairKey, Program, ProgramId, Role,
    StudentProfile, StudentProgramScore, UserId,
};
use crate::admissions::memory::InMemoryAdmissionsRepository;
use crate::admissions::repository::{AdmissionsRepository, CatalogRepository, RepositoryError};
use crate::admissions::scoring::ProgramScores;
use crate::admissions::service::AdmissionsService;
use crate::config::ScoringConfig;

pub(super) fn tags(values: &[&str]) -> BTreeSet<String> {
    values.iter().map(|value| value.to_string()).collect()
}

pub(super) fn profile(student: u64, interests: &[&str]) -> StudentProfile {
    StudentProfile {
        student_id: UserId(student),
        name: "Avery Lee".to_string(),
        interests: tags(interests),
        goals: Some("Graduate".to_string()),
    }
}

pub(super) fn program(id: u64, program_tags: &[&str]) -> Program {
    Program {
        id: ProgramId(id),
        institution_id: InstitutionId(1),
        name: "Computational Biology BS".to_string(),
        tags: tags(program_tags),
    }
}

pub(super) fn events(student: u64, program: u64, count: usize, kind: EventType) -> Vec<Event> {
    (0..count)
        .map(|index| Event {
            id: EventId(index as u64 + 1),
            student_id: UserId(student),
            program_id: ProgramId(program),
            kind,
            metadata: BTreeMap::new(),
            created_at: Utc::now(),
        })
        .collect()
}

pub(super) fn application(student: u64, program: u64, status: ApplicationStatus) -> Application {
    Application {
        id: ApplicationId(1),
        student_id: UserId(student),
        program_id: ProgramId(program),
        status,
        created_at: Utc::now(),
    }
}

pub(super) fn scoring_config() -> ScoringConfig {
    ScoringConfig {
        queue_capacity: 64,
        retry_attempts: 2,
        retry_backoff_ms: 1,
    }
}

/// Catalog handles created by [`seeded_store`].
pub(super) struct Fixture {
    pub(super) admin: UserId,
    pub(super) institution: InstitutionId,
    pub(super) student: UserId,
    /// Shares all three of the student's interests.
    pub(super) matching_program: ProgramId,
    /// Shares one tag with the student.
    pub(super) partial_program: ProgramId,
}

impl Fixture {
    pub(super) fn pair(&self) -> PairKey {
        PairKey::new(self.student, self.matching_program)
    }
}

pub(super) fn seeded_store() -> (InMemoryAdmissionsRepository, Fixture) {
    let store = InMemoryAdmissionsRepository::default();
    let admin = store
        .register_user("admin_0@edu.com", Role::InstitutionAdmin)
        .expect("admin registers");
    let institution = store
        .insert_institution("Harbor University", admin)
        .expect("institution inserts");
    let matching_program = store
        .insert_program(NewProgram {
            institution_id: institution.id,
            name: "Data Science BS".to_string(),
            tags: tags(&["Math", "Code", "Bio"]),
        })
        .expect("program inserts");
    let partial_program = store
        .insert_program(NewProgram {
            institution_id: institution.id,
            name: "Studio Art Certificate".to_string(),
            tags: tags(&["Math", "Art", "History"]),
        })
        .expect("program inserts");
    let student = store
        .register_user("s0_abcde@audelas.com", Role::Student)
        .expect("student registers");
    store
        .insert_student(StudentProfile {
            student_id: student,
            name: "Kiara Patel".to_string(),
            interests: tags(&["Math", "Code", "Bio"]),
            goals: Some("Graduate".to_string()),
        })
        .expect("profile inserts");

    let fixture = Fixture {
        admin,
        institution: institution.id,
        student,
        matching_program: matching_program.id,
        partial_program: partial_program.id,
    };
    (store, fixture)
}

pub(super) fn build_service<R>(
    repository: Arc<R>,
) -> (AdmissionsService<R>, JoinHandle<()>)
where
    R: AdmissionsRepository + 'static,
{
    AdmissionsService::start(repository, &scoring_config())
}

/// Delegates to an in-memory store but can be told to fail specific writes.
#[derive(Default)]
pub(super) struct FaultyRepository {
    pub(super) inner: InMemoryAdmissionsRepository,
    pub(super) fail_applications: AtomicBool,
    pub(super) fail_events: AtomicBool,
    /// Number of upcoming score upserts that fail with `Unavailable`.
    pub(super) score_failures: AtomicU32,
}

impl FaultyRepository {
    pub(super) fn wrapping(inner: InMemoryAdmissionsRepository) -> Self {
        Self {
            inner,
            ..Self::default()
        }
    }

    fn offline() -> RepositoryError {
        RepositoryError::Unavailable("database offline".to_string())
    }
}

impl AdmissionsRepository for FaultyRepository {
    fn student_profile(&self, student: UserId) -> Result<Option<StudentProfile>, RepositoryError> {
        self.inner.student_profile(student)
    }

    fn program(&self, program: ProgramId) -> Result<Option<Program>, RepositoryError> {
        self.inner.program(program)
    }

    fn events_for(&self, pair: PairKey) -> Result<Vec<Event>, RepositoryError> {
        self.inner.events_for(pair)
    }

    fn application(&self, pair: PairKey) -> Result<Option<Application>, RepositoryError> {
        self.inner.application(pair)
    }

    fn insert_application(&self, draft: NewApplication) -> Result<Application, RepositoryError> {
        if self.fail_applications.load(Ordering::SeqCst) {
            return Err(Self::offline());
        }
        self.inner.insert_application(draft)
    }

    fn append_event(&self, draft: NewEvent) -> Result<Event, RepositoryError> {
        if self.fail_events.load(Ordering::SeqCst) {
            return Err(Self::offline());
        }
        self.inner.append_event(draft)
    }

    fn upsert_score(
        &self,
        pair: PairKey,
        scores: ProgramScores,
    ) -> Result<StudentProgramScore, RepositoryError> {
        let remaining = self.score_failures.load(Ordering::SeqCst);
        if remaining > 0 {
            self.score_failures.store(remaining - 1, Ordering::SeqCst);
            return Err(Self::offline());
        }
        self.inner.upsert_score(pair, scores)
    }
}

impl CatalogRepository for FaultyRepository {
    fn register_user(&self, email: &str, role: Role) -> Result<UserId, RepositoryError> {
        self.inner.register_user(email, role)
    }

    fn insert_student(&self, profile: StudentProfile) -> Result<StudentProfile, RepositoryError> {
        self.inner.insert_student(profile)
    }

    fn insert_institution(
        &self,
        name: &str,
        admin_user_id: UserId,
    ) -> Result<Institution, RepositoryError> {
        self.inner.insert_institution(name, admin_user_id)
    }

    fn insert_program(&self, draft: NewProgram) -> Result<Program, RepositoryError> {
        self.inner.insert_program(draft)
    }

    fn program_ids(&self) -> Result<Vec<ProgramId>, RepositoryError> {
        self.inner.program_ids()
    }

    fn scores_for_student(
        &self,
        student: UserId,
        limit: usize,
    ) -> Result<Vec<ScoreWithProgram>, RepositoryError> {
        self.inner.scores_for_student(student, limit)
    }

    fn institution_for_admin(&self, admin: UserId) -> Result<Option<Institution>, RepositoryError> {
        self.inner.institution_for_admin(admin)
    }

    fn programs_for_institution(
        &self,
        institution: InstitutionId,
        page: PageRequest,
    ) -> Result<Vec<Program>, RepositoryError> {
        self.inner.programs_for_institution(institution, page)
    }

    fn application_funnel(
        &self,
        institution: InstitutionId,
    ) -> Result<Vec<FunnelEntry>, RepositoryError> {
        self.inner.application_funnel(institution)
    }

    fn high_risk_students(
        &self,
        institution: InstitutionId,
        query: HighRiskQuery,
    ) -> Result<Vec<HighRiskEntry>, RepositoryError> {
        self.inner.high_risk_students(institution, query)
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
