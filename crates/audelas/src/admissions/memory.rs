use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;

use super::dashboard::{
    rank_high_risk, tally_funnel, FunnelEntry, HighRiskEntry, HighRiskQuery, PageRequest,
    ScoreWithProgram,
};
use super::domain::{
    Application, ApplicationId, Event, EventId, Institution, InstitutionId, NewApplication,
    NewEvent, NewProgram, PairKey, Program, ProgramId, Role, StudentProfile, StudentProgramScore,
    UserId,
};
use super::repository::{AdmissionsRepository, CatalogRepository, RepositoryError};
use super::scoring::ProgramScores;

/// Process-local store. Every operation runs under one lock, so uniqueness
/// checks and upserts are atomic per key.
#[derive(Default, Clone)]
pub struct InMemoryAdmissionsRepository {
    state: Arc<Mutex<StoreState>>,
}

#[derive(Default)]
struct StoreState {
    sequence: u64,
    users: HashMap<UserId, Role>,
    emails: HashMap<String, UserId>,
    profiles: HashMap<UserId, StudentProfile>,
    institutions: BTreeMap<InstitutionId, Institution>,
    programs: BTreeMap<ProgramId, Program>,
    applications: HashMap<PairKey, Application>,
    events: HashMap<PairKey, Vec<Event>>,
    scores: HashMap<PairKey, StudentProgramScore>,
}

impl StoreState {
    fn next_id(&mut self) -> u64 {
        self.sequence += 1;
        self.sequence
    }
}

impl InMemoryAdmissionsRepository {
    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store lock poisoned".to_string()))
    }

    /// Number of applications stored for the pair (0 or 1).
    pub fn application_count(&self, pair: PairKey) -> Result<usize, RepositoryError> {
        Ok(usize::from(self.lock()?.applications.contains_key(&pair)))
    }

    pub fn score(&self, pair: PairKey) -> Result<Option<StudentProgramScore>, RepositoryError> {
        Ok(self.lock()?.scores.get(&pair).cloned())
    }

    pub fn score_count(&self) -> Result<usize, RepositoryError> {
        Ok(self.lock()?.scores.len())
    }

    /// Pairs that currently hold an application, in key order.
    pub fn application_pairs(&self) -> Result<Vec<PairKey>, RepositoryError> {
        let mut pairs: Vec<PairKey> = self.lock()?.applications.keys().copied().collect();
        pairs.sort();
        Ok(pairs)
    }
}

impl AdmissionsRepository for InMemoryAdmissionsRepository {
    fn student_profile(&self, student: UserId) -> Result<Option<StudentProfile>, RepositoryError> {
        Ok(self.lock()?.profiles.get(&student).cloned())
    }

    fn program(&self, program: ProgramId) -> Result<Option<Program>, RepositoryError> {
        Ok(self.lock()?.programs.get(&program).cloned())
    }

    fn events_for(&self, pair: PairKey) -> Result<Vec<Event>, RepositoryError> {
        Ok(self.lock()?.events.get(&pair).cloned().unwrap_or_default())
    }

    fn application(&self, pair: PairKey) -> Result<Option<Application>, RepositoryError> {
        Ok(self.lock()?.applications.get(&pair).cloned())
    }

    fn insert_application(&self, draft: NewApplication) -> Result<Application, RepositoryError> {
        let mut state = self.lock()?;
        if !state.programs.contains_key(&draft.pair.program_id) {
            return Err(RepositoryError::NotFound);
        }

        let id = ApplicationId(state.next_id());
        match state.applications.entry(draft.pair) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict),
            Entry::Vacant(slot) => {
                let application = Application {
                    id,
                    student_id: draft.pair.student_id,
                    program_id: draft.pair.program_id,
                    status: draft.status,
                    created_at: Utc::now(),
                };
                slot.insert(application.clone());
                Ok(application)
            }
        }
    }

    fn append_event(&self, draft: NewEvent) -> Result<Event, RepositoryError> {
        let mut state = self.lock()?;
        if !state.programs.contains_key(&draft.pair.program_id) {
            return Err(RepositoryError::NotFound);
        }

        let event = Event {
            id: EventId(state.next_id()),
            student_id: draft.pair.student_id,
            program_id: draft.pair.program_id,
            kind: draft.kind,
            metadata: draft.metadata,
            created_at: Utc::now(),
        };
        state
            .events
            .entry(draft.pair)
            .or_default()
            .push(event.clone());
        Ok(event)
    }

    fn upsert_score(
        &self,
        pair: PairKey,
        scores: ProgramScores,
    ) -> Result<StudentProgramScore, RepositoryError> {
        let record = StudentProgramScore {
            student_id: pair.student_id,
            program_id: pair.program_id,
            engagement_score: scores.engagement,
            fit_score: scores.fit,
            yield_risk_score: scores.yield_risk,
            updated_at: Utc::now(),
        };
        self.lock()?.scores.insert(pair, record.clone());
        Ok(record)
    }
}

impl CatalogRepository for InMemoryAdmissionsRepository {
    fn register_user(&self, email: &str, role: Role) -> Result<UserId, RepositoryError> {
        let mut state = self.lock()?;
        let key = email.trim().to_ascii_lowercase();
        if state.emails.contains_key(&key) {
            return Err(RepositoryError::Conflict);
        }

        let id = UserId(state.next_id());
        state.emails.insert(key, id);
        state.users.insert(id, role);
        Ok(id)
    }

    fn insert_student(&self, profile: StudentProfile) -> Result<StudentProfile, RepositoryError> {
        let mut state = self.lock()?;
        match state.users.get(&profile.student_id) {
            Some(Role::Student) => {}
            Some(Role::InstitutionAdmin) => return Err(RepositoryError::Conflict),
            None => return Err(RepositoryError::NotFound),
        }
        match state.profiles.entry(profile.student_id) {
            Entry::Occupied(_) => Err(RepositoryError::Conflict),
            Entry::Vacant(slot) => Ok(slot.insert(profile).clone()),
        }
    }

    fn insert_institution(
        &self,
        name: &str,
        admin_user_id: UserId,
    ) -> Result<Institution, RepositoryError> {
        let mut state = self.lock()?;
        if state
            .institutions
            .values()
            .any(|institution| institution.admin_user_id == admin_user_id)
        {
            return Err(RepositoryError::Conflict);
        }

        let institution = Institution {
            id: InstitutionId(state.next_id()),
            name: name.to_string(),
            admin_user_id,
        };
        state
            .institutions
            .insert(institution.id, institution.clone());
        Ok(institution)
    }

    fn insert_program(&self, draft: NewProgram) -> Result<Program, RepositoryError> {
        let mut state = self.lock()?;
        if !state.institutions.contains_key(&draft.institution_id) {
            return Err(RepositoryError::NotFound);
        }

        let program = Program {
            id: ProgramId(state.next_id()),
            institution_id: draft.institution_id,
            name: draft.name,
            tags: draft.tags,
        };
        state.programs.insert(program.id, program.clone());
        Ok(program)
    }

    fn program_ids(&self) -> Result<Vec<ProgramId>, RepositoryError> {
        Ok(self.lock()?.programs.keys().copied().collect())
    }

    fn scores_for_student(
        &self,
        student: UserId,
        limit: usize,
    ) -> Result<Vec<ScoreWithProgram>, RepositoryError> {
        let state = self.lock()?;
        let mut scores: Vec<&StudentProgramScore> = state
            .scores
            .values()
            .filter(|score| score.student_id == student)
            .collect();
        scores.sort_by_key(|score| score.program_id);

        Ok(scores
            .into_iter()
            .filter_map(|score| {
                state.programs.get(&score.program_id).map(|program| ScoreWithProgram {
                    score: score.clone(),
                    program: program.clone(),
                })
            })
            .take(limit)
            .collect())
    }

    fn institution_for_admin(&self, admin: UserId) -> Result<Option<Institution>, RepositoryError> {
        Ok(self
            .lock()?
            .institutions
            .values()
            .find(|institution| institution.admin_user_id == admin)
            .cloned())
    }

    fn programs_for_institution(
        &self,
        institution: InstitutionId,
        page: PageRequest,
    ) -> Result<Vec<Program>, RepositoryError> {
        Ok(self
            .lock()?
            .programs
            .values()
            .filter(|program| program.institution_id == institution)
            .skip(page.offset())
            .take(page.limit())
            .cloned()
            .collect())
    }

    fn application_funnel(
        &self,
        institution: InstitutionId,
    ) -> Result<Vec<FunnelEntry>, RepositoryError> {
        let state = self.lock()?;
        let statuses = state.applications.values().filter_map(|application| {
            state
                .programs
                .get(&application.program_id)
                .filter(|program| program.institution_id == institution)
                .map(|_| application.status)
        });
        Ok(tally_funnel(statuses))
    }

    fn high_risk_students(
        &self,
        institution: InstitutionId,
        query: HighRiskQuery,
    ) -> Result<Vec<HighRiskEntry>, RepositoryError> {
        let state = self.lock()?;
        let in_institution = state.scores.values().filter(|score| {
            state
                .programs
                .get(&score.program_id)
                .is_some_and(|program| program.institution_id == institution)
        });

        Ok(rank_high_risk(in_institution, &query)
            .into_iter()
            .filter_map(|score| {
                state.programs.get(&score.program_id).map(|program| HighRiskEntry {
                    score: score.clone(),
                    student: state.profiles.get(&score.student_id).cloned(),
                    program: program.clone(),
                })
            })
            .collect())
    }
}
