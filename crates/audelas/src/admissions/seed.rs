//! Synthetic catalog and engagement data for demos and load tests.
//!
//! Each generated student has an independent chance (20% by default) of one
//! EXPLORING application plus one VIEW event against a random program, which
//! yields a sparse engagement distribution similar to real traffic.

use std::collections::BTreeSet;
use std::sync::Arc;

use tracing::{debug, info};

use super::domain::{
    ApplicationStatus, EventType, NewApplication, NewEvent, NewProgram, PairKey, ProgramId, Role,
    StudentProfile,
};
use super::repository::{AdmissionsRepository, CatalogRepository, RepositoryError};
use super::rescore::{Rescorer, ScoreOutcome};
use crate::config::{ScoringConfig, SeedConfig};

pub const TAG_POOL: [&str; 5] = ["Math", "Art", "Code", "Bio", "History"];
const PROGRAM_TAGS: usize = 3;
const STUDENT_INTERESTS: usize = 2;

const FIRST_NAMES: [&str; 12] = [
    "Avery", "Jules", "Kiara", "Mateo", "Priya", "Noah", "Lena", "Omar", "Sofia", "Theo", "Imani",
    "Rowan",
];
const LAST_NAMES: [&str; 10] = [
    "Lee", "Moreno", "Patel", "Nguyen", "Okafor", "Schmidt", "Haddad", "Kim", "Silva", "Walsh",
];
const CAMPUS_NAMES: [&str; 8] = [
    "Harbor", "Northfield", "Cedar Ridge", "Lakeshore", "Summit", "Riverside", "Granite", "Bayview",
];
const PROGRAM_AREAS: [&str; 8] = [
    "Applied Mathematics",
    "Studio Art",
    "Computer Science",
    "Biology",
    "Public History",
    "Data Science",
    "Bioinformatics",
    "Digital Media",
];
const CREDENTIALS: [&str; 3] = ["BS", "MS", "Certificate"];
const ALPHANUMERIC: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Small seedable generator (SplitMix64); good enough for synthetic data.
#[derive(Debug, Clone)]
pub struct SeedRng {
    state: u64,
}

impl SeedRng {
    pub fn new(seed: u64) -> Self {
        Self { state: seed }
    }

    pub fn from_clock() -> Self {
        let nanos = chrono::Utc::now()
            .timestamp_nanos_opt()
            .unwrap_or_default();
        Self::new(nanos as u64)
    }

    pub fn next_u64(&mut self) -> u64 {
        self.state = self.state.wrapping_add(0x9E37_79B9_7F4A_7C15);
        let mut z = self.state;
        z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
        z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
        z ^ (z >> 31)
    }

    /// Uniform in `[0, 1)`.
    pub fn next_f64(&mut self) -> f64 {
        (self.next_u64() >> 11) as f64 / (1u64 << 53) as f64
    }

    pub fn below(&mut self, bound: usize) -> usize {
        if bound == 0 {
            return 0;
        }
        (self.next_u64() % bound as u64) as usize
    }

    pub fn pick<'a, T>(&mut self, items: &'a [T]) -> Option<&'a T> {
        if items.is_empty() {
            return None;
        }
        items.get(self.below(items.len()))
    }

    /// `count` distinct elements (fewer if `items` is shorter).
    pub fn sample<'a, T>(&mut self, items: &'a [T], count: usize) -> Vec<&'a T> {
        let mut indices: Vec<usize> = (0..items.len()).collect();
        let take = count.min(items.len());
        for slot in 0..take {
            let swap = slot + self.below(indices.len() - slot);
            indices.swap(slot, swap);
        }
        indices[..take].iter().map(|&index| &items[index]).collect()
    }

    fn alphanumeric(&mut self, len: usize) -> String {
        (0..len)
            .map(|_| ALPHANUMERIC[self.below(ALPHANUMERIC.len())] as char)
            .collect()
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub institutions: usize,
    pub programs: usize,
    pub students: usize,
    pub applications: usize,
    pub events: usize,
    pub scores: usize,
}

fn tag_set(rng: &mut SeedRng, count: usize) -> BTreeSet<String> {
    rng.sample(&TAG_POOL, count)
        .into_iter()
        .map(|tag| tag.to_string())
        .collect()
}

/// Populate the store with institutions, programs and students.
///
/// Seeded pairs are rescored inline when `config.rescore` is set; otherwise
/// they carry no score until something triggers them.
pub fn seed_catalog<R>(
    repository: &Arc<R>,
    config: &SeedConfig,
    scoring: &ScoringConfig,
) -> Result<SeedReport, RepositoryError>
where
    R: AdmissionsRepository + CatalogRepository + 'static,
{
    let mut rng = config
        .rng_seed
        .map(SeedRng::new)
        .unwrap_or_else(SeedRng::from_clock);
    let mut report = SeedReport::default();

    for index in 0..config.institutions {
        let admin = match repository.register_user(
            &format!("admin_{index}@edu.com"),
            Role::InstitutionAdmin,
        ) {
            Ok(id) => id,
            Err(RepositoryError::Conflict) => repository.register_user(
                &format!("admin_{index}_{}@edu.com", rng.alphanumeric(5)),
                Role::InstitutionAdmin,
            )?,
            Err(err) => return Err(err),
        };
        let campus = rng.pick(&CAMPUS_NAMES).copied().unwrap_or("Audelas");
        let institution =
            repository.insert_institution(&format!("{campus} University"), admin)?;
        report.institutions += 1;

        for _ in 0..config.programs_per_institution {
            let area = rng.pick(&PROGRAM_AREAS).copied().unwrap_or("General Studies");
            let credential = rng.pick(&CREDENTIALS).copied().unwrap_or("BS");
            repository.insert_program(NewProgram {
                institution_id: institution.id,
                name: format!("{area} {credential}"),
                tags: tag_set(&mut rng, PROGRAM_TAGS),
            })?;
            report.programs += 1;
        }
    }
    info!(
        institutions = report.institutions,
        programs = report.programs,
        "seeded institutions"
    );

    let program_ids: Vec<ProgramId> = repository.program_ids()?;
    let batch_size = config.batch_size.max(1);
    let mut seeded_pairs: Vec<PairKey> = Vec::new();
    let mut created = 0;

    while created < config.students {
        let batch = batch_size.min(config.students - created);
        for index in created..created + batch {
            let email = format!("s{index}_{}@audelas.com", rng.alphanumeric(5));
            let student_id = match repository.register_user(&email, Role::Student) {
                Ok(id) => id,
                Err(RepositoryError::Conflict) => continue,
                Err(err) => return Err(err),
            };
            let first = rng.pick(&FIRST_NAMES).copied().unwrap_or("Student");
            let last = rng.pick(&LAST_NAMES).copied().unwrap_or("Doe");
            repository.insert_student(StudentProfile {
                student_id,
                name: format!("{first} {last}"),
                interests: tag_set(&mut rng, STUDENT_INTERESTS),
                goals: Some("Graduate".to_string()),
            })?;
            report.students += 1;

            if rng.next_f64() >= config.application_rate {
                continue;
            }
            let Some(&program_id) = rng.pick(program_ids.as_slice()) else {
                continue;
            };
            let pair = PairKey::new(student_id, program_id);
            match repository.insert_application(NewApplication {
                pair,
                status: ApplicationStatus::Exploring,
            }) {
                Ok(_) => report.applications += 1,
                Err(RepositoryError::Conflict) => {}
                Err(err) => return Err(err),
            }
            repository.append_event(NewEvent::new(pair, EventType::View))?;
            report.events += 1;
            seeded_pairs.push(pair);
        }
        created += batch;
        debug!(created, target = config.students, "seeded student batch");
    }

    if config.rescore {
        let rescorer = Rescorer::new(repository.clone(), scoring.clone());
        for pair in &seeded_pairs {
            if let ScoreOutcome::Updated(_) = rescorer.recalculate(*pair)? {
                report.scores += 1;
            }
        }
    }

    info!(
        students = report.students,
        applications = report.applications,
        events = report.events,
        scores = report.scores,
        "seed complete"
    );
    Ok(report)
}
