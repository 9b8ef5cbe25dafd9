use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

macro_rules! numeric_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub u64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

numeric_id!(
    /// Account identifier; a student's profile is keyed by their user id.
    UserId
);
numeric_id!(InstitutionId);
numeric_id!(ProgramId);
numeric_id!(EventId);
numeric_id!(ApplicationId);

/// Composite identity of a (student, program) pair.
///
/// Applications and scores are unique per pair; events are scanned by it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairKey {
    pub student_id: UserId,
    pub program_id: ProgramId,
}

impl PairKey {
    pub fn new(student_id: UserId, program_id: ProgramId) -> Self {
        Self {
            student_id,
            program_id,
        }
    }
}

impl fmt::Display for PairKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "student {} / program {}", self.student_id, self.program_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Student,
    InstitutionAdmin,
}

impl Role {
    /// Accepts both the wire form (`INSTITUTION_ADMIN`) and the gateway form (`institution_admin`).
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "student" => Some(Self::Student),
            "institution_admin" | "admin" => Some(Self::InstitutionAdmin),
            _ => None,
        }
    }
}

/// Authenticated caller as asserted by the identity gateway.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Principal {
    pub id: UserId,
    pub role: Role,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProfile {
    pub student_id: UserId,
    pub name: String,
    pub interests: BTreeSet<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub goals: Option<String>,
}

impl StudentProfile {
    pub fn is_interested_in(&self, tag: &str) -> bool {
        self.interests.contains(tag)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Institution {
    pub id: InstitutionId,
    pub name: String,
    pub admin_user_id: UserId,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Program {
    pub id: ProgramId,
    pub institution_id: InstitutionId,
    pub name: String,
    pub tags: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProgram {
    pub institution_id: InstitutionId,
    pub name: String,
    pub tags: BTreeSet<String>,
}

/// Interaction kinds recorded against a program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    View,
    Apply,
}

/// Append-only interaction record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    pub id: EventId,
    pub student_id: UserId,
    pub program_id: ProgramId,
    #[serde(rename = "type")]
    pub kind: EventType,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
}

impl Event {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.student_id, self.program_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEvent {
    pub pair: PairKey,
    pub kind: EventType,
    pub metadata: BTreeMap<String, String>,
}

impl NewEvent {
    pub fn new(pair: PairKey, kind: EventType) -> Self {
        Self {
            pair,
            kind,
            metadata: BTreeMap::new(),
        }
    }
}

/// Lifecycle of an application. Transitions are not enforced by the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApplicationStatus {
    Exploring,
    Applied,
    Accepted,
    Rejected,
    Withdrawn,
}

impl ApplicationStatus {
    pub fn label(&self) -> &'static str {
        match self {
            ApplicationStatus::Exploring => "EXPLORING",
            ApplicationStatus::Applied => "APPLIED",
            ApplicationStatus::Accepted => "ACCEPTED",
            ApplicationStatus::Rejected => "REJECTED",
            ApplicationStatus::Withdrawn => "WITHDRAWN",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Application {
    pub id: ApplicationId,
    pub student_id: UserId,
    pub program_id: ProgramId,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

impl Application {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.student_id, self.program_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NewApplication {
    pub pair: PairKey,
    pub status: ApplicationStatus,
}

/// Materialized scores for a pair; overwritten on every recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudentProgramScore {
    pub student_id: UserId,
    pub program_id: ProgramId,
    pub engagement_score: f64,
    pub fit_score: f64,
    pub yield_risk_score: f64,
    pub updated_at: DateTime<Utc>,
}

impl StudentProgramScore {
    pub fn pair(&self) -> PairKey {
        PairKey::new(self.student_id, self.program_id)
    }
}
