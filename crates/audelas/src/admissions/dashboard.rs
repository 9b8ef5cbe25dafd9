//! Read models behind the student and institution dashboards.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationStatus, Program, StudentProfile, StudentProgramScore};

pub const STUDENT_SCORE_LIMIT: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// 1-based page request; out-of-range values are clamped rather than rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub struct PageRequest {
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_page() -> usize {
    1
}

fn default_limit() -> usize {
    10
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: default_page(),
            limit: default_limit(),
        }
    }
}

impl PageRequest {
    pub fn limit(&self) -> usize {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }

    pub fn offset(&self) -> usize {
        self.page.max(1).saturating_sub(1).saturating_mul(self.limit())
    }
}

/// Thresholds for the "strong fit but unlikely to enroll" list.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HighRiskQuery {
    pub min_fit: f64,
    pub min_yield_risk: f64,
    pub limit: usize,
}

impl Default for HighRiskQuery {
    fn default() -> Self {
        Self {
            min_fit: 70.0,
            min_yield_risk: 50.0,
            limit: 10,
        }
    }
}

impl HighRiskQuery {
    pub fn with_limit(limit: Option<usize>) -> Self {
        let defaults = Self::default();
        Self {
            limit: limit.map_or(defaults.limit, |value| value.clamp(1, MAX_PAGE_SIZE)),
            ..defaults
        }
    }

    pub fn matches(&self, score: &StudentProgramScore) -> bool {
        score.fit_score > self.min_fit && score.yield_risk_score > self.min_yield_risk
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoreWithProgram {
    #[serde(flatten)]
    pub score: StudentProgramScore,
    pub program: Program,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FunnelEntry {
    pub status: ApplicationStatus,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HighRiskEntry {
    #[serde(flatten)]
    pub score: StudentProgramScore,
    pub student: Option<StudentProfile>,
    pub program: Program,
}

/// Count applications per status, ordered by status.
pub fn tally_funnel<I>(statuses: I) -> Vec<FunnelEntry>
where
    I: IntoIterator<Item = ApplicationStatus>,
{
    let mut counts: BTreeMap<ApplicationStatus, usize> = BTreeMap::new();
    for status in statuses {
        *counts.entry(status).or_insert(0) += 1;
    }

    counts
        .into_iter()
        .map(|(status, count)| FunnelEntry { status, count })
        .collect()
}

/// Filter by the query thresholds and order by descending yield risk.
pub fn rank_high_risk<'a, I>(scores: I, query: &HighRiskQuery) -> Vec<&'a StudentProgramScore>
where
    I: IntoIterator<Item = &'a StudentProgramScore>,
{
    let mut ranked: Vec<&StudentProgramScore> =
        scores.into_iter().filter(|score| query.matches(score)).collect();
    ranked.sort_by(|a, b| {
        b.yield_risk_score
            .partial_cmp(&a.yield_risk_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.pair().cmp(&b.pair()))
    });
    ranked.truncate(query.limit);
    ranked
}
