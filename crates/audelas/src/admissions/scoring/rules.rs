use std::collections::BTreeSet;

use super::super::domain::{ApplicationStatus, StudentProfile};

pub(crate) const MAX_SCORE: f64 = 100.0;
pub(crate) const POINTS_PER_EVENT: f64 = 5.0;
/// Fixed normalizer: three shared tags is a perfect fit, whatever the tag-set sizes.
pub(crate) const FIT_MATCH_TARGET: f64 = 3.0;
pub(crate) const ENGAGEMENT_WEIGHT: f64 = 0.5;
pub(crate) const FIT_WEIGHT: f64 = 0.5;

/// Engagement bonus for the application's current status. Bonuses never stack.
pub(crate) fn status_bonus(status: ApplicationStatus) -> f64 {
    match status {
        ApplicationStatus::Applied => 20.0,
        ApplicationStatus::Accepted => 50.0,
        ApplicationStatus::Exploring
        | ApplicationStatus::Rejected
        | ApplicationStatus::Withdrawn => 0.0,
    }
}

pub(crate) fn engagement(event_count: usize, status: Option<ApplicationStatus>) -> f64 {
    let raw = event_count as f64 * POINTS_PER_EVENT + status.map_or(0.0, status_bonus);
    raw.clamp(0.0, MAX_SCORE)
}

pub(crate) fn matching_tags(profile: &StudentProfile, tags: &BTreeSet<String>) -> usize {
    tags.iter().filter(|tag| profile.is_interested_in(tag)).count()
}

pub(crate) fn fit(matches: usize) -> f64 {
    (matches as f64 / FIT_MATCH_TARGET * MAX_SCORE).min(MAX_SCORE)
}

pub(crate) fn yield_risk(engagement: f64, fit: f64) -> f64 {
    let blended = engagement * ENGAGEMENT_WEIGHT + fit * FIT_WEIGHT;
    MAX_SCORE - blended.min(MAX_SCORE)
}
