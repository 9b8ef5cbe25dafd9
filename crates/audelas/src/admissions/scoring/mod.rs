mod rules;

use serde::{Deserialize, Serialize};

use super::domain::{Application, Event, PairKey, Program, StudentProfile};

/// Everything the engine reads for one (student, program) pair.
#[derive(Debug, Clone, Copy)]
pub struct ScoreInputs<'a> {
    pub profile: Option<&'a StudentProfile>,
    pub program: Option<&'a Program>,
    pub events: &'a [Event],
    pub application: Option<&'a Application>,
}

/// The three bounded signals, each in `[0, 100]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgramScores {
    pub engagement: f64,
    pub fit: f64,
    pub yield_risk: f64,
}

/// Stateless scorer blending engagement, interest fit and yield risk.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScoreEngine;

impl ScoreEngine {
    pub fn new() -> Self {
        Self
    }

    /// Returns `None` when the profile or program is missing; that is not a zero score.
    ///
    /// Events and an application belonging to another pair are ignored.
    pub fn score(&self, inputs: &ScoreInputs<'_>) -> Option<ProgramScores> {
        let profile = inputs.profile?;
        let program = inputs.program?;
        let pair = PairKey::new(profile.student_id, program.id);

        let event_count = inputs
            .events
            .iter()
            .filter(|event| event.pair() == pair)
            .count();
        let status = inputs
            .application
            .filter(|application| application.pair() == pair)
            .map(|application| application.status);

        let engagement = rules::engagement(event_count, status);
        let fit = rules::fit(rules::matching_tags(profile, &program.tags));
        let yield_risk = rules::yield_risk(engagement, fit);

        Some(ProgramScores {
            engagement,
            fit,
            yield_risk,
        })
    }
}
