use super::common::*;
use crate::admissions::domain::{ApplicationStatus, EventType};
use crate::admissions::scoring::{ProgramScores, ScoreEngine, ScoreInputs};

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < 0.01,
        "expected {expected}, got {actual}"
    );
}

#[test]
fn single_tag_overlap_without_activity() {
    let profile = profile(1, &["Math", "Code"]);
    let program = program(10, &["Math", "Art", "Bio"]);

    let scores = ScoreEngine::new()
        .score(&ScoreInputs {
            profile: Some(&profile),
            program: Some(&program),
            events: &[],
            application: None,
        })
        .expect("scores computed");

    assert_eq!(scores.engagement, 0.0);
    assert_close(scores.fit, 33.33);
    assert_close(scores.yield_risk, 83.33);
}

#[test]
fn applied_student_with_full_overlap() {
    let profile = profile(1, &["Math", "Code", "Bio"]);
    let program = program(10, &["Math", "Code", "Bio"]);
    let views = events(1, 10, 4, EventType::View);
    let applied = application(1, 10, ApplicationStatus::Applied);

    let scores = ScoreEngine::new()
        .score(&ScoreInputs {
            profile: Some(&profile),
            program: Some(&program),
            events: &views,
            application: Some(&applied),
        })
        .expect("scores computed");

    assert_eq!(
        scores,
        ProgramScores {
            engagement: 40.0,
            fit: 100.0,
            yield_risk: 30.0,
        }
    );
}

#[test]
fn missing_profile_or_program_computes_nothing() {
    let profile = profile(1, &["Math"]);
    let program = program(10, &["Math"]);
    let engine = ScoreEngine::new();

    let no_program = ScoreInputs {
        profile: Some(&profile),
        program: None,
        events: &[],
        application: None,
    };
    let no_profile = ScoreInputs {
        profile: None,
        program: Some(&program),
        events: &[],
        application: None,
    };

    assert!(engine.score(&no_program).is_none());
    assert!(engine.score(&no_profile).is_none());
}

#[test]
fn three_shared_tags_saturate_fit() {
    let profile = profile(1, &["Math", "Code", "Bio", "Art", "History"]);
    let program = program(10, &["Math", "Code", "Bio", "Art", "History"]);

    let scores = ScoreEngine::new()
        .score(&ScoreInputs {
            profile: Some(&profile),
            program: Some(&program),
            events: &[],
            application: None,
        })
        .expect("scores computed");

    assert_eq!(scores.fit, 100.0);
    assert_eq!(scores.yield_risk, 50.0);
}

#[test]
fn accepted_bonus_replaces_applied_bonus() {
    let profile = profile(1, &[]);
    let program = program(10, &[]);
    let accepted = application(1, 10, ApplicationStatus::Accepted);

    let scores = ScoreEngine::new()
        .score(&ScoreInputs {
            profile: Some(&profile),
            program: Some(&program),
            events: &events(1, 10, 2, EventType::Apply),
            application: Some(&accepted),
        })
        .expect("scores computed");

    assert_eq!(scores.engagement, 60.0);
    assert_eq!(scores.fit, 0.0);
    assert_eq!(scores.yield_risk, 70.0);
}

#[test]
fn activity_for_other_pairs_is_ignored() {
    let profile = profile(1, &["Math"]);
    let program = program(10, &["Math"]);
    let mut mixed = events(1, 10, 1, EventType::View);
    mixed.extend(events(2, 10, 5, EventType::View));
    mixed.extend(events(1, 11, 5, EventType::View));
    let foreign_application = application(1, 11, ApplicationStatus::Accepted);

    let scores = ScoreEngine::new()
        .score(&ScoreInputs {
            profile: Some(&profile),
            program: Some(&program),
            events: &mixed,
            application: Some(&foreign_application),
        })
        .expect("scores computed");

    assert_eq!(scores.engagement, 5.0);
}

#[test]
fn identical_inputs_give_identical_scores() {
    let profile = profile(1, &["Math", "Art"]);
    let program = program(10, &["Math", "Art", "Code"]);
    let views = events(1, 10, 7, EventType::View);
    let exploring = application(1, 10, ApplicationStatus::Exploring);
    let inputs = ScoreInputs {
        profile: Some(&profile),
        program: Some(&program),
        events: &views,
        application: Some(&exploring),
    };
    let engine = ScoreEngine::new();

    assert_eq!(engine.score(&inputs), engine.score(&inputs));
}
