use crate::infra::start_admissions;
use audelas::admissions::{
    seed_catalog, AdmissionsRepository, CatalogRepository, HighRiskQuery,
    InMemoryAdmissionsRepository, PairKey, ProgramId, SeedReport, UserId,
};
use audelas::config::{ScoringConfig, SeedConfig};
use audelas::error::AppError;
use clap::Args;
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct SeedArgs {
    /// Number of synthetic students (defaults to 5000)
    #[arg(long)]
    pub(crate) students: Option<usize>,
    /// Number of institutions, each with its own admin account
    #[arg(long)]
    pub(crate) institutions: Option<usize>,
    /// Programs created per institution
    #[arg(long)]
    pub(crate) programs_per_institution: Option<usize>,
    /// Fix the random seed for reproducible output
    #[arg(long)]
    pub(crate) rng_seed: Option<u64>,
    /// Score every seeded (student, program) pair after generation
    #[arg(long)]
    pub(crate) rescore: bool,
}

impl SeedArgs {
    fn into_config(self) -> SeedConfig {
        let defaults = SeedConfig::default();
        SeedConfig {
            students: self.students.unwrap_or(defaults.students),
            institutions: self.institutions.unwrap_or(defaults.institutions),
            programs_per_institution: self
                .programs_per_institution
                .unwrap_or(defaults.programs_per_institution),
            rng_seed: self.rng_seed,
            rescore: self.rescore,
            ..defaults
        }
    }
}

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Synthetic students generated before the walkthrough
    #[arg(long, default_value_t = 200)]
    pub(crate) students: usize,
    /// Fix the random seed for reproducible output
    #[arg(long)]
    pub(crate) rng_seed: Option<u64>,
}

pub(crate) fn run_seed(args: SeedArgs) -> Result<(), AppError> {
    let config = args.into_config();
    let store = Arc::new(InMemoryAdmissionsRepository::default());

    println!("Seeding synthetic admissions data");
    let report = seed_catalog(&store, &config, &ScoringConfig::default())?;
    render_seed_report(&report);
    Ok(())
}

fn render_seed_report(report: &SeedReport) {
    println!(
        "- {} institutions | {} programs | {} students",
        report.institutions, report.programs, report.students
    );
    println!(
        "- {} exploring applications | {} view events | {} scores",
        report.applications, report.events, report.scores
    );
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let seed = SeedConfig {
        students: args.students.max(1),
        institutions: 3,
        programs_per_institution: 4,
        rng_seed: args.rng_seed,
        rescore: true,
        ..SeedConfig::default()
    };
    let runtime = start_admissions(&ScoringConfig::default(), &seed)?;
    let store = runtime.store.clone();
    let service = runtime.service.clone();

    println!("Admissions scoring demo");
    if let Some(report) = &runtime.seed {
        render_seed_report(report);
    }

    let Some((student, program)) = pick_unapplied_pair(&store)? else {
        println!("  No student without an open application; nothing to demo.");
        return Ok(());
    };

    println!("\nStudent {student} applies to program {program}");
    let application = service.apply(student, program)?;
    println!(
        "- Application {} recorded with status {}",
        application.id,
        application.status.label()
    );
    let pending = store.score(PairKey::new(student, program))?;
    println!(
        "- Score visible immediately after the response: {}",
        if pending.is_some() { "yes" } else { "not yet" }
    );

    if let Err(err) = service.queue().flush().await {
        println!("  Scoring worker unavailable: {err}");
        return Ok(());
    }

    println!("\nStudent dashboard (after the worker caught up)");
    for entry in service.student_scores(student)? {
        println!(
            "  - {}: engagement {:.1} | fit {:.1} | yield risk {:.1}",
            entry.program.name,
            entry.score.engagement_score,
            entry.score.fit_score,
            entry.score.yield_risk_score
        );
    }

    let Some(institution) = store.program(program)?.map(|found| found.institution_id) else {
        return Ok(());
    };
    println!("\nInstitution {institution} funnel");
    for entry in service.funnel(institution)? {
        println!("  - {}: {}", entry.status.label(), entry.count);
    }

    let high_risk = service.high_risk_students(institution, HighRiskQuery::default())?;
    println!(
        "\nHigh-risk students (fit > 70, yield risk > 50): {}",
        high_risk.len()
    );
    for entry in &high_risk {
        let name = entry
            .student
            .as_ref()
            .map_or("unknown student", |profile| profile.name.as_str());
        println!(
            "  - {} -> {} (risk {:.1})",
            name, entry.program.name, entry.score.yield_risk_score
        );
    }

    let stats = service.queue().stats();
    println!(
        "\nScoring worker: {} updated | {} skipped | {} failed | {} dropped",
        stats.updated, stats.skipped, stats.failed, stats.dropped
    );
    runtime.worker.abort();
    Ok(())
}

/// First seeded student paired with a program they have not applied to yet.
fn pick_unapplied_pair(
    store: &InMemoryAdmissionsRepository,
) -> Result<Option<(UserId, ProgramId)>, AppError> {
    let programs = store.program_ids()?;
    for pair in store.application_pairs()? {
        for program in &programs {
            if store
                .application(PairKey::new(pair.student_id, *program))?
                .is_none()
            {
                return Ok(Some((pair.student_id, *program)));
            }
        }
    }
    Ok(None)
}
