use audelas::admissions::{seed_catalog, AdmissionsService, InMemoryAdmissionsRepository, SeedReport};
use audelas::config::{ScoringConfig, SeedConfig};
use audelas::error::AppError;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Store, intake service and scoring worker wired together for one process.
pub(crate) struct AdmissionsRuntime {
    pub(crate) store: Arc<InMemoryAdmissionsRepository>,
    pub(crate) service: Arc<AdmissionsService<InMemoryAdmissionsRepository>>,
    pub(crate) seed: Option<SeedReport>,
    pub(crate) worker: JoinHandle<()>,
}

/// Build the in-memory store, seed it when `seed.students > 0`, then start
/// the scoring worker. Must run inside a Tokio runtime.
pub(crate) fn start_admissions(
    scoring: &ScoringConfig,
    seed: &SeedConfig,
) -> Result<AdmissionsRuntime, AppError> {
    let store = Arc::new(InMemoryAdmissionsRepository::default());

    let seed = if seed.students > 0 {
        let report = seed_catalog(&store, seed, scoring)?;
        info!(
            students = report.students,
            applications = report.applications,
            "store seeded before startup"
        );
        Some(report)
    } else {
        None
    };

    let (service, worker) = AdmissionsService::start(store.clone(), scoring);
    Ok(AdmissionsRuntime {
        store,
        service: Arc::new(service),
        seed,
        worker,
    })
}
