use crate::cli::ServeArgs;
use crate::infra::{start_admissions, AppState};
use crate::routes::with_admissions_routes;
use audelas::admissions::{QueueStats, ScoringQueue};
use audelas::config::AppConfig;
use audelas::error::AppError;
use audelas::telemetry;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use std::future::Future;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(students) = args.seed_students.take() {
        config.seed.students = students;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let runtime = start_admissions(&config.scoring, &config.seed)?;
    let queue = runtime.service.queue().clone();
    let worker = runtime.worker;

    let app = with_admissions_routes(runtime.service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        queue_capacity = config.scoring.queue_capacity,
        "admissions scoring service ready"
    );

    let stats = serve_and_drain(listener, app, queue, worker, shutdown_signal()).await?;
    if stats.failed > 0 || stats.dropped > 0 {
        warn!(
            failed = stats.failed,
            dropped = stats.dropped,
            "some score recomputations did not complete"
        );
    }
    info!(updated = stats.updated, "admissions scoring service stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; shutting down");
    }
}

/// Serve until `shutdown` resolves, then let the worker finish the jobs
/// accepted before the listener stopped.
pub(crate) async fn serve_and_drain<F>(
    listener: TcpListener,
    app: axum::Router,
    queue: ScoringQueue,
    worker: JoinHandle<()>,
    shutdown: F,
) -> Result<QueueStats, AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    if queue.flush().await.is_err() {
        warn!("scoring worker stopped before the queue drained");
    }
    worker.abort();
    Ok(queue.stats())
}
