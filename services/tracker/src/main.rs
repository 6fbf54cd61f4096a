//! Larder tracker HTTP service entry point.
//!
//! # Purpose
//! Wires configuration, storage, the compliance evaluator, and the HTTP router,
//! then serves the API and the Prometheus metrics listener.
//!
//! # Notes
//! The `build_state` helper keeps wiring testable and minimizes main setup logic.
use anyhow::Context;
use std::future::Future;
use std::sync::Arc;
use tracker::app::{AppState, build_router};
use tracker::config::{StorageBackend, TrackerConfig};
use tracker::observability;
use tracker::store::memory::InMemoryStore;
use tracker::store::postgres::PostgresStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = TrackerConfig::from_env_or_yaml().context("tracker config")?;
    run_with_shutdown(config, async {
        let _ = tokio::signal::ctrl_c().await;
    })
    .await
}

async fn run_with_shutdown<F>(config: TrackerConfig, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let metrics_handle = observability::init_observability("larder-tracker");
    let state = build_state(config.clone()).await?;
    tracing::info!(
        backend = state.store.backend_name(),
        unmonitored_policy = %state.features.unmonitored_policy,
        "tracker state ready"
    );
    let metrics_task = tokio::spawn(observability::serve_metrics(
        metrics_handle,
        config.metrics_bind,
    ));

    let app = build_router(state);
    let addr = config.bind_addr;
    tracing::info!(%addr, "tracker listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tokio::pin!(shutdown);
    tokio::select! {
        result = axum::serve(listener, app.into_make_service()) => {
            result?;
        }
        _ = &mut shutdown => {}
    }

    metrics_task.abort();
    let _ = metrics_task.await;
    Ok(())
}

async fn build_state(config: TrackerConfig) -> anyhow::Result<AppState> {
    let clock = Arc::new(larder_compliance::SystemClock);
    let policy = config.evaluator_policy();
    match config.storage {
        StorageBackend::Memory => {
            AppState::build(Arc::new(InMemoryStore::new()), clock, policy).await
        }
        StorageBackend::Postgres => {
            let pg = config
                .postgres
                .as_ref()
                .context("postgres configuration missing")?;
            let store = PostgresStore::connect(pg)
                .await
                .context("connect postgres store")?;
            AppState::build(Arc::new(store), clock, policy).await
        }
    }
}
