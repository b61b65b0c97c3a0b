use anyhow::Result;
use axum::Router;
use tokio::net::TcpListener;
use tracing::info;

use crate::config::settings::SettingsConfig;
use crate::observability::metrics::{get_metrics, Metrics};
use crate::observability::routes::MetricsState;

#[derive(Clone)]
pub struct AppState {
    pub metrics_state: MetricsState,
}

impl AppState {
    pub fn new(metrics: &Metrics) -> Self {
        Self {
            metrics_state: MetricsState::new(metrics.registry.clone()),
        }
    }
}

pub fn router(settings_config: &SettingsConfig, state: AppState) -> Router {
    Router::new()
        .merge(state.metrics_state.router(&settings_config.metrics))
        .with_state(state)
}

/// Serve `/healthz` and, when enabled, the metrics path.
pub async fn start(settings_config: &SettingsConfig) -> Result<()> {
    let metrics = get_metrics().await;
    let app = router(settings_config, AppState::new(metrics));

    let bind_addr = format!("{}:{}", settings_config.server.host, settings_config.server.port);
    let listener = TcpListener::bind(&bind_addr).await?;
    info!("http server listening on {}", bind_addr);
    metrics.up.set(1);
    axum::serve(listener, app).await?;

    Ok(())
}
