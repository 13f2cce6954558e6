use axum::{routing::get, Router};
use axum_prometheus::PrometheusMetricLayer;
use budget_guard::config::{self, GuardConfig};
use std::net::SocketAddr;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let guard_config = GuardConfig::from_env();
    match &guard_config.project {
        Some(project) => tracing::info!(%project, "guarding project billing"),
        None => tracing::warn!("GCP_PROJECT is not set; over-budget alerts will be ignored"),
    }
    let state = budget_guard::build_state(guard_config)?;

    let (prometheus_layer, metrics_handle) = PrometheusMetricLayer::pair();
    let app = Router::new()
        .route(
            "/metrics",
            get(move || async move { metrics_handle.render() }),
        )
        .merge(budget_guard::routes::routes(state))
        .layer(prometheus_layer);

    let addr: SocketAddr =
        format!("{}:{}", config::BIND_ADDRESS.as_str(), *config::BIND_PORT).parse()?;
    tracing::info!(%addr, "Listening for budget notifications");
    axum::Server::bind(&addr)
        .serve(app.into_make_service())
        .await?;

    Ok(())
}
