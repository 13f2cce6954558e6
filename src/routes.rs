use axum::{
    body::Bytes,
    extract::Extension,
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;

use crate::billing::BillingApi;
use crate::config::GuardConfig;
use crate::error::AppResult;
use crate::guard::{enforce_budget, OutcomeSummary};
use crate::notification::BudgetNotification;

/// Everything a push invocation needs, built once at startup.
#[derive(Clone)]
pub struct GuardState {
    pub config: GuardConfig,
    pub billing: Arc<dyn BillingApi>,
}

impl GuardState {
    pub fn new(config: GuardConfig, billing: Arc<dyn BillingApi>) -> Self {
        Self { config, billing }
    }
}

pub fn routes(state: GuardState) -> Router {
    Router::new()
        .route("/", post(handle_push))
        .route("/pubsub", post(handle_push))
        .route("/healthz", get(healthz))
        .layer(Extension(state))
}

async fn healthz() -> &'static str {
    "ok"
}

/// key: push-endpoint -> decode, then hand off to the guard
///
/// Decode failures answer 400; everything after a successful decode answers
/// 200, whatever happened at the billing API.
pub async fn handle_push(
    Extension(state): Extension<GuardState>,
    body: Bytes,
) -> AppResult<Json<OutcomeSummary>> {
    let notification = BudgetNotification::from_push_body(&body)?;
    info!(
        message_id = notification.message_id.as_deref().unwrap_or(""),
        publish_time = notification.publish_time.as_deref().unwrap_or(""),
        subscription = notification.subscription.as_deref().unwrap_or(""),
        budget_id = notification.budget_id.as_deref().unwrap_or(""),
        cost = notification.cost_amount,
        budget = notification.budget_amount,
        "received budget notification"
    );

    let outcome = enforce_budget(
        &notification,
        state.config.project.as_ref(),
        state.billing.as_ref(),
    )
    .await;
    Ok(Json(OutcomeSummary::from(&outcome)))
}
