use serde::Serialize;
use serde_json::{Number, Value};
use std::fmt;
use tracing::{error, info, warn};

use crate::billing::{BillingApi, BillingApiError, ProjectName, UpdateBillingInfo};
use crate::notification::BudgetNotification;

/// What a single invocation ended up doing.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// Spend is at or below the budget; nothing was called.
    WithinBudget { reported_cost: Number },
    /// No target project is configured.
    MissingProject,
    /// The project already has no billing account attached.
    AlreadyDisabled,
    /// The billing account was detached. Carries the API response.
    Disabled {
        response: Value,
        status_uncertain: bool,
    },
    /// The detach call failed and was swallowed.
    DisableFailed {
        error: BillingApiError,
        status_uncertain: bool,
    },
}

impl Outcome {
    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::WithinBudget { .. } => "within_budget",
            Outcome::MissingProject => "missing_project",
            Outcome::AlreadyDisabled => "already_disabled",
            Outcome::Disabled { .. } => "disabled",
            Outcome::DisableFailed { .. } => "disable_failed",
        }
    }
}

impl fmt::Display for Outcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Outcome::WithinBudget { reported_cost } => {
                write!(f, "No action necessary. (Current cost: {reported_cost})")
            }
            Outcome::MissingProject => {
                f.write_str("No project specified with GCP_PROJECT environment variable")
            }
            Outcome::AlreadyDisabled => f.write_str("Billing already disabled"),
            Outcome::Disabled { response, .. } => write!(f, "Billing disabled: {response}"),
            Outcome::DisableFailed { error, .. } => match error {
                BillingApiError::Authorization { .. } => {
                    f.write_str("Failed to disable billing, possibly check permissions")
                }
                other => write!(f, "Failed to disable billing: {other}"),
            },
        }
    }
}

/// JSON summary returned to the push caller.
#[derive(Debug, Serialize)]
pub struct OutcomeSummary {
    pub outcome: &'static str,
    pub message: String,
}

impl From<&Outcome> for OutcomeSummary {
    fn from(outcome: &Outcome) -> Self {
        Self {
            outcome: outcome.kind(),
            message: outcome.to_string(),
        }
    }
}

/// key: budget-guard -> threshold check, status lookup, conditional detach
///
/// Never fails: every billing API problem is logged and folded into the
/// returned [`Outcome`].
pub async fn enforce_budget(
    notification: &BudgetNotification,
    project: Option<&ProjectName>,
    billing: &dyn BillingApi,
) -> Outcome {
    if !notification.is_over_budget() {
        let outcome = Outcome::WithinBudget {
            reported_cost: notification.reported_cost.clone(),
        };
        info!(
            cost = notification.cost_amount,
            budget = notification.budget_amount,
            "{outcome}"
        );
        return outcome;
    }

    let Some(project) = project else {
        let outcome = Outcome::MissingProject;
        error!("{outcome}");
        return outcome;
    };

    warn!(
        project = %project,
        cost = notification.cost_amount,
        budget = notification.budget_amount,
        currency = notification.details.currency_code.as_deref().unwrap_or(""),
        budget_name = notification.details.budget_display_name.as_deref().unwrap_or(""),
        "spend exceeded budget"
    );

    let status = check_billing_status(project, billing).await;
    let status_uncertain = matches!(status, BillingStatus::Unknown);
    if matches!(status, BillingStatus::Disabled) {
        let outcome = Outcome::AlreadyDisabled;
        info!(project = %project, "{outcome}");
        return outcome;
    }

    disable_billing(project, billing, status_uncertain).await
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BillingStatus {
    Enabled,
    Disabled,
    Unknown,
}

async fn check_billing_status(project: &ProjectName, billing: &dyn BillingApi) -> BillingStatus {
    match billing.get_billing_info(project).await {
        Ok(info) if info.is_billing_enabled() => BillingStatus::Enabled,
        Ok(_) => BillingStatus::Disabled,
        // Detaching is the safe action for spend, so every failure kind falls
        // through to the disable attempt; the kind is kept for the operator.
        Err(err) => {
            warn!(
                project = %project,
                error_kind = err.kind(),
                error = %err,
                "Unable to determine billing status, assuming enabled"
            );
            BillingStatus::Unknown
        }
    }
}

async fn disable_billing(
    project: &ProjectName,
    billing: &dyn BillingApi,
    status_uncertain: bool,
) -> Outcome {
    match billing
        .update_billing_info(project, &UpdateBillingInfo::detach())
        .await
    {
        Ok(response) => {
            let outcome = Outcome::Disabled {
                response,
                status_uncertain,
            };
            info!(project = %project, "{outcome}");
            outcome
        }
        Err(err) => {
            let kind = err.kind();
            let outcome = Outcome::DisableFailed {
                error: err,
                status_uncertain,
            };
            error!(project = %project, error_kind = kind, "{outcome}");
            outcome
        }
    }
}
