use base64::engine::general_purpose::STANDARD as Base64Engine;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::{Number, Value};
use std::collections::HashMap;
use thiserror::Error;

/// key: notification-decoder -> push envelope as delivered by the event bus
///
/// Pub/Sub push and binary-mode CloudEvents carry `message` at the top level;
/// structured-mode CloudEvents nest the same envelope under `data`.
#[derive(Debug, Deserialize)]
pub struct PushEnvelope {
    #[serde(default)]
    pub message: Option<PushMessage>,
    #[serde(default)]
    pub subscription: Option<String>,
    #[serde(default)]
    pub data: Option<CloudEventData>,
}

#[derive(Debug, Deserialize)]
pub struct CloudEventData {
    #[serde(default)]
    pub message: Option<PushMessage>,
    #[serde(default)]
    pub subscription: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushMessage {
    #[serde(default)]
    pub data: Option<String>,
    #[serde(default)]
    pub attributes: HashMap<String, String>,
    #[serde(default)]
    pub message_id: Option<String>,
    #[serde(default)]
    pub publish_time: Option<String>,
}

#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("request body is not a push envelope: {0}")]
    InvalidEnvelope(#[source] serde_json::Error),
    #[error("push envelope has no message data")]
    MissingData,
    #[error("message data is not valid base64: {0}")]
    InvalidBase64(#[from] base64::DecodeError),
    #[error("message data is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
    #[error("message data is not valid JSON: {0}")]
    InvalidJson(#[source] serde_json::Error),
    #[error("budget notification missing required field `{0}`")]
    MissingField(&'static str),
    #[error("budget notification field `{0}` is not a number")]
    NotANumber(&'static str),
}

/// Optional budget fields, only used for diagnostics.
#[derive(Debug, Clone, Default, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BudgetDetails {
    #[serde(default)]
    pub budget_display_name: Option<String>,
    #[serde(default)]
    pub currency_code: Option<String>,
    #[serde(default)]
    pub alert_threshold_exceeded: Option<f64>,
    #[serde(default)]
    pub forecast_threshold_exceeded: Option<f64>,
    #[serde(default)]
    pub cost_interval_start: Option<DateTime<Utc>>,
    #[serde(default)]
    pub budget_amount_type: Option<String>,
}

/// key: notification-decoder -> one budget alert
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetNotification {
    pub cost_amount: f64,
    pub budget_amount: f64,
    /// `costAmount` exactly as it appeared in the payload, for diagnostics.
    pub reported_cost: Number,
    pub details: BudgetDetails,
    pub billing_account_id: Option<String>,
    pub budget_id: Option<String>,
    pub schema_version: Option<String>,
    pub message_id: Option<String>,
    pub publish_time: Option<String>,
    pub subscription: Option<String>,
}

impl BudgetNotification {
    pub fn new(cost_amount: f64, budget_amount: f64) -> Self {
        Self {
            cost_amount,
            budget_amount,
            reported_cost: Number::from_f64(cost_amount).unwrap_or_else(|| Number::from(0)),
            details: BudgetDetails::default(),
            billing_account_id: None,
            budget_id: None,
            schema_version: None,
            message_id: None,
            publish_time: None,
            subscription: None,
        }
    }

    /// Spend equal to the budget is still within budget.
    pub fn is_over_budget(&self) -> bool {
        self.cost_amount > self.budget_amount
    }

    /// Parses the JSON document carried in the message data.
    pub fn from_json(document: &str) -> Result<Self, NotificationError> {
        let value: Value =
            serde_json::from_str(document).map_err(NotificationError::InvalidJson)?;
        let reported_cost = require_number(&value, "costAmount")?;
        let cost_amount = as_f64(&reported_cost, "costAmount")?;
        let budget_amount = as_f64(&require_number(&value, "budgetAmount")?, "budgetAmount")?;
        // Diagnostics only; a malformed optional field never fails the decode.
        let details = serde_json::from_value(value).unwrap_or_default();

        Ok(Self {
            reported_cost,
            details,
            ..Self::new(cost_amount, budget_amount)
        })
    }

    pub fn from_message(message: &PushMessage) -> Result<Self, NotificationError> {
        let data = message
            .data
            .as_deref()
            .filter(|data| !data.trim().is_empty())
            .ok_or(NotificationError::MissingData)?;
        let bytes = Base64Engine.decode(data.trim())?;
        let document = String::from_utf8(bytes)?;

        let mut notification = Self::from_json(&document)?;
        notification.billing_account_id = message.attributes.get("billingAccountId").cloned();
        notification.budget_id = message.attributes.get("budgetId").cloned();
        notification.schema_version = message.attributes.get("schemaVersion").cloned();
        notification.message_id = message.message_id.clone();
        notification.publish_time = message.publish_time.clone();
        Ok(notification)
    }

    /// Decodes a raw push request body.
    pub fn from_push_body(body: &[u8]) -> Result<Self, NotificationError> {
        let envelope: PushEnvelope =
            serde_json::from_slice(body).map_err(NotificationError::InvalidEnvelope)?;
        let (message, subscription) = match (envelope.message, envelope.data) {
            (Some(message), _) => (message, envelope.subscription),
            (None, Some(CloudEventData {
                message: Some(message),
                subscription,
            })) => (message, subscription),
            (None, _) => return Err(NotificationError::MissingData),
        };

        let mut notification = Self::from_message(&message)?;
        notification.subscription = subscription;
        Ok(notification)
    }
}

fn require_number(payload: &Value, field: &'static str) -> Result<Number, NotificationError> {
    match payload.get(field) {
        None | Some(Value::Null) => Err(NotificationError::MissingField(field)),
        Some(Value::Number(number)) => Ok(number.clone()),
        Some(_) => Err(NotificationError::NotANumber(field)),
    }
}

fn as_f64(number: &Number, field: &'static str) -> Result<f64, NotificationError> {
    number.as_f64().ok_or(NotificationError::NotANumber(field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn push_body(document: &str) -> Vec<u8> {
        serde_json::to_vec(&json!({
            "message": {
                "data": Base64Engine.encode(document),
                "attributes": {
                    "billingAccountId": "01D4EE-079462-DFD6EC",
                    "budgetId": "budget-1",
                    "schemaVersion": "1.0",
                },
                "messageId": "42",
            },
            "subscription": "projects/acme/subscriptions/budget-alerts",
        }))
        .unwrap()
    }

    #[test]
    fn decodes_required_amounts() {
        let body = push_body(r#"{"costAmount": 150, "budgetAmount": 100}"#);
        let notification = BudgetNotification::from_push_body(&body).unwrap();
        assert_eq!(notification.cost_amount, 150.0);
        assert_eq!(notification.budget_amount, 100.0);
        assert!(notification.is_over_budget());
        assert_eq!(notification.budget_id.as_deref(), Some("budget-1"));
        assert_eq!(notification.message_id.as_deref(), Some("42"));
        assert_eq!(
            notification.subscription.as_deref(),
            Some("projects/acme/subscriptions/budget-alerts")
        );
    }

    #[test]
    fn decodes_structured_cloud_event() {
        let body = serde_json::to_vec(&json!({
            "specversion": "1.0",
            "type": "google.cloud.pubsub.topic.v1.messagePublished",
            "source": "//pubsub.googleapis.com/projects/acme/topics/budget-alerts",
            "id": "42",
            "datacontenttype": "application/json",
            "data": {
                "message": {
                    "data": Base64Engine.encode(r#"{"costAmount":150,"budgetAmount":100}"#),
                    "messageId": "42",
                    "publishTime": "2024-05-01T00:00:00Z",
                },
                "subscription": "projects/acme/subscriptions/eventarc",
            },
        }))
        .unwrap();

        let notification = BudgetNotification::from_push_body(&body).unwrap();
        assert!(notification.is_over_budget());
        assert_eq!(notification.cost_amount, 150.0);
        assert_eq!(
            notification.publish_time.as_deref(),
            Some("2024-05-01T00:00:00Z")
        );
        assert_eq!(
            notification.subscription.as_deref(),
            Some("projects/acme/subscriptions/eventarc")
        );
    }

    #[test]
    fn keeps_cost_as_written() {
        let float = BudgetNotification::from_json(r#"{"costAmount": 50.0, "budgetAmount": 100}"#)
            .unwrap();
        assert_eq!(float.reported_cost.to_string(), "50.0");

        let integer = BudgetNotification::from_json(r#"{"costAmount": 50, "budgetAmount": 100}"#)
            .unwrap();
        assert_eq!(integer.reported_cost.to_string(), "50");
    }

    #[test]
    fn rejects_invalid_utf8() {
        let body = serde_json::to_vec(&json!({
            "message": { "data": Base64Engine.encode([0xff_u8, 0xfe]) }
        }))
        .unwrap();
        assert!(matches!(
            BudgetNotification::from_push_body(&body),
            Err(NotificationError::InvalidUtf8(_))
        ));
    }

    #[test]
    fn decodes_optional_budget_details() {
        let body = push_body(
            r#"{
                "budgetDisplayName": "monthly cap",
                "alertThresholdExceeded": 1.0,
                "costAmount": 100.01,
                "costIntervalStart": "2019-01-01T00:00:00Z",
                "budgetAmount": 100.00,
                "budgetAmountType": "SPECIFIED_AMOUNT",
                "currencyCode": "USD"
            }"#,
        );
        let notification = BudgetNotification::from_push_body(&body).unwrap();
        assert_eq!(
            notification.details.budget_display_name.as_deref(),
            Some("monthly cap")
        );
        assert_eq!(notification.details.currency_code.as_deref(), Some("USD"));
        assert_eq!(notification.details.alert_threshold_exceeded, Some(1.0));
        assert!(notification.details.cost_interval_start.is_some());
    }

    #[test]
    fn equal_spend_is_within_budget() {
        assert!(!BudgetNotification::new(100.0, 100.0).is_over_budget());
        assert!(!BudgetNotification::new(50.0, 100.0).is_over_budget());
    }

    #[test]
    fn malformed_optional_detail_does_not_fail_decode() {
        let notification = BudgetNotification::from_json(
            r#"{"costAmount": 1, "budgetAmount": 2, "currencyCode": 7}"#,
        )
        .unwrap();
        assert_eq!(notification.details, BudgetDetails::default());
    }

    #[test]
    fn missing_field_is_reported() {
        let err = BudgetNotification::from_json(r#"{"costAmount": 150}"#)
            .expect_err("budgetAmount is required");
        assert!(matches!(err, NotificationError::MissingField("budgetAmount")));
    }

    #[test]
    fn non_numeric_field_is_reported() {
        let err = BudgetNotification::from_json(r#"{"costAmount": "150", "budgetAmount": 100}"#)
            .expect_err("costAmount must be numeric");
        assert!(matches!(err, NotificationError::NotANumber("costAmount")));
    }

    #[test]
    fn rejects_bad_encodings() {
        let bad_base64 = serde_json::to_vec(&json!({ "message": { "data": "%%%" } })).unwrap();
        assert!(matches!(
            BudgetNotification::from_push_body(&bad_base64),
            Err(NotificationError::InvalidBase64(_))
        ));

        let not_json = push_body("cost went up");
        assert!(matches!(
            BudgetNotification::from_push_body(&not_json),
            Err(NotificationError::InvalidJson(_))
        ));

        let no_data = serde_json::to_vec(&json!({ "message": {} })).unwrap();
        assert!(matches!(
            BudgetNotification::from_push_body(&no_data),
            Err(NotificationError::MissingData)
        ));

        assert!(matches!(
            BudgetNotification::from_push_body(b"not an envelope"),
            Err(NotificationError::InvalidEnvelope(_))
        ));
    }
}
