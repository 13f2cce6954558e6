use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Failures at the billing API boundary, classified by cause.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum BillingApiError {
    #[error("billing api denied access ({status}): {message}")]
    Authorization { status: u16, message: String },
    #[error("billing api could not find {0}")]
    NotFound(String),
    #[error("billing api rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("billing api unavailable: {0}")]
    Transient(String),
    #[error("malformed billing api response: {0}")]
    MalformedResponse(String),
    #[error("unable to obtain access token: {0}")]
    Credentials(String),
}

impl BillingApiError {
    /// Short label used as a structured log field and in HTTP summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            BillingApiError::Authorization { .. } => "authorization",
            BillingApiError::NotFound(_) => "not_found",
            BillingApiError::Rejected { .. } => "rejected",
            BillingApiError::Transient(_) => "transient",
            BillingApiError::MalformedResponse(_) => "malformed_response",
            BillingApiError::Credentials(_) => "credentials",
        }
    }

    /// Classifies a non-success HTTP response. `body` is the raw response text,
    /// which usually carries a Google API error envelope.
    pub fn from_status(status: StatusCode, resource: &str, body: &str) -> Self {
        let message = api_error_message(body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .unwrap_or("unknown error")
                .to_string()
        });
        match status {
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => BillingApiError::Authorization {
                status: status.as_u16(),
                message,
            },
            StatusCode::NOT_FOUND => BillingApiError::NotFound(resource.to_string()),
            StatusCode::TOO_MANY_REQUESTS => {
                BillingApiError::Transient(format!("{}: {message}", status.as_u16()))
            }
            status if status.is_server_error() => {
                BillingApiError::Transient(format!("{}: {message}", status.as_u16()))
            }
            status => BillingApiError::Rejected {
                status: status.as_u16(),
                message,
            },
        }
    }
}

impl From<reqwest::Error> for BillingApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            BillingApiError::MalformedResponse(err.to_string())
        } else if let Some(status) = err.status() {
            BillingApiError::from_status(status, "", "")
        } else {
            BillingApiError::Transient(err.to_string())
        }
    }
}

#[derive(Debug, Deserialize)]
struct ApiErrorEnvelope {
    error: ApiErrorBody,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

fn api_error_message(body: &str) -> Option<String> {
    let envelope: ApiErrorEnvelope = serde_json::from_str(body).ok()?;
    match (envelope.error.status, envelope.error.message) {
        (Some(status), Some(message)) => Some(format!("{status}: {message}")),
        (None, Some(message)) => Some(message),
        (Some(status), None) => Some(status),
        (None, None) => None,
    }
}
