use once_cell::sync::Lazy;
use std::time::Duration;

use crate::billing::ProjectName;

/// Default Cloud Billing API base URL.
pub const DEFAULT_BILLING_API_ENDPOINT: &str = "https://cloudbilling.googleapis.com";

/// Default metadata server host used to mint access tokens.
pub const DEFAULT_METADATA_HOST: &str = "metadata.google.internal";

/// Address the HTTP server should bind to. Defaults to `0.0.0.0`.
pub static BIND_ADDRESS: Lazy<String> =
    Lazy::new(|| read_optional_env("BIND_ADDRESS").unwrap_or_else(|| "0.0.0.0".to_string()));

/// Port the HTTP server should listen on. `PORT` (set by the serverless
/// platform) takes precedence over `BIND_PORT`. Defaults to `8080`.
pub static BIND_PORT: Lazy<u16> =
    Lazy::new(|| bind_port_from_lookup(|key| std::env::var(key).ok()));

pub fn bind_port_from_lookup<F>(lookup: F) -> u16
where
    F: Fn(&str) -> Option<String>,
{
    ["PORT", "BIND_PORT"]
        .into_iter()
        .filter_map(|key| lookup(key))
        .find_map(|value| value.trim().parse::<u16>().ok())
        .unwrap_or(8080)
}

/// Settings handed to every invocation of the budget guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuardConfig {
    /// Target project. `None` when `GCP_PROJECT` is unset or blank.
    pub project: Option<ProjectName>,
    pub billing_endpoint: String,
    pub request_timeout: Duration,
    pub access_token: Option<String>,
    pub metadata_host: String,
}

impl Default for GuardConfig {
    fn default() -> Self {
        Self {
            project: None,
            billing_endpoint: DEFAULT_BILLING_API_ENDPOINT.to_string(),
            request_timeout: Duration::from_secs(30),
            access_token: None,
            metadata_host: DEFAULT_METADATA_HOST.to_string(),
        }
    }
}

impl GuardConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary variable lookup so callers
    /// (and tests) are not tied to the process environment.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        Self {
            project: read("GCP_PROJECT").map(ProjectName::new),
            billing_endpoint: read("BILLING_API_ENDPOINT")
                .map(|value| value.trim_end_matches('/').to_string())
                .unwrap_or(defaults.billing_endpoint),
            request_timeout: read("BILLING_API_TIMEOUT_SECS")
                .and_then(|value| value.parse::<u64>().ok())
                .filter(|value| *value > 0)
                .map(Duration::from_secs)
                .unwrap_or(defaults.request_timeout),
            access_token: read("GCP_ACCESS_TOKEN"),
            metadata_host: read("GCE_METADATA_HOST").unwrap_or(defaults.metadata_host),
        }
    }
}

fn read_optional_env(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}
