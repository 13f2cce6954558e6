use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::sync::Mutex;

use super::error::BillingApiError;

/// Refresh cached tokens this long before they expire.
const EXPIRY_MARGIN_SECS: i64 = 60;

/// key: billing-auth -> bearer token provider
#[async_trait]
pub trait TokenSource: Send + Sync {
    async fn access_token(&self) -> Result<String, BillingApiError>;
}

/// A fixed token, typically supplied through `GCP_ACCESS_TOKEN`.
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

#[async_trait]
impl TokenSource for StaticToken {
    async fn access_token(&self) -> Result<String, BillingApiError> {
        Ok(self.0.clone())
    }
}

#[derive(Debug, Deserialize)]
struct MetadataTokenResponse {
    access_token: String,
    #[serde(default)]
    expires_in: i64,
}

struct CachedToken {
    value: String,
    expires_at: DateTime<Utc>,
}

/// key: billing-auth-metadata -> default service account token
///
/// Mints tokens for the runtime's service account from the instance metadata
/// server and caches them until shortly before expiry.
pub struct MetadataServerToken {
    client: Client,
    base_url: String,
    cached: Mutex<Option<CachedToken>>,
}

impl MetadataServerToken {
    /// `host` is either a bare host (`metadata.google.internal`) or a full base
    /// URL including the scheme.
    pub fn new(client: Client, host: &str) -> Self {
        let host = host.trim_end_matches('/');
        let base_url = if host.starts_with("http://") || host.starts_with("https://") {
            host.to_string()
        } else {
            format!("http://{host}")
        };
        Self {
            client,
            base_url,
            cached: Mutex::new(None),
        }
    }

    async fn fetch(&self) -> Result<CachedToken, BillingApiError> {
        let url = format!(
            "{}/computeMetadata/v1/instance/service-accounts/default/token",
            self.base_url
        );
        let response = self
            .client
            .get(&url)
            .header("Metadata-Flavor", "Google")
            .send()
            .await
            .map_err(|err| BillingApiError::Credentials(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BillingApiError::Credentials(format!(
                "metadata server returned {status}"
            )));
        }

        let parsed: MetadataTokenResponse = response
            .json()
            .await
            .map_err(|err| BillingApiError::Credentials(err.to_string()))?;

        Ok(CachedToken {
            value: parsed.access_token,
            expires_at: Utc::now() + ChronoDuration::seconds(parsed.expires_in),
        })
    }
}

#[async_trait]
impl TokenSource for MetadataServerToken {
    async fn access_token(&self) -> Result<String, BillingApiError> {
        let mut cached = self.cached.lock().await;
        let margin = ChronoDuration::seconds(EXPIRY_MARGIN_SECS);
        if let Some(token) = cached.as_ref() {
            if token.expires_at - margin > Utc::now() {
                return Ok(token.value.clone());
            }
        }

        let token = self.fetch().await?;
        let value = token.value.clone();
        *cached = Some(token);
        tracing::debug!("refreshed access token from metadata server");
        Ok(value)
    }
}
