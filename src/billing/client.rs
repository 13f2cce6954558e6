use async_trait::async_trait;
use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::auth::TokenSource;
use super::error::BillingApiError;
use super::models::{ProjectBillingInfo, ProjectName, UpdateBillingInfo};

/// key: billing-api -> the two project billing operations the guard needs
#[async_trait]
pub trait BillingApi: Send + Sync {
    async fn get_billing_info(
        &self,
        project: &ProjectName,
    ) -> Result<ProjectBillingInfo, BillingApiError>;

    /// Returns the raw response document so it can be logged verbatim.
    async fn update_billing_info(
        &self,
        project: &ProjectName,
        body: &UpdateBillingInfo,
    ) -> Result<Value, BillingApiError>;
}

/// Cloud Billing API v1 over REST.
pub struct CloudBillingClient {
    client: Client,
    base_url: String,
    tokens: Arc<dyn TokenSource>,
}

impl CloudBillingClient {
    pub fn new(
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
        timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(client, base_url, tokens))
    }

    pub fn with_client(
        client: Client,
        base_url: impl Into<String>,
        tokens: Arc<dyn TokenSource>,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            tokens,
        }
    }

    fn endpoint(&self, project: &ProjectName) -> String {
        format!("{}/v1/{}/billingInfo", self.base_url, project)
    }

    async fn execute<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        project: &ProjectName,
    ) -> Result<T, BillingApiError> {
        let token = self.tokens.access_token().await?;
        let response = request.bearer_auth(token).send().await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(BillingApiError::from_status(
                status,
                project.as_str(),
                &body,
            ));
        }

        // An empty 2xx body still means "no fields set".
        let body: &str = if body.trim().is_empty() {
            "{}"
        } else {
            body.as_str()
        };
        serde_json::from_str(body).map_err(|err| BillingApiError::MalformedResponse(err.to_string()))
    }
}

#[async_trait]
impl BillingApi for CloudBillingClient {
    async fn get_billing_info(
        &self,
        project: &ProjectName,
    ) -> Result<ProjectBillingInfo, BillingApiError> {
        let request = self.client.get(self.endpoint(project));
        self.execute(request, project).await
    }

    async fn update_billing_info(
        &self,
        project: &ProjectName,
        body: &UpdateBillingInfo,
    ) -> Result<Value, BillingApiError> {
        let request = self.client.put(self.endpoint(project)).json(body);
        self.execute(request, project).await
    }
}
