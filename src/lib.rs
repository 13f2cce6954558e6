pub mod billing;
pub mod config;
pub mod error;
pub mod guard;
pub mod notification;
pub mod routes;

use reqwest::Client;
use std::sync::Arc;

use billing::{CloudBillingClient, MetadataServerToken, StaticToken, TokenSource};
use config::GuardConfig;
use routes::GuardState;

/// Wires the billing client and its token source from configuration.
pub fn build_state(config: GuardConfig) -> Result<GuardState, reqwest::Error> {
    let client = Client::builder().timeout(config.request_timeout).build()?;
    let tokens: Arc<dyn TokenSource> = match &config.access_token {
        Some(token) => Arc::new(StaticToken::new(token.clone())),
        None => Arc::new(MetadataServerToken::new(
            client.clone(),
            &config.metadata_host,
        )),
    };
    let billing = CloudBillingClient::with_client(client, config.billing_endpoint.clone(), tokens);
    Ok(GuardState::new(config, Arc::new(billing)))
}
