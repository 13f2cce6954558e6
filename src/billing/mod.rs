pub mod auth;
pub mod client;
pub mod error;
pub mod models;

pub use auth::{MetadataServerToken, StaticToken, TokenSource};
pub use client::{BillingApi, CloudBillingClient};
pub use error::BillingApiError;
pub use models::{ProjectBillingInfo, ProjectName, UpdateBillingInfo};
