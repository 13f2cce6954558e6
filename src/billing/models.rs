use serde::{Deserialize, Serialize};
use std::fmt;

/// Fully-qualified project resource name, always of the form `projects/<id>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ProjectName(String);

impl ProjectName {
    /// Accepts either a bare project id or an already qualified name.
    pub fn new(project: impl Into<String>) -> Self {
        let project = project.into();
        let project = project.trim();
        match project.strip_prefix("projects/") {
            Some(id) => Self(format!("projects/{id}")),
            None => Self(format!("projects/{project}")),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// key: billing-info -> `projects.getBillingInfo` response
///
/// The API drops `false` booleans and empty strings from its JSON encoding, so
/// every field is optional on the wire.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ProjectBillingInfo {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_enabled: Option<bool>,
}

impl ProjectBillingInfo {
    /// A missing `billingEnabled` means billing is off.
    pub fn is_billing_enabled(&self) -> bool {
        self.billing_enabled.unwrap_or(false)
    }
}

/// key: billing-info -> `projects.updateBillingInfo` request body
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBillingInfo {
    pub billing_account_name: String,
}

impl UpdateBillingInfo {
    /// Body that detaches the project from its billing account.
    pub fn detach() -> Self {
        Self {
            billing_account_name: String::new(),
        }
    }
}
