//! Subscription level ARM types: locations, resource providers, resource
//! groups, and the envelopes shared by every API.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Reference to another ARM resource by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdReference {
    /// Full ARM resource id.
    pub id: String,
}

/// Paged list envelope.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListResponse<T> {
    /// Items on this page.
    #[serde(default = "Vec::new")]
    pub value: Vec<T>,
    /// Absolute URL of the next page.
    #[serde(default)]
    pub next_link: Option<String>,
}

/// ARM error envelope: `{"error": {"code": ..., "message": ...}}`.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorResponse {
    /// The error.
    pub error: ErrorDetail,
}

/// ARM error detail.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorDetail {
    /// Machine readable code.
    #[serde(default)]
    pub code: String,
    /// Human readable message.
    #[serde(default)]
    pub message: String,
}

/// An Azure region.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Region id, e.g. `westeurope`.
    pub name: String,
    /// Display name, e.g. `West Europe`.
    pub display_name: String,
    /// Latitude.
    #[serde(default)]
    pub latitude: Option<String>,
    /// Longitude.
    #[serde(default)]
    pub longitude: Option<String>,
}

/// A resource provider namespace such as `Microsoft.Compute`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProvider {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Namespace.
    pub namespace: String,
    /// Resource types offered by the namespace.
    #[serde(default)]
    pub resource_types: Vec<ResourceProviderMetaData>,
}

/// One resource type of a provider namespace.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceProviderMetaData {
    /// Type, e.g. `virtualMachines`.
    pub resource_type: String,
    /// Display names of the regions offering the type.
    #[serde(default)]
    pub locations: Vec<String>,
    /// Supported `api-version` values.
    #[serde(default)]
    pub api_versions: Vec<String>,
}

/// A resource group.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroup {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Group name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Properties.
    #[serde(default)]
    pub properties: Option<ResourceGroupProperties>,
}

/// Resource group properties.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceGroupProperties {
    /// Provisioning state.
    #[serde(default)]
    pub provisioning_state: Option<String>,
}

/// ARM provisioning state of a resource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProvisioningState {
    /// Accepted, not started.
    Accepted,
    /// Being created.
    Creating,
    /// Being updated.
    Updating,
    /// Being deleted.
    Deleting,
    /// Done.
    Succeeded,
    /// Failed.
    Failed,
    /// Canceled.
    Canceled,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

impl ProvisioningState {
    /// Parses the state, case-insensitively.
    #[must_use]
    pub fn parse(state: &str) -> Self {
        match state.to_ascii_lowercase().as_str() {
            "accepted" => Self::Accepted,
            "creating" => Self::Creating,
            "updating" => Self::Updating,
            "deleting" => Self::Deleting,
            "succeeded" => Self::Succeeded,
            "failed" => Self::Failed,
            "canceled" => Self::Canceled,
            _ => Self::Unknown,
        }
    }
}

impl std::fmt::Display for Location {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.display_name)
    }
}
