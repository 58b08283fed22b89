//! `Microsoft.Storage` models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A storage account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageService {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Account name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Properties.
    pub properties: StorageServiceProperties,
}

/// Storage account properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageServiceProperties {
    /// Replication type, e.g. `Standard_LRS`.
    #[serde(default)]
    pub account_type: Option<String>,
    /// Provisioning status.
    #[serde(default)]
    pub provisioning_state: Option<StorageStatus>,
    /// Service endpoints keyed by service (`blob`, `queue`, ...).
    #[serde(default)]
    pub primary_endpoints: HashMap<String, String>,
    /// Primary region.
    #[serde(default)]
    pub primary_location: Option<String>,
    /// Availability of the primary region.
    #[serde(default)]
    pub status_of_primary: Option<String>,
}

/// Storage account provisioning status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageStatus {
    /// Being created.
    Creating,
    /// DNS is being set up.
    #[serde(rename = "ResolvingDNS")]
    ResolvingDns,
    /// Ready.
    Succeeded,
    /// Anything else.
    #[serde(other)]
    Unknown,
}

/// Access keys of a storage account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StorageServiceKeys {
    /// Primary key.
    pub key1: String,
    /// Secondary key.
    pub key2: String,
}

/// Body of a storage account creation.
#[derive(Debug, Clone, Serialize)]
pub struct StorageAccountCreate {
    /// Region.
    pub location: String,
    /// Tags.
    pub tags: HashMap<String, String>,
    /// Properties.
    pub properties: StorageAccountCreateProperties,
}

/// Properties of a storage account creation.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageAccountCreateProperties {
    /// Replication type.
    pub account_type: String,
}

impl StorageService {
    /// Returns true once the account is usable.
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.properties.provisioning_state == Some(StorageStatus::Succeeded)
    }

    /// Primary blob endpoint, e.g. `https://acct.blob.core.windows.net/`.
    #[must_use]
    pub fn blob_endpoint(&self) -> Option<&str> {
        self.properties.primary_endpoints.get("blob").map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_storage_status_values() {
        let account: StorageService = serde_json::from_str(
            r#"{"name":"stor1","location":"westeurope","properties":{"accountType":"Standard_LRS","provisioningState":"ResolvingDNS"}}"#,
        )
        .expect("valid account");
        assert_eq!(account.properties.provisioning_state, Some(StorageStatus::ResolvingDns));
        assert!(!account.is_ready());

        let other: StorageStatus = serde_json::from_str(r#""Migrating""#).expect("known or other");
        assert_eq!(other, StorageStatus::Unknown);
    }

    #[test]
    fn test_blob_endpoint() {
        let account: StorageService = serde_json::from_str(
            r#"{"name":"stor1","location":"westeurope","properties":{"provisioningState":"Succeeded","primaryEndpoints":{"blob":"https://stor1.blob.core.windows.net/"}}}"#,
        )
        .expect("valid account");
        assert!(account.is_ready());
        assert_eq!(account.blob_endpoint(), Some("https://stor1.blob.core.windows.net/"));
    }
}
