//! Storage account operations.

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::{StorageAccountCreate, StorageService, StorageServiceKeys};
use crate::error::Result;

const NAMESPACE: &str = "Microsoft.Storage";

/// Storage accounts of one resource group.
#[derive(Debug, Clone, Copy)]
pub struct StorageAccountApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
}

impl<'a> StorageAccountApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str) -> Self {
        Self { client, group }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .resource_path(self.group, NAMESPACE, &format!("storageAccounts/{name}"))
    }

    fn version(&self) -> &str {
        &self.client.api_versions().storage
    }

    /// Requests creation of an account. Creation usually completes
    /// asynchronously; the operation URI is returned when it does.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the account.
    pub async fn create(&self, name: &str, account: &StorageAccountCreate) -> Result<Option<String>> {
        self.client
            .put_accepted(&self.path(name), self.version(), account)
            .await
    }

    /// Gets an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<StorageService>> {
        self.client.get(&self.path(name), self.version()).await
    }

    /// Lists the accounts of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<StorageService>> {
        let path = self
            .client
            .resource_path(self.group, NAMESPACE, "storageAccounts");
        self.client.list(&path, self.version()).await
    }

    /// Fetches the access keys of an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_keys(&self, name: &str) -> Result<StorageServiceKeys> {
        let path = format!("{}/listKeys", self.path(name));
        self.client.post(&path, self.version()).await
    }

    /// Deletes an account.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.client.delete(&self.path(name), self.version()).await
    }
}
