//! Network interface operations.

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::NetworkInterfaceCard;
use crate::error::Result;

const NAMESPACE: &str = "Microsoft.Network";

/// Network interfaces of one resource group.
#[derive(Debug, Clone, Copy)]
pub struct NetworkInterfaceCardApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
}

impl<'a> NetworkInterfaceCardApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str) -> Self {
        Self { client, group }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .resource_path(self.group, NAMESPACE, &format!("networkInterfaces/{name}"))
    }

    fn version(&self) -> &str {
        &self.client.api_versions().network
    }

    /// Creates or updates a NIC.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the NIC.
    pub async fn create_or_update(&self, nic: &NetworkInterfaceCard) -> Result<NetworkInterfaceCard> {
        self.client.put(&self.path(&nic.name), self.version(), nic).await
    }

    /// Gets a NIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<NetworkInterfaceCard>> {
        self.client.get(&self.path(name), self.version()).await
    }

    /// Gets a NIC by its full ARM id.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_by_id(&self, id: &str) -> Result<Option<NetworkInterfaceCard>> {
        self.client.get(id, self.version()).await
    }

    /// Lists the NICs of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<NetworkInterfaceCard>> {
        let path = self
            .client
            .resource_path(self.group, NAMESPACE, "networkInterfaces");
        self.client.list(&path, self.version()).await
    }

    /// Deletes a NIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.client.delete(&self.path(name), self.version()).await
    }
}
