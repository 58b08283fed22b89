//! NIC operations.

use crate::error::Result;
use crate::profitbricks::binder::{CreateNic, UpdateNic};
use crate::profitbricks::client::{ProfitBricksClient, Queued};
use crate::profitbricks::types::Nic;

/// NICs of one server.
#[derive(Debug, Clone, Copy)]
pub struct NicApi<'a> {
    client: &'a ProfitBricksClient,
    datacenter_id: &'a str,
    server_id: &'a str,
}

impl<'a> NicApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient, datacenter_id: &'a str, server_id: &'a str) -> Self {
        Self {
            client,
            datacenter_id,
            server_id,
        }
    }

    fn base(&self) -> String {
        format!("/datacenters/{}/servers/{}/nics", self.datacenter_id, self.server_id)
    }

    /// Lists the NICs of the server.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Nic>> {
        self.client.list(&self.base(), 1).await
    }

    /// Gets a NIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> Result<Option<Nic>> {
        self.client.get(&format!("{}/{id}", self.base()), 1).await
    }

    /// Creates a NIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid or the request fails.
    pub async fn create(&self, payload: &CreateNic) -> Result<Queued<Nic>> {
        self.client.send(payload).await
    }

    /// Changes a NIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid or the request fails.
    pub async fn update(&self, payload: &UpdateNic) -> Result<Queued<Nic>> {
        self.client.send(payload).await
    }

    /// Deletes a NIC.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &str) -> Result<Option<String>> {
        self.client.delete(&format!("{}/{id}", self.base())).await
    }
}
