//! Data center operations.

use crate::error::Result;
use crate::profitbricks::binder::CreateDatacenter;
use crate::profitbricks::client::{ProfitBricksClient, Queued};
use crate::profitbricks::types::Datacenter;

/// Data centers of the account.
#[derive(Debug, Clone, Copy)]
pub struct DatacenterApi<'a> {
    client: &'a ProfitBricksClient,
}

impl<'a> DatacenterApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient) -> Self {
        Self { client }
    }

    /// Lists data centers with their properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Datacenter>> {
        self.client.list("/datacenters", 1).await
    }

    /// Gets a data center.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> Result<Option<Datacenter>> {
        self.client.get(&format!("/datacenters/{id}"), 1).await
    }

    /// Creates a data center.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid or the request fails.
    pub async fn create(&self, payload: &CreateDatacenter) -> Result<Queued<Datacenter>> {
        self.client.send(payload).await
    }

    /// Deletes a data center and everything in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &str) -> Result<Option<String>> {
        self.client.delete(&format!("/datacenters/{id}")).await
    }
}
