//! Volume operations.

use crate::error::Result;
use crate::profitbricks::binder::CreateVolume;
use crate::profitbricks::client::{ProfitBricksClient, Queued};
use crate::profitbricks::types::Volume;

/// Volumes of one data center.
#[derive(Debug, Clone, Copy)]
pub struct VolumeApi<'a> {
    client: &'a ProfitBricksClient,
    datacenter_id: &'a str,
}

impl<'a> VolumeApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient, datacenter_id: &'a str) -> Self {
        Self {
            client,
            datacenter_id,
        }
    }

    fn base(&self) -> String {
        format!("/datacenters/{}/volumes", self.datacenter_id)
    }

    /// Lists the volumes of the data center.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Volume>> {
        self.client.list(&self.base(), 1).await
    }

    /// Gets a volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> Result<Option<Volume>> {
        self.client.get(&format!("{}/{id}", self.base()), 1).await
    }

    /// Creates a volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid or the request fails.
    pub async fn create(&self, payload: &CreateVolume) -> Result<Queued<Volume>> {
        self.client.send(payload).await
    }

    /// Deletes a volume.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &str) -> Result<Option<String>> {
        self.client.delete(&format!("{}/{id}", self.base())).await
    }
}
