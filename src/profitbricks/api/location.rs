//! Location operations.

use crate::error::Result;
use crate::profitbricks::client::ProfitBricksClient;
use crate::profitbricks::types::Location;

/// Locations of the Cloud API.
#[derive(Debug, Clone, Copy)]
pub struct LocationApi<'a> {
    client: &'a ProfitBricksClient,
}

impl<'a> LocationApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient) -> Self {
        Self { client }
    }

    /// Lists locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Location>> {
        self.client.list("/locations", 1).await
    }

    /// Gets a location. Ids contain a slash, e.g. `de/fkb`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> Result<Option<Location>> {
        self.client.get(&format!("/locations/{id}"), 1).await
    }
}
