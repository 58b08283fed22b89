//! Image operations.

use crate::error::Result;
use crate::profitbricks::client::ProfitBricksClient;
use crate::profitbricks::types::Image;

/// Images visible to the account.
#[derive(Debug, Clone, Copy)]
pub struct ImageApi<'a> {
    client: &'a ProfitBricksClient,
}

impl<'a> ImageApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient) -> Self {
        Self { client }
    }

    /// Lists images with their properties.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Image>> {
        self.client.list("/images", 1).await
    }

    /// Gets an image.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> Result<Option<Image>> {
        self.client.get(&format!("/images/{id}"), 1).await
    }
}
