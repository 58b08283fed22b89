//! Subscription level lookups: regions, resource providers and VM sizes.

use crate::azure::client::ArmClient;
use crate::azure::types::{Location, ResourceProvider, VmSize};
use crate::error::Result;

/// Regions of the subscription.
#[derive(Debug, Clone, Copy)]
pub struct LocationApi<'a> {
    client: &'a ArmClient,
}

/// Resource provider namespaces.
#[derive(Debug, Clone, Copy)]
pub struct ResourceProviderApi<'a> {
    client: &'a ArmClient,
}

/// VM sizes offered in a location.
#[derive(Debug, Clone, Copy)]
pub struct VmSizeApi<'a> {
    client: &'a ArmClient,
    location: &'a str,
}

impl<'a> LocationApi<'a> {
    pub(super) const fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    /// Lists the regions.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Location>> {
        let path = format!("{}/locations", self.client.subscription_path());
        self.client
            .list(&path, &self.client.api_versions().resources)
            .await
    }
}

impl<'a> ResourceProviderApi<'a> {
    pub(super) const fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    /// Gets a namespace such as `Microsoft.Compute`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, namespace: &str) -> Result<Option<ResourceProvider>> {
        let path = format!("{}/providers/{namespace}", self.client.subscription_path());
        self.client
            .get(&path, &self.client.api_versions().resources)
            .await
    }
}

impl ResourceProvider {
    /// Display names of the regions offering a resource type.
    #[must_use]
    pub fn locations_of(&self, resource_type: &str) -> Vec<&str> {
        self.resource_types
            .iter()
            .filter(|t| t.resource_type.eq_ignore_ascii_case(resource_type))
            .flat_map(|t| t.locations.iter().map(String::as_str))
            .collect()
    }
}

impl<'a> VmSizeApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, location: &'a str) -> Self {
        Self { client, location }
    }

    /// Lists the VM sizes.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<VmSize>> {
        let path = format!(
            "{}/providers/Microsoft.Compute/locations/{}/vmSizes",
            self.client.subscription_path(),
            self.location
        );
        self.client
            .list(&path, &self.client.api_versions().compute)
            .await
    }
}
