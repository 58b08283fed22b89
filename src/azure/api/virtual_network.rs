//! Virtual network and subnet operations.

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::{Subnet, VirtualNetwork};
use crate::error::Result;

const NAMESPACE: &str = "Microsoft.Network";

/// Virtual networks of one resource group.
#[derive(Debug, Clone, Copy)]
pub struct VirtualNetworkApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
}

/// Subnets of one virtual network.
#[derive(Debug, Clone, Copy)]
pub struct SubnetApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
    virtual_network: &'a str,
}

impl<'a> VirtualNetworkApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str) -> Self {
        Self { client, group }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .resource_path(self.group, NAMESPACE, &format!("virtualNetworks/{name}"))
    }

    fn version(&self) -> &str {
        &self.client.api_versions().network
    }

    /// Creates or updates a virtual network.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the network.
    pub async fn create_or_update(&self, network: &VirtualNetwork) -> Result<VirtualNetwork> {
        self.client
            .put(&self.path(&network.name), self.version(), network)
            .await
    }

    /// Gets a virtual network.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<VirtualNetwork>> {
        self.client.get(&self.path(name), self.version()).await
    }

    /// Lists the virtual networks of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<VirtualNetwork>> {
        let path = self
            .client
            .resource_path(self.group, NAMESPACE, "virtualNetworks");
        self.client.list(&path, self.version()).await
    }

    /// Deletes a virtual network.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.client.delete(&self.path(name), self.version()).await
    }
}

impl<'a> SubnetApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str, virtual_network: &'a str) -> Self {
        Self {
            client,
            group,
            virtual_network,
        }
    }

    fn collection(&self) -> String {
        self.client.resource_path(
            self.group,
            NAMESPACE,
            &format!("virtualNetworks/{}/subnets", self.virtual_network),
        )
    }

    fn version(&self) -> &str {
        &self.client.api_versions().network
    }

    /// Creates or updates a subnet.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the subnet.
    pub async fn create_or_update(&self, subnet: &Subnet) -> Result<Subnet> {
        let path = format!("{}/{}", self.collection(), subnet.name);
        self.client.put(&path, self.version(), subnet).await
    }

    /// Gets a subnet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<Subnet>> {
        let path = format!("{}/{name}", self.collection());
        self.client.get(&path, self.version()).await
    }

    /// Lists the subnets of the network.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Subnet>> {
        self.client.list(&self.collection(), self.version()).await
    }

    /// Deletes a subnet.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        let path = format!("{}/{name}", self.collection());
        self.client.delete(&path, self.version()).await
    }
}
