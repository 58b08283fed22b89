//! Virtual machine scale set operations.

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::VirtualMachineScaleSet;
use crate::error::Result;

const NAMESPACE: &str = "Microsoft.Compute";

/// Scale sets of one resource group.
#[derive(Debug, Clone, Copy)]
pub struct VirtualMachineScaleSetApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
}

impl<'a> VirtualMachineScaleSetApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str) -> Self {
        Self { client, group }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .resource_path(self.group, NAMESPACE, &format!("VirtualMachineScaleSets/{name}"))
    }

    fn version(&self) -> &str {
        &self.client.api_versions().scale_sets
    }

    /// Creates or updates a scale set.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the scale set.
    pub async fn create_or_update(
        &self,
        name: &str,
        scale_set: &VirtualMachineScaleSet,
    ) -> Result<VirtualMachineScaleSet> {
        self.client.put(&self.path(name), self.version(), scale_set).await
    }

    /// Gets a scale set.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<VirtualMachineScaleSet>> {
        self.client.get(&self.path(name), self.version()).await
    }

    /// Lists the scale sets of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<VirtualMachineScaleSet>> {
        let path = self
            .client
            .resource_path(self.group, NAMESPACE, "VirtualMachineScaleSets");
        self.client.list(&path, self.version()).await
    }

    /// Deletes a scale set.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.client.delete(&self.path(name), self.version()).await
    }
}
