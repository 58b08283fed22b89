//! Virtual machine operations.

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::VirtualMachine;
use crate::error::Result;

const NAMESPACE: &str = "Microsoft.Compute";

/// Virtual machines of one resource group.
#[derive(Debug, Clone, Copy)]
pub struct VirtualMachineApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
}

impl<'a> VirtualMachineApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str) -> Self {
        Self { client, group }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .resource_path(self.group, NAMESPACE, &format!("virtualMachines/{name}"))
    }

    fn version(&self) -> &str {
        &self.client.api_versions().compute
    }

    /// Creates or updates a VM.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the VM.
    pub async fn create(&self, vm: &VirtualMachine) -> Result<VirtualMachine> {
        self.client.put(&self.path(&vm.name), self.version(), vm).await
    }

    /// Gets a VM.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<VirtualMachine>> {
        self.client.get(&self.path(name), self.version()).await
    }

    /// Gets a VM including its runtime status.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get_with_instance_view(&self, name: &str) -> Result<Option<VirtualMachine>> {
        self.client
            .get_with_query(
                &self.path(name),
                &[("api-version", self.version()), ("$expand", "instanceView")],
            )
            .await
    }

    /// Lists the VMs of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<VirtualMachine>> {
        let path = self
            .client
            .resource_path(self.group, NAMESPACE, "virtualMachines");
        self.client.list(&path, self.version()).await
    }

    /// Deletes a VM. Its NICs, public IPs and disks are left alone.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.client.delete(&self.path(name), self.version()).await
    }

    /// Starts a VM.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn start(&self, name: &str) -> Result<Option<String>> {
        self.action(name, "start").await
    }

    /// Powers a VM off without releasing its compute resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn power_off(&self, name: &str) -> Result<Option<String>> {
        self.action(name, "powerOff").await
    }

    /// Restarts a VM.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn restart(&self, name: &str) -> Result<Option<String>> {
        self.action(name, "restart").await
    }

    /// Stops a VM and releases its compute resources.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn deallocate(&self, name: &str) -> Result<Option<String>> {
        self.action(name, "deallocate").await
    }

    async fn action(&self, name: &str, action: &str) -> Result<Option<String>> {
        let path = format!("{}/{action}", self.path(name));
        self.client.post_action(&path, self.version()).await
    }
}
