//! Tearing down everything created for an Azure node.
//!
//! The VM goes first; its NICs only once the VM delete has completed, then
//! the public IPs and security group of each NIC and finally the VHD blobs of
//! its disks. When the VM is already gone, the conventionally named NIC,
//! public IP and security group are still looked up and reclaimed.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::compute::Poller;
use crate::error::{CloudportError, Result};
use crate::planner::{CleanupReport, Reclaimer, ResourceKind, ResourceRef, TeardownPlan};

use super::blob::{BlobClient, BlobLocation, BlobStore};
use super::client::ArmClient;
use super::predicates;
use super::types::NetworkInterfaceCard;
use super::{nic_name, public_ip_name, security_group_name};

/// Deletes the resources of Azure nodes in one resource group.
#[derive(Debug, Clone, Copy)]
pub struct CleanupResources<'a> {
    client: &'a ArmClient,
    group: &'a str,
    operations: Poller,
}

impl<'a> CleanupResources<'a> {
    /// Creates a cleaner; `operations` bounds each delete.
    #[must_use]
    pub const fn new(client: &'a ArmClient, group: &'a str, operations: Poller) -> Self {
        Self {
            client,
            group,
            operations,
        }
    }

    /// Plans the teardown of node `name` from what currently exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the node's resources cannot be looked up.
    pub async fn plan(&self, name: &str) -> Result<TeardownPlan> {
        let mut plan = TeardownPlan::new(name);
        let nics = self.client.network_interfaces(self.group);

        if let Some(vm) = self.client.virtual_machines(self.group).get(name).await? {
            let vm_step = plan.push(
                ResourceRef::new(ResourceKind::VirtualMachine, &vm.name, &vm.id),
                Vec::new(),
            );
            for nic_id in vm.nic_ids() {
                match nics.get_by_id(nic_id).await? {
                    Some(nic) => push_nic(&mut plan, &nic, vm_step),
                    None => debug!("NIC {nic_id} of {name} is already gone"),
                }
            }
            for uri in vm.vhd_uris() {
                plan.push(
                    ResourceRef::new(ResourceKind::DiskBlob, last_segment(uri), uri),
                    vec![vm_step],
                );
            }
            return Ok(plan);
        }

        info!("Virtual machine {name} not found, looking for its network resources");
        if let Some(nic) = nics.get(&nic_name(name)).await? {
            let nic_step = plan.push(
                ResourceRef::new(ResourceKind::NetworkInterface, &nic.name, &nic.id),
                Vec::new(),
            );
            push_public_ips(&mut plan, &nic, nic_step);
            push_security_group(&mut plan, &nic, nic_step);
        }

        let ip_name = public_ip_name(name);
        let planned = plan
            .resources()
            .any(|r| r.kind == ResourceKind::PublicIpAddress && r.name == ip_name);
        if !planned {
            if let Some(address) = self.client.public_ips(self.group).get(&ip_name).await? {
                plan.push(
                    ResourceRef::new(ResourceKind::PublicIpAddress, &address.name, &address.id),
                    Vec::new(),
                );
            }
        }

        let nsg_name = security_group_name(name);
        let planned = plan
            .resources()
            .any(|r| r.kind == ResourceKind::SecurityGroup && r.name == nsg_name);
        if !planned {
            if let Some(group) = self.client.security_groups(self.group).get(&nsg_name).await? {
                plan.push(
                    ResourceRef::new(ResourceKind::SecurityGroup, &group.name, &group.id),
                    Vec::new(),
                );
            }
        }

        Ok(plan)
    }

    /// Tears down node `name` and reports what is left.
    ///
    /// # Errors
    ///
    /// Returns an error if the teardown cannot be planned. Failures of single
    /// deletes are reported in the [`CleanupReport`].
    pub async fn cleanup(&self, name: &str) -> Result<CleanupReport> {
        let plan = self.plan(name).await?;
        if plan.is_empty() {
            info!("Nothing to delete for {name}");
        }
        Ok(plan.execute(self).await)
    }

    async fn delete_arm(&self, resource: &ResourceRef, api_version: &str) -> Result<bool> {
        let outcome = self.client.delete(&resource.id, api_version).await?;
        let label = format!("{} {}", resource.kind, resource.name);
        predicates::delete_completed(self.client, &label, outcome, &self.operations).await
    }

    async fn delete_vhd(&self, uri: &str) -> Result<bool> {
        let location = BlobLocation::parse(uri)?;
        let keys = match self
            .client
            .storage_accounts(self.group)
            .list_keys(&location.account)
            .await
        {
            Ok(keys) => keys,
            Err(e) if e.is_not_found() => {
                debug!("Storage account {} is gone, so is {uri}", location.account);
                return Ok(true);
            }
            Err(e) => return Err(e),
        };

        let store = BlobClient::new(
            self.client.http().clone(),
            &location.endpoint,
            &location.account,
            &keys.key1,
        )?;
        if !store.delete_blob(&location.container, &location.blob).await? {
            debug!("Blob {uri} was already gone");
        }
        Ok(true)
    }
}

#[async_trait]
impl Reclaimer for CleanupResources<'_> {
    async fn reclaim(&self, resource: &ResourceRef) -> Result<bool> {
        let versions = self.client.api_versions();
        match resource.kind {
            ResourceKind::VirtualMachine => self.delete_arm(resource, &versions.compute).await,
            ResourceKind::NetworkInterface
            | ResourceKind::PublicIpAddress
            | ResourceKind::SecurityGroup => {
                self.delete_arm(resource, &versions.network).await
            }
            ResourceKind::DiskBlob => self.delete_vhd(&resource.id).await,
            ResourceKind::Server | ResourceKind::Volume => Err(CloudportError::internal(format!(
                "{} {} is not an Azure resource",
                resource.kind, resource.name
            ))),
        }
    }
}

fn push_nic(plan: &mut TeardownPlan, nic: &NetworkInterfaceCard, vm_step: usize) {
    let nic_step = plan.push(
        ResourceRef::new(ResourceKind::NetworkInterface, &nic.name, &nic.id),
        vec![vm_step],
    );
    push_public_ips(plan, nic, nic_step);
    push_security_group(plan, nic, nic_step);
}

fn push_public_ips(plan: &mut TeardownPlan, nic: &NetworkInterfaceCard, nic_step: usize) {
    for ip_id in nic.public_ip_ids() {
        plan.push(
            ResourceRef::new(ResourceKind::PublicIpAddress, last_segment(ip_id), ip_id),
            vec![nic_step],
        );
    }
}

fn push_security_group(plan: &mut TeardownPlan, nic: &NetworkInterfaceCard, nic_step: usize) {
    if let Some(id) = nic.security_group_id() {
        plan.push(
            ResourceRef::new(ResourceKind::SecurityGroup, last_segment(id), id),
            vec![nic_step],
        );
    }
}

fn last_segment(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
