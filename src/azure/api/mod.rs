//! Per-resource ARM APIs.
//!
//! Each API borrows the [`ArmClient`] and is scoped the way ARM scopes the
//! resource: subscription, resource group, or location.

mod location;
mod network_interface;
mod os_image;
mod public_ip;
mod resource_group;
mod scale_set;
mod security_group;
mod storage_account;
mod virtual_machine;
mod virtual_network;

pub use location::{LocationApi, ResourceProviderApi, VmSizeApi};
pub use network_interface::NetworkInterfaceCardApi;
pub use os_image::OsImageApi;
pub use public_ip::PublicIpAddressApi;
pub use resource_group::ResourceGroupApi;
pub use scale_set::VirtualMachineScaleSetApi;
pub use security_group::NetworkSecurityGroupApi;
pub use storage_account::StorageAccountApi;
pub use virtual_machine::VirtualMachineApi;
pub use virtual_network::{SubnetApi, VirtualNetworkApi};

use super::client::ArmClient;

impl ArmClient {
    /// Virtual machines of a resource group.
    #[must_use]
    pub const fn virtual_machines<'a>(&'a self, group: &'a str) -> VirtualMachineApi<'a> {
        VirtualMachineApi::new(self, group)
    }

    /// Public IP addresses of a resource group.
    #[must_use]
    pub const fn public_ips<'a>(&'a self, group: &'a str) -> PublicIpAddressApi<'a> {
        PublicIpAddressApi::new(self, group)
    }

    /// Network interfaces of a resource group.
    #[must_use]
    pub const fn network_interfaces<'a>(&'a self, group: &'a str) -> NetworkInterfaceCardApi<'a> {
        NetworkInterfaceCardApi::new(self, group)
    }

    /// Network security groups of a resource group.
    #[must_use]
    pub const fn security_groups<'a>(&'a self, group: &'a str) -> NetworkSecurityGroupApi<'a> {
        NetworkSecurityGroupApi::new(self, group)
    }

    /// Virtual networks of a resource group.
    #[must_use]
    pub const fn virtual_networks<'a>(&'a self, group: &'a str) -> VirtualNetworkApi<'a> {
        VirtualNetworkApi::new(self, group)
    }

    /// Subnets of a virtual network.
    #[must_use]
    pub const fn subnets<'a>(&'a self, group: &'a str, virtual_network: &'a str) -> SubnetApi<'a> {
        SubnetApi::new(self, group, virtual_network)
    }

    /// Storage accounts of a resource group.
    #[must_use]
    pub const fn storage_accounts<'a>(&'a self, group: &'a str) -> StorageAccountApi<'a> {
        StorageAccountApi::new(self, group)
    }

    /// Scale sets of a resource group.
    #[must_use]
    pub const fn scale_sets<'a>(&'a self, group: &'a str) -> VirtualMachineScaleSetApi<'a> {
        VirtualMachineScaleSetApi::new(self, group)
    }

    /// Marketplace images offered in a location.
    #[must_use]
    pub const fn os_images<'a>(&'a self, location: &'a str) -> OsImageApi<'a> {
        OsImageApi::new(self, location)
    }

    /// VM sizes offered in a location.
    #[must_use]
    pub const fn vm_sizes<'a>(&'a self, location: &'a str) -> VmSizeApi<'a> {
        VmSizeApi::new(self, location)
    }

    /// Regions of the subscription.
    #[must_use]
    pub const fn locations(&self) -> LocationApi<'_> {
        LocationApi::new(self)
    }

    /// Resource provider namespaces.
    #[must_use]
    pub const fn resource_providers(&self) -> ResourceProviderApi<'_> {
        ResourceProviderApi::new(self)
    }

    /// Resource groups of the subscription.
    #[must_use]
    pub const fn resource_groups(&self) -> ResourceGroupApi<'_> {
        ResourceGroupApi::new(self)
    }
}
