//! Azure Resource Manager JSON models.
//!
//! Field names follow the ARM wire format (camelCase, with the odd
//! `IPAddress`/`SizeInMB` spelling handled by explicit renames).

mod compute;
mod network;
mod resource;
mod scale_set;
mod storage;

pub use compute::{
    DataDisk, HardwareProfile, ImageArtifact, ImageReference, InstanceView, InstanceViewStatus,
    LinuxConfiguration, ManagedDiskParameters, NetworkInterfaceReference,
    NetworkInterfaceReferenceProperties, NetworkProfile, OsDisk, OsProfile, PowerState,
    SshConfiguration, SshPublicKey, StorageProfile, Vhd, VirtualMachine, VirtualMachineProperties,
    VmSize, WindowsConfiguration,
};
pub use network::{
    AddressSpace, DnsSettings, IpConfiguration, IpConfigurationProperties, NetworkInterfaceCard,
    NetworkInterfaceCardProperties, NetworkSecurityGroup, NetworkSecurityGroupProperties,
    NetworkSecurityRule, NetworkSecurityRuleProperties, PublicIpAddress, PublicIpAddressProperties, Subnet,
    SubnetProperties, VirtualNetwork, VirtualNetworkProperties,
};
pub use resource::{
    ErrorDetail, ErrorResponse, IdReference, ListResponse, Location, ProvisioningState,
    ResourceGroup, ResourceGroupProperties, ResourceProvider, ResourceProviderMetaData,
};
pub use scale_set::{
    Extension, ExtensionProfile, ExtensionProfileSettings, ExtensionProperties,
    NetworkInterfaceConfiguration, NetworkInterfaceConfigurationProperties,
    VirtualMachineScaleSet, VirtualMachineScaleSetDnsSettings,
    VirtualMachineScaleSetIpConfiguration, VirtualMachineScaleSetIpConfigurationProperties,
    VirtualMachineScaleSetNetworkProfile, VirtualMachineScaleSetOsProfile,
    VirtualMachineScaleSetPlan, VirtualMachineScaleSetProperties,
    VirtualMachineScaleSetPublicIpAddressConfiguration,
    VirtualMachineScaleSetPublicIpAddressProperties, VirtualMachineScaleSetSku,
    VirtualMachineScaleSetUpgradePolicy, VirtualMachineScaleSetVirtualMachineProfile,
};
pub use storage::{
    StorageAccountCreate, StorageAccountCreateProperties, StorageService, StorageServiceKeys,
    StorageServiceProperties, StorageStatus,
};
