//! Virtual machine scale set models.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::compute::{LinuxConfiguration, StorageProfile, WindowsConfiguration};
use super::resource::IdReference;

/// A virtual machine scale set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSet {
    /// ARM id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Region.
    pub location: String,
    /// Size and capacity.
    pub sku: VirtualMachineScaleSetSku,
    /// Tags.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tags: HashMap<String, String>,
    /// Marketplace plan.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<VirtualMachineScaleSetPlan>,
    /// Properties.
    pub properties: VirtualMachineScaleSetProperties,
}

/// Scale set SKU.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineScaleSetSku {
    /// VM size.
    pub name: String,
    /// Tier, e.g. `Standard`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<String>,
    /// Number of instances.
    pub capacity: u32,
}

/// Marketplace plan of a scale set image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineScaleSetPlan {
    /// Plan name.
    pub name: String,
    /// Publisher.
    pub publisher: String,
    /// Product.
    pub product: String,
}

/// Scale set properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetProperties {
    /// Limit the set to a single placement group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub single_placement_group: Option<bool>,
    /// Over-provision instances while scaling.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub over_provision: Option<bool>,
    /// Upgrade policy.
    pub upgrade_policy: VirtualMachineScaleSetUpgradePolicy,
    /// Template for every instance.
    pub virtual_machine_profile: VirtualMachineScaleSetVirtualMachineProfile,
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
}

/// Upgrade policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineScaleSetUpgradePolicy {
    /// `Manual` or `Automatic`.
    pub mode: String,
}

/// Instance template of a scale set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetVirtualMachineProfile {
    /// Disks and image.
    pub storage_profile: StorageProfile,
    /// Credentials.
    pub os_profile: VirtualMachineScaleSetOsProfile,
    /// Network configuration.
    pub network_profile: VirtualMachineScaleSetNetworkProfile,
    /// VM extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extension_profile: Option<ExtensionProfile>,
}

/// OS profile of scale set instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetOsProfile {
    /// Prefix of instance computer names.
    pub computer_name_prefix: String,
    /// Admin user.
    pub admin_username: String,
    /// Admin password.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    /// Linux settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_configuration: Option<LinuxConfiguration>,
    /// Windows settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_configuration: Option<WindowsConfiguration>,
}

/// Network profile of scale set instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetNetworkProfile {
    /// NIC templates.
    pub network_interface_configurations: Vec<NetworkInterfaceConfiguration>,
}

/// NIC template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceConfiguration {
    /// Name.
    pub name: String,
    /// Properties.
    pub properties: NetworkInterfaceConfigurationProperties,
}

/// NIC template properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceConfigurationProperties {
    /// Primary NIC.
    pub primary: bool,
    /// Accelerated networking.
    #[serde(default)]
    pub enable_accelerated_networking: bool,
    /// Network security group.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<IdReference>,
    /// DNS servers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<VirtualMachineScaleSetDnsSettings>,
    /// IP configurations.
    pub ip_configurations: Vec<VirtualMachineScaleSetIpConfiguration>,
}

/// DNS servers of scale set NICs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetDnsSettings {
    /// Server addresses.
    pub dns_servers: Vec<String>,
}

/// IP configuration template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineScaleSetIpConfiguration {
    /// Name.
    pub name: String,
    /// Properties.
    pub properties: VirtualMachineScaleSetIpConfigurationProperties,
}

/// IP configuration template properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetIpConfigurationProperties {
    /// Per-instance public IP.
    #[serde(
        default,
        rename = "publicIPAddressConfiguration",
        skip_serializing_if = "Option::is_none"
    )]
    pub public_ip_address_configuration: Option<VirtualMachineScaleSetPublicIpAddressConfiguration>,
    /// Subnet.
    pub subnet: IdReference,
    /// `IPv4` or `IPv6`.
    #[serde(
        default,
        rename = "privateIPAddressVersion",
        skip_serializing_if = "Option::is_none"
    )]
    pub private_ip_address_version: Option<String>,
    /// Load balancer backend pools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_balancer_backend_address_pools: Vec<IdReference>,
    /// Load balancer inbound NAT pools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub load_balancer_inbound_nat_pools: Vec<IdReference>,
    /// Application gateway backend pools.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub application_gateway_backend_address_pools: Vec<IdReference>,
}

/// Per-instance public IP template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VirtualMachineScaleSetPublicIpAddressConfiguration {
    /// Name.
    pub name: String,
    /// Properties.
    pub properties: VirtualMachineScaleSetPublicIpAddressProperties,
}

/// Per-instance public IP properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineScaleSetPublicIpAddressProperties {
    /// Idle timeout.
    pub idle_timeout_in_minutes: u32,
}

/// VM extensions of scale set instances.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtensionProfile {
    /// Extensions.
    pub extensions: Vec<Extension>,
}

/// A VM extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Extension {
    /// Name.
    pub name: String,
    /// Properties.
    pub properties: ExtensionProperties,
}

/// VM extension properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionProperties {
    /// Publisher, e.g. `Microsoft.Compute`.
    pub publisher: String,
    /// Extension type, e.g. `CustomScriptExtension`.
    #[serde(rename = "type")]
    pub extension_type: String,
    /// Handler version.
    pub type_handler_version: String,
    /// Allow minor version upgrades.
    pub auto_upgrade_minor_version: bool,
    /// Public settings.
    pub settings: ExtensionProfileSettings,
    /// Settings encrypted at rest (storage keys and the like).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub protected_settings: HashMap<String, String>,
}

/// Public settings of a custom script extension.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtensionProfileSettings {
    /// Files downloaded before the command runs.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub file_uris: Vec<String>,
    /// Command to run.
    pub command_to_execute: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::types::{ImageReference, ManagedDiskParameters, OsDisk};

    fn scale_set() -> VirtualMachineScaleSet {
        VirtualMachineScaleSet {
            id: None,
            name: None,
            location: String::from("eastus"),
            sku: VirtualMachineScaleSetSku {
                name: String::from("Standard_A1"),
                tier: Some(String::from("Standard")),
                capacity: 10,
            },
            tags: HashMap::new(),
            plan: None,
            properties: VirtualMachineScaleSetProperties {
                single_placement_group: None,
                over_provision: None,
                upgrade_policy: VirtualMachineScaleSetUpgradePolicy {
                    mode: String::from("Manual"),
                },
                virtual_machine_profile: VirtualMachineScaleSetVirtualMachineProfile {
                    storage_profile: StorageProfile {
                        image_reference: Some(ImageReference {
                            id: None,
                            publisher: Some(String::from("Canonical")),
                            offer: Some(String::from("UbuntuServer")),
                            sku: Some(String::from("16.04-LTS")),
                            version: Some(String::from("latest")),
                        }),
                        os_disk: OsDisk {
                            os_type: Some(String::from("Linux")),
                            create_option: Some(String::from("FromImage")),
                            managed_disk: Some(ManagedDiskParameters {
                                id: None,
                                storage_account_type: String::from("Standard_LRS"),
                            }),
                            ..OsDisk::default()
                        },
                        data_disks: Vec::new(),
                    },
                    os_profile: VirtualMachineScaleSetOsProfile {
                        computer_name_prefix: String::from("vmss"),
                        admin_username: String::from("cloudport"),
                        admin_password: Some(String::from("Password12345!")),
                        linux_configuration: Some(LinuxConfiguration {
                            disable_password_authentication: false,
                            ssh: None,
                        }),
                        windows_configuration: None,
                    },
                    network_profile: VirtualMachineScaleSetNetworkProfile {
                        network_interface_configurations: vec![NetworkInterfaceConfiguration {
                            name: String::from("nicconfig1"),
                            properties: NetworkInterfaceConfigurationProperties {
                                primary: true,
                                enable_accelerated_networking: false,
                                network_security_group: None,
                                dns_settings: Some(VirtualMachineScaleSetDnsSettings {
                                    dns_servers: vec![String::from("8.8.8.8")],
                                }),
                                ip_configurations: vec![VirtualMachineScaleSetIpConfiguration {
                                    name: String::from("ipconfig1"),
                                    properties: VirtualMachineScaleSetIpConfigurationProperties {
                                        public_ip_address_configuration: Some(
                                            VirtualMachineScaleSetPublicIpAddressConfiguration {
                                                name: String::from("pub1"),
                                                properties:
                                                    VirtualMachineScaleSetPublicIpAddressProperties {
                                                        idle_timeout_in_minutes: 15,
                                                    },
                                            },
                                        ),
                                        subnet: IdReference {
                                            id: String::from("/subscriptions/s/resourceGroups/g/providers/Microsoft.Network/virtualNetworks/v/subnets/sn"),
                                        },
                                        private_ip_address_version: Some(String::from("IPv4")),
                                        load_balancer_backend_address_pools: Vec::new(),
                                        load_balancer_inbound_nat_pools: Vec::new(),
                                        application_gateway_backend_address_pools: Vec::new(),
                                    },
                                }],
                            },
                        }],
                    },
                    extension_profile: Some(ExtensionProfile {
                        extensions: vec![Extension {
                            name: String::from("extensionName"),
                            properties: ExtensionProperties {
                                publisher: String::from("Microsoft.Compute"),
                                extension_type: String::from("CustomScriptExtension"),
                                type_handler_version: String::from("1.1"),
                                auto_upgrade_minor_version: false,
                                settings: ExtensionProfileSettings {
                                    file_uris: vec![String::from(
                                        "https://mystorage1.blob.core.windows.net/winvmextekfacnt/SampleCmd_1.cmd",
                                    )],
                                    command_to_execute: String::from("SampleCmd_1.cmd"),
                                },
                                protected_settings: HashMap::from([(
                                    String::from("StorageAccountKey"),
                                    String::from("account-key"),
                                )]),
                            },
                        }],
                    }),
                },
                provisioning_state: None,
            },
        }
    }

    #[test]
    fn test_scale_set_wire_format() {
        let json = serde_json::to_value(scale_set()).expect("serializable");
        let profile = &json["properties"]["virtualMachineProfile"];

        assert_eq!(json["sku"]["capacity"], 10);
        assert_eq!(json["properties"]["upgradePolicy"]["mode"], "Manual");

        let ip = &profile["networkProfile"]["networkInterfaceConfigurations"][0]["properties"]
            ["ipConfigurations"][0]["properties"];
        assert_eq!(ip["publicIPAddressConfiguration"]["properties"]["idleTimeoutInMinutes"], 15);
        assert_eq!(ip["privateIPAddressVersion"], "IPv4");
        assert!(ip.get("loadBalancerBackendAddressPools").is_none());

        let extension = &profile["extensionProfile"]["extensions"][0]["properties"];
        assert_eq!(extension["type"], "CustomScriptExtension");
        assert_eq!(extension["settings"]["commandToExecute"], "SampleCmd_1.cmd");
        assert_eq!(extension["protectedSettings"]["StorageAccountKey"], "account-key");
    }

    #[test]
    fn test_scale_set_parses_back() {
        let original = scale_set();
        let json = serde_json::to_string(&original).expect("serializable");
        let parsed: VirtualMachineScaleSet = serde_json::from_str(&json).expect("parsable");
        assert_eq!(parsed.properties.virtual_machine_profile, original.properties.virtual_machine_profile);
    }
}
