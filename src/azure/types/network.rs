//! `Microsoft.Network` models: public IPs, NICs, security groups, virtual
//! networks and subnets.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::resource::{IdReference, ProvisioningState};

/// A public IP address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddress {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Entity tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Properties.
    pub properties: PublicIpAddressProperties,
}

/// Public IP properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicIpAddressProperties {
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// Resource GUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,
    /// The address, once allocated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    /// `Static` or `Dynamic`.
    #[serde(rename = "publicIPAllocationMethod")]
    pub public_ip_allocation_method: String,
    /// Idle timeout.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub idle_timeout_in_minutes: Option<u32>,
    /// DNS settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dns_settings: Option<DnsSettings>,
    /// IP configuration the address is bound to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_configuration: Option<IdReference>,
}

/// DNS settings of a public IP.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DnsSettings {
    /// DNS label.
    pub domain_name_label: String,
    /// Resulting FQDN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fqdn: Option<String>,
    /// Reverse FQDN.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverse_fqdn: Option<String>,
}

/// A network interface card.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceCard {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Entity tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Properties.
    pub properties: NetworkInterfaceCardProperties,
}

/// NIC properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkInterfaceCardProperties {
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// Resource GUID.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_guid: Option<String>,
    /// IP forwarding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enable_ip_forwarding: Option<bool>,
    /// IP configurations.
    #[serde(default)]
    pub ip_configurations: Vec<IpConfiguration>,
    /// Security group filtering the NIC's traffic.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub network_security_group: Option<IdReference>,
}

/// One IP configuration of a NIC.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfiguration {
    /// Name.
    pub name: String,
    /// ARM id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Entity tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Properties.
    pub properties: IpConfigurationProperties,
}

/// IP configuration properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IpConfigurationProperties {
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// Private address, once allocated.
    #[serde(default, rename = "privateIPAddress", skip_serializing_if = "Option::is_none")]
    pub private_ip_address: Option<String>,
    /// `Static` or `Dynamic`.
    #[serde(default, rename = "privateIPAllocationMethod", skip_serializing_if = "Option::is_none")]
    pub private_ip_allocation_method: Option<String>,
    /// Subnet.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subnet: Option<IdReference>,
    /// Public IP.
    #[serde(default, rename = "publicIPAddress", skip_serializing_if = "Option::is_none")]
    pub public_ip_address: Option<IdReference>,
}

/// A network security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroup {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Entity tag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub etag: Option<String>,
    /// Tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Properties.
    pub properties: NetworkSecurityGroupProperties,
}

/// Security group properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityGroupProperties {
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// User defined rules.
    #[serde(default)]
    pub security_rules: Vec<NetworkSecurityRule>,
}

/// One rule of a security group.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSecurityRule {
    /// Name.
    pub name: String,
    /// Properties.
    pub properties: NetworkSecurityRuleProperties,
}

/// Rule properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkSecurityRuleProperties {
    /// `Tcp`, `Udp` or `*`.
    pub protocol: String,
    /// Source port or range.
    pub source_port_range: String,
    /// Destination port or range.
    pub destination_port_range: String,
    /// Source CIDR or tag.
    pub source_address_prefix: String,
    /// Destination CIDR or tag.
    pub destination_address_prefix: String,
    /// `Allow` or `Deny`.
    pub access: String,
    /// 100 to 4096, lower wins.
    pub priority: u32,
    /// `Inbound` or `Outbound`.
    pub direction: String,
}

/// A virtual network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetwork {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Properties.
    pub properties: VirtualNetworkProperties,
}

/// Virtual network properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualNetworkProperties {
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// Address space.
    pub address_space: AddressSpace,
    /// Subnets.
    #[serde(default)]
    pub subnets: Vec<Subnet>,
}

/// Address prefixes of a virtual network.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddressSpace {
    /// CIDR prefixes.
    pub address_prefixes: Vec<String>,
}

/// A subnet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Subnet {
    /// ARM id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Name.
    pub name: String,
    /// Properties.
    pub properties: SubnetProperties,
}

/// Subnet properties.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubnetProperties {
    /// CIDR prefix.
    pub address_prefix: String,
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// IP configurations using the subnet.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub ip_configurations: Vec<IdReference>,
}

impl PublicIpAddress {
    /// Provisioning state of the address.
    #[must_use]
    pub fn provisioning_state(&self) -> ProvisioningState {
        self.properties
            .provisioning_state
            .as_deref()
            .map_or(ProvisioningState::Unknown, ProvisioningState::parse)
    }
}

impl NetworkSecurityRule {
    /// A rule admitting inbound TCP traffic to `port` from anywhere.
    #[must_use]
    pub fn allow_inbound_tcp(port: u16, priority: u32) -> Self {
        Self {
            name: format!("tcp-{port}"),
            properties: NetworkSecurityRuleProperties {
                protocol: String::from("Tcp"),
                source_port_range: String::from("*"),
                destination_port_range: port.to_string(),
                source_address_prefix: String::from("*"),
                destination_address_prefix: String::from("*"),
                access: String::from("Allow"),
                priority,
                direction: String::from("Inbound"),
            },
        }
    }
}

impl NetworkInterfaceCard {
    /// Public IP ids referenced by the NIC's IP configurations.
    pub fn public_ip_ids(&self) -> impl Iterator<Item = &str> {
        self.properties
            .ip_configurations
            .iter()
            .filter_map(|c| c.properties.public_ip_address.as_ref())
            .map(|r| r.id.as_str())
    }

    /// Id of the security group attached to the NIC.
    #[must_use]
    pub fn security_group_id(&self) -> Option<&str> {
        self.properties.network_security_group.as_ref().map(|r| r.id.as_str())
    }

    /// Private addresses allocated to the NIC.
    pub fn private_addresses(&self) -> impl Iterator<Item = &str> {
        self.properties
            .ip_configurations
            .iter()
            .filter_map(|c| c.properties.private_ip_address.as_deref())
    }
}
