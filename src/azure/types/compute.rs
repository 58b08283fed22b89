//! `Microsoft.Compute` models: virtual machines, their profiles, VM sizes and
//! marketplace image artifacts.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::resource::{IdReference, ProvisioningState};

/// A virtual machine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachine {
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// VM name.
    pub name: String,
    /// Region.
    pub location: String,
    /// Tags.
    #[serde(default)]
    pub tags: HashMap<String, String>,
    /// Properties.
    pub properties: VirtualMachineProperties,
}

/// Virtual machine properties.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VirtualMachineProperties {
    /// Platform assigned VM id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vm_id: Option<String>,
    /// License type (`Windows_Server` for BYOL).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub license_type: Option<String>,
    /// Availability set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub availability_set: Option<IdReference>,
    /// Size.
    pub hardware_profile: HardwareProfile,
    /// Disks and image.
    pub storage_profile: StorageProfile,
    /// Credentials and computer name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_profile: Option<OsProfile>,
    /// Network interfaces.
    pub network_profile: NetworkProfile,
    /// Provisioning state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provisioning_state: Option<String>,
    /// Runtime status, present when fetched with `$expand=instanceView`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance_view: Option<InstanceView>,
}

/// VM size selection.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HardwareProfile {
    /// Size name, e.g. `Standard_A1`.
    pub vm_size: String,
}

/// Disks of a VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageProfile {
    /// Marketplace image, absent for custom images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_reference: Option<ImageReference>,
    /// OS disk.
    pub os_disk: OsDisk,
    /// Data disks.
    #[serde(default)]
    pub data_disks: Vec<DataDisk>,
}

/// Marketplace image reference.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageReference {
    /// Custom image resource id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Publisher.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publisher: Option<String>,
    /// Offer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer: Option<String>,
    /// SKU.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    /// Version or `latest`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
}

/// A VHD location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vhd {
    /// Blob URI.
    pub uri: String,
}

/// Managed disk parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ManagedDiskParameters {
    /// Managed disk id.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    /// Storage account type, e.g. `Standard_LRS`.
    pub storage_account_type: String,
}

/// OS disk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsDisk {
    /// `Linux` or `Windows`; required for custom images.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub os_type: Option<String>,
    /// Disk name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Where the disk's VHD lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhd: Option<Vhd>,
    /// Caching mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<String>,
    /// `FromImage`, `Attach` or `Empty`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_option: Option<String>,
    /// Source VHD of a custom image.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Vhd>,
    /// Managed disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

/// Data disk.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataDisk {
    /// Disk name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Size in GB.
    #[serde(default, rename = "diskSizeGB", skip_serializing_if = "Option::is_none")]
    pub disk_size_gb: Option<String>,
    /// Logical unit number.
    pub lun: u32,
    /// Where the disk's VHD lives.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vhd: Option<Vhd>,
    /// `FromImage`, `Attach` or `Empty`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_option: Option<String>,
    /// Caching mode.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caching: Option<String>,
    /// Managed disk.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub managed_disk: Option<ManagedDiskParameters>,
}

/// OS level settings of a VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OsProfile {
    /// Host name.
    pub computer_name: String,
    /// Admin user.
    pub admin_username: String,
    /// Admin password, when key authentication is not used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_password: Option<String>,
    /// Base64 custom data.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub custom_data: Option<String>,
    /// Linux settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub linux_configuration: Option<LinuxConfiguration>,
    /// Windows settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub windows_configuration: Option<WindowsConfiguration>,
}

/// Linux OS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinuxConfiguration {
    /// Disables password logins.
    pub disable_password_authentication: bool,
    /// SSH settings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ssh: Option<SshConfiguration>,
}

/// SSH settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshConfiguration {
    /// Authorised keys.
    pub public_keys: Vec<SshPublicKey>,
}

/// An authorised SSH key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SshPublicKey {
    /// File the key is written to on the VM.
    pub path: String,
    /// Key material.
    pub key_data: String,
}

/// Windows OS settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowsConfiguration {
    /// Installs the VM agent.
    #[serde(rename = "provisionVMAgent")]
    pub provision_vm_agent: bool,
    /// Enables automatic updates.
    pub enable_automatic_updates: bool,
}

/// Network interfaces of a VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkProfile {
    /// Attached NICs.
    #[serde(default)]
    pub network_interfaces: Vec<NetworkInterfaceReference>,
}

/// NIC attached to a VM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceReference {
    /// NIC id.
    pub id: String,
    /// Attachment properties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub properties: Option<NetworkInterfaceReferenceProperties>,
}

/// NIC attachment properties.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkInterfaceReferenceProperties {
    /// Primary NIC.
    pub primary: bool,
}

/// Runtime status of a VM.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceView {
    /// Status entries such as `ProvisioningState/succeeded` and
    /// `PowerState/running`.
    #[serde(default)]
    pub statuses: Vec<InstanceViewStatus>,
}

/// One instance view status.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstanceViewStatus {
    /// Status code.
    pub code: String,
    /// Level.
    #[serde(default)]
    pub level: Option<String>,
    /// Display text.
    #[serde(default)]
    pub display_status: Option<String>,
    /// When the status was reached.
    #[serde(default)]
    pub time: Option<String>,
}

/// Power state derived from the instance view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerState {
    /// Starting.
    Starting,
    /// Running.
    Running,
    /// Stopping.
    Stopping,
    /// Stopped, still allocated.
    Stopped,
    /// Deallocating.
    Deallocating,
    /// Deallocated.
    Deallocated,
    /// Anything else.
    Unknown,
}

/// A VM size offered in a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VmSize {
    /// Size name.
    pub name: String,
    /// Cores.
    pub number_of_cores: u32,
    /// OS disk size.
    #[serde(rename = "osDiskSizeInMB")]
    pub os_disk_size_in_mb: u64,
    /// Temporary disk size.
    #[serde(rename = "resourceDiskSizeInMB")]
    pub resource_disk_size_in_mb: u64,
    /// Memory.
    #[serde(rename = "memoryInMB")]
    pub memory_in_mb: u64,
    /// Maximum number of data disks.
    pub max_data_disk_count: u32,
}

/// A marketplace image artifact: publisher, offer, SKU or version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageArtifact {
    /// Artifact name.
    pub name: String,
    /// Region.
    #[serde(default)]
    pub location: String,
    /// ARM id.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
}

impl VirtualMachine {
    /// Provisioning state of the VM.
    #[must_use]
    pub fn provisioning_state(&self) -> ProvisioningState {
        self.properties
            .provisioning_state
            .as_deref()
            .map_or(ProvisioningState::Unknown, ProvisioningState::parse)
    }

    /// Power state from the instance view, `None` without one.
    #[must_use]
    pub fn power_state(&self) -> Option<PowerState> {
        let view = self.properties.instance_view.as_ref()?;
        view.statuses
            .iter()
            .find_map(|s| s.code.strip_prefix("PowerState/"))
            .map(PowerState::parse)
    }

    /// NIC ids attached to the VM.
    pub fn nic_ids(&self) -> impl Iterator<Item = &str> {
        self.properties
            .network_profile
            .network_interfaces
            .iter()
            .map(|n| n.id.as_str())
    }

    /// URIs of every VHD backing the VM (OS disk first).
    #[must_use]
    pub fn vhd_uris(&self) -> Vec<&str> {
        let storage = &self.properties.storage_profile;
        storage
            .os_disk
            .vhd
            .iter()
            .chain(storage.data_disks.iter().filter_map(|d| d.vhd.as_ref()))
            .map(|v| v.uri.as_str())
            .collect()
    }
}

impl PowerState {
    /// Parses the part after `PowerState/`.
    #[must_use]
    pub fn parse(code: &str) -> Self {
        match code {
            "starting" => Self::Starting,
            "running" => Self::Running,
            "stopping" => Self::Stopping,
            "stopped" => Self::Stopped,
            "deallocating" => Self::Deallocating,
            "deallocated" => Self::Deallocated,
            _ => Self::Unknown,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const VM_JSON: &str = r#"{
        "id": "/subscriptions/s/resourceGroups/g/providers/Microsoft.Compute/virtualMachines/web-1a2b3c",
        "name": "web-1a2b3c",
        "location": "westeurope",
        "tags": {"cloudport-group": "web"},
        "properties": {
            "vmId": "27d2c4c6",
            "hardwareProfile": {"vmSize": "Standard_A1"},
            "storageProfile": {
                "imageReference": {"publisher": "Canonical", "offer": "UbuntuServer", "sku": "16.04-LTS", "version": "latest"},
                "osDisk": {"name": "web-1a2b3c", "vhd": {"uri": "https://stor.blob.core.windows.net/vhds/web-1a2b3c.vhd"}, "caching": "ReadWrite", "createOption": "FromImage"},
                "dataDisks": [{"lun": 0, "diskSizeGB": "10", "vhd": {"uri": "https://stor.blob.core.windows.net/vhds/data0.vhd"}, "createOption": "Empty"}]
            },
            "osProfile": {"computerName": "web-1a2b3c", "adminUsername": "cloudport", "linuxConfiguration": {"disablePasswordAuthentication": true}},
            "networkProfile": {"networkInterfaces": [{"id": "/subscriptions/s/resourceGroups/g/providers/Microsoft.Network/networkInterfaces/nic-web-1a2b3c"}]},
            "provisioningState": "Succeeded",
            "instanceView": {"statuses": [
                {"code": "ProvisioningState/succeeded", "level": "Info"},
                {"code": "PowerState/deallocated", "level": "Info", "displayStatus": "VM deallocated"}
            ]}
        }
    }"#;

    #[test]
    fn test_virtual_machine_accessors() {
        let vm: VirtualMachine = serde_json::from_str(VM_JSON).expect("valid VM");

        assert_eq!(vm.provisioning_state(), ProvisioningState::Succeeded);
        assert_eq!(vm.power_state(), Some(PowerState::Deallocated));
        assert_eq!(vm.nic_ids().count(), 1);
        assert_eq!(
            vm.vhd_uris(),
            vec![
                "https://stor.blob.core.windows.net/vhds/web-1a2b3c.vhd",
                "https://stor.blob.core.windows.net/vhds/data0.vhd",
            ]
        );
    }

    #[test]
    fn test_os_profile_serialization_omits_absent_fields() {
        let profile = OsProfile {
            computer_name: String::from("web"),
            admin_username: String::from("admin"),
            linux_configuration: Some(LinuxConfiguration {
                disable_password_authentication: true,
                ssh: None,
            }),
            ..OsProfile::default()
        };
        let json = serde_json::to_value(&profile).expect("serializable");
        assert_eq!(
            json,
            serde_json::json!({
                "computerName": "web",
                "adminUsername": "admin",
                "linuxConfiguration": {"disablePasswordAuthentication": true}
            })
        );
    }

    #[test]
    fn test_vm_size_field_names() {
        let size: VmSize = serde_json::from_str(
            r#"{"name":"Standard_A0","numberOfCores":1,"osDiskSizeInMB":1047552,"resourceDiskSizeInMB":20480,"memoryInMB":768,"maxDataDiskCount":1}"#,
        )
        .expect("valid size");
        assert_eq!(size.memory_in_mb, 768);
        assert_eq!(size.os_disk_size_in_mb, 1_047_552);
    }
}
