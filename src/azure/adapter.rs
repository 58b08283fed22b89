//! Azure implementation of [`ComputeServiceAdapter`].
//!
//! A node is a virtual machine named after the node, plus the public IP and
//! NIC created for it and the VHD of its OS disk. Creation is expressed as a
//! [`CreatePlan`]:
//!
//! ```text
//! 0. public IP            public-address-<name>
//! 1. network interface    nic-<name>          (after 0)
//! 2. storage profile      <name>
//! 3. OS profile           <name>
//! 4. virtual machine      <name>              (after 1, 2, 3)
//! ```
//!
//! When the template asks for inbound ports, a security group `nsg-<name>`
//! admitting them is created first and the NIC depends on it too.

use async_trait::async_trait;
use std::collections::HashMap;
use std::fmt;
use tracing::{debug, info, warn};

use crate::compute::{
    ComputeServiceAdapter, HardwareMetadata, ImageMetadata, LocationMetadata, LoginCredentials,
    NodeAndInitialCredentials, NodeMetadata, NodeStatus, Poller, Template,
};
use crate::config::{group_from_name, AzureConfig};
use crate::error::{CloudportError, ProvisionError, Result};
use crate::planner::{CreatePlan, PlanExecutor, PlannedStep, StepOutputs, StepRunner, StepSummary};

use super::blob::{custom_image_exists, custom_images, BlobClient, CUSTOM_IMAGE_CONTAINER};
use super::cleanup::CleanupResources;
use super::client::ArmClient;
use super::image::{newest_version, ImageRef};
use super::predicates;
use super::resources::ResourcePreparer;
use super::types::{
    HardwareProfile, IdReference, ImageReference, IpConfiguration, IpConfigurationProperties,
    LinuxConfiguration, Location, NetworkInterfaceCard, NetworkInterfaceCardProperties,
    NetworkInterfaceReference, NetworkInterfaceReferenceProperties, NetworkProfile,
    NetworkSecurityGroup, NetworkSecurityGroupProperties, NetworkSecurityRule, OsDisk,
    OsProfile, PowerState, ProvisioningState, PublicIpAddress, PublicIpAddressProperties,
    SshConfiguration, SshPublicKey, StorageProfile, StorageService, Vhd, VirtualMachine,
    VirtualMachineProperties, VmSize, WindowsConfiguration,
};
use super::{ip_config_name, nic_name, public_ip_name, security_group_name};

/// Tag recording the group a resource was created for.
pub const GROUP_TAG: &str = "cloudport-group";

const COMPUTE_NAMESPACE: &str = "Microsoft.Compute";
const VM_RESOURCE_TYPE: &str = "virtualMachines";
const PUBLIC_IP_IDLE_TIMEOUT_MINUTES: u32 = 4;
const FIRST_RULE_PRIORITY: u32 = 100;
const LAST_RULE_PRIORITY: u32 = 4096;

/// Steps of an Azure node creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AzureStep {
    /// Create the public IP and wait for it.
    PublicIp,
    /// Create the security group admitting the inbound ports.
    SecurityGroup,
    /// Create the NIC attached to the public IP.
    NetworkInterface,
    /// Build the storage profile from the image.
    StorageProfile,
    /// Build the OS profile from the login options.
    OsProfile,
    /// Create the virtual machine.
    VirtualMachine,
}

/// What each creation step produces.
#[derive(Debug, Clone)]
pub enum AzureArtifact {
    /// A provisioned public IP.
    PublicIp(PublicIpAddress),
    /// A created security group.
    SecurityGroup(NetworkSecurityGroup),
    /// A created NIC.
    NetworkInterface(NetworkInterfaceCard),
    /// A storage profile.
    StorageProfile(StorageProfile),
    /// An OS profile.
    OsProfile(OsProfile),
    /// A created virtual machine.
    VirtualMachine(VirtualMachine),
}

/// A virtual machine together with the addresses of its NICs.
#[derive(Debug, Clone)]
pub struct AzureNode {
    /// The virtual machine.
    pub vm: VirtualMachine,
    /// Public addresses.
    pub public_addresses: Vec<String>,
    /// Private addresses.
    pub private_addresses: Vec<String>,
}

/// A VM size offered in a location.
#[derive(Debug, Clone)]
pub struct VmHardware {
    /// The size.
    pub size: VmSize,
    /// Location it was listed in.
    pub location: String,
}

/// Azure Resource Manager compute adapter.
#[derive(Debug)]
pub struct AzureComputeServiceAdapter {
    client: ArmClient,
    config: AzureConfig,
}

impl fmt::Display for AzureStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PublicIp => "create public IP",
            Self::SecurityGroup => "create security group",
            Self::NetworkInterface => "create network interface",
            Self::StorageProfile => "build storage profile",
            Self::OsProfile => "build OS profile",
            Self::VirtualMachine => "create virtual machine",
        };
        write!(f, "{s}")
    }
}

impl From<AzureNode> for NodeMetadata {
    fn from(node: AzureNode) -> Self {
        let vm = node.vm;
        let status = node_status(&vm);
        let group = vm
            .tags
            .get(GROUP_TAG)
            .cloned()
            .or_else(|| group_from_name(&vm.name).map(ToString::to_string));
        let image_id = vm
            .properties
            .storage_profile
            .image_reference
            .as_ref()
            .and_then(|r| marketplace_id(&vm.location, r));

        Self {
            id: vm.name.clone(),
            name: vm.name,
            group,
            status,
            location: Some(vm.location),
            hardware_id: Some(vm.properties.hardware_profile.vm_size),
            image_id,
            public_addresses: node.public_addresses,
            private_addresses: node.private_addresses,
        }
    }
}

impl From<VmHardware> for HardwareMetadata {
    fn from(hardware: VmHardware) -> Self {
        Self {
            id: hardware.size.name.clone(),
            name: hardware.size.name,
            cores: hardware.size.number_of_cores,
            ram_mb: hardware.size.memory_in_mb,
            disk_gb: hardware.size.os_disk_size_in_mb / 1024,
            location: Some(hardware.location),
        }
    }
}

impl From<Location> for LocationMetadata {
    fn from(location: Location) -> Self {
        Self {
            id: location.name,
            description: location.display_name,
        }
    }
}

/// Maps the provisioning and power state of a VM onto a node status.
#[must_use]
pub fn node_status(vm: &VirtualMachine) -> NodeStatus {
    match vm.provisioning_state() {
        ProvisioningState::Accepted | ProvisioningState::Creating | ProvisioningState::Updating => {
            NodeStatus::Pending
        }
        ProvisioningState::Deleting => NodeStatus::Terminated,
        ProvisioningState::Failed | ProvisioningState::Canceled => NodeStatus::Error,
        ProvisioningState::Unknown => NodeStatus::Unrecognized,
        ProvisioningState::Succeeded => match vm.power_state() {
            None | Some(PowerState::Running) => NodeStatus::Running,
            Some(PowerState::Starting) => NodeStatus::Pending,
            Some(
                PowerState::Stopping
                | PowerState::Stopped
                | PowerState::Deallocating
                | PowerState::Deallocated,
            ) => NodeStatus::Suspended,
            Some(PowerState::Unknown) => NodeStatus::Unrecognized,
        },
    }
}

fn marketplace_id(location: &str, reference: &ImageReference) -> Option<String> {
    let image = ImageRef::Marketplace {
        location: location.to_string(),
        publisher: reference.publisher.clone()?,
        offer: reference.offer.clone()?,
        sku: reference.sku.clone()?,
    };
    Some(image.encode())
}

/// Storage profile booting `name` from the template image.
///
/// The OS disk is written to `{blob}vhds/{name}.vhd`. Marketplace images are
/// referenced by publisher, offer and SKU at their latest version; custom
/// images by the URI of their captured VHD.
///
/// # Errors
///
/// Returns an error if the image id cannot be decoded.
pub fn storage_profile(name: &str, image: &ImageMetadata, blob: &str) -> Result<StorageProfile> {
    let os_disk = OsDisk {
        name: Some(name.to_string()),
        vhd: Some(Vhd {
            uri: format!("{blob}vhds/{name}.vhd"),
        }),
        caching: Some(String::from("ReadWrite")),
        create_option: Some(String::from("FromImage")),
        ..OsDisk::default()
    };

    let profile = match ImageRef::decode(&image.id)? {
        ImageRef::Marketplace {
            publisher,
            offer,
            sku,
            ..
        } => StorageProfile {
            image_reference: Some(ImageReference {
                id: None,
                publisher: Some(publisher),
                offer: Some(offer),
                sku: Some(sku),
                version: Some(String::from("latest")),
            }),
            os_disk,
            data_disks: Vec::new(),
        },
        ImageRef::Custom { .. } => StorageProfile {
            image_reference: None,
            os_disk: OsDisk {
                os_type: Some(String::from(if image.os_family.is_windows() {
                    "Windows"
                } else {
                    "Linux"
                })),
                image: Some(Vhd {
                    uri: image.provider_id.clone(),
                }),
                ..os_disk
            },
            data_disks: Vec::new(),
        },
    };
    Ok(profile)
}

/// OS profile for `name`.
///
/// Windows images get a password. Other images get the template's SSH key
/// with password authentication disabled, or a password when there is no key.
#[must_use]
pub fn os_profile(name: &str, template: &Template, config: &AzureConfig) -> OsProfile {
    let user = template
        .login_user()
        .unwrap_or(&config.default_login_user)
        .to_string();
    let password = template
        .login_password()
        .unwrap_or(&config.default_login_password)
        .to_string();

    if template.image.os_family.is_windows() {
        return OsProfile {
            computer_name: name.to_string(),
            admin_username: user,
            admin_password: Some(password),
            windows_configuration: Some(WindowsConfiguration {
                provision_vm_agent: true,
                enable_automatic_updates: true,
            }),
            ..OsProfile::default()
        };
    }

    match &template.options.public_key {
        Some(key) => OsProfile {
            computer_name: name.to_string(),
            linux_configuration: Some(LinuxConfiguration {
                disable_password_authentication: true,
                ssh: Some(SshConfiguration {
                    public_keys: vec![SshPublicKey {
                        path: format!("/home/{user}/.ssh/authorized_keys"),
                        key_data: key.clone(),
                    }],
                }),
            }),
            admin_username: user,
            ..OsProfile::default()
        },
        None => OsProfile {
            computer_name: name.to_string(),
            admin_username: user,
            admin_password: Some(password),
            linux_configuration: Some(LinuxConfiguration {
                disable_password_authentication: false,
                ssh: None,
            }),
            ..OsProfile::default()
        },
    }
}

impl AzureComputeServiceAdapter {
    /// Creates an adapter for the configured subscription and group.
    ///
    /// # Errors
    ///
    /// Returns an error if the ARM client cannot be created.
    pub fn new(config: AzureConfig) -> Result<Self> {
        let client = ArmClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// The ARM client.
    #[must_use]
    pub const fn client(&self) -> &ArmClient {
        &self.client
    }

    /// The configuration.
    #[must_use]
    pub const fn config(&self) -> &AzureConfig {
        &self.config
    }

    /// Resource cleaner for the configured group.
    #[must_use]
    pub fn cleanup(&self) -> CleanupResources<'_> {
        CleanupResources::new(
            &self.client,
            &self.config.resource_group,
            Poller::for_operations(&self.config.timeouts),
        )
    }

    /// Plans the creation of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the template image id cannot be decoded.
    pub fn plan(&self, name: &str, template: &Template) -> Result<CreatePlan<AzureStep>> {
        ImageRef::decode(&template.image.id)?;

        let mut plan = CreatePlan::new(name);
        let ip = plan.push(AzureStep::PublicIp, public_ip_name(name), Vec::new())?;
        let mut nic_dependencies = vec![ip];
        if !template.options.inbound_ports.is_empty() {
            inbound_rules(&template.options.inbound_ports)?;
            let security_group = plan.push(AzureStep::SecurityGroup, security_group_name(name), Vec::new())?;
            nic_dependencies.push(security_group);
        }
        let nic = plan.push(AzureStep::NetworkInterface, nic_name(name), nic_dependencies)?;
        let storage = plan.push(AzureStep::StorageProfile, name, Vec::new())?;
        let os = plan.push(AzureStep::OsProfile, name, Vec::new())?;
        plan.push(AzureStep::VirtualMachine, name, vec![nic, storage, os])?;
        Ok(plan)
    }

    fn tags(&self, group: &str, template: &Template) -> HashMap<String, String> {
        let mut tags = self.config.tags.clone();
        tags.extend(template.options.tags.clone());
        tags.insert(GROUP_TAG.to_string(), group.to_string());
        tags
    }

    async fn describe(&self, vm: VirtualMachine) -> Result<AzureNode> {
        let group = self.config.resource_group.as_str();
        let network = &self.client.api_versions().network;
        let mut public_addresses = Vec::new();
        let mut private_addresses = Vec::new();

        for nic_id in vm.nic_ids() {
            let Some(nic) = self.client.network_interfaces(group).get_by_id(nic_id).await? else {
                continue;
            };
            private_addresses.extend(nic.private_addresses().map(ToString::to_string));
            for ip_id in nic.public_ip_ids() {
                let address: Option<PublicIpAddress> = self.client.get(ip_id, network).await?;
                if let Some(ip) = address.and_then(|a| a.properties.ip_address) {
                    public_addresses.push(ip);
                }
            }
        }

        Ok(AzureNode {
            vm,
            public_addresses,
            private_addresses,
        })
    }

    async fn marketplace_images(&self, location: &str, publisher: &str) -> Result<Vec<ImageMetadata>> {
        let api = self.client.os_images(location);
        let mut images = Vec::new();

        for offer in api.list_offers(publisher).await? {
            for sku in api.list_skus(publisher, &offer.name).await? {
                let versions = api.list_versions(publisher, &offer.name, &sku.name).await?;
                if let Some(version) = newest_version(versions.iter().map(|v| v.name.as_str())) {
                    images.push(ImageRef::marketplace_metadata(
                        location,
                        publisher,
                        &offer.name,
                        &sku.name,
                        version,
                    ));
                }
            }
        }

        debug!("{} images of {publisher} in {location}", images.len());
        Ok(images)
    }

    async fn blob_store(&self, group: &str, account: &StorageService) -> Result<Option<BlobClient>> {
        let keys = match self.client.storage_accounts(group).list_keys(&account.name).await {
            Ok(keys) => keys,
            Err(e) if e.is_not_found() => return Ok(None),
            Err(e) => return Err(e),
        };
        let endpoint = account
            .blob_endpoint()
            .map_or_else(|| self.config.blob_endpoint_for(&account.name), ToString::to_string);
        BlobClient::new(self.client.http().clone(), &endpoint, &account.name, &keys.key1).map(Some)
    }

    /// Captured images of `account`, with ids encoded for `location`.
    async fn account_images(
        &self,
        group: &str,
        account: &StorageService,
        location: &str,
    ) -> Result<Vec<ImageMetadata>> {
        let Some(store) = self.blob_store(group, account).await? else {
            return Ok(Vec::new());
        };
        if !custom_image_exists(&store).await? {
            return Ok(Vec::new());
        }
        custom_images(&store, CUSTOM_IMAGE_CONTAINER, group, &account.name, location).await
    }

    async fn power_action(&self, id: &str, action: &str, accepted: Option<String>) -> Result<()> {
        info!("{action} {id}");
        if let Some(uri) = accepted {
            let poller = Poller::for_operations(&self.config.timeouts);
            if !predicates::operation_completed(&self.client, &uri, &poller).await? {
                warn!("{action} of {id} still running after {:?}", poller.timeout);
            }
        }
        Ok(())
    }
}

/// Runs the steps of one node creation.
struct NodeCreation<'a> {
    adapter: &'a AzureComputeServiceAdapter,
    name: &'a str,
    template: &'a Template,
    subnet_id: &'a str,
    blob: &'a str,
    tags: HashMap<String, String>,
}

impl NodeCreation<'_> {
    fn group(&self) -> &str {
        &self.adapter.config.resource_group
    }

    fn missing(&self, step: &PlannedStep<AzureStep>, what: &str) -> CloudportError {
        ProvisionError::StepFailed {
            node: self.name.to_string(),
            step: step.to_string(),
            reason: format!("no {what} from an earlier step"),
        }
        .into()
    }

    async fn create_public_ip(&self) -> Result<AzureArtifact> {
        let client = &self.adapter.client;
        let address = PublicIpAddress {
            id: String::new(),
            name: public_ip_name(self.name),
            location: self.template.location_id.clone(),
            etag: None,
            tags: self.tags.clone(),
            properties: PublicIpAddressProperties {
                public_ip_allocation_method: String::from("Static"),
                idle_timeout_in_minutes: Some(PUBLIC_IP_IDLE_TIMEOUT_MINUTES),
                ..PublicIpAddressProperties::default()
            },
        };
        let created = client.public_ips(self.group()).create_or_update(&address).await?;
        let poller = Poller::for_public_ip(&self.adapter.config.timeouts);
        let ready = predicates::public_ip_available(client, self.group(), &created.name, &poller).await?;
        Ok(AzureArtifact::PublicIp(ready))
    }

    async fn create_security_group(&self) -> Result<AzureArtifact> {
        let security_group = NetworkSecurityGroup {
            id: String::new(),
            name: security_group_name(self.name),
            location: self.template.location_id.clone(),
            etag: None,
            tags: self.tags.clone(),
            properties: NetworkSecurityGroupProperties {
                provisioning_state: None,
                security_rules: inbound_rules(&self.template.options.inbound_ports)?,
            },
        };
        let created = self
            .adapter
            .client
            .security_groups(self.group())
            .create_or_update(&security_group)
            .await?;
        Ok(AzureArtifact::SecurityGroup(created))
    }

    async fn create_nic(
        &self,
        ip: &PublicIpAddress,
        security_group: Option<&NetworkSecurityGroup>,
    ) -> Result<AzureArtifact> {
        let nic = NetworkInterfaceCard {
            id: String::new(),
            name: nic_name(self.name),
            location: self.template.location_id.clone(),
            etag: None,
            tags: self.tags.clone(),
            properties: NetworkInterfaceCardProperties {
                ip_configurations: vec![IpConfiguration {
                    name: ip_config_name(self.name),
                    id: None,
                    etag: None,
                    properties: IpConfigurationProperties {
                        private_ip_allocation_method: Some(String::from("Dynamic")),
                        subnet: Some(IdReference {
                            id: self.subnet_id.to_string(),
                        }),
                        public_ip_address: Some(IdReference { id: ip.id.clone() }),
                        ..IpConfigurationProperties::default()
                    },
                }],
                network_security_group: security_group.map(|g| IdReference { id: g.id.clone() }),
                ..NetworkInterfaceCardProperties::default()
            },
        };
        let created = self
            .adapter
            .client
            .network_interfaces(self.group())
            .create_or_update(&nic)
            .await?;
        Ok(AzureArtifact::NetworkInterface(created))
    }

    async fn create_vm(
        &self,
        nic: &NetworkInterfaceCard,
        storage: &StorageProfile,
        os: &OsProfile,
    ) -> Result<AzureArtifact> {
        let vm = VirtualMachine {
            id: String::new(),
            name: self.name.to_string(),
            location: self.template.location_id.clone(),
            tags: self.tags.clone(),
            properties: VirtualMachineProperties {
                hardware_profile: HardwareProfile {
                    vm_size: self.template.hardware_id.clone(),
                },
                storage_profile: storage.clone(),
                os_profile: Some(os.clone()),
                network_profile: NetworkProfile {
                    network_interfaces: vec![NetworkInterfaceReference {
                        id: nic.id.clone(),
                        properties: Some(NetworkInterfaceReferenceProperties { primary: true }),
                    }],
                },
                ..VirtualMachineProperties::default()
            },
        };
        let created = self
            .adapter
            .client
            .virtual_machines(self.group())
            .create(&vm)
            .await?;
        Ok(AzureArtifact::VirtualMachine(created))
    }
}

fn dependency<'o, T>(
    step: &PlannedStep<AzureStep>,
    outputs: &'o StepOutputs<AzureArtifact>,
    pick: impl Fn(&'o AzureArtifact) -> Option<&'o T>,
) -> Option<&'o T> {
    step.dependencies
        .iter()
        .filter_map(|index| outputs.get(*index))
        .find_map(pick)
}

#[async_trait]
impl StepRunner<AzureStep> for NodeCreation<'_> {
    type Output = AzureArtifact;

    async fn run(
        &self,
        step: &PlannedStep<AzureStep>,
        outputs: &StepOutputs<AzureArtifact>,
    ) -> Result<AzureArtifact> {
        match step.kind {
            AzureStep::PublicIp => self.create_public_ip().await,
            AzureStep::SecurityGroup => self.create_security_group().await,
            AzureStep::NetworkInterface => {
                let ip = dependency(step, outputs, |a| match a {
                    AzureArtifact::PublicIp(ip) => Some(ip),
                    _ => None,
                })
                .ok_or_else(|| self.missing(step, "public IP"))?;
                let security_group = dependency(step, outputs, |a| match a {
                    AzureArtifact::SecurityGroup(group) => Some(group),
                    _ => None,
                });
                self.create_nic(ip, security_group).await
            }
            AzureStep::StorageProfile => {
                storage_profile(self.name, &self.template.image, self.blob).map(AzureArtifact::StorageProfile)
            }
            AzureStep::OsProfile => Ok(AzureArtifact::OsProfile(os_profile(
                self.name,
                self.template,
                &self.adapter.config,
            ))),
            AzureStep::VirtualMachine => {
                let nic = dependency(step, outputs, |a| match a {
                    AzureArtifact::NetworkInterface(nic) => Some(nic),
                    _ => None,
                })
                .ok_or_else(|| self.missing(step, "network interface"))?;
                let storage = dependency(step, outputs, |a| match a {
                    AzureArtifact::StorageProfile(profile) => Some(profile),
                    _ => None,
                })
                .ok_or_else(|| self.missing(step, "storage profile"))?;
                let os = dependency(step, outputs, |a| match a {
                    AzureArtifact::OsProfile(profile) => Some(profile),
                    _ => None,
                })
                .ok_or_else(|| self.missing(step, "OS profile"))?;
                self.create_vm(nic, storage, os).await
            }
        }
    }
}

/// One allow rule per distinct port, in ascending priority.
fn inbound_rules(ports: &[u16]) -> Result<Vec<NetworkSecurityRule>> {
    let mut ports = ports.to_vec();
    ports.sort_unstable();
    ports.dedup();

    let mut rules = Vec::with_capacity(ports.len());
    let mut priority = FIRST_RULE_PRIORITY;
    for port in ports {
        if priority > LAST_RULE_PRIORITY {
            return Err(ProvisionError::InvalidTemplate {
                message: format!(
                    "at most {} inbound ports fit in a security group",
                    LAST_RULE_PRIORITY - FIRST_RULE_PRIORITY + 1
                ),
            }
            .into());
        }
        rules.push(NetworkSecurityRule::allow_inbound_tcp(port, priority));
        priority += 1;
    }
    Ok(rules)
}

fn required<'t>(template: &'t Template, value: Option<&'t String>, option: &str) -> Result<&'t str> {
    value.map(String::as_str).ok_or_else(|| {
        ProvisionError::InvalidTemplate {
            message: format!(
                "option {option} is not set for image {}; prepare the template for a group first",
                template.image.id
            ),
        }
        .into()
    })
}

#[async_trait]
impl ComputeServiceAdapter for AzureComputeServiceAdapter {
    type Node = AzureNode;
    type Hardware = VmHardware;
    type Image = ImageMetadata;
    type Location = Location;

    async fn prepare_template(&self, group: &str, mut template: Template) -> Result<Template> {
        info!(
            "Preparing resource group {} in {} for node group {group}",
            self.config.resource_group, template.location_id
        );
        let prepared = ResourcePreparer::new(&self.client, &self.config)
            .ensure(&template.location_id)
            .await?;
        template.options.subnet_id.get_or_insert(prepared.subnet_id);
        template.options.blob.get_or_insert(prepared.blob);
        Ok(template)
    }

    fn describe_creation(&self, name: &str, template: &Template) -> Result<Vec<StepSummary>> {
        Ok(self.plan(name, template)?.summary())
    }

    async fn create_node_with_group_encoded_into_name(
        &self,
        group: &str,
        name: &str,
        template: &Template,
    ) -> Result<NodeAndInitialCredentials<AzureNode>> {
        let subnet_id = required(template, template.options.subnet_id.as_ref(), "subnet_id")?;
        let blob = required(template, template.options.blob.as_ref(), "blob")?;
        let plan = self.plan(name, template)?;

        let creation = NodeCreation {
            adapter: self,
            name,
            template,
            subnet_id,
            blob,
            tags: self.tags(group, template),
        };
        let mut result = PlanExecutor::new().execute(&plan, &creation).await;

        if let Some(failure) = result.failure.take() {
            warn!(
                "Creating {name} failed after {} of {} steps, deleting what was created: {failure}",
                result.completed,
                plan.step_count()
            );
            match self.cleanup().cleanup(name).await {
                Ok(report) if !report.is_clean() => {
                    warn!("{} resources of {name} remain after rollback", report.remaining.len());
                }
                Ok(_) => debug!("Rolled back {name}"),
                Err(e) => warn!("Rollback of {name} failed: {e}"),
            }
            return Err(failure);
        }

        let mut public_addresses = Vec::new();
        let mut private_addresses = Vec::new();
        let mut vm = None;
        for index in 0..plan.step_count() {
            match result.outputs.take(index) {
                Some(AzureArtifact::PublicIp(ip)) => public_addresses.extend(ip.properties.ip_address),
                Some(AzureArtifact::NetworkInterface(nic)) => {
                    private_addresses.extend(nic.private_addresses().map(ToString::to_string));
                }
                Some(AzureArtifact::VirtualMachine(created)) => vm = Some(created),
                _ => {}
            }
        }
        let vm = vm.ok_or_else(|| CloudportError::internal(format!("no virtual machine created for {name}")))?;

        let os = os_profile(name, template, &self.config);
        let credentials = LoginCredentials {
            user: os.admin_username,
            password: os.admin_password,
            key: template.options.public_key.clone(),
        };

        info!("Created virtual machine {name}");
        Ok(NodeAndInitialCredentials {
            node: AzureNode {
                vm,
                public_addresses,
                private_addresses,
            },
            node_id: name.to_string(),
            credentials: Some(credentials),
        })
    }

    async fn list_hardware_profiles(&self) -> Result<Vec<VmHardware>> {
        let mut hardware = Vec::new();
        for location in self.list_locations().await? {
            let sizes = self.client.vm_sizes(&location.name).list().await?;
            hardware.extend(sizes.into_iter().map(|size| VmHardware {
                size,
                location: location.name.clone(),
            }));
        }
        Ok(hardware)
    }

    async fn list_images(&self) -> Result<Vec<ImageMetadata>> {
        let mut images = Vec::new();
        for location in self.list_locations().await? {
            for publisher in self.config.publishers() {
                images.extend(self.marketplace_images(&location.name, publisher).await?);
            }
        }

        let group = self.config.resource_group.as_str();
        for account in self.client.storage_accounts(group).list().await? {
            if account.is_ready() {
                images.extend(self.account_images(group, &account, &account.location).await?);
            }
        }

        Ok(images)
    }

    async fn get_image(&self, id: &str) -> Result<Option<ImageMetadata>> {
        match ImageRef::decode(id)? {
            ImageRef::Marketplace {
                location,
                publisher,
                offer,
                sku,
            } => {
                let versions = self
                    .client
                    .os_images(&location)
                    .list_versions(&publisher, &offer, &sku)
                    .await?;
                Ok(newest_version(versions.iter().map(|v| v.name.as_str())).map(|version| {
                    ImageRef::marketplace_metadata(&location, &publisher, &offer, &sku, version)
                }))
            }
            ImageRef::Custom {
                location,
                group,
                storage,
                ..
            } => {
                let Some(account) = self.client.storage_accounts(&group).get(&storage).await? else {
                    return Ok(None);
                };
                let images = self.account_images(&group, &account, &location).await?;
                Ok(images.into_iter().find(|image| image.id == id))
            }
        }
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        let Some(provider) = self.client.resource_providers().get(COMPUTE_NAMESPACE).await? else {
            return Ok(Vec::new());
        };
        let offered = provider.locations_of(VM_RESOURCE_TYPE);
        let regions = &self.config.regions;

        let locations = self
            .client
            .locations()
            .list()
            .await?
            .into_iter()
            .filter(|l| offered.contains(&l.display_name.as_str()))
            .filter(|l| regions.is_empty() || regions.contains(&l.name))
            .collect();
        Ok(locations)
    }

    async fn get_node(&self, id: &str) -> Result<Option<AzureNode>> {
        let group = self.config.resource_group.as_str();
        match self.client.virtual_machines(group).get_with_instance_view(id).await? {
            Some(vm) => self.describe(vm).await.map(Some),
            None => Ok(None),
        }
    }

    async fn destroy_node(&self, id: &str) -> Result<()> {
        info!("Destroying {id}");
        self.cleanup().cleanup(id).await?.into_result()
    }

    async fn reboot_node(&self, id: &str) -> Result<()> {
        let accepted = self.client.virtual_machines(&self.config.resource_group).restart(id).await?;
        self.power_action(id, "Restart", accepted).await
    }

    async fn resume_node(&self, id: &str) -> Result<()> {
        let accepted = self.client.virtual_machines(&self.config.resource_group).start(id).await?;
        self.power_action(id, "Start", accepted).await
    }

    async fn suspend_node(&self, id: &str) -> Result<()> {
        let accepted = self
            .client
            .virtual_machines(&self.config.resource_group)
            .power_off(id)
            .await?;
        self.power_action(id, "Power off", accepted).await
    }

    async fn list_nodes(&self) -> Result<Vec<AzureNode>> {
        let vms = self
            .client
            .virtual_machines(&self.config.resource_group)
            .list()
            .await?;
        let mut nodes = Vec::with_capacity(vms.len());
        for vm in vms {
            nodes.push(self.describe(vm).await?);
        }
        Ok(nodes)
    }

    async fn list_nodes_by_ids(&self, ids: &[String]) -> Result<Vec<AzureNode>> {
        let nodes = self.list_nodes().await?;
        Ok(nodes
            .into_iter()
            .filter(|n| ids.iter().any(|id| *id == n.vm.name || *id == n.vm.id))
            .collect())
    }
}
