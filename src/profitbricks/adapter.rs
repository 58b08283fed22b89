//! `ProfitBricks` implementation of [`ComputeServiceAdapter`].
//!
//! A node is a server in a data center named after its group, booting from a
//! volume created from the template image, with one DHCP NIC on the public
//! LAN. Node ids are `<datacenter id>/<server id>`.
//!
//! ```text
//! 0. datacenter       <group>
//! 1. volume           <name>          (after 0)
//! 2. server           <name>          (after 0)
//! 3. attach volume    <name>          (after 0, 1, 2)
//! 4. boot volume      <name>          (after 0, 2, 3)
//! 5. NIC              nic-<name>      (after 0, 2)
//! ```
//!
//! Every step waits for its queued request to finish before the next starts.
//! Inbound ports of the template turn on the NIC firewall with one TCP rule
//! per port.

use async_trait::async_trait;
use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::{debug, info, warn};

use crate::compute::{
    ComputeServiceAdapter, HardwareMetadata, ImageMetadata, LocationMetadata, LoginCredentials,
    NodeAndInitialCredentials, NodeMetadata, NodeStatus, OsFamily, Poller, Template,
};
use crate::config::{group_from_name, ProfitBricksConfig};
use crate::error::{CloudportError, ProvisionError, Result};
use crate::planner::{
    CreatePlan, PlanExecutor, PlannedStep, Reclaimer, ResourceKind, ResourceRef, StepOutputs,
    StepRunner, StepSummary, TeardownPlan,
};

use super::binder::{CreateDatacenter, CreateNic, CreateServer, CreateVolume, FirewallRule, UpdateServer};
use super::client::{ProfitBricksClient, Queued};
use super::types::{Datacenter, Image, Location, Nic, Server, Snapshot, Volume};

/// User images log in as when the template names none.
const DEFAULT_LOGIN_USER: &str = "root";

const CORE_OPTIONS: &[u32] = &[1, 2, 4, 8, 16];
const RAM_OPTIONS_MB: &[u64] = &[1024, 2048, 4096, 8192, 16384, 32768];
const DISK_OPTIONS_GB: &[u32] = &[10, 20, 50, 100, 200];

/// Steps of a `ProfitBricks` node creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerStep {
    /// Find or create the group's data center.
    Datacenter,
    /// Create the boot volume from the image.
    Volume,
    /// Create the server.
    Server,
    /// Attach the volume to the server.
    AttachVolume,
    /// Make the volume the boot volume.
    BootVolume,
    /// Create the NIC.
    Nic,
}

/// What each creation step produces.
#[derive(Debug, Clone)]
pub enum ServerArtifact {
    /// The data center.
    Datacenter(Datacenter),
    /// A created or attached volume.
    Volume(Volume),
    /// The server.
    Server(Server),
    /// The NIC.
    Nic(Nic),
}

/// A hardware profile from the generated grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareSpec {
    /// Cores.
    pub cores: u32,
    /// Memory in MB.
    pub ram_mb: u64,
    /// Boot volume size in GB.
    pub disk_gb: u32,
}

/// Address of a server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeId {
    /// Data center id.
    pub datacenter_id: String,
    /// Server id.
    pub server_id: String,
}

/// A server and the data center it lives in.
#[derive(Debug, Clone)]
pub struct ServerNode {
    /// Data center id.
    pub datacenter_id: String,
    /// Location of the data center.
    pub location: String,
    /// The server, with volumes and NICs.
    pub server: Server,
}

/// Image or snapshot usable as a volume source.
#[derive(Debug, Clone)]
pub enum VolumeSource {
    /// An image.
    Image(Image),
    /// A snapshot.
    Snapshot(Snapshot),
}

/// `ProfitBricks` Cloud API compute adapter.
#[derive(Debug)]
pub struct ProfitBricksComputeServiceAdapter {
    client: ProfitBricksClient,
    config: ProfitBricksConfig,
}

impl fmt::Display for ServerStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Datacenter => "ensure datacenter",
            Self::Volume => "create volume",
            Self::Server => "create server",
            Self::AttachVolume => "attach volume",
            Self::BootVolume => "set boot volume",
            Self::Nic => "create NIC",
        };
        write!(f, "{s}")
    }
}

impl HardwareSpec {
    /// Every combination of the offered cores, memory and disk sizes.
    #[must_use]
    pub fn grid() -> Vec<Self> {
        let mut grid = Vec::with_capacity(CORE_OPTIONS.len() * RAM_OPTIONS_MB.len() * DISK_OPTIONS_GB.len());
        for &cores in CORE_OPTIONS {
            for &ram_mb in RAM_OPTIONS_MB {
                for &disk_gb in DISK_OPTIONS_GB {
                    grid.push(Self {
                        cores,
                        ram_mb,
                        disk_gb,
                    });
                }
            }
        }
        grid
    }

    /// `cores=N,ram=M,disk=D`.
    #[must_use]
    pub fn id(&self) -> String {
        format!("cores={},ram={},disk={}", self.cores, self.ram_mb, self.disk_gb)
    }
}

impl FromStr for HardwareSpec {
    type Err = CloudportError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || -> CloudportError {
            ProvisionError::InvalidTemplate {
                message: format!("hardware id '{s}' is not of the form cores=N,ram=M,disk=D"),
            }
            .into()
        };

        let (mut cores, mut ram_mb, mut disk_gb) = (None, None, None);
        for part in s.split(',') {
            let (key, value) = part.split_once('=').ok_or_else(invalid)?;
            match key.trim() {
                "cores" => cores = value.trim().parse().ok(),
                "ram" => ram_mb = value.trim().parse().ok(),
                "disk" => disk_gb = value.trim().parse().ok(),
                _ => return Err(invalid()),
            }
        }

        match (cores, ram_mb, disk_gb) {
            (Some(cores), Some(ram_mb), Some(disk_gb)) if cores > 0 && ram_mb > 0 && disk_gb > 0 => Ok(Self {
                cores,
                ram_mb,
                disk_gb,
            }),
            _ => Err(invalid()),
        }
    }
}

impl FromStr for NodeId {
    type Err = CloudportError;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((dc, server)) if !dc.is_empty() && !server.is_empty() && !server.contains('/') => Ok(Self {
                datacenter_id: dc.to_string(),
                server_id: server.to_string(),
            }),
            _ => Err(ProvisionError::InvalidNodeId { id: s.to_string() }.into()),
        }
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.datacenter_id, self.server_id)
    }
}

impl From<HardwareSpec> for HardwareMetadata {
    fn from(spec: HardwareSpec) -> Self {
        let id = spec.id();
        Self {
            name: id.clone(),
            id,
            cores: spec.cores,
            ram_mb: spec.ram_mb,
            disk_gb: u64::from(spec.disk_gb),
            location: None,
        }
    }
}

impl From<Location> for LocationMetadata {
    fn from(location: Location) -> Self {
        Self {
            id: location.id,
            description: location.properties.name,
        }
    }
}

impl From<VolumeSource> for ImageMetadata {
    fn from(source: VolumeSource) -> Self {
        let (id, name, description, location, licence) = match source {
            VolumeSource::Image(image) => (
                image.id,
                image.properties.name,
                image.properties.description,
                Some(image.properties.location),
                image.properties.licence_type,
            ),
            VolumeSource::Snapshot(snapshot) => (
                snapshot.id,
                snapshot.properties.name.unwrap_or_default(),
                snapshot.properties.description,
                snapshot.properties.location,
                snapshot.properties.licence_type,
            ),
        };
        let os_family = match licence.as_deref() {
            Some("WINDOWS" | "WINDOWS2016") => OsFamily::Windows,
            Some("LINUX") => match OsFamily::infer(&name) {
                OsFamily::Unrecognized => OsFamily::Linux,
                family => family,
            },
            _ => OsFamily::infer(&name),
        };

        Self {
            provider_id: id.clone(),
            id,
            version: licence.unwrap_or_default(),
            name,
            location,
            os_family,
            description,
            default_credentials: Some(LoginCredentials {
                user: String::from(DEFAULT_LOGIN_USER),
                password: None,
                key: None,
            }),
        }
    }
}

impl From<ServerNode> for NodeMetadata {
    fn from(node: ServerNode) -> Self {
        let server = node.server;
        let status = server_status(&server);
        let disk_gb = server
            .boot_volume()
            .or_else(|| server.volumes().first())
            .map_or(0, |v| disk_gigabytes(v.properties.size));
        let hardware = HardwareSpec {
            cores: server.properties.cores,
            ram_mb: server.properties.ram,
            disk_gb,
        };
        let image_id = server.boot_volume().and_then(|v| v.properties.image.clone());

        let (private_addresses, public_addresses): (Vec<String>, Vec<String>) = server
            .nics()
            .iter()
            .flat_map(|n| n.properties.ips.iter().cloned())
            .partition(|ip| is_private(ip));

        Self {
            id: NodeId {
                datacenter_id: node.datacenter_id,
                server_id: server.id.clone(),
            }
            .to_string(),
            group: group_from_name(&server.properties.name).map(ToString::to_string),
            name: server.properties.name.clone(),
            status,
            location: Some(node.location),
            hardware_id: Some(hardware.id()),
            image_id,
            public_addresses,
            private_addresses,
        }
    }
}

/// Maps the server state onto a node status.
#[must_use]
pub fn server_status(server: &Server) -> NodeStatus {
    if server.metadata.is_busy() {
        return NodeStatus::Pending;
    }
    match server.properties.vm_state.as_deref() {
        Some("RUNNING") => NodeStatus::Running,
        Some("SHUTOFF" | "SHUTDOWN" | "PAUSED") => NodeStatus::Suspended,
        Some("CRASHED") => NodeStatus::Error,
        None | Some("NOSTATE") => NodeStatus::Pending,
        Some(_) => NodeStatus::Unrecognized,
    }
}

/// Volume size in whole gigabytes. Sizes outside the `u32` range clamp to its
/// bounds and an unreadable size counts as zero.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn disk_gigabytes(size: f64) -> u32 {
    if size.is_nan() {
        return 0;
    }
    size.round().clamp(0.0, f64::from(u32::MAX)) as u32
}

fn is_private(ip: &str) -> bool {
    ip.parse::<Ipv4Addr>().is_ok_and(|a| a.is_private() || a.is_loopback())
}

impl ProfitBricksComputeServiceAdapter {
    /// Creates an adapter for the configured account.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be created.
    pub fn new(config: ProfitBricksConfig) -> Result<Self> {
        let client = ProfitBricksClient::new(&config)?;
        Ok(Self { client, config })
    }

    /// The Cloud API client.
    #[must_use]
    pub const fn client(&self) -> &ProfitBricksClient {
        &self.client
    }

    fn poller(&self) -> Poller {
        Poller::for_operations(&self.config.timeouts)
    }

    /// Waits for a queued request, if there is one.
    async fn settle(&self, status_uri: Option<&str>) -> Result<()> {
        match status_uri {
            Some(uri) => self.client.requests().wait(uri, &self.poller()).await,
            None => Ok(()),
        }
    }

    async fn settled<T>(&self, queued: Queued<T>) -> Result<T> {
        self.settle(queued.status_uri.as_deref()).await?;
        Ok(queued.resource)
    }

    /// Plans the creation of `name`.
    ///
    /// # Errors
    ///
    /// Returns an error if the hardware id is not a grid id.
    pub fn plan(&self, name: &str, template: &Template) -> Result<CreatePlan<ServerStep>> {
        template.hardware_id.parse::<HardwareSpec>()?;
        let datacenter = template
            .options
            .datacenter_id
            .as_deref()
            .or_else(|| group_from_name(name))
            .unwrap_or(name);

        let mut plan = CreatePlan::new(name);
        let dc = plan.push(ServerStep::Datacenter, datacenter, Vec::new())?;
        let volume = plan.push(ServerStep::Volume, name, vec![dc])?;
        let server = plan.push(ServerStep::Server, name, vec![dc])?;
        let attach = plan.push(ServerStep::AttachVolume, name, vec![dc, volume, server])?;
        plan.push(ServerStep::BootVolume, name, vec![dc, server, attach])?;
        plan.push(ServerStep::Nic, format!("nic-{name}"), vec![dc, server])?;
        Ok(plan)
    }

    /// Finds the data center named `group` in `location`, creating it when missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the data centers cannot be listed or created.
    pub async fn ensure_datacenter(&self, group: &str, location: &str) -> Result<Datacenter> {
        let existing = self
            .client
            .datacenters()
            .list()
            .await?
            .into_iter()
            .find(|dc| dc.properties.name == group && dc.properties.location == location);
        if let Some(datacenter) = existing {
            debug!("Using datacenter {} for {group}", datacenter.id);
            return Ok(datacenter);
        }

        info!("Creating datacenter {group} in {location}");
        let payload = CreateDatacenter {
            name: group.to_string(),
            location: location.to_string(),
            description: Some(format!("cloudport group {group}")),
        };
        let queued = self.client.datacenters().create(&payload).await?;
        self.settled(queued).await
    }

    fn node(datacenter: &Datacenter, server: Server) -> ServerNode {
        ServerNode {
            datacenter_id: datacenter.id.clone(),
            location: datacenter.properties.location.clone(),
            server,
        }
    }

    async fn teardown(&self, plan: TeardownPlan) -> Result<()> {
        let reclaimer = ServerReclaimer {
            client: &self.client,
            poller: self.poller(),
        };
        plan.execute(&reclaimer).await.into_result()
    }
}

/// Runs the steps of one server creation.
struct ServerCreation<'a> {
    adapter: &'a ProfitBricksComputeServiceAdapter,
    group: &'a str,
    name: &'a str,
    template: &'a Template,
    hardware: HardwareSpec,
}

fn dependency<'o, T>(
    step: &PlannedStep<ServerStep>,
    outputs: &'o StepOutputs<ServerArtifact>,
    pick: impl Fn(&'o ServerArtifact) -> Option<&'o T>,
) -> Option<&'o T> {
    step.dependencies
        .iter()
        .filter_map(|index| outputs.get(*index))
        .find_map(pick)
}

impl ServerCreation<'_> {
    fn missing(&self, step: &PlannedStep<ServerStep>, what: &str) -> CloudportError {
        ProvisionError::StepFailed {
            node: self.name.to_string(),
            step: step.to_string(),
            reason: format!("no {what} from an earlier step"),
        }
        .into()
    }

    fn datacenter<'o>(
        &self,
        step: &PlannedStep<ServerStep>,
        outputs: &'o StepOutputs<ServerArtifact>,
    ) -> Result<&'o Datacenter> {
        dependency(step, outputs, |a| match a {
            ServerArtifact::Datacenter(dc) => Some(dc),
            _ => None,
        })
        .ok_or_else(|| self.missing(step, "datacenter"))
    }

    fn server<'o>(
        &self,
        step: &PlannedStep<ServerStep>,
        outputs: &'o StepOutputs<ServerArtifact>,
    ) -> Result<&'o Server> {
        dependency(step, outputs, |a| match a {
            ServerArtifact::Server(server) => Some(server),
            _ => None,
        })
        .ok_or_else(|| self.missing(step, "server"))
    }

    fn volume<'o>(
        &self,
        step: &PlannedStep<ServerStep>,
        outputs: &'o StepOutputs<ServerArtifact>,
    ) -> Result<&'o Volume> {
        dependency(step, outputs, |a| match a {
            ServerArtifact::Volume(volume) => Some(volume),
            _ => None,
        })
        .ok_or_else(|| self.missing(step, "volume"))
    }

    async fn ensure_datacenter(&self) -> Result<ServerArtifact> {
        let client = &self.adapter.client;
        let datacenter = match &self.template.options.datacenter_id {
            Some(id) => client.datacenters().get(id).await?.ok_or_else(|| {
                CloudportError::from(ProvisionError::InvalidTemplate {
                    message: format!("datacenter {id} does not exist"),
                })
            })?,
            None => {
                self.adapter
                    .ensure_datacenter(self.group, &self.template.location_id)
                    .await?
            }
        };
        Ok(ServerArtifact::Datacenter(datacenter))
    }

    async fn create_volume(&self, datacenter: &Datacenter) -> Result<ServerArtifact> {
        let payload = CreateVolume {
            datacenter_id: datacenter.id.clone(),
            name: Some(self.name.to_string()),
            size: self.hardware.disk_gb,
            volume_type: Some(self.adapter.config.volume_type.clone()),
            image: Some(self.template.image.id.clone()),
            image_password: self.template.login_password().map(ToString::to_string),
            ssh_keys: self.template.options.public_key.iter().cloned().collect(),
            ..CreateVolume::default()
        };
        let queued = self.adapter.client.volumes(&datacenter.id).create(&payload).await?;
        self.adapter.settled(queued).await.map(ServerArtifact::Volume)
    }

    async fn create_server(&self, datacenter: &Datacenter) -> Result<ServerArtifact> {
        let payload = CreateServer {
            datacenter_id: datacenter.id.clone(),
            name: self.name.to_string(),
            cores: self.hardware.cores,
            ram: self.hardware.ram_mb,
            ..CreateServer::default()
        };
        let queued = self.adapter.client.servers(&datacenter.id).create(&payload).await?;
        self.adapter.settled(queued).await.map(ServerArtifact::Server)
    }

    async fn attach_volume(&self, datacenter: &Datacenter, server: &Server, volume: &Volume) -> Result<ServerArtifact> {
        let queued = self
            .adapter
            .client
            .servers(&datacenter.id)
            .attach_volume(&server.id, &volume.id)
            .await?;
        self.adapter.settled(queued).await.map(ServerArtifact::Volume)
    }

    async fn set_boot_volume(&self, datacenter: &Datacenter, server: &Server, volume: &Volume) -> Result<ServerArtifact> {
        let payload = UpdateServer {
            datacenter_id: datacenter.id.clone(),
            id: server.id.clone(),
            boot_volume: Some(volume.id.clone()),
            ..UpdateServer::default()
        };
        let queued = self.adapter.client.servers(&datacenter.id).update(&payload).await?;
        self.adapter.settled(queued).await.map(ServerArtifact::Server)
    }

    async fn create_nic(&self, datacenter: &Datacenter, server: &Server) -> Result<ServerArtifact> {
        let mut ports = self.template.options.inbound_ports.clone();
        ports.sort_unstable();
        ports.dedup();

        let payload = CreateNic {
            datacenter_id: datacenter.id.clone(),
            server_id: server.id.clone(),
            name: Some(format!("nic-{}", self.name)),
            dhcp: Some(true),
            lan: self.adapter.config.lan,
            firewall_active: (!ports.is_empty()).then_some(true),
            firewall_rules: ports.into_iter().map(FirewallRule::tcp).collect(),
            ..CreateNic::default()
        };
        let queued = self
            .adapter
            .client
            .nics(&datacenter.id, &server.id)
            .create(&payload)
            .await?;
        self.adapter.settled(queued).await.map(ServerArtifact::Nic)
    }
}

#[async_trait]
impl StepRunner<ServerStep> for ServerCreation<'_> {
    type Output = ServerArtifact;

    async fn run(
        &self,
        step: &PlannedStep<ServerStep>,
        outputs: &StepOutputs<ServerArtifact>,
    ) -> Result<ServerArtifact> {
        match step.kind {
            ServerStep::Datacenter => self.ensure_datacenter().await,
            ServerStep::Volume => self.create_volume(self.datacenter(step, outputs)?).await,
            ServerStep::Server => self.create_server(self.datacenter(step, outputs)?).await,
            ServerStep::AttachVolume => {
                let datacenter = self.datacenter(step, outputs)?;
                let server = self.server(step, outputs)?;
                let volume = self.volume(step, outputs)?;
                self.attach_volume(datacenter, server, volume).await
            }
            ServerStep::BootVolume => {
                let datacenter = self.datacenter(step, outputs)?;
                let server = self.server(step, outputs)?;
                let volume = self.volume(step, outputs)?;
                self.set_boot_volume(datacenter, server, volume).await
            }
            ServerStep::Nic => {
                let datacenter = self.datacenter(step, outputs)?;
                let server = self.server(step, outputs)?;
                self.create_nic(datacenter, server).await
            }
        }
    }
}

/// Deletes servers and volumes addressed as `<datacenter>/<id>`.
struct ServerReclaimer<'a> {
    client: &'a ProfitBricksClient,
    poller: Poller,
}

#[async_trait]
impl Reclaimer for ServerReclaimer<'_> {
    async fn reclaim(&self, resource: &ResourceRef) -> Result<bool> {
        let (datacenter, id) = resource
            .id
            .split_once('/')
            .ok_or_else(|| CloudportError::internal(format!("malformed resource id {}", resource.id)))?;

        let status = match resource.kind {
            ResourceKind::Server => self.client.servers(datacenter).delete(id).await?,
            ResourceKind::Volume => self.client.volumes(datacenter).delete(id).await?,
            other => {
                return Err(CloudportError::internal(format!(
                    "{other} is not a ProfitBricks resource"
                )));
            }
        };

        let Some(uri) = status else {
            return Ok(true);
        };
        match self.client.requests().wait(&uri, &self.poller).await {
            Ok(()) => Ok(true),
            Err(CloudportError::Provision(ProvisionError::Timeout { .. })) => Ok(false),
            Err(e) => Err(e),
        }
    }
}

fn server_ref(datacenter_id: &str, server: &Server) -> ResourceRef {
    ResourceRef::new(
        ResourceKind::Server,
        &server.properties.name,
        format!("{datacenter_id}/{}", server.id),
    )
}

fn volume_ref(datacenter_id: &str, volume: &Volume) -> ResourceRef {
    ResourceRef::new(
        ResourceKind::Volume,
        volume.properties.name.as_deref().unwrap_or(&volume.id),
        format!("{datacenter_id}/{}", volume.id),
    )
}

#[async_trait]
impl ComputeServiceAdapter for ProfitBricksComputeServiceAdapter {
    type Node = ServerNode;
    type Hardware = HardwareSpec;
    type Image = VolumeSource;
    type Location = Location;

    async fn prepare_template(&self, group: &str, mut template: Template) -> Result<Template> {
        if template.options.datacenter_id.is_none() {
            let datacenter = self.ensure_datacenter(group, &template.location_id).await?;
            template.options.datacenter_id = Some(datacenter.id);
        }
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
    ) -> Result<NodeAndInitialCredentials<ServerNode>> {
        let hardware: HardwareSpec = template.hardware_id.parse()?;
        let plan = self.plan(name, template)?;
        let creation = ServerCreation {
            adapter: self,
            group,
            name,
            template,
            hardware,
        };
        let mut result = PlanExecutor::new().execute(&plan, &creation).await;

        let mut datacenter = None;
        let mut server = None;
        let mut volume = None;
        for index in 0..plan.step_count() {
            match result.outputs.take(index) {
                Some(ServerArtifact::Datacenter(dc)) => datacenter = Some(dc),
                Some(ServerArtifact::Server(created)) => server = Some(created),
                Some(ServerArtifact::Volume(created)) if volume.is_none() => volume = Some(created),
                _ => {}
            }
        }

        if let Some(failure) = result.failure.take() {
            warn!(
                "Creating {name} failed at step {}, deleting what was created: {failure}",
                result.failed_step.unwrap_or(result.completed)
            );
            if let Some(dc) = &datacenter {
                let mut teardown = TeardownPlan::new(name);
                let server_step = server.as_ref().map(|s| teardown.push(server_ref(&dc.id, s), Vec::new()));
                if let Some(v) = &volume {
                    teardown.push(volume_ref(&dc.id, v), server_step.into_iter().collect());
                }
                if let Err(e) = self.teardown(teardown).await {
                    warn!("Rollback of {name} incomplete: {e}");
                }
            }
            return Err(failure);
        }

        let datacenter = datacenter.ok_or_else(|| CloudportError::internal(format!("no datacenter for {name}")))?;
        let server = server.ok_or_else(|| CloudportError::internal(format!("no server created for {name}")))?;
        let server = self
            .client
            .servers(&datacenter.id)
            .get(&server.id)
            .await?
            .unwrap_or(server);
        let node = Self::node(&datacenter, server);
        let node_id = NodeId {
            datacenter_id: node.datacenter_id.clone(),
            server_id: node.server.id.clone(),
        }
        .to_string();

        info!("Created server {name} as {node_id}");
        Ok(NodeAndInitialCredentials {
            node,
            node_id,
            credentials: Some(LoginCredentials {
                user: template.login_user().unwrap_or(DEFAULT_LOGIN_USER).to_string(),
                password: template.login_password().map(ToString::to_string),
                key: template.options.public_key.clone(),
            }),
        })
    }

    async fn list_hardware_profiles(&self) -> Result<Vec<HardwareSpec>> {
        Ok(HardwareSpec::grid())
    }

    async fn list_images(&self) -> Result<Vec<VolumeSource>> {
        let images = self
            .client
            .images()
            .list()
            .await?
            .into_iter()
            .filter(|i| i.properties.image_type.as_deref() != Some("CDROM"))
            .map(VolumeSource::Image);
        let snapshots = self.client.snapshots().list().await?.into_iter().map(VolumeSource::Snapshot);
        Ok(images.chain(snapshots).collect())
    }

    async fn get_image(&self, id: &str) -> Result<Option<VolumeSource>> {
        if let Some(image) = self.client.images().get(id).await? {
            return Ok(Some(VolumeSource::Image(image)));
        }
        Ok(self.client.snapshots().get(id).await?.map(VolumeSource::Snapshot))
    }

    async fn list_locations(&self) -> Result<Vec<Location>> {
        self.client.locations().list().await
    }

    async fn get_node(&self, id: &str) -> Result<Option<ServerNode>> {
        let node_id: NodeId = id.parse()?;
        let Some(datacenter) = self.client.datacenters().get(&node_id.datacenter_id).await? else {
            return Ok(None);
        };
        match self.client.servers(&datacenter.id).get(&node_id.server_id).await? {
            Some(server) => Ok(Some(Self::node(&datacenter, server))),
            None => Ok(None),
        }
    }

    async fn destroy_node(&self, id: &str) -> Result<()> {
        let node_id: NodeId = id.parse()?;
        let Some(server) = self
            .client
            .servers(&node_id.datacenter_id)
            .get(&node_id.server_id)
            .await?
        else {
            debug!("Server {id} is already gone");
            return Ok(());
        };

        info!("Destroying {id}");
        let mut plan = TeardownPlan::new(&server.properties.name);
        let server_step = plan.push(server_ref(&node_id.datacenter_id, &server), Vec::new());
        for volume in server.volumes() {
            plan.push(volume_ref(&node_id.datacenter_id, volume), vec![server_step]);
        }
        self.teardown(plan).await
    }

    async fn reboot_node(&self, id: &str) -> Result<()> {
        let node_id: NodeId = id.parse()?;
        let status = self
            .client
            .servers(&node_id.datacenter_id)
            .reboot(&node_id.server_id)
            .await?;
        self.settle(status.as_deref()).await
    }

    async fn resume_node(&self, id: &str) -> Result<()> {
        let node_id: NodeId = id.parse()?;
        let status = self
            .client
            .servers(&node_id.datacenter_id)
            .start(&node_id.server_id)
            .await?;
        self.settle(status.as_deref()).await
    }

    async fn suspend_node(&self, id: &str) -> Result<()> {
        let node_id: NodeId = id.parse()?;
        let status = self
            .client
            .servers(&node_id.datacenter_id)
            .stop(&node_id.server_id)
            .await?;
        self.settle(status.as_deref()).await
    }

    async fn list_nodes(&self) -> Result<Vec<ServerNode>> {
        let mut nodes = Vec::new();
        for datacenter in self.client.datacenters().list().await? {
            for server in self.client.servers(&datacenter.id).list().await? {
                nodes.push(Self::node(&datacenter, server));
            }
        }
        Ok(nodes)
    }

    async fn list_nodes_by_ids(&self, ids: &[String]) -> Result<Vec<ServerNode>> {
        let mut nodes = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(node) = self.get_node(id).await? {
                nodes.push(node);
            }
        }
        Ok(nodes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::TemplateOptions;
    use crate::profitbricks::client::tests::config_for;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const API: &str = "/cloudapi/v4";

    fn adapter(server: &MockServer) -> ProfitBricksComputeServiceAdapter {
        ProfitBricksComputeServiceAdapter::new(config_for(server)).expect("adapter")
    }

    fn template() -> Template {
        let image = VolumeSource::Image(Image {
            id: String::from("img-1"),
            metadata: crate::profitbricks::types::Metadata::default(),
            properties: crate::profitbricks::types::ImageProperties {
                name: String::from("Ubuntu-16.04"),
                location: String::from("de/fkb"),
                licence_type: Some(String::from("LINUX")),
                ..Default::default()
            },
        });
        Template::new("de/fkb", "cores=2,ram=2048,disk=20", image.into()).with_options(TemplateOptions {
            login_password: Some(String::from("Secret123")),
            public_key: Some(String::from("ssh-rsa AAAA")),
            ..TemplateOptions::default()
        })
    }

    /// A 202 carrying `body` whose status location reports DONE.
    async fn accepted(server: &MockServer, request: &str, body: serde_json::Value) -> ResponseTemplate {
        let status = format!("{API}/requests/{request}/status");
        Mock::given(method("GET"))
            .and(path(status.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": request, "metadata": {"status": "DONE"}
            })))
            .mount(server)
            .await;
        ResponseTemplate::new(202)
            .insert_header("Location", format!("{}{status}", server.uri()).as_str())
            .set_body_json(body)
    }

    async fn queued(server: &MockServer, verb: &str, at: &str, request: &str, body: serde_json::Value) {
        let response = accepted(server, request, body).await;
        Mock::given(method(verb))
            .and(path(format!("{API}{at}")))
            .respond_with(response)
            .expect(1)
            .mount(server)
            .await;
    }

    #[test]
    fn test_hardware_ids() {
        let spec: HardwareSpec = "cores=4,ram=8192,disk=50".parse().expect("spec");
        assert_eq!(
            spec,
            HardwareSpec {
                cores: 4,
                ram_mb: 8192,
                disk_gb: 50
            }
        );
        assert_eq!(spec.id(), "cores=4,ram=8192,disk=50");
        assert!("cores=4,ram=8192".parse::<HardwareSpec>().is_err());
        assert!("cores=0,ram=1024,disk=10".parse::<HardwareSpec>().is_err());
        assert!("Standard_A1".parse::<HardwareSpec>().is_err());

        let grid = HardwareSpec::grid();
        assert_eq!(grid.len(), 150);
        assert!(grid.contains(&spec));
    }

    #[test]
    fn test_node_ids() {
        let id: NodeId = "dc-1/srv-1".parse().expect("id");
        assert_eq!(id.datacenter_id, "dc-1");
        assert_eq!(id.server_id, "srv-1");
        assert_eq!(id.to_string(), "dc-1/srv-1");

        for bad in ["srv-1", "/srv-1", "dc-1/", "a/b/c"] {
            assert!(matches!(
                bad.parse::<NodeId>(),
                Err(CloudportError::Provision(ProvisionError::InvalidNodeId { .. }))
            ));
        }
    }

    #[test]
    fn test_disk_gigabytes_clamps() {
        assert_eq!(disk_gigabytes(20.0), 20);
        assert_eq!(disk_gigabytes(19.6), 20);
        assert_eq!(disk_gigabytes(-5.0), 0);
        assert_eq!(disk_gigabytes(f64::NAN), 0);
        assert_eq!(disk_gigabytes(1e12), u32::MAX);
    }

    #[test]
    fn test_node_metadata() {
        let server: Server = serde_json::from_value(serde_json::json!({
            "id": "srv-1",
            "metadata": {"state": "AVAILABLE"},
            "properties": {"name": "web-1a2b3c", "cores": 2, "ram": 2048, "vmState": "SHUTOFF", "bootVolume": {"id": "vol-1"}},
            "entities": {
                "volumes": {"items": [{"id": "vol-1", "properties": {"size": 20, "image": "img-1"}}]},
                "nics": {"items": [{"id": "nic-1", "properties": {"ips": ["46.16.73.50", "10.11.12.13"], "lan": 1}}]}
            }
        }))
        .expect("server");

        let node: NodeMetadata = ServerNode {
            datacenter_id: String::from("dc-1"),
            location: String::from("de/fkb"),
            server,
        }
        .into();

        assert_eq!(node.id, "dc-1/srv-1");
        assert_eq!(node.group.as_deref(), Some("web"));
        assert_eq!(node.status, NodeStatus::Suspended);
        assert_eq!(node.hardware_id.as_deref(), Some("cores=2,ram=2048,disk=20"));
        assert_eq!(node.image_id.as_deref(), Some("img-1"));
        assert_eq!(node.public_addresses, vec![String::from("46.16.73.50")]);
        assert_eq!(node.private_addresses, vec![String::from("10.11.12.13")]);
    }

    #[tokio::test]
    async fn test_creation_plan() {
        let server = MockServer::start().await;
        let steps = adapter(&server)
            .describe_creation("web-1a2b3c", &template())
            .expect("plan");

        let descriptions: Vec<&str> = steps.iter().map(|s| s.description.as_str()).collect();
        assert_eq!(
            descriptions,
            vec![
                "ensure datacenter web",
                "create volume web-1a2b3c",
                "create server web-1a2b3c",
                "attach volume web-1a2b3c",
                "set boot volume web-1a2b3c",
                "create NIC nic-web-1a2b3c",
            ]
        );
        assert_eq!(steps[3].dependencies, vec![0, 1, 2]);

        let mut bad = template();
        bad.hardware_id = String::from("Standard_A1");
        assert!(adapter(&server).describe_creation("web-1a2b3c", &bad).is_err());
    }

    #[tokio::test]
    async fn test_create_node() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{API}/datacenters")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": []})))
            .mount(&server)
            .await;
        queued(
            &server,
            "POST",
            "/datacenters",
            "dc",
            serde_json::json!({"id": "dc-1", "properties": {"name": "web", "location": "de/fkb"}}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(format!("{API}/datacenters/dc-1/volumes")))
            .and(body_partial_json(serde_json::json!({"properties": {
                "image": "img-1", "size": 20, "type": "HDD", "imagePassword": "Secret123", "sshKeys": ["ssh-rsa AAAA"]
            }})))
            .respond_with(
                accepted(
                    &server,
                    "vol",
                    serde_json::json!({"id": "vol-1", "properties": {"name": "web-1a2b3c", "size": 20, "image": "img-1"}}),
                )
                .await,
            )
            .expect(1)
            .mount(&server)
            .await;
        queued(
            &server,
            "POST",
            "/datacenters/dc-1/servers",
            "srv",
            serde_json::json!({"id": "srv-1", "properties": {"name": "web-1a2b3c", "cores": 2, "ram": 2048}}),
        )
        .await;
        queued(
            &server,
            "POST",
            "/datacenters/dc-1/servers/srv-1/volumes",
            "attach",
            serde_json::json!({"id": "vol-1", "properties": {"size": 20}}),
        )
        .await;
        queued(
            &server,
            "PATCH",
            "/datacenters/dc-1/servers/srv-1",
            "boot",
            serde_json::json!({"id": "srv-1", "properties": {"name": "web-1a2b3c", "bootVolume": {"id": "vol-1"}}}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(format!("{API}/datacenters/dc-1/servers/srv-1/nics")))
            .and(body_partial_json(serde_json::json!({
                "properties": {"name": "nic-web-1a2b3c", "dhcp": true, "lan": 1, "firewallActive": true},
                "entities": {"firewallrules": {"items": [
                    {"properties": {"protocol": "TCP", "portRangeStart": 22, "portRangeEnd": 22}},
                    {"properties": {"protocol": "TCP", "portRangeStart": 443, "portRangeEnd": 443}}
                ]}}
            })))
            .respond_with(
                accepted(
                    &server,
                    "nic",
                    serde_json::json!({"id": "nic-1", "properties": {"lan": 1, "dhcp": true}}),
                )
                .await,
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{API}/datacenters/dc-1/servers/srv-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "srv-1",
                "properties": {"name": "web-1a2b3c", "cores": 2, "ram": 2048, "vmState": "RUNNING", "bootVolume": {"id": "vol-1"}},
                "entities": {
                    "volumes": {"items": [{"id": "vol-1", "properties": {"size": 20, "image": "img-1"}}]},
                    "nics": {"items": [{"id": "nic-1", "properties": {"ips": ["46.16.73.50"], "lan": 1}}]}
                }
            })))
            .mount(&server)
            .await;

        let mut template = template();
        template.options.inbound_ports = vec![443, 22];
        let created = adapter(&server)
            .create_node_with_group_encoded_into_name("web", "web-1a2b3c", &template)
            .await
            .expect("created");

        assert_eq!(created.node_id, "dc-1/srv-1");
        let node: NodeMetadata = created.node.into();
        assert_eq!(node.status, NodeStatus::Running);
        assert_eq!(node.public_addresses, vec![String::from("46.16.73.50")]);
        let credentials = created.credentials.expect("credentials");
        assert_eq!(credentials.user, "root");
        assert_eq!(credentials.password.as_deref(), Some("Secret123"));
    }

    #[tokio::test]
    async fn test_failed_create_removes_volume() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{API}/datacenters/dc-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "dc-1", "properties": {"name": "web", "location": "de/fkb"}
            })))
            .mount(&server)
            .await;
        queued(
            &server,
            "POST",
            "/datacenters/dc-1/volumes",
            "vol",
            serde_json::json!({"id": "vol-1", "properties": {"name": "web-1a2b3c", "size": 20}}),
        )
        .await;
        Mock::given(method("POST"))
            .and(path(format!("{API}/datacenters/dc-1/servers")))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "messages": [{"errorCode": "200", "message": "Not enough cores"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{API}/datacenters/dc-1/volumes/vol-1")))
            .respond_with(ResponseTemplate::new(202))
            .expect(1)
            .mount(&server)
            .await;

        let mut template = template();
        template.options.datacenter_id = Some(String::from("dc-1"));
        let err = adapter(&server)
            .create_node_with_group_encoded_into_name("web", "web-1a2b3c", &template)
            .await
            .expect_err("server creation fails");
        assert!(err.to_string().contains("Not enough cores"));
    }

    #[tokio::test]
    async fn test_destroy_deletes_server_then_volumes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{API}/datacenters/dc-1/servers/srv-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "srv-1",
                "properties": {"name": "web-1a2b3c"},
                "entities": {"volumes": {"items": [
                    {"id": "vol-1", "properties": {"name": "web-1a2b3c", "size": 20}},
                    {"id": "vol-2", "properties": {"name": "data", "size": 50}}
                ]}}
            })))
            .mount(&server)
            .await;
        queued(&server, "DELETE", "/datacenters/dc-1/servers/srv-1", "del-srv", serde_json::json!({})).await;
        queued(&server, "DELETE", "/datacenters/dc-1/volumes/vol-1", "del-vol-1", serde_json::json!({})).await;
        queued(&server, "DELETE", "/datacenters/dc-1/volumes/vol-2", "del-vol-2", serde_json::json!({})).await;

        adapter(&server).destroy_node("dc-1/srv-1").await.expect("destroyed");
    }

    #[tokio::test]
    async fn test_volumes_remain_when_server_delete_fails() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{API}/datacenters/dc-1/servers/srv-1")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "srv-1",
                "properties": {"name": "web-1a2b3c"},
                "entities": {"volumes": {"items": [{"id": "vol-1", "properties": {"size": 20}}]}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{API}/datacenters/dc-1/servers/srv-1")))
            .respond_with(ResponseTemplate::new(409))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("{API}/datacenters/dc-1/volumes/vol-1")))
            .respond_with(ResponseTemplate::new(202))
            .expect(0)
            .mount(&server)
            .await;

        let err = adapter(&server)
            .destroy_node("dc-1/srv-1")
            .await
            .expect_err("server remains");
        assert!(err.to_string().contains("still there after deleting"));
    }

    #[tokio::test]
    async fn test_prepare_template_reuses_datacenter() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{API}/datacenters")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"items": [
                {"id": "dc-0", "properties": {"name": "web", "location": "us/las"}},
                {"id": "dc-1", "properties": {"name": "web", "location": "de/fkb"}}
            ]})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("{API}/datacenters")))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let prepared = adapter(&server)
            .prepare_template("web", template())
            .await
            .expect("prepared");
        assert_eq!(prepared.options.datacenter_id.as_deref(), Some("dc-1"));
    }

    #[tokio::test]
    async fn test_power_actions_wait_for_request() {
        let server = MockServer::start().await;
        queued(&server, "POST", "/datacenters/dc-1/servers/srv-1/stop", "stop", serde_json::json!({})).await;
        queued(&server, "POST", "/datacenters/dc-1/servers/srv-1/start", "start", serde_json::json!({})).await;
        queued(&server, "POST", "/datacenters/dc-1/servers/srv-1/reboot", "reboot", serde_json::json!({})).await;

        let adapter = adapter(&server);
        adapter.suspend_node("dc-1/srv-1").await.expect("stopped");
        adapter.resume_node("dc-1/srv-1").await.expect("started");
        adapter.reboot_node("dc-1/srv-1").await.expect("rebooted");
        assert!(adapter.reboot_node("srv-1").await.is_err());
    }
}
