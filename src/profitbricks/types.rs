//! `ProfitBricks` Cloud API v4 JSON models.
//!
//! Every resource has the same envelope: `id`, `type`, `href`, a `metadata`
//! block, a `properties` block and, for servers, `entities` holding the
//! attached volumes and NICs when requested with enough `depth`.

use serde::{Deserialize, Serialize};

/// Metadata common to every resource.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Metadata {
    /// Creation time.
    #[serde(default)]
    pub created_date: Option<String>,
    /// Last modification time.
    #[serde(default)]
    pub last_modified_date: Option<String>,
    /// Entity tag.
    #[serde(default)]
    pub etag: Option<String>,
    /// `AVAILABLE`, `BUSY`, `INACTIVE` or `DEPLOYING`.
    #[serde(default)]
    pub state: Option<String>,
}

/// A list of resources.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection<T> {
    /// Members. Only ids and hrefs unless fetched with `depth`.
    #[serde(default = "Vec::new")]
    pub items: Vec<T>,
}

/// Reference to another resource by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceId {
    /// Resource id.
    pub id: String,
}

/// A virtual data center.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Datacenter {
    /// Id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Properties.
    #[serde(default)]
    pub properties: DatacenterProperties,
}

/// Properties of a data center.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DatacenterProperties {
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Location id, e.g. `de/fkb`.
    #[serde(default)]
    pub location: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Version, bumped on every change.
    #[serde(default)]
    pub version: Option<u32>,
}

/// A server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Server {
    /// Id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Properties.
    #[serde(default)]
    pub properties: ServerProperties,
    /// Attached volumes and NICs.
    #[serde(default)]
    pub entities: Option<ServerEntities>,
}

/// Properties of a server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServerProperties {
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Cores.
    #[serde(default)]
    pub cores: u32,
    /// Memory in MB.
    #[serde(default)]
    pub ram: u64,
    /// `AUTO`, `ZONE_1` or `ZONE_2`.
    #[serde(default)]
    pub availability_zone: Option<String>,
    /// `RUNNING`, `SHUTOFF`, `CRASHED`, ...
    #[serde(default)]
    pub vm_state: Option<String>,
    /// Volume the server boots from.
    #[serde(default)]
    pub boot_volume: Option<ResourceId>,
    /// CD-ROM the server boots from.
    #[serde(default)]
    pub boot_cdrom: Option<ResourceId>,
    /// `AMD_OPTERON` or `INTEL_XEON`.
    #[serde(default)]
    pub cpu_family: Option<String>,
}

/// Resources attached to a server.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerEntities {
    /// Attached volumes.
    #[serde(default)]
    pub volumes: Option<Collection<Volume>>,
    /// NICs.
    #[serde(default)]
    pub nics: Option<Collection<Nic>>,
}

/// A block storage volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Volume {
    /// Id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Properties.
    #[serde(default)]
    pub properties: VolumeProperties,
}

/// Properties of a volume.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeProperties {
    /// Name.
    #[serde(default)]
    pub name: Option<String>,
    /// `HDD` or `SSD`.
    #[serde(default, rename = "type")]
    pub volume_type: Option<String>,
    /// Size in GB.
    #[serde(default)]
    pub size: f64,
    /// Image the volume was created from.
    #[serde(default)]
    pub image: Option<String>,
    /// `VIRTIO` or `IDE`.
    #[serde(default)]
    pub bus: Option<String>,
    /// `LINUX`, `WINDOWS`, `OTHER` or `UNKNOWN`.
    #[serde(default)]
    pub licence_type: Option<String>,
    /// Device number once attached.
    #[serde(default)]
    pub device_number: Option<u32>,
}

/// A network interface of a server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nic {
    /// Id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Properties.
    #[serde(default)]
    pub properties: NicProperties,
}

/// Properties of a NIC.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NicProperties {
    /// Name.
    #[serde(default)]
    pub name: Option<String>,
    /// MAC address.
    #[serde(default)]
    pub mac: Option<String>,
    /// Assigned IPs.
    #[serde(default)]
    pub ips: Vec<String>,
    /// Whether addresses are assigned by DHCP.
    #[serde(default)]
    pub dhcp: Option<bool>,
    /// LAN id.
    #[serde(default)]
    pub lan: Option<u32>,
    /// Whether the firewall is active.
    #[serde(default)]
    pub firewall_active: Option<bool>,
}

/// A snapshot of a volume.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Properties.
    #[serde(default)]
    pub properties: SnapshotProperties,
}

/// Properties of a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotProperties {
    /// Name.
    #[serde(default)]
    pub name: Option<String>,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Location id.
    #[serde(default)]
    pub location: Option<String>,
    /// Size in GB.
    #[serde(default)]
    pub size: Option<f64>,
    /// Licence type.
    #[serde(default)]
    pub licence_type: Option<String>,
}

/// A public or private image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    /// Id.
    pub id: String,
    /// Metadata.
    #[serde(default)]
    pub metadata: Metadata,
    /// Properties.
    #[serde(default)]
    pub properties: ImageProperties,
}

/// Properties of an image.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageProperties {
    /// Name.
    #[serde(default)]
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: Option<String>,
    /// Location id.
    #[serde(default)]
    pub location: String,
    /// Size in GB.
    #[serde(default)]
    pub size: Option<f64>,
    /// Licence type.
    #[serde(default)]
    pub licence_type: Option<String>,
    /// `HDD` or `CDROM`.
    #[serde(default)]
    pub image_type: Option<String>,
    /// Whether the image is public.
    #[serde(default)]
    pub public: bool,
}

/// A location servers can be placed in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Location {
    /// Id, e.g. `de/fkb`.
    pub id: String,
    /// Properties.
    #[serde(default)]
    pub properties: LocationProperties,
}

/// Properties of a location.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationProperties {
    /// Human readable name.
    #[serde(default)]
    pub name: String,
}

/// Status of a queued request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatus {
    /// Request id.
    #[serde(default)]
    pub id: String,
    /// Status details.
    pub metadata: RequestStatusMetadata,
}

/// Status details of a queued request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestStatusMetadata {
    /// Status.
    pub status: RequestState,
    /// Message, set on failure.
    #[serde(default)]
    pub message: Option<String>,
}

/// States of a queued request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum RequestState {
    /// Waiting to be processed.
    Queued,
    /// Being processed.
    Running,
    /// Finished.
    Done,
    /// Finished unsuccessfully.
    Failed,
}

impl Server {
    /// Volumes attached to the server, when fetched with enough depth.
    #[must_use]
    pub fn volumes(&self) -> &[Volume] {
        self.entities
            .as_ref()
            .and_then(|e| e.volumes.as_ref())
            .map_or(&[], |c| c.items.as_slice())
    }

    /// NICs of the server, when fetched with enough depth.
    #[must_use]
    pub fn nics(&self) -> &[Nic] {
        self.entities
            .as_ref()
            .and_then(|e| e.nics.as_ref())
            .map_or(&[], |c| c.items.as_slice())
    }

    /// The volume the server boots from, if it is attached.
    #[must_use]
    pub fn boot_volume(&self) -> Option<&Volume> {
        let boot = self.properties.boot_volume.as_ref()?;
        self.volumes().iter().find(|v| v.id == boot.id)
    }
}

impl Metadata {
    /// Returns true while the resource is being changed.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        matches!(self.state.as_deref(), Some("BUSY" | "DEPLOYING"))
    }
}
