//! Provider independent views of nodes, hardware, images and locations.

use serde::{Deserialize, Serialize};

use super::template::{LoginCredentials, OsFamily};

/// Lifecycle status of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeStatus {
    /// Being created or started.
    Pending,
    /// Running.
    Running,
    /// Stopped or deallocated, can be resumed.
    Suspended,
    /// Being deleted or gone.
    Terminated,
    /// Provisioning failed.
    Error,
    /// Status could not be mapped.
    Unrecognized,
}

/// A node as seen by the compute service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeMetadata {
    /// Provider id.
    pub id: String,
    /// Node name.
    pub name: String,
    /// Group the node belongs to, if known.
    pub group: Option<String>,
    /// Lifecycle status.
    pub status: NodeStatus,
    /// Location id.
    pub location: Option<String>,
    /// Hardware profile id.
    pub hardware_id: Option<String>,
    /// Image id.
    pub image_id: Option<String>,
    /// Public IP addresses.
    pub public_addresses: Vec<String>,
    /// Private IP addresses.
    pub private_addresses: Vec<String>,
}

/// A hardware profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareMetadata {
    /// Provider id.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Virtual CPU cores.
    pub cores: u32,
    /// Memory in MB.
    pub ram_mb: u64,
    /// Boot disk size in GB.
    pub disk_gb: u64,
    /// Location the profile is offered in, if it is location specific.
    pub location: Option<String>,
}

/// A bootable image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Opaque id understood by the provider's `get_image`.
    pub id: String,
    /// Provider specific identifier (Azure: publisher or VHD URI).
    pub provider_id: String,
    /// Image name (Azure: offer).
    pub name: String,
    /// Image version (Azure: SKU).
    pub version: String,
    /// Location the image is available in.
    pub location: Option<String>,
    /// Operating system family.
    pub os_family: OsFamily,
    /// Free form description.
    pub description: Option<String>,
    /// Credentials the image ships with.
    pub default_credentials: Option<LoginCredentials>,
}

/// A location nodes can be created in.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LocationMetadata {
    /// Provider id.
    pub id: String,
    /// Human readable description.
    pub description: String,
}

impl NodeStatus {
    /// Returns true once no further transition is expected without user action.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Running | Self::Suspended | Self::Terminated | Self::Error)
    }
}

impl std::fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Pending => "PENDING",
            Self::Running => "RUNNING",
            Self::Suspended => "SUSPENDED",
            Self::Terminated => "TERMINATED",
            Self::Error => "ERROR",
            Self::Unrecognized => "UNRECOGNIZED",
        };
        write!(f, "{s}")
    }
}
