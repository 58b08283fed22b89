//! Templates describe what to create: where, on which hardware, from which
//! image, and with which options.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::metadata::ImageMetadata;

/// Everything needed to create one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Template {
    /// Provider location id.
    pub location_id: String,
    /// Provider hardware profile id.
    pub hardware_id: String,
    /// Image to boot from.
    pub image: ImageMetadata,
    /// Provider independent and provider specific options.
    pub options: TemplateOptions,
}

/// Options attached to a template.
///
/// `subnet_id`, `blob` and `datacenter_id` are usually left empty by the caller
/// and filled in by the provider when the template is prepared for a group.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateOptions {
    /// Login user to create on the node.
    pub login_user: Option<String>,
    /// Password for the login user.
    pub login_password: Option<String>,
    /// SSH public key authorised for the login user.
    pub public_key: Option<String>,
    /// Azure subnet id the node's NIC is attached to.
    pub subnet_id: Option<String>,
    /// Azure blob endpoint that holds the node's disks.
    pub blob: Option<String>,
    /// `ProfitBricks` datacenter the node is created in.
    pub datacenter_id: Option<String>,
    /// Inbound TCP ports to open on the node.
    pub inbound_ports: Vec<u16>,
    /// Tags applied to created resources.
    pub tags: HashMap<String, String>,
}

/// Operating system family, as far as it can be told from image names.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OsFamily {
    /// Ubuntu.
    Ubuntu,
    /// Debian.
    Debian,
    /// `CentOS`.
    CentOs,
    /// Red Hat Enterprise Linux.
    Rhel,
    /// `SUSE`.
    Suse,
    /// `CoreOS`.
    CoreOs,
    /// Windows.
    Windows,
    /// Some other Linux.
    Linux,
    /// Unknown.
    #[default]
    Unrecognized,
}

/// Credentials to log into a node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoginCredentials {
    /// User name.
    pub user: String,
    /// Password, when password authentication is enabled.
    pub password: Option<String>,
    /// Private key or public key material, when key authentication is used.
    pub key: Option<String>,
}

/// A freshly created node together with the credentials it was created with.
#[derive(Debug, Clone)]
pub struct NodeAndInitialCredentials<N> {
    /// The provider's node.
    pub node: N,
    /// Provider id of the node.
    pub node_id: String,
    /// Credentials set at creation time, if the provider knows them.
    pub credentials: Option<LoginCredentials>,
}

impl OsFamily {
    /// Guesses the family from an image name, offer or description.
    #[must_use]
    pub fn infer(text: &str) -> Self {
        let text = text.to_lowercase();
        let matches = |needles: &[&str]| needles.iter().any(|n| text.contains(n));

        if matches(&["windows"]) {
            Self::Windows
        } else if matches(&["ubuntu"]) {
            Self::Ubuntu
        } else if matches(&["debian"]) {
            Self::Debian
        } else if matches(&["centos"]) {
            Self::CentOs
        } else if matches(&["rhel", "redhat", "red hat"]) {
            Self::Rhel
        } else if matches(&["suse", "sles"]) {
            Self::Suse
        } else if matches(&["coreos"]) {
            Self::CoreOs
        } else if matches(&["linux"]) {
            Self::Linux
        } else {
            Self::Unrecognized
        }
    }

    /// Returns true for Windows images.
    #[must_use]
    pub const fn is_windows(self) -> bool {
        matches!(self, Self::Windows)
    }
}

impl std::fmt::Display for OsFamily {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Ubuntu => "ubuntu",
            Self::Debian => "debian",
            Self::CentOs => "centos",
            Self::Rhel => "rhel",
            Self::Suse => "suse",
            Self::CoreOs => "coreos",
            Self::Windows => "windows",
            Self::Linux => "linux",
            Self::Unrecognized => "unrecognized",
        };
        write!(f, "{s}")
    }
}

impl Template {
    /// Creates a template with default options.
    #[must_use]
    pub fn new(
        location_id: impl Into<String>,
        hardware_id: impl Into<String>,
        image: ImageMetadata,
    ) -> Self {
        Self {
            location_id: location_id.into(),
            hardware_id: hardware_id.into(),
            image,
            options: TemplateOptions::default(),
        }
    }

    /// Replaces the template options.
    #[must_use]
    pub fn with_options(mut self, options: TemplateOptions) -> Self {
        self.options = options;
        self
    }

    /// Login user: the option when set, otherwise the image default.
    #[must_use]
    pub fn login_user(&self) -> Option<&str> {
        self.options
            .login_user
            .as_deref()
            .or_else(|| self.image.default_credentials.as_ref().map(|c| c.user.as_str()))
    }

    /// Login password: the option when set, otherwise the image default.
    #[must_use]
    pub fn login_password(&self) -> Option<&str> {
        self.options.login_password.as_deref().or_else(|| {
            self.image
                .default_credentials
                .as_ref()
                .and_then(|c| c.password.as_deref())
        })
    }
}
