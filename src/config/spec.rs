//! Configuration types and their defaults.
//!
//! This module defines the structs that map to the `cloudport.yaml` file.
//! Every provider section is optional; the CLI only requires the section of
//! the provider it is asked to drive.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;
use validator::Validate;

/// The root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default, Validate)]
pub struct CloudportConfig {
    /// Provider used when the CLI is not told otherwise.
    #[serde(default)]
    pub default_provider: Provider,
    /// Azure Resource Manager settings.
    #[serde(default)]
    #[validate(nested)]
    pub azure: Option<AzureConfig>,
    /// `ProfitBricks` settings.
    #[serde(default)]
    #[validate(nested)]
    pub profitbricks: Option<ProfitBricksConfig>,
}

/// Supported compute providers.
#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    /// Azure Resource Manager.
    #[default]
    Azure,
    /// `ProfitBricks` Cloud API.
    Profitbricks,
}

/// Azure Resource Manager configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct AzureConfig {
    /// Subscription every request is scoped to.
    #[validate(length(min = 1))]
    pub subscription_id: String,
    /// Resource group that holds every node and its resources.
    #[serde(default = "default_resource_group")]
    #[validate(length(min = 1, max = 90))]
    pub resource_group: String,
    /// ARM endpoint.
    #[serde(default = "default_arm_endpoint")]
    #[validate(url)]
    pub endpoint: String,
    /// Blob endpoint template; `{account}` is replaced by the storage account name.
    #[serde(default = "default_blob_endpoint")]
    pub blob_endpoint: String,
    /// Authentication settings.
    #[serde(default)]
    pub auth: AzureAuthConfig,
    /// Comma separated marketplace publishers whose images are listed.
    #[serde(default = "default_image_publishers")]
    pub image_publishers: String,
    /// Region ids to restrict locations to (empty means all).
    #[serde(default)]
    pub regions: Vec<String>,
    /// Login user used when neither the template nor the image provide one.
    #[serde(default = "default_login_user")]
    pub default_login_user: String,
    /// Login password used when neither the template nor the image provide one.
    #[serde(default = "default_login_password")]
    pub default_login_password: String,
    /// Default network created for the resource group.
    #[serde(default)]
    pub network: NetworkDefaults,
    /// Wait timeouts.
    #[serde(default)]
    #[validate(nested)]
    pub timeouts: TimeoutConfig,
    /// `api-version` query values per resource family.
    #[serde(default)]
    pub api_versions: ApiVersions,
    /// Tags applied to every resource the adapter creates.
    #[serde(default)]
    pub tags: HashMap<String, String>,
}

/// Azure authentication settings.
///
/// Either a pre-issued `access_token` or a service principal
/// (`tenant_id`, `client_id`, `client_secret`) must be present.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AzureAuthConfig {
    /// Azure AD tenant.
    #[serde(default)]
    pub tenant_id: Option<String>,
    /// Service principal application id.
    #[serde(default)]
    pub client_id: Option<String>,
    /// Service principal secret.
    #[serde(default)]
    pub client_secret: Option<String>,
    /// Pre-issued bearer token.
    #[serde(default)]
    pub access_token: Option<String>,
    /// OAuth2 authority.
    #[serde(default = "default_authority")]
    pub authority: String,
    /// Resource the token is requested for.
    #[serde(default = "default_token_resource")]
    pub resource: String,
}

/// Default virtual network settings for the resource group.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkDefaults {
    /// Virtual network name.
    pub virtual_network: String,
    /// Virtual network address space.
    pub address_space: String,
    /// Subnet name.
    pub subnet: String,
    /// Subnet address prefix.
    pub subnet_prefix: String,
}

/// Wait timeouts shared by both providers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct TimeoutConfig {
    /// Deadline for asynchronous operations such as deletes, in seconds.
    #[serde(default = "default_operation_secs")]
    #[validate(range(min = 1))]
    pub operation_secs: u64,
    /// Deadline for a public IP to become available, in seconds.
    #[serde(default = "default_public_ip_secs")]
    #[validate(range(min = 1))]
    pub public_ip_secs: u64,
    /// Deadline for a node to report running, in seconds.
    #[serde(default = "default_node_running_secs")]
    #[validate(range(min = 1))]
    pub node_running_secs: u64,
    /// Delay between polls, in milliseconds.
    #[serde(default = "default_poll_interval_ms")]
    #[validate(range(min = 1))]
    pub poll_interval_ms: u64,
}

/// ARM `api-version` values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ApiVersions {
    /// Virtual machines, sizes and images.
    pub compute: String,
    /// Virtual machine scale sets.
    pub scale_sets: String,
    /// Public IPs, NICs, virtual networks.
    pub network: String,
    /// Storage accounts.
    pub storage: String,
    /// Resource groups, locations and providers.
    pub resources: String,
}

/// `ProfitBricks` configuration.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
pub struct ProfitBricksConfig {
    /// Cloud API endpoint.
    #[serde(default = "default_profitbricks_endpoint")]
    #[validate(url)]
    pub endpoint: String,
    /// Account user name.
    #[serde(default)]
    pub username: String,
    /// Account password.
    #[serde(default)]
    pub password: String,
    /// LAN id new NICs are connected to.
    #[serde(default = "default_lan")]
    pub lan: u32,
    /// Volume type for boot volumes (HDD or SSD).
    #[serde(default = "default_volume_type")]
    pub volume_type: String,
    /// Wait timeouts.
    #[serde(default)]
    #[validate(nested)]
    pub timeouts: TimeoutConfig,
}

// Default value functions

fn default_resource_group() -> String {
    String::from("cloudport")
}

fn default_arm_endpoint() -> String {
    String::from("https://management.azure.com")
}

fn default_blob_endpoint() -> String {
    String::from("https://{account}.blob.core.windows.net")
}

fn default_image_publishers() -> String {
    String::from("Canonical,RedHat")
}

fn default_login_user() -> String {
    String::from("cloudport")
}

fn default_login_password() -> String {
    String::from("Password12345!")
}

fn default_authority() -> String {
    String::from("https://login.microsoftonline.com")
}

fn default_token_resource() -> String {
    String::from("https://management.azure.com/")
}

fn default_profitbricks_endpoint() -> String {
    String::from("https://api.profitbricks.com/cloudapi/v4")
}

fn default_volume_type() -> String {
    String::from("HDD")
}

const fn default_lan() -> u32 {
    1
}

const fn default_operation_secs() -> u64 {
    600
}

const fn default_public_ip_secs() -> u64 {
    300
}

const fn default_node_running_secs() -> u64 {
    900
}

const fn default_poll_interval_ms() -> u64 {
    5000
}

impl Default for AzureAuthConfig {
    fn default() -> Self {
        Self {
            tenant_id: None,
            client_id: None,
            client_secret: None,
            access_token: None,
            authority: default_authority(),
            resource: default_token_resource(),
        }
    }
}

impl Default for NetworkDefaults {
    fn default() -> Self {
        Self {
            virtual_network: String::from("cloudport-virtualnetwork"),
            address_space: String::from("10.0.0.0/16"),
            subnet: String::from("cloudport-subnet"),
            subnet_prefix: String::from("10.0.0.0/24"),
        }
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            operation_secs: default_operation_secs(),
            public_ip_secs: default_public_ip_secs(),
            node_running_secs: default_node_running_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

impl Default for ApiVersions {
    fn default() -> Self {
        Self {
            compute: String::from("2016-04-30-preview"),
            scale_sets: String::from("2016-04-30-preview"),
            network: String::from("2015-06-15"),
            storage: String::from("2015-06-15"),
            resources: String::from("2015-01-01"),
        }
    }
}

impl TimeoutConfig {
    /// Deadline for asynchronous operations.
    #[must_use]
    pub const fn operation(&self) -> Duration {
        Duration::from_secs(self.operation_secs)
    }

    /// Deadline for public IP availability.
    #[must_use]
    pub const fn public_ip(&self) -> Duration {
        Duration::from_secs(self.public_ip_secs)
    }

    /// Deadline for a node to report running.
    #[must_use]
    pub const fn node_running(&self) -> Duration {
        Duration::from_secs(self.node_running_secs)
    }

    /// Delay between polls.
    #[must_use]
    pub const fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl AzureConfig {
    /// Creates a configuration with defaults for everything but the subscription.
    #[must_use]
    pub fn new(subscription_id: impl Into<String>) -> Self {
        Self {
            subscription_id: subscription_id.into(),
            resource_group: default_resource_group(),
            endpoint: default_arm_endpoint(),
            blob_endpoint: default_blob_endpoint(),
            auth: AzureAuthConfig::default(),
            image_publishers: default_image_publishers(),
            regions: Vec::new(),
            default_login_user: default_login_user(),
            default_login_password: default_login_password(),
            network: NetworkDefaults::default(),
            timeouts: TimeoutConfig::default(),
            api_versions: ApiVersions::default(),
            tags: HashMap::new(),
        }
    }

    /// Returns the configured image publishers, trimmed, without empties.
    #[must_use]
    pub fn publishers(&self) -> Vec<&str> {
        self.image_publishers
            .split(',')
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .collect()
    }

    /// Returns the blob endpoint for a storage account.
    #[must_use]
    pub fn blob_endpoint_for(&self, account: &str) -> String {
        self.blob_endpoint.replace("{account}", account)
    }
}

impl ProfitBricksConfig {
    /// Creates a configuration with the given credentials and defaults otherwise.
    #[must_use]
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            endpoint: default_profitbricks_endpoint(),
            username: username.into(),
            password: password.into(),
            lan: default_lan(),
            volume_type: default_volume_type(),
            timeouts: TimeoutConfig::default(),
        }
    }
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Azure => "azure",
            Self::Profitbricks => "profitbricks",
        };
        write!(f, "{name}")
    }
}
