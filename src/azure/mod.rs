//! Azure Resource Manager provider.
//!
//! [`ArmClient`] speaks the ARM REST API; the per-resource APIs hang off it
//! (`client.virtual_machines(group)`, `client.public_ips(group)`, ...).
//! [`AzureComputeServiceAdapter`] maps the compute abstraction onto them.

pub mod adapter;
pub mod api;
pub mod auth;
pub mod blob;
pub mod cleanup;
pub mod client;
pub mod image;
pub mod predicates;
pub mod resources;
pub mod types;

pub use adapter::{AzureComputeServiceAdapter, AzureNode, AzureStep, VmHardware, GROUP_TAG};
pub use cleanup::CleanupResources;
pub use client::{ArmClient, DeleteOutcome, JobStatus};
pub use image::ImageRef;
pub use resources::{GroupResources, ResourcePreparer};

/// Name of the public IP created for node `name`.
#[must_use]
pub fn public_ip_name(name: &str) -> String {
    format!("public-address-{name}")
}

/// Name of the NIC created for node `name`.
#[must_use]
pub fn nic_name(name: &str) -> String {
    format!("nic-{name}")
}

/// Name of the security group created for node `name`.
#[must_use]
pub fn security_group_name(name: &str) -> String {
    format!("nsg-{name}")
}

/// Name of the IP configuration of the NIC created for node `name`.
#[must_use]
pub fn ip_config_name(name: &str) -> String {
    format!("ipConfig-{name}")
}
