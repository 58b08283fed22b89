//! Provider independent compute abstraction.
//!
//! A provider implements [`ComputeServiceAdapter`]; [`ComputeService`] layers
//! group naming, template preparation and readiness waits on top of it.

mod adapter;
mod metadata;
mod poll;
mod service;
mod template;

pub use adapter::ComputeServiceAdapter;
pub use metadata::{HardwareMetadata, ImageMetadata, LocationMetadata, NodeMetadata, NodeStatus};
pub use poll::Poller;
pub use service::{ComputeService, CreatedNode};
pub use template::{LoginCredentials, NodeAndInitialCredentials, OsFamily, Template, TemplateOptions};
