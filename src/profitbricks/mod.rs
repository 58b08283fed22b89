//! `ProfitBricks` Cloud API v4 provider.
//!
//! [`ProfitBricksClient`] speaks the REST API with basic auth; changes are
//! bound from typed payloads by the [`binder`] module and come back as
//! queued requests that are polled until done.
//! [`ProfitBricksComputeServiceAdapter`] maps the compute abstraction onto
//! data centers, servers, volumes and NICs.

pub mod adapter;
pub mod api;
pub mod binder;
pub mod client;
pub mod types;

pub use adapter::{HardwareSpec, NodeId, ProfitBricksComputeServiceAdapter, ServerNode, ServerStep, VolumeSource};
pub use binder::{BoundRequest, RequestBinder};
pub use client::{ProfitBricksClient, Queued};
