// ============================================================================
// Linting
// ============================================================================

#![deny(unsafe_code)]                 // Unsafe code is forbidden
#![warn(missing_docs)]                // Public items should be documented
#![deny(non_camel_case_types)]        // Types must follow CamelCase convention
#![deny(unused_must_use)]             // Must handle Result and Option explicitly
#![deny(non_snake_case)]              // Variables and functions must be snake_case
#![deny(non_upper_case_globals)]      // Constants must be UPPER_CASE
#![deny(nonstandard_style)]           // Non-standard code style is forbidden

// Clippy lints (warnings only)
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::panic)]
#![warn(clippy::print_stdout)]
#![warn(clippy::todo)]
#![warn(clippy::unimplemented)]
#![warn(clippy::unwrap_in_result)]
#![warn(clippy::redundant_clone)]
#![warn(clippy::cognitive_complexity)]
#![allow(clippy::module_name_repetitions)]

// Safety and robustness lints
#![deny(overflowing_literals)]
#![deny(arithmetic_overflow)]

// ============================================================================
// Crate Documentation
// ============================================================================

//! # Cloudport
//!
//! Portable compute nodes on Azure Resource Manager and `ProfitBricks`.
//!
//! ## Overview
//!
//! A [`ComputeService`](compute::ComputeService) creates, lists, reboots,
//! suspends, resumes and destroys nodes in named groups. The provider work is
//! done by a [`ComputeServiceAdapter`](compute::ComputeServiceAdapter):
//!
//! - [`azure`]: a node is a virtual machine with a public IP, a NIC on the
//!   group's subnet and a VHD in the group's storage account. Images come
//!   from the marketplace or from custom VHDs in blob storage.
//! - [`profitbricks`]: a node is a server in the group's data center with a
//!   boot volume created from an image and a DHCP NIC.
//!
//! Creation is planned as dependent steps ([`planner::CreatePlan`]) and run in
//! order; a failed creation reclaims what it created. Destruction runs a
//! [`planner::TeardownPlan`] that never deletes a resource while something
//! that uses it still exists.
//!
//! ## Modules
//!
//! - [`config`]: configuration parsing, environment overrides and validation
//! - [`compute`]: provider independent metadata, templates and the service
//! - [`planner`]: creation plans and teardown plans
//! - [`azure`]: ARM client, resource APIs, blob storage and the adapter
//! - [`profitbricks`]: Cloud API client, request binders and the adapter
//! - [`cli`]: command-line interface
//!
//! ## Example
//!
//! ```yaml
//! default_provider: profitbricks
//!
//! profitbricks:
//!   username: me@example.com
//!   password: secret
//!   volume_type: SSD
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod azure;
pub mod cli;
pub mod compute;
pub mod config;
pub mod error;
pub mod planner;
pub mod profitbricks;

// ============================================================================
// Re-exports
// ============================================================================

pub use cli::{Cli, Commands, OutputFormatter};
pub use compute::{ComputeService, ComputeServiceAdapter, NodeMetadata, Template};
pub use config::{CloudportConfig, ConfigParser, ConfigValidator};
pub use error::{CloudportError, Result};
pub use planner::{CreatePlan, PlanExecutor, TeardownPlan};
