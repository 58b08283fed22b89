//! Configuration module for cloudport.
//!
//! This module handles all configuration-related functionality:
//! - Parsing and deserializing `cloudport.yaml`
//! - Environment overrides and `.env` loading
//! - Validation of configuration values
//! - Deterministic resource naming

mod naming;
mod parser;
mod spec;
mod validator;

pub use naming::{group_from_name, node_name, storage_account_name};
pub use parser::{ConfigParser, DEFAULT_CONFIG_FILES, find_config_file};
pub use spec::{
    ApiVersions, AzureAuthConfig, AzureConfig, CloudportConfig, NetworkDefaults,
    ProfitBricksConfig, Provider, TimeoutConfig,
};
pub use validator::{ConfigValidator, ValidationError, ValidationResult, is_valid_group_name};
