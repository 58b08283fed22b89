//! Configuration parser for loading configuration files.
//!
//! This module handles loading configuration from YAML files, `.env` files
//! and environment variables, with environment values taking precedence.

use crate::error::{CloudportError, ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use super::spec::{AzureConfig, CloudportConfig, ProfitBricksConfig};

/// Configuration parser.
#[derive(Debug, Default)]
pub struct ConfigParser {
    /// Base path for resolving the `.env` file.
    base_path: Option<PathBuf>,
}

impl ConfigParser {
    /// Creates a new configuration parser.
    #[must_use]
    pub const fn new() -> Self {
        Self { base_path: None }
    }

    /// Sets the base path for resolving relative paths.
    #[must_use]
    pub fn with_base_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.base_path = Some(path.into());
        self
    }

    /// Loads configuration from a YAML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load_file(&self, path: impl AsRef<Path>) -> Result<CloudportConfig> {
        let path = path.as_ref();
        info!("Loading configuration from: {}", path.display());

        if !path.exists() {
            return Err(CloudportError::Config(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            }));
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            CloudportError::Config(ConfigError::ParseError {
                message: format!("Failed to read file: {e}"),
                location: Some(path.display().to_string()),
            })
        })?;

        self.parse_yaml(&content, Some(path))
    }

    /// Parses configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is invalid.
    pub fn parse_yaml(&self, content: &str, source: Option<&Path>) -> Result<CloudportConfig> {
        debug!("Parsing YAML configuration");

        let config: CloudportConfig = serde_yaml::from_str(content).map_err(|e| {
            let location = source.map(|p| p.display().to_string());
            CloudportError::Config(ConfigError::ParseError {
                message: format!("YAML parse error: {e}"),
                location,
            })
        })?;

        debug!(
            "Parsed configuration (azure: {}, profitbricks: {})",
            config.azure.is_some(),
            config.profitbricks.is_some()
        );
        Ok(config)
    }

    /// Loads configuration with environment variable overrides.
    ///
    /// A missing file is not an error here: the configuration is then built
    /// from the environment alone.
    ///
    /// # Errors
    ///
    /// Returns an error if an existing file cannot be read or parsed.
    pub fn load_with_env(&self, path: Option<&Path>) -> Result<CloudportConfig> {
        let mut config = match path {
            Some(p) => self.load_file(p)?,
            None => CloudportConfig::default(),
        };

        Self::apply_env_overrides(&mut config, |name| std::env::var(name).ok());

        Ok(config)
    }

    /// Applies environment overrides using the given variable lookup.
    ///
    /// Recognised variables: `AZURE_SUBSCRIPTION_ID`, `AZURE_RESOURCE_GROUP`,
    /// `AZURE_TENANT_ID`, `AZURE_CLIENT_ID`, `AZURE_CLIENT_SECRET`,
    /// `AZURE_ACCESS_TOKEN`, `AZURE_ENDPOINT`, `PROFITBRICKS_USERNAME`,
    /// `PROFITBRICKS_PASSWORD` and `PROFITBRICKS_ENDPOINT`.
    pub fn apply_env_overrides<F>(config: &mut CloudportConfig, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if config.azure.is_none() {
            if let Some(subscription) = lookup("AZURE_SUBSCRIPTION_ID") {
                debug!("Creating azure section from environment");
                config.azure = Some(AzureConfig::new(subscription));
            }
        }

        if let Some(azure) = config.azure.as_mut() {
            if let Some(subscription) = lookup("AZURE_SUBSCRIPTION_ID") {
                azure.subscription_id = subscription;
            }
            if let Some(group) = lookup("AZURE_RESOURCE_GROUP") {
                debug!("Overriding azure.resource_group from environment");
                azure.resource_group = group;
            }
            if let Some(endpoint) = lookup("AZURE_ENDPOINT") {
                azure.endpoint = endpoint;
            }
            if let Some(tenant) = lookup("AZURE_TENANT_ID") {
                azure.auth.tenant_id = Some(tenant);
            }
            if let Some(client) = lookup("AZURE_CLIENT_ID") {
                azure.auth.client_id = Some(client);
            }
            if let Some(secret) = lookup("AZURE_CLIENT_SECRET") {
                azure.auth.client_secret = Some(secret);
            }
            if let Some(token) = lookup("AZURE_ACCESS_TOKEN") {
                azure.auth.access_token = Some(token);
            }
        }

        if config.profitbricks.is_none() {
            if let (Some(user), Some(password)) =
                (lookup("PROFITBRICKS_USERNAME"), lookup("PROFITBRICKS_PASSWORD"))
            {
                debug!("Creating profitbricks section from environment");
                config.profitbricks = Some(ProfitBricksConfig::new(user, password));
            }
        }

        if let Some(pb) = config.profitbricks.as_mut() {
            if let Some(user) = lookup("PROFITBRICKS_USERNAME") {
                pb.username = user;
            }
            if let Some(password) = lookup("PROFITBRICKS_PASSWORD") {
                pb.password = password;
            }
            if let Some(endpoint) = lookup("PROFITBRICKS_ENDPOINT") {
                pb.endpoint = endpoint;
            }
        }
    }

    /// Loads the .env file if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the .env file exists but cannot be loaded.
    pub fn load_dotenv(&self) -> Result<()> {
        let env_path = self
            .base_path
            .as_ref()
            .map_or_else(|| PathBuf::from(".env"), |p| p.join(".env"));

        if env_path.exists() {
            info!("Loading environment from: {}", env_path.display());
            dotenvy::from_path(&env_path).map_err(|e| {
                CloudportError::Config(ConfigError::ParseError {
                    message: format!("Failed to load .env file: {e}"),
                    location: Some(env_path.display().to_string()),
                })
            })?;
        } else {
            debug!(".env file not found at: {}", env_path.display());
        }

        Ok(())
    }
}

/// Default configuration file names to search for.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["cloudport.yaml", "cloudport.yml"];

/// Finds the configuration file in the given directory, its parents, or the
/// user configuration directory (`<config_dir>/cloudport/config.yaml`).
///
/// Returns `None` when no file exists anywhere.
#[must_use]
pub fn find_config_file(start_dir: impl AsRef<Path>) -> Option<PathBuf> {
    let mut current = start_dir.as_ref().to_path_buf();

    loop {
        for filename in DEFAULT_CONFIG_FILES {
            let config_path = current.join(filename);
            if config_path.exists() {
                info!("Found configuration file: {}", config_path.display());
                return Some(config_path);
            }
        }

        if !current.pop() {
            break;
        }
    }

    let user_config = dirs::config_dir()?.join("cloudport").join("config.yaml");
    if user_config.exists() {
        info!("Using user configuration: {}", user_config.display());
        return Some(user_config);
    }

    debug!("No configuration file found");
    None
}
