//! Configuration validation.
//!
//! Field-level constraints (lengths, URLs, ranges) are declared on the configuration
//! types with `validator`; this module runs them and adds the cross-field
//! checks that cannot be expressed as attributes.

use crate::error::{CloudportError, ConfigError, Result};
use tracing::debug;
use validator::Validate;

use super::spec::{AzureConfig, CloudportConfig, ProfitBricksConfig, Provider};

/// Validator for cloudport configurations.
#[derive(Debug, Default)]
pub struct ConfigValidator;

/// Validation result containing all errors found.
#[derive(Debug, Default)]
pub struct ValidationResult {
    /// List of validation errors.
    pub errors: Vec<ValidationError>,
    /// List of warnings (non-fatal issues).
    pub warnings: Vec<String>,
}

/// A single validation error.
#[derive(Debug)]
pub struct ValidationError {
    /// The field path that failed validation.
    pub field: String,
    /// The error message.
    pub message: String,
}

impl ConfigValidator {
    /// Creates a new validator.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Validates a configuration.
    ///
    /// # Errors
    ///
    /// Returns the first validation error if any check fails.
    pub fn validate(&self, config: &CloudportConfig) -> Result<ValidationResult> {
        let mut result = ValidationResult::default();

        if let Err(errors) = config.validate() {
            for line in errors.to_string().lines().filter(|l| !l.trim().is_empty()) {
                let (field, message) = line.split_once(": ").unwrap_or(("config", line));
                result.errors.push(ValidationError {
                    field: field.trim().to_string(),
                    message: message.trim().to_string(),
                });
            }
        }

        match config.default_provider {
            Provider::Azure if config.azure.is_none() => result.warnings.push(String::from(
                "default_provider is azure but no azure section is configured",
            )),
            Provider::Profitbricks if config.profitbricks.is_none() => {
                result.warnings.push(String::from(
                    "default_provider is profitbricks but no profitbricks section is configured",
                ));
            }
            _ => {}
        }

        if let Some(azure) = &config.azure {
            Self::validate_azure(azure, &mut result);
        }

        if let Some(pb) = &config.profitbricks {
            Self::validate_profitbricks(pb, &mut result);
        }

        if result.errors.is_empty() {
            debug!("Configuration validation passed");
            Ok(result)
        } else {
            let first_error = &result.errors[0];
            Err(CloudportError::Config(ConfigError::ValidationError {
                message: first_error.message.clone(),
                field: Some(first_error.field.clone()),
            }))
        }
    }

    /// Validates the Azure section.
    fn validate_azure(azure: &AzureConfig, result: &mut ValidationResult) {
        if !is_valid_resource_group(&azure.resource_group) {
            result.errors.push(ValidationError {
                field: String::from("azure.resource_group"),
                message: format!(
                    "Resource group '{}' is invalid. Use letters, digits, '-', '_', '.' or '(' ')', not ending in '.'",
                    azure.resource_group
                ),
            });
        }

        let auth = &azure.auth;
        let has_principal =
            auth.tenant_id.is_some() && auth.client_id.is_some() && auth.client_secret.is_some();
        if auth.access_token.is_none() && !has_principal {
            result.errors.push(ValidationError {
                field: String::from("azure.auth"),
                message: String::from(
                    "Either access_token or tenant_id, client_id and client_secret are required",
                ),
            });
        }

        if !azure.blob_endpoint.contains("{account}") {
            result.errors.push(ValidationError {
                field: String::from("azure.blob_endpoint"),
                message: String::from("Blob endpoint must contain the {account} placeholder"),
            });
        }

        if azure.publishers().is_empty() {
            result.warnings.push(String::from(
                "azure.image_publishers is empty: only custom images will be listed",
            ));
        }

        if azure.default_login_password.len() < 8 {
            result.warnings.push(String::from(
                "azure.default_login_password is shorter than Azure's 8 character minimum",
            ));
        }

        if azure.timeouts.poll_interval_ms > azure.timeouts.operation_secs.saturating_mul(1000) {
            result.warnings.push(String::from(
                "azure.timeouts.poll_interval_ms exceeds the operation timeout",
            ));
        }
    }

    /// Validates the `ProfitBricks` section.
    fn validate_profitbricks(pb: &ProfitBricksConfig, result: &mut ValidationResult) {
        if pb.username.is_empty() || pb.password.is_empty() {
            result.errors.push(ValidationError {
                field: String::from("profitbricks.username"),
                message: String::from("Username and password are required"),
            });
        }

        if !matches!(pb.volume_type.as_str(), "HDD" | "SSD") {
            result.errors.push(ValidationError {
                field: String::from("profitbricks.volume_type"),
                message: format!("Volume type must be HDD or SSD, got '{}'", pb.volume_type),
            });
        }

        if pb.lan == 0 {
            result.errors.push(ValidationError {
                field: String::from("profitbricks.lan"),
                message: String::from("LAN ids start at 1"),
            });
        }
    }
}

/// Validates an Azure resource group name.
fn is_valid_resource_group(name: &str) -> bool {
    !name.is_empty()
        && name.len() <= 90
        && !name.ends_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '(' | ')'))
}

/// Validates that a node group name follows the naming convention.
/// Names must be lowercase alphanumeric with hyphens, starting with a letter.
#[must_use]
pub fn is_valid_group_name(name: &str) -> bool {
    if name.is_empty() {
        return false;
    }

    let mut chars = name.chars();

    // First character must be a letter
    if !chars.next().is_some_and(|c| c.is_ascii_lowercase()) {
        return false;
    }

    // Rest must be lowercase alphanumeric or hyphen
    if !chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-') {
        return false;
    }

    !name.ends_with('-') && !name.contains("--")
}

impl ValidationResult {
    /// Returns true if validation passed (no errors).
    #[must_use]
    pub const fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    /// Returns the number of errors.
    #[must_use]
    pub const fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Returns the number of warnings.
    #[must_use]
    pub const fn warning_count(&self) -> usize {
        self.warnings.len()
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}
