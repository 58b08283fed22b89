//! Error types for cloudport.
//!
//! This module provides the error hierarchy for every layer of the library:
//! configuration, the Azure Resource Manager and `ProfitBricks` clients,
//! provisioning orchestration, and image resolution.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for cloudport.
#[derive(Debug, Error)]
pub enum CloudportError {
    /// Configuration-related errors.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Azure Resource Manager errors.
    #[error("Azure error: {0}")]
    Azure(#[from] ArmError),

    /// `ProfitBricks` API errors.
    #[error("ProfitBricks error: {0}")]
    ProfitBricks(#[from] ProfitBricksError),

    /// Node provisioning and teardown errors.
    #[error("Provisioning error: {0}")]
    Provision(#[from] ProvisionError),

    /// Image resolution errors.
    #[error("Image error: {0}")]
    Image(#[from] ImageError),

    /// IO errors.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Generic internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file was not found.
    #[error("Configuration file not found: {path}")]
    FileNotFound {
        /// Path to the missing file.
        path: PathBuf,
    },

    /// The configuration file could not be parsed.
    #[error("Failed to parse configuration: {message}")]
    ParseError {
        /// Description of the parse error.
        message: String,
        /// Optional source location.
        location: Option<String>,
    },

    /// Validation failed.
    #[error("Configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation error.
        message: String,
        /// Field that failed validation.
        field: Option<String>,
    },

    /// Environment variable is missing.
    #[error("Missing environment variable: {name}")]
    MissingEnvVar {
        /// Name of the missing variable.
        name: String,
    },

    /// A provider section is required but absent.
    #[error("Provider '{provider}' is not configured")]
    ProviderNotConfigured {
        /// Provider name.
        provider: String,
    },
}

/// Azure Resource Manager errors.
#[derive(Debug, Error)]
pub enum ArmError {
    /// Authentication failed.
    #[error("Azure authentication failed: {message}")]
    AuthenticationFailed {
        /// Description of the auth failure.
        message: String,
    },

    /// API request failed.
    #[error("ARM request failed: {status} {code} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// ARM error code, if the body carried one.
        code: String,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("ARM rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with Azure: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from Azure: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// Blob storage request failed.
    #[error("Blob storage error on account {account}: {message}")]
    BlobStorage {
        /// Storage account name.
        account: String,
        /// Description of the failure.
        message: String,
    },

    /// An asynchronous ARM operation reported failure.
    #[error("Asynchronous operation failed: {uri}")]
    OperationFailed {
        /// The operation status URI.
        uri: String,
    },
}

/// `ProfitBricks` API errors.
#[derive(Debug, Error)]
pub enum ProfitBricksError {
    /// Authentication failed.
    #[error("ProfitBricks authentication failed")]
    AuthenticationFailed,

    /// API request failed.
    #[error("ProfitBricks request failed: {status} - {message}")]
    ApiRequestFailed {
        /// HTTP status code.
        status: u16,
        /// Error message from the API.
        message: String,
    },

    /// Rate limited.
    #[error("ProfitBricks rate limited, retry after {retry_after_secs} seconds")]
    RateLimited {
        /// Seconds to wait before retrying.
        retry_after_secs: u64,
    },

    /// Network error.
    #[error("Network error communicating with ProfitBricks: {message}")]
    NetworkError {
        /// Description of the network error.
        message: String,
    },

    /// Invalid response from the API.
    #[error("Invalid response from ProfitBricks: {message}")]
    InvalidResponse {
        /// Description of the response issue.
        message: String,
    },

    /// A request binder was handed an incomplete payload.
    #[error("Invalid {binder} payload: {message}")]
    InvalidPayload {
        /// Binder that rejected the payload.
        binder: &'static str,
        /// What was wrong.
        message: String,
    },

    /// A queued request finished with status FAILED.
    #[error("Request {request_id} failed: {message}")]
    RequestFailed {
        /// Request identifier.
        request_id: String,
        /// Message reported by the API.
        message: String,
    },
}

/// Node provisioning and teardown errors.
#[derive(Debug, Error)]
pub enum ProvisionError {
    /// A resource did not reach the expected state in time.
    #[error("Timeout waiting for {resource} to become {expected_state}")]
    Timeout {
        /// The resource being waited on.
        resource: String,
        /// Expected state that was not reached.
        expected_state: String,
    },

    /// A public IP did not reach `Succeeded` before the public IP timeout.
    #[error("Public IP was not provisioned in the configured timeout: {name}")]
    PublicIpNotProvisioned {
        /// Public IP resource name.
        name: String,
    },

    /// A provisioning step failed.
    #[error("Step '{step}' failed for node {node}: {reason}")]
    StepFailed {
        /// Node name.
        node: String,
        /// Step description.
        step: String,
        /// Reason for failure.
        reason: String,
    },

    /// Resources were left behind after a destroy.
    #[error("server({node}) and its resources still there after deleting!? remaining: {remaining}")]
    ResourcesRemain {
        /// Node id.
        node: String,
        /// Comma separated list of remaining resources.
        remaining: String,
    },

    /// The template is missing something the provider needs.
    #[error("Invalid template: {message}")]
    InvalidTemplate {
        /// Description of the issue.
        message: String,
    },

    /// A node id could not be understood by the provider.
    #[error("Invalid node id: {id}")]
    InvalidNodeId {
        /// The offending id.
        id: String,
    },
}

/// Image resolution errors.
#[derive(Debug, Error)]
pub enum ImageError {
    /// The id does not decode into a known image shape.
    #[error("Malformed image id '{id}': expected {expected}")]
    MalformedId {
        /// The offending id.
        id: String,
        /// Description of the expected shape.
        expected: &'static str,
    },

    /// The image could not be found.
    #[error("Image not found: {id}")]
    NotFound {
        /// The image id.
        id: String,
    },
}

/// Result type alias for cloudport operations.
pub type Result<T> = std::result::Result<T, CloudportError>;

impl CloudportError {
    /// Creates a new internal error with the given message.
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Returns true if this error is retryable.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::Azure(ArmError::RateLimited { .. } | ArmError::NetworkError { .. })
                | Self::ProfitBricks(
                    ProfitBricksError::RateLimited { .. } | ProfitBricksError::NetworkError { .. }
                )
        )
    }

    /// Returns the suggested retry delay in seconds, if applicable.
    #[must_use]
    pub const fn retry_delay_secs(&self) -> Option<u64> {
        match self {
            Self::Azure(ArmError::RateLimited { retry_after_secs })
            | Self::ProfitBricks(ProfitBricksError::RateLimited { retry_after_secs }) => {
                Some(*retry_after_secs)
            }
            Self::Azure(ArmError::NetworkError { .. })
            | Self::ProfitBricks(ProfitBricksError::NetworkError { .. }) => Some(5),
            _ => None,
        }
    }

    /// Returns true if this error is an HTTP 404 from either provider.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(
            self,
            Self::Azure(ArmError::ApiRequestFailed { status: 404, .. })
                | Self::ProfitBricks(ProfitBricksError::ApiRequestFailed { status: 404, .. })
        )
    }
}

impl ConfigError {
    /// Creates a validation error for a specific field.
    #[must_use]
    pub fn validation(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    /// Creates a validation error without a specific field.
    #[must_use]
    pub fn validation_general(message: impl Into<String>) -> Self {
        Self::ValidationError {
            message: message.into(),
            field: None,
        }
    }
}

impl ArmError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            code: code.into(),
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }

    /// Creates an invalid-response error.
    #[must_use]
    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::InvalidResponse {
            message: message.into(),
        }
    }
}

impl ProfitBricksError {
    /// Creates an API request error.
    #[must_use]
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiRequestFailed {
            status,
            message: message.into(),
        }
    }

    /// Creates a network error.
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::NetworkError {
            message: message.into(),
        }
    }
}

impl ProvisionError {
    /// Creates a timeout error.
    #[must_use]
    pub fn timeout(resource: impl Into<String>, expected_state: impl Into<String>) -> Self {
        Self::Timeout {
            resource: resource.into(),
            expected_state: expected_state.into(),
        }
    }
}
