//! Bearer tokens for the Azure Resource Manager.
//!
//! A token is either handed over as-is in the configuration, or obtained with
//! the OAuth2 client-credentials grant of a service principal and cached until
//! shortly before it expires.

use reqwest::Client;
use serde::{Deserialize, Deserializer};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::AzureAuthConfig;
use crate::error::{ArmError, ConfigError, Result};

/// Tokens are refreshed this long before they expire.
const REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

/// Source of ARM bearer tokens.
#[derive(Debug)]
pub enum TokenProvider {
    /// A fixed token.
    Static(String),
    /// Service principal credentials.
    ClientCredentials(ClientCredentials),
}

/// OAuth2 client-credentials grant against Azure AD.
#[derive(Debug)]
pub struct ClientCredentials {
    http: Client,
    token_url: String,
    client_id: String,
    client_secret: String,
    resource: String,
    cached: Mutex<Option<CachedToken>>,
}

#[derive(Debug, Clone)]
struct CachedToken {
    value: String,
    refresh_at: Instant,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    #[serde(default, deserialize_with = "lenient_secs")]
    expires_in: u64,
}

/// Azure AD v1 endpoints return `expires_in` as a string.
fn lenient_secs<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<u64, D::Error> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Secs {
        Number(u64),
        Text(String),
    }

    match Secs::deserialize(deserializer)? {
        Secs::Number(n) => Ok(n),
        Secs::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

impl TokenProvider {
    /// Builds a provider from the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if neither a token nor complete service principal
    /// credentials are configured.
    pub fn from_config(auth: &AzureAuthConfig, http: Client) -> Result<Self> {
        if let Some(token) = auth.access_token.as_ref().filter(|t| !t.is_empty()) {
            return Ok(Self::Static(token.clone()));
        }

        match (&auth.tenant_id, &auth.client_id, &auth.client_secret) {
            (Some(tenant), Some(client_id), Some(secret)) => {
                Ok(Self::ClientCredentials(ClientCredentials {
                    http,
                    token_url: format!(
                        "{}/{tenant}/oauth2/token",
                        auth.authority.trim_end_matches('/')
                    ),
                    client_id: client_id.clone(),
                    client_secret: secret.clone(),
                    resource: auth.resource.clone(),
                    cached: Mutex::new(None),
                }))
            }
            _ => Err(ConfigError::validation(
                "either access_token or tenant_id, client_id and client_secret are required",
                "azure.auth",
            )
            .into()),
        }
    }

    /// Returns a valid bearer token.
    ///
    /// # Errors
    ///
    /// Returns an error if the token endpoint rejects the credentials or
    /// cannot be reached.
    pub async fn token(&self) -> Result<String> {
        match self {
            Self::Static(token) => Ok(token.clone()),
            Self::ClientCredentials(credentials) => credentials.token().await,
        }
    }
}

impl ClientCredentials {
    async fn token(&self) -> Result<String> {
        let mut cached = self.cached.lock().await;
        if let Some(token) = cached.as_ref().filter(|t| Instant::now() < t.refresh_at) {
            return Ok(token.value.clone());
        }

        debug!("Requesting ARM token from {}", self.token_url);
        let response = self
            .http
            .post(&self.token_url)
            .form(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.client_id.as_str()),
                ("client_secret", self.client_secret.as_str()),
                ("resource", self.resource.as_str()),
            ])
            .send()
            .await
            .map_err(|e| ArmError::network(format!("Token request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ArmError::AuthenticationFailed {
                message: format!("token endpoint returned {status}: {body}"),
            }
            .into());
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| ArmError::invalid_response(format!("Failed to parse token: {e}")))?;

        let lifetime = Duration::from_secs(token.expires_in);
        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        });

        Ok(token.access_token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudportError;
    use wiremock::matchers::{body_string_contains, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn principal(authority: &str) -> AzureAuthConfig {
        AzureAuthConfig {
            tenant_id: Some(String::from("tenant")),
            client_id: Some(String::from("app")),
            client_secret: Some(String::from("secret")),
            authority: authority.to_string(),
            ..AzureAuthConfig::default()
        }
    }

    #[tokio::test]
    async fn test_static_token_wins() {
        let auth = AzureAuthConfig {
            access_token: Some(String::from("fixed")),
            ..principal("https://login.example")
        };
        let provider = TokenProvider::from_config(&auth, Client::new()).expect("configured");
        assert_eq!(provider.token().await.expect("token"), "fixed");
    }

    #[test]
    fn test_missing_credentials_rejected() {
        let auth = AzureAuthConfig {
            client_secret: None,
            ..principal("https://login.example")
        };
        let err = TokenProvider::from_config(&auth, Client::new()).expect_err("incomplete");
        assert!(matches!(err, CloudportError::Config(_)));
    }

    #[tokio::test]
    async fn test_client_credentials_token_is_cached() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/token"))
            .and(body_string_contains("grant_type=client_credentials"))
            .and(body_string_contains("client_id=app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": "3599",
                "access_token": "issued"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let provider =
            TokenProvider::from_config(&principal(&server.uri()), Client::new()).expect("configured");
        assert_eq!(provider.token().await.expect("first"), "issued");
        assert_eq!(provider.token().await.expect("cached"), "issued");
    }

    #[tokio::test]
    async fn test_token_inside_refresh_margin_is_fetched_again() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "token_type": "Bearer",
                "expires_in": "240",
                "access_token": "short-lived"
            })))
            .expect(2)
            .mount(&server)
            .await;

        let provider =
            TokenProvider::from_config(&principal(&server.uri()), Client::new()).expect("configured");
        assert_eq!(provider.token().await.expect("first"), "short-lived");
        assert_eq!(provider.token().await.expect("refetched"), "short-lived");
    }

    #[tokio::test]
    async fn test_rejected_credentials() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/tenant/oauth2/token"))
            .respond_with(ResponseTemplate::new(401).set_body_string("invalid_client"))
            .mount(&server)
            .await;

        let provider =
            TokenProvider::from_config(&principal(&server.uri()), Client::new()).expect("configured");
        let err = provider.token().await.expect_err("rejected");
        assert!(matches!(err, CloudportError::Azure(ArmError::AuthenticationFailed { .. })));
    }
}
