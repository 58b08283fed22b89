//! `ProfitBricks` Cloud API v4 HTTP client.
//!
//! Requests are authenticated with HTTP basic auth. Changes are queued by the
//! API: a 202 response carries the created or changed resource and a
//! `Location` header pointing at the request status, which
//! [`RequestApi::wait`](super::api::RequestApi::wait) polls until `DONE`.

use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::ProfitBricksConfig;
use crate::error::{CloudportError, ProfitBricksError, Result};

use super::binder::{BoundRequest, RequestBinder};
use super::types::Collection;

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// A resource returned by a queued request.
#[derive(Debug, Clone)]
pub struct Queued<T> {
    /// The resource as returned when the request was accepted.
    pub resource: T,
    /// Request status URI, when the change is processed asynchronously.
    pub status_uri: Option<String>,
}

/// `ProfitBricks` Cloud API client.
#[derive(Debug, Clone)]
pub struct ProfitBricksClient {
    http: Client,
    endpoint: String,
    username: String,
    password: String,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    messages: Vec<ErrorMessage>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ErrorMessage {
    #[serde(default)]
    error_code: String,
    #[serde(default)]
    message: String,
}

impl ProfitBricksClient {
    /// Creates a client for the configured account.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created.
    pub fn new(config: &ProfitBricksConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProfitBricksError::network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
        })
    }

    /// Fetches a resource; a 404 yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any other reason.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, depth: u8) -> Result<Option<T>> {
        match self.execute(Method::GET, path, depth, None).await {
            Ok(response) => parse(response).await.map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Lists a collection. A missing collection is empty.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list<T: DeserializeOwned>(&self, path: &str, depth: u8) -> Result<Vec<T>> {
        let collection: Option<Collection<T>> = self.get(path, depth).await?;
        Ok(collection.map(|c| c.items).unwrap_or_default())
    }

    /// Sends a bound payload and returns the accepted resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid, the request fails or the
    /// response cannot be parsed.
    pub async fn send<B: RequestBinder + Sync, T: DeserializeOwned>(&self, payload: &B) -> Result<Queued<T>> {
        let BoundRequest { method, path, body } = payload.bind()?;
        debug!("{method} {path}");
        let response = self.execute(method, &path, 0, Some(&body)).await?;
        let status_uri = status_location(&response);
        let resource = parse(response).await?;
        Ok(Queued { resource, status_uri })
    }

    /// POSTs an action such as `/start` without a body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn post_action(&self, path: &str) -> Result<Option<String>> {
        let response = self.execute(Method::POST, path, 0, None).await?;
        Ok(status_location(&response))
    }

    /// Deletes a resource. Returns the request status URI, `None` if there was
    /// nothing to delete or the delete completed synchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for a reason other than 404.
    pub async fn delete(&self, path: &str) -> Result<Option<String>> {
        match self.execute(Method::DELETE, path, 0, None).await {
            Ok(response) => Ok(status_location(&response)),
            Err(e) if e.is_not_found() => {
                debug!("{path} was already gone");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.endpoint)
        }
    }

    /// Executes a request, retrying transient failures.
    async fn execute(
        &self,
        method: Method,
        path: &str,
        depth: u8,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = match &last_error {
                    Some(CloudportError::ProfitBricks(ProfitBricksError::RateLimited {
                        retry_after_secs,
                    })) => Duration::from_secs(*retry_after_secs),
                    _ => Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)),
                };
                debug!("Retry attempt {attempt} of {MAX_RETRIES} in {delay:?}");
                tokio::time::sleep(delay).await;
            }

            match self.execute_once(method.clone(), path, depth, body).await {
                Ok(response) => return Ok(response),
                Err(e) if e.is_retryable() => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| ProfitBricksError::network("Max retries exceeded").into()))
    }

    async fn execute_once(
        &self,
        method: Method,
        path: &str,
        depth: u8,
        body: Option<&serde_json::Value>,
    ) -> Result<Response> {
        let url = self.url(path);
        trace!("{method} {url} depth={depth}");

        let mut builder = self
            .http
            .request(method, &url)
            .basic_auth(&self.username, Some(&self.password));
        if depth > 0 {
            builder = builder.query(&[("depth", depth)]);
        }
        if let Some(body) = body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ProfitBricksError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ProfitBricksError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status == StatusCode::UNAUTHORIZED {
            return Err(ProfitBricksError::AuthenticationFailed.into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProfitBricksError::api_error(status.as_u16(), error_message(&body)).into());
        }

        Ok(response)
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ProfitBricksError::network(format!("Failed to read response: {e}")))?;
    serde_json::from_str(&body).map_err(|e| {
        ProfitBricksError::InvalidResponse {
            message: format!("Failed to parse response: {e}"),
        }
        .into()
    })
}

fn status_location(response: &Response) -> Option<String> {
    if response.status() != StatusCode::ACCEPTED {
        return None;
    }
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Joins the messages of an error body, falling back to the raw body.
fn error_message(body: &str) -> String {
    match serde_json::from_str::<ErrorBody>(body) {
        Ok(parsed) if !parsed.messages.is_empty() => parsed
            .messages
            .iter()
            .map(|m| format!("[{}] {}", m.error_code, m.message))
            .collect::<Vec<_>>()
            .join("; "),
        _ => body.to_string(),
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::profitbricks::binder::CreateDatacenter;
    use crate::profitbricks::types::Datacenter;
    use wiremock::matchers::{basic_auth, body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    pub(crate) fn config_for(server: &MockServer) -> ProfitBricksConfig {
        let mut config = ProfitBricksConfig::new("user", "secret");
        config.endpoint = format!("{}/cloudapi/v4", server.uri());
        config.timeouts.poll_interval_ms = 10;
        config.timeouts.operation_secs = 2;
        config.timeouts.public_ip_secs = 2;
        config.timeouts.node_running_secs = 2;
        config
    }

    pub(crate) fn client_for(server: &MockServer) -> ProfitBricksClient {
        ProfitBricksClient::new(&config_for(server)).expect("client")
    }

    #[tokio::test]
    async fn test_list_with_depth_and_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cloudapi/v4/datacenters"))
            .and(query_param("depth", "1"))
            .and(basic_auth("user", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "datacenters",
                "items": [
                    {"id": "dc-1", "properties": {"name": "web", "location": "de/fkb"}},
                    {"id": "dc-2", "properties": {"name": "db", "location": "us/las"}}
                ]
            })))
            .mount(&server)
            .await;

        let datacenters: Vec<Datacenter> = client_for(&server)
            .list("/datacenters", 1)
            .await
            .expect("listed");
        assert_eq!(datacenters.len(), 2);
        assert_eq!(datacenters[1].properties.location, "us/las");
    }

    #[tokio::test]
    async fn test_send_returns_status_location() {
        let server = MockServer::start().await;
        let status = format!("{}/cloudapi/v4/requests/req-1/status", server.uri());
        Mock::given(method("POST"))
            .and(path("/cloudapi/v4/datacenters"))
            .and(body_json(serde_json::json!({"properties": {"name": "web", "location": "de/fkb"}})))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", status.as_str())
                    .set_body_json(serde_json::json!({
                        "id": "dc-1",
                        "metadata": {"state": "BUSY"},
                        "properties": {"name": "web", "location": "de/fkb"}
                    })),
            )
            .mount(&server)
            .await;

        let payload = CreateDatacenter {
            name: String::from("web"),
            location: String::from("de/fkb"),
            description: None,
        };
        let queued: Queued<Datacenter> = client_for(&server).send(&payload).await.expect("sent");
        assert_eq!(queued.resource.id, "dc-1");
        assert_eq!(queued.status_uri.as_deref(), Some(status.as_str()));
    }

    #[tokio::test]
    async fn test_error_messages_are_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/cloudapi/v4/datacenters/dc-9"))
            .respond_with(ResponseTemplate::new(422).set_body_json(serde_json::json!({
                "httpStatus": 422,
                "messages": [{"errorCode": "100", "message": "Invalid depth"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/cloudapi/v4/datacenters/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .get::<Datacenter>("/datacenters/dc-9", 0)
            .await
            .expect_err("422");
        assert!(err.to_string().contains("[100] Invalid depth"));

        let missing = client.get::<Datacenter>("/datacenters/missing", 0).await.expect("404");
        assert!(missing.is_none());
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .list::<Datacenter>("/datacenters", 1)
            .await
            .expect_err("401");
        assert!(matches!(
            err,
            CloudportError::ProfitBricks(ProfitBricksError::AuthenticationFailed)
        ));
    }

    #[tokio::test]
    async fn test_delete_of_missing_resource() {
        let server = MockServer::start().await;
        let deleted = client_for(&server)
            .delete("/datacenters/dc/servers/gone")
            .await
            .expect("404 is fine");
        assert!(deleted.is_none());
    }
}
