//! Azure Resource Manager HTTP client.
//!
//! Every per-resource API goes through [`ArmClient`], which adds the bearer
//! token and `api-version`, maps ARM error bodies, and retries transient
//! failures.

use reqwest::{header, Client, Method, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, trace};

use crate::config::{ApiVersions, AzureConfig};
use crate::error::{ArmError, CloudportError, Result};

use super::auth::TokenProvider;
use super::types::{ErrorResponse, ListResponse};

/// Default request timeout in seconds.
const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Maximum number of retries for transient failures.
const MAX_RETRIES: u32 = 3;

/// Delay between retries in milliseconds.
const RETRY_DELAY_MS: u64 = 1000;

/// Result of a DELETE.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeleteOutcome {
    /// Deletion runs asynchronously; poll the URI with [`ArmClient::job_status`].
    Accepted(String),
    /// The resource is gone.
    Completed,
    /// There was nothing to delete.
    NotFound,
}

/// Status of an asynchronous ARM operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Still running.
    InProgress,
    /// Finished.
    Done,
    /// Finished unsuccessfully.
    Failed,
}

/// Azure Resource Manager client.
#[derive(Debug)]
pub struct ArmClient {
    http: Client,
    endpoint: String,
    subscription_id: String,
    api_versions: ApiVersions,
    tokens: TokenProvider,
}

struct ArmRequest<'a> {
    method: Method,
    url: String,
    query: &'a [(&'a str, &'a str)],
    body: Option<&'a serde_json::Value>,
}

impl ArmClient {
    /// Creates a client for the configured subscription.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be created or the
    /// authentication settings are incomplete.
    pub fn new(config: &AzureConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .map_err(|e| ArmError::network(format!("Failed to create HTTP client: {e}")))?;
        let tokens = TokenProvider::from_config(&config.auth, http.clone())?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            subscription_id: config.subscription_id.clone(),
            api_versions: config.api_versions.clone(),
            tokens,
        })
    }

    /// Configured `api-version` values.
    #[must_use]
    pub const fn api_versions(&self) -> &ApiVersions {
        &self.api_versions
    }

    /// Underlying HTTP client, shared with the blob service client.
    #[must_use]
    pub const fn http(&self) -> &Client {
        &self.http
    }

    /// `/subscriptions/{id}`.
    #[must_use]
    pub fn subscription_path(&self) -> String {
        format!("/subscriptions/{}", self.subscription_id)
    }

    /// `/subscriptions/{id}/resourceGroups/{group}`.
    #[must_use]
    pub fn group_path(&self, group: &str) -> String {
        format!("{}/resourceGroups/{group}", self.subscription_path())
    }

    /// Path of a resource inside a group, e.g.
    /// `resource_path("g", "Microsoft.Network", "publicIPAddresses/ip")`.
    #[must_use]
    pub fn resource_path(&self, group: &str, namespace: &str, rest: &str) -> String {
        format!("{}/providers/{namespace}/{rest}", self.group_path(group))
    }

    /// GETs a resource; a 404 yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any other reason.
    pub async fn get<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<Option<T>> {
        self.get_with_query(path, &[("api-version", api_version)]).await
    }

    /// GETs a resource with extra query parameters; a 404 yields `None`.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any other reason.
    pub async fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Option<T>> {
        let request = ArmRequest {
            method: Method::GET,
            url: self.url(path),
            query,
            body: None,
        };
        match self.execute(&request).await {
            Ok(response) => parse(response).await.map(Some),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// GETs a plain JSON array; a 404 yields an empty list.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for any other reason.
    pub async fn get_array<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<Vec<T>> {
        Ok(self.get(path, api_version).await?.unwrap_or_default())
    }

    /// Lists a collection, following `nextLink` pages.
    ///
    /// # Errors
    ///
    /// Returns an error if any page cannot be fetched.
    pub async fn list<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<Vec<T>> {
        let mut items = Vec::new();
        let Some(mut page) = self.get::<ListResponse<T>>(path, api_version).await? else {
            return Ok(items);
        };

        loop {
            items.append(&mut page.value);
            let Some(next) = page.next_link.take() else {
                break;
            };
            trace!("Following nextLink {next}");
            let request = ArmRequest {
                method: Method::GET,
                url: next,
                query: &[],
                body: None,
            };
            page = parse(self.execute(&request).await?).await?;
        }

        Ok(items)
    }

    /// PUTs a resource and returns the resulting representation.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn put<B: Serialize + Sync, T: DeserializeOwned>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<T> {
        let response = self.send_json(Method::PUT, path, api_version, body).await?;
        parse(response).await
    }

    /// PUTs a resource whose creation may be accepted without a body
    /// (storage accounts). Returns the operation URI on 202.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn put_accepted<B: Serialize + Sync>(
        &self,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<Option<String>> {
        let response = self.send_json(Method::PUT, path, api_version, body).await?;
        Ok(accepted_location(&response))
    }

    /// POSTs without a body and parses the response (e.g. `listKeys`).
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the response cannot be parsed.
    pub async fn post<T: DeserializeOwned>(&self, path: &str, api_version: &str) -> Result<T> {
        let request = ArmRequest {
            method: Method::POST,
            url: self.url(path),
            query: &[("api-version", api_version)],
            body: None,
        };
        parse(self.execute(&request).await?).await
    }

    /// POSTs an action such as `start` or `restart`. Returns the operation
    /// URI when the action was accepted asynchronously.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn post_action(&self, path: &str, api_version: &str) -> Result<Option<String>> {
        let request = ArmRequest {
            method: Method::POST,
            url: self.url(path),
            query: &[("api-version", api_version)],
            body: None,
        };
        let response = self.execute(&request).await?;
        Ok(accepted_location(&response))
    }

    /// DELETEs a resource.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails for a reason other than 404.
    pub async fn delete(&self, path: &str, api_version: &str) -> Result<DeleteOutcome> {
        let request = ArmRequest {
            method: Method::DELETE,
            url: self.url(path),
            query: &[("api-version", api_version)],
            body: None,
        };
        match self.execute(&request).await {
            Ok(response) => Ok(accepted_location(&response)
                .map_or(DeleteOutcome::Completed, DeleteOutcome::Accepted)),
            Err(e) if e.is_not_found() => Ok(DeleteOutcome::NotFound),
            Err(e) => Err(e),
        }
    }

    /// Checks an asynchronous operation URI.
    ///
    /// # Errors
    ///
    /// Returns an error if the status cannot be fetched at all.
    pub async fn job_status(&self, uri: &str) -> Result<JobStatus> {
        let request = ArmRequest {
            method: Method::GET,
            url: self.url(uri),
            query: &[],
            body: None,
        };
        match self.execute(&request).await {
            Ok(response) if response.status() == StatusCode::ACCEPTED => Ok(JobStatus::InProgress),
            Ok(response) if matches!(response.status(), StatusCode::OK | StatusCode::NO_CONTENT) => {
                Ok(JobStatus::Done)
            }
            Ok(_) | Err(CloudportError::Azure(ArmError::ApiRequestFailed { .. })) => {
                Ok(JobStatus::Failed)
            }
            Err(e) => Err(e),
        }
    }

    async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        path: &str,
        api_version: &str,
        body: &B,
    ) -> Result<Response> {
        let body = serde_json::to_value(body)
            .map_err(|e| CloudportError::internal(format!("Failed to serialize request: {e}")))?;
        let request = ArmRequest {
            method,
            url: self.url(path),
            query: &[("api-version", api_version)],
            body: Some(&body),
        };
        self.execute(&request).await
    }

    fn url(&self, path: &str) -> String {
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{path}", self.endpoint)
        }
    }

    /// Executes a request, retrying transient failures.
    async fn execute(&self, request: &ArmRequest<'_>) -> Result<Response> {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                let delay = match &last_error {
                    Some(CloudportError::Azure(ArmError::RateLimited { retry_after_secs })) => {
                        Duration::from_secs(*retry_after_secs)
                    }
                    _ => Duration::from_millis(RETRY_DELAY_MS * u64::from(attempt)),
                };
                debug!("Retry attempt {attempt} of {MAX_RETRIES} in {delay:?}");
                tokio::time::sleep(delay).await;
            }

            match self.execute_once(request).await {
                Ok(response) => return Ok(response),
                Err(e) => {
                    if e.is_retryable() {
                        last_error = Some(e);
                        continue;
                    }
                    return Err(e);
                }
            }
        }

        Err(last_error.unwrap_or_else(|| ArmError::network("Max retries exceeded").into()))
    }

    /// Executes a single request.
    async fn execute_once(&self, request: &ArmRequest<'_>) -> Result<Response> {
        trace!("{} {}", request.method, request.url);

        let token = self.tokens.token().await?;
        let mut builder = self
            .http
            .request(request.method.clone(), &request.url)
            .header(header::AUTHORIZATION, format!("Bearer {token}"))
            .query(request.query);
        if let Some(body) = request.body {
            builder = builder
                .header(header::CONTENT_TYPE, "application/json")
                .json(body);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| ArmError::network(format!("Request failed: {e}")))?;

        let status = response.status();

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or_default();
            let retry_after = if retry_after == 0 { 60 } else { retry_after };

            return Err(ArmError::RateLimited {
                retry_after_secs: retry_after,
            }
            .into());
        }

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = response.text().await.unwrap_or_default();
            return Err(ArmError::AuthenticationFailed {
                message: error_message(&body).1,
            }
            .into());
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let (code, message) = error_message(&body);
            return Err(ArmError::api_error(status.as_u16(), code, message).into());
        }

        Ok(response)
    }
}

async fn parse<T: DeserializeOwned>(response: Response) -> Result<T> {
    let body = response
        .text()
        .await
        .map_err(|e| ArmError::network(format!("Failed to read response: {e}")))?;
    serde_json::from_str(&body)
        .map_err(|e| ArmError::invalid_response(format!("Failed to parse response: {e}")).into())
}

fn accepted_location(response: &Response) -> Option<String> {
    if response.status() != StatusCode::ACCEPTED {
        return None;
    }
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(ToString::to_string)
}

/// Splits an ARM error body into code and message, falling back to the raw body.
fn error_message(body: &str) -> (String, String) {
    serde_json::from_str::<ErrorResponse>(body).map_or_else(
        |_| (String::new(), body.to_string()),
        |e| (e.error.code, e.error.message),
    )
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::azure::types::Location;
    use wiremock::matchers::{header as header_eq, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A client pointed at a mock server with a static token.
    pub(crate) fn config_for(server: &MockServer) -> AzureConfig {
        let mut config = AzureConfig::new("sub");
        config.endpoint = server.uri();
        config.resource_group = String::from("group");
        config.auth.access_token = Some(String::from("token"));
        config.blob_endpoint = format!("{}/{{account}}", server.uri());
        config.timeouts.poll_interval_ms = 10;
        config.timeouts.operation_secs = 2;
        config.timeouts.public_ip_secs = 2;
        config.timeouts.node_running_secs = 2;
        config
    }

    pub(crate) fn client_for(server: &MockServer) -> ArmClient {
        ArmClient::new(&config_for(server)).expect("client")
    }

    #[test]
    fn test_paths() {
        let config = AzureConfig {
            auth: crate::config::AzureAuthConfig {
                access_token: Some(String::from("t")),
                ..crate::config::AzureAuthConfig::default()
            },
            ..AzureConfig::new("sub")
        };
        let client = ArmClient::new(&config).expect("client");
        assert_eq!(
            client.resource_path("g", "Microsoft.Network", "publicIPAddresses/ip"),
            "/subscriptions/sub/resourceGroups/g/providers/Microsoft.Network/publicIPAddresses/ip"
        );
    }

    #[tokio::test]
    async fn test_get_sends_token_and_version() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/sub/locations"))
            .and(query_param("api-version", "2015-01-01"))
            .and(header_eq("authorization", "Bearer token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"name": "westeurope", "displayName": "West Europe"}]
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let locations: Vec<Location> = client
            .list("/subscriptions/sub/locations", "2015-01-01")
            .await
            .expect("listed");
        assert_eq!(locations.len(), 1);
        assert_eq!(locations[0].name, "westeurope");
    }

    #[tokio::test]
    async fn test_list_follows_next_link() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"name": "eastus", "displayName": "East US"}]
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/subscriptions/sub/locations"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "value": [{"name": "westeurope", "displayName": "West Europe"}],
                "nextLink": format!("{}/page2", server.uri())
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let locations: Vec<Location> = client
            .list("/subscriptions/sub/locations", "2015-01-01")
            .await
            .expect("listed");
        let names: Vec<_> = locations.iter().map(|l| l.name.as_str()).collect();
        assert_eq!(names, vec!["westeurope", "eastus"]);
    }

    #[tokio::test]
    async fn test_get_missing_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "ResourceNotFound", "message": "missing"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let found: Option<Location> = client.get("/anything", "v").await.expect("no error");
        assert!(found.is_none());
    }

    #[tokio::test]
    async fn test_error_body_is_mapped() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(409).set_body_json(serde_json::json!({
                "error": {"code": "Conflict", "message": "operation in progress"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client
            .put::<_, serde_json::Value>("/thing", "v", &serde_json::json!({}))
            .await
            .expect_err("conflict");
        match err {
            CloudportError::Azure(ArmError::ApiRequestFailed { status, code, message }) => {
                assert_eq!(status, 409);
                assert_eq!(code, "Conflict");
                assert_eq!(message, "operation in progress");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_delete_outcomes() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path("/accepted"))
            .respond_with(
                ResponseTemplate::new(202).insert_header("Location", "https://op.example/1"),
            )
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/done"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        assert_eq!(
            client.delete("/accepted", "v").await.expect("accepted"),
            DeleteOutcome::Accepted(String::from("https://op.example/1"))
        );
        assert_eq!(client.delete("/done", "v").await.expect("done"), DeleteOutcome::Completed);
        assert_eq!(client.delete("/missing", "v").await.expect("missing"), DeleteOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_job_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/op/running"))
            .respond_with(ResponseTemplate::new(202))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/op/done"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/op/failed"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let status = |p: &'static str| {
            let uri = format!("{}{p}", server.uri());
            let client = &client;
            async move { client.job_status(&uri).await.expect("status") }
        };
        assert_eq!(status("/op/running").await, JobStatus::InProgress);
        assert_eq!(status("/op/done").await, JobStatus::Done);
        assert_eq!(status("/op/failed").await, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
                "error": {"code": "InvalidAuthenticationToken", "message": "expired"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get::<Location>("/x", "v").await.expect_err("unauthorized");
        assert!(matches!(
            err,
            CloudportError::Azure(ArmError::AuthenticationFailed { ref message }) if message == "expired"
        ));
    }
}
