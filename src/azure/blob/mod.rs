//! Blob storage access for VHDs and captured images.
//!
//! Only the handful of operations the compute adapter needs are implemented:
//! container existence, prefix listing and blob deletion, all signed with the
//! storage account's Shared Key.

mod helper;
mod signing;

pub use helper::{
    custom_image_exists, custom_image_name, custom_image_prefix, custom_images,
    CUSTOM_IMAGE_CONTAINER, SYSTEM_CONTAINER,
};
pub use signing::{SharedKeySigner, SignableRequest, STORAGE_VERSION};

use async_trait::async_trait;
use chrono::Utc;
use reqwest::{Client, Method, StatusCode, Url};
use serde::Deserialize;
use tracing::{debug, trace};

#[cfg(test)]
use mockall::automock;

use crate::error::{ArmError, Result};

/// A blob in a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobItem {
    /// Blob name, relative to the container.
    pub name: String,
    /// Size in bytes, when reported.
    pub content_length: Option<u64>,
}

/// Operations on one storage account's blob service.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Returns true if the container exists.
    async fn container_exists(&self, container: &str) -> Result<bool>;

    /// Lists the blobs of a container whose names start with `prefix`.
    async fn list_blobs(&self, container: &str, prefix: &str) -> Result<Vec<BlobItem>>;

    /// Deletes a blob. Returns false if there was nothing to delete.
    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool>;

    /// Absolute URI of a blob.
    fn blob_uri(&self, container: &str, blob: &str) -> String;
}

/// Where a blob lives, split out of its URI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobLocation {
    /// Blob service endpoint of the account, without trailing slash.
    pub endpoint: String,
    /// Storage account name.
    pub account: String,
    /// Container name.
    pub container: String,
    /// Blob name.
    pub blob: String,
}

impl BlobLocation {
    /// Parses a blob URI.
    ///
    /// Both the public form `https://{account}.blob.core.windows.net/{container}/{blob}`
    /// and the path-style form used by local emulators,
    /// `http://host:port/{account}/{container}/{blob}`, are understood.
    ///
    /// # Errors
    ///
    /// Returns an error if the URI has no container or blob.
    pub fn parse(uri: &str) -> Result<Self> {
        let invalid = || ArmError::invalid_response(format!("not a blob URI: {uri}"));
        let url = Url::parse(uri).map_err(|_| invalid())?;
        let host = url.host_str().ok_or_else(invalid)?;
        let origin = url.origin().ascii_serialization();
        let segments: Vec<&str> = url
            .path_segments()
            .map(|s| s.filter(|p| !p.is_empty()).collect())
            .unwrap_or_default();

        let (endpoint, account, rest) = if host.contains(".blob.") {
            let account = host.split('.').next().unwrap_or_default();
            (origin, account.to_string(), segments.as_slice())
        } else {
            let Some((account, rest)) = segments.split_first() else {
                return Err(invalid().into());
            };
            (format!("{origin}/{account}"), (*account).to_string(), rest)
        };

        match rest {
            [container, blob @ ..] if !blob.is_empty() => Ok(Self {
                endpoint,
                account,
                container: (*container).to_string(),
                blob: blob.join("/"),
            }),
            _ => Err(invalid().into()),
        }
    }
}

/// Blob service client for one storage account.
#[derive(Debug, Clone)]
pub struct BlobClient {
    http: Client,
    endpoint: String,
    signer: SharedKeySigner,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct EnumerationResults {
    #[serde(default)]
    blobs: BlobList,
    #[serde(default)]
    next_marker: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct BlobList {
    #[serde(rename = "Blob", default)]
    blob: Vec<BlobEntry>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct BlobEntry {
    name: String,
    #[serde(default)]
    properties: Option<BlobEntryProperties>,
}

#[derive(Debug, Deserialize)]
struct BlobEntryProperties {
    #[serde(rename = "Content-Length", default)]
    content_length: Option<u64>,
}

impl BlobClient {
    /// Creates a client for the account served at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not valid base64.
    pub fn new(http: Client, endpoint: &str, account: &str, key: &str) -> Result<Self> {
        Ok(Self {
            http,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            signer: SharedKeySigner::new(account, key)?,
        })
    }

    /// Storage account name.
    #[must_use]
    pub fn account(&self) -> &str {
        self.signer.account()
    }

    fn blob_error(&self, message: impl Into<String>) -> ArmError {
        ArmError::BlobStorage {
            account: self.account().to_string(),
            message: message.into(),
        }
    }

    async fn send(&self, method: Method, resource: &str, query: &[(&str, &str)]) -> Result<reqwest::Response> {
        let url = format!("{}/{resource}", self.endpoint);
        let parsed = Url::parse(&url).map_err(|e| self.blob_error(format!("invalid URL {url}: {e}")))?;
        let date = Utc::now().format("%a, %d %b %Y %H:%M:%S GMT").to_string();

        let signable = SignableRequest {
            method: method.as_str(),
            path: parsed.path(),
            query,
            ms_headers: &[("x-ms-date", date.as_str()), ("x-ms-version", STORAGE_VERSION)],
            content_length: 0,
            content_type: None,
        };
        let authorization = self.signer.authorization(&signable)?;

        trace!("{method} {url}");
        self.http
            .request(method, parsed)
            .query(query)
            .header("x-ms-date", &date)
            .header("x-ms-version", STORAGE_VERSION)
            .header(reqwest::header::AUTHORIZATION, authorization)
            .send()
            .await
            .map_err(|e| self.blob_error(format!("request failed: {e}")).into())
    }

    async fn failure(&self, response: reqwest::Response) -> crate::error::CloudportError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        self.blob_error(format!("{status}: {body}")).into()
    }
}

#[async_trait]
impl BlobStore for BlobClient {
    async fn container_exists(&self, container: &str) -> Result<bool> {
        let response = self
            .send(Method::GET, container, &[("restype", "container")])
            .await?;
        match response.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(self.failure(response).await),
        }
    }

    async fn list_blobs(&self, container: &str, prefix: &str) -> Result<Vec<BlobItem>> {
        let mut items = Vec::new();
        let mut marker = String::new();

        loop {
            let mut query = vec![("restype", "container"), ("comp", "list")];
            if !prefix.is_empty() {
                query.push(("prefix", prefix));
            }
            if !marker.is_empty() {
                query.push(("marker", marker.as_str()));
            }

            let response = self.send(Method::GET, container, &query).await?;
            if response.status() == StatusCode::NOT_FOUND {
                return Ok(items);
            }
            if !response.status().is_success() {
                return Err(self.failure(response).await);
            }

            let body = response
                .text()
                .await
                .map_err(|e| self.blob_error(format!("failed to read listing: {e}")))?;
            let page: EnumerationResults = quick_xml::de::from_str(&body)
                .map_err(|e| self.blob_error(format!("failed to parse listing: {e}")))?;

            items.extend(page.blobs.blob.into_iter().map(|b| BlobItem {
                name: b.name,
                content_length: b.properties.and_then(|p| p.content_length),
            }));

            match page.next_marker.filter(|m| !m.is_empty()) {
                Some(next) => marker = next,
                None => break,
            }
        }

        debug!(
            "Listed {} blobs in {}/{container} with prefix '{prefix}'",
            items.len(),
            self.account()
        );
        Ok(items)
    }

    async fn delete_blob(&self, container: &str, blob: &str) -> Result<bool> {
        let response = self
            .send(Method::DELETE, &format!("{container}/{blob}"), &[])
            .await?;
        match response.status() {
            StatusCode::ACCEPTED | StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(self.failure(response).await),
        }
    }

    fn blob_uri(&self, container: &str, blob: &str) -> String {
        format!("{}/{container}/{blob}", self.endpoint)
    }
}
