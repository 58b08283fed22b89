//! Marketplace image catalog of a location.
//!
//! The catalog is a tree: publishers, their offers, the SKUs of an offer and
//! the versions of a SKU. Every level is a plain JSON array.

use crate::azure::client::ArmClient;
use crate::azure::types::ImageArtifact;
use crate::error::Result;

/// Image catalog of one location.
#[derive(Debug, Clone, Copy)]
pub struct OsImageApi<'a> {
    client: &'a ArmClient,
    location: &'a str,
}

impl<'a> OsImageApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, location: &'a str) -> Self {
        Self { client, location }
    }

    fn base(&self) -> String {
        format!(
            "{}/providers/Microsoft.Compute/locations/{}/publishers",
            self.client.subscription_path(),
            self.location
        )
    }

    async fn artifacts(&self, path: &str) -> Result<Vec<ImageArtifact>> {
        self.client
            .get_array(path, &self.client.api_versions().compute)
            .await
    }

    /// Lists publishers.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_publishers(&self) -> Result<Vec<ImageArtifact>> {
        self.artifacts(&self.base()).await
    }

    /// Lists the offers of a publisher. Unknown publishers yield nothing.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_offers(&self, publisher: &str) -> Result<Vec<ImageArtifact>> {
        let path = format!("{}/{publisher}/artifacttypes/vmimage/offers", self.base());
        self.artifacts(&path).await
    }

    /// Lists the SKUs of an offer.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_skus(&self, publisher: &str, offer: &str) -> Result<Vec<ImageArtifact>> {
        let path = format!(
            "{}/{publisher}/artifacttypes/vmimage/offers/{offer}/skus",
            self.base()
        );
        self.artifacts(&path).await
    }

    /// Lists the versions of a SKU.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list_versions(
        &self,
        publisher: &str,
        offer: &str,
        sku: &str,
    ) -> Result<Vec<ImageArtifact>> {
        let path = format!(
            "{}/{publisher}/artifacttypes/vmimage/offers/{offer}/skus/{sku}/versions",
            self.base()
        );
        self.artifacts(&path).await
    }
}

#[cfg(test)]
mod tests {
    use crate::azure::client::tests::client_for;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const BASE: &str = "/subscriptions/sub/providers/Microsoft.Compute/locations/westeurope/publishers";

    #[tokio::test]
    async fn test_catalog_levels() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(format!("{BASE}/Canonical/artifacttypes/vmimage/offers")))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "UbuntuServer", "location": "westeurope", "id": "offer-id"}
            ])))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!(
                "{BASE}/Canonical/artifacttypes/vmimage/offers/UbuntuServer/skus/16.04-LTS/versions"
            )))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {"name": "16.04.201612140", "location": "westeurope"},
                {"name": "16.04.201701130", "location": "westeurope"}
            ])))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let images = client.os_images("westeurope");
        let offers = images.list_offers("Canonical").await.expect("offers");
        assert_eq!(offers[0].name, "UbuntuServer");

        let versions = images
            .list_versions("Canonical", "UbuntuServer", "16.04-LTS")
            .await
            .expect("versions");
        assert_eq!(versions.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_publisher_is_empty() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let offers = client
            .os_images("westeurope")
            .list_offers("Nobody")
            .await
            .expect("no error");
        assert!(offers.is_empty());
    }
}
