//! Snapshot operations.

use crate::error::Result;
use crate::profitbricks::binder::UpdateSnapshot;
use crate::profitbricks::client::{ProfitBricksClient, Queued};
use crate::profitbricks::types::Snapshot;

/// Snapshots of the account.
#[derive(Debug, Clone, Copy)]
pub struct SnapshotApi<'a> {
    client: &'a ProfitBricksClient,
}

impl<'a> SnapshotApi<'a> {
    pub(super) const fn new(client: &'a ProfitBricksClient) -> Self {
        Self { client }
    }

    /// Lists snapshots.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<Snapshot>> {
        self.client.list("/snapshots", 1).await
    }

    /// Gets a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, id: &str) -> Result<Option<Snapshot>> {
        self.client.get(&format!("/snapshots/{id}"), 1).await
    }

    /// Changes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the payload is invalid or the request fails.
    pub async fn update(&self, payload: &UpdateSnapshot) -> Result<Queued<Snapshot>> {
        self.client.send(payload).await
    }

    /// Deletes a snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, id: &str) -> Result<Option<String>> {
        self.client.delete(&format!("/snapshots/{id}")).await
    }
}

#[cfg(test)]
mod tests {
    use crate::profitbricks::binder::UpdateSnapshot;
    use crate::profitbricks::client::tests::client_for;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_update_patches_flat_body() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/cloudapi/v4/snapshots/snap-1"))
            .and(body_json(serde_json::json!({"description": "nightly", "nicHotPlug": true})))
            .respond_with(ResponseTemplate::new(202).set_body_json(serde_json::json!({
                "id": "snap-1",
                "properties": {"name": "golden", "description": "nightly", "size": 10.0}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let updated = client
            .snapshots()
            .update(&UpdateSnapshot {
                id: String::from("snap-1"),
                description: Some(String::from("nightly")),
                nic_hot_plug: Some(true),
                ..UpdateSnapshot::default()
            })
            .await
            .expect("updated");
        assert_eq!(updated.resource.properties.name.as_deref(), Some("golden"));
    }
}
