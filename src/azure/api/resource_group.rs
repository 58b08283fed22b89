//! Resource group operations.

use serde::Serialize;
use std::collections::HashMap;

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::ResourceGroup;
use crate::error::Result;

/// Resource groups of the subscription.
#[derive(Debug, Clone, Copy)]
pub struct ResourceGroupApi<'a> {
    client: &'a ArmClient,
}

#[derive(Serialize)]
struct CreateResourceGroup<'a> {
    location: &'a str,
    tags: &'a HashMap<String, String>,
}

impl<'a> ResourceGroupApi<'a> {
    pub(super) const fn new(client: &'a ArmClient) -> Self {
        Self { client }
    }

    fn version(&self) -> &str {
        &self.client.api_versions().resources
    }

    /// Creates or updates a group.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the group.
    pub async fn create(
        &self,
        name: &str,
        location: &str,
        tags: &HashMap<String, String>,
    ) -> Result<ResourceGroup> {
        let body = CreateResourceGroup { location, tags };
        self.client
            .put(&self.client.group_path(name), self.version(), &body)
            .await
    }

    /// Gets a group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<ResourceGroup>> {
        self.client
            .get(&self.client.group_path(name), self.version())
            .await
    }

    /// Lists the groups.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<ResourceGroup>> {
        let path = format!("{}/resourceGroups", self.client.subscription_path());
        self.client.list(&path, self.version()).await
    }

    /// Deletes a group and everything in it.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.client
            .delete(&self.client.group_path(name), self.version())
            .await
    }
}

#[cfg(test)]
mod tests {
    use crate::azure::client::tests::client_for;
    use std::collections::HashMap;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_group() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/subscriptions/sub/resourceGroups/web"))
            .and(body_json(serde_json::json!({
                "location": "westeurope",
                "tags": {"owner": "ops"}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "/subscriptions/sub/resourceGroups/web",
                "name": "web",
                "location": "westeurope",
                "properties": {"provisioningState": "Succeeded"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let tags = HashMap::from([(String::from("owner"), String::from("ops"))]);
        let group = client
            .resource_groups()
            .create("web", "westeurope", &tags)
            .await
            .expect("created");
        assert_eq!(group.name, "web");
    }
}
