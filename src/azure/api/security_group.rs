//! Network security group operations.

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::NetworkSecurityGroup;
use crate::error::Result;

const NAMESPACE: &str = "Microsoft.Network";

/// Network security groups of one resource group.
#[derive(Debug, Clone, Copy)]
pub struct NetworkSecurityGroupApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
}

impl<'a> NetworkSecurityGroupApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str) -> Self {
        Self { client, group }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .resource_path(self.group, NAMESPACE, &format!("networkSecurityGroups/{name}"))
    }

    fn version(&self) -> &str {
        &self.client.api_versions().network
    }

    /// Creates or updates a security group with its rules.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the group.
    pub async fn create_or_update(&self, security_group: &NetworkSecurityGroup) -> Result<NetworkSecurityGroup> {
        self.client
            .put(&self.path(&security_group.name), self.version(), security_group)
            .await
    }

    /// Gets a security group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<NetworkSecurityGroup>> {
        self.client.get(&self.path(name), self.version()).await
    }

    /// Lists the security groups of the resource group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<NetworkSecurityGroup>> {
        let path = self
            .client
            .resource_path(self.group, NAMESPACE, "networkSecurityGroups");
        self.client.list(&path, self.version()).await
    }

    /// Deletes a security group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn delete(&self, name: &str) -> Result<DeleteOutcome> {
        self.client.delete(&self.path(name), self.version()).await
    }
}

#[cfg(test)]
mod tests {
    use crate::azure::client::tests::client_for;
    use crate::azure::client::DeleteOutcome;
    use crate::azure::types::{NetworkSecurityGroup, NetworkSecurityGroupProperties, NetworkSecurityRule};
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const NSG_PATH: &str =
        "/subscriptions/sub/resourceGroups/group/providers/Microsoft.Network/networkSecurityGroups/nsg-web";

    #[tokio::test]
    async fn test_create_with_rules() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(NSG_PATH))
            .and(body_partial_json(serde_json::json!({
                "properties": {"securityRules": [
                    {"name": "tcp-22", "properties": {"destinationPortRange": "22", "priority": 1000}}
                ]}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": NSG_PATH,
                "name": "nsg-web",
                "location": "westeurope",
                "properties": {"provisioningState": "Updating", "securityRules": []}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let nsg = NetworkSecurityGroup {
            id: String::new(),
            name: String::from("nsg-web"),
            location: String::from("westeurope"),
            etag: None,
            tags: HashMap::new(),
            properties: NetworkSecurityGroupProperties {
                provisioning_state: None,
                security_rules: vec![NetworkSecurityRule::allow_inbound_tcp(22, 1000)],
            },
        };
        let created = client
            .security_groups("group")
            .create_or_update(&nsg)
            .await
            .expect("created");
        assert_eq!(created.id, NSG_PATH);
    }

    #[tokio::test]
    async fn test_delete_missing_group() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .and(path(NSG_PATH))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "error": {"code": "ResourceNotFound", "message": "not found"}
            })))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let outcome = client.security_groups("group").delete("nsg-web").await.expect("deleted");
        assert_eq!(outcome, DeleteOutcome::NotFound);
    }
}
