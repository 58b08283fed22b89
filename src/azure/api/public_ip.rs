//! Public IP address operations.

use crate::azure::client::{ArmClient, DeleteOutcome};
use crate::azure::types::PublicIpAddress;
use crate::error::Result;

const NAMESPACE: &str = "Microsoft.Network";

/// Public IP addresses of one resource group.
#[derive(Debug, Clone, Copy)]
pub struct PublicIpAddressApi<'a> {
    client: &'a ArmClient,
    group: &'a str,
}

impl<'a> PublicIpAddressApi<'a> {
    pub(super) const fn new(client: &'a ArmClient, group: &'a str) -> Self {
        Self { client, group }
    }

    fn path(&self, name: &str) -> String {
        self.client
            .resource_path(self.group, NAMESPACE, &format!("publicIPAddresses/{name}"))
    }

    fn version(&self) -> &str {
        &self.client.api_versions().network
    }

    /// Creates or updates an address.
    ///
    /// # Errors
    ///
    /// Returns an error if ARM rejects the address.
    pub async fn create_or_update(&self, address: &PublicIpAddress) -> Result<PublicIpAddress> {
        self.client
            .put(&self.path(&address.name), self.version(), address)
            .await
    }

    /// Gets an address.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn get(&self, name: &str) -> Result<Option<PublicIpAddress>> {
        self.client.get(&self.path(name), self.version()).await
    }

    /// Lists the addresses of the group.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn list(&self) -> Result<Vec<PublicIpAddress>> {
        let path = self
            .client
            .resource_path(self.group, NAMESPACE, "publicIPAddresses");
        self.client.list(&path, self.version()).await
    }

    /// Deletes an address.
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
    use crate::azure::types::{ProvisioningState, PublicIpAddress, PublicIpAddressProperties};
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_create_or_update() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(
                "/subscriptions/sub/resourceGroups/group/providers/Microsoft.Network/publicIPAddresses/public-address-web",
            ))
            .and(query_param("api-version", "2015-06-15"))
            .and(body_partial_json(serde_json::json!({
                "location": "westeurope",
                "properties": {"publicIPAllocationMethod": "Static", "idleTimeoutInMinutes": 4}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "id": "/subscriptions/sub/resourceGroups/group/providers/Microsoft.Network/publicIPAddresses/public-address-web",
                "name": "public-address-web",
                "location": "westeurope",
                "properties": {"provisioningState": "Updating", "publicIPAllocationMethod": "Static"}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let address = PublicIpAddress {
            id: String::new(),
            name: String::from("public-address-web"),
            location: String::from("westeurope"),
            etag: None,
            tags: HashMap::new(),
            properties: PublicIpAddressProperties {
                public_ip_allocation_method: String::from("Static"),
                idle_timeout_in_minutes: Some(4),
                ..PublicIpAddressProperties::default()
            },
        };
        let created = client
            .public_ips("group")
            .create_or_update(&address)
            .await
            .expect("created");
        assert_eq!(created.provisioning_state(), ProvisioningState::Updating);
        assert!(created.id.ends_with("/public-address-web"));
    }
}
