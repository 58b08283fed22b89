//! Shared resources every node of a resource group relies on.
//!
//! Before nodes are created the group itself, the default virtual network
//! and subnet, and the group's storage account must exist. They are looked up
//! first and only created when missing, so preparing a group twice is cheap.

use tracing::{debug, info};

use crate::compute::Poller;
use crate::config::{storage_account_name, AzureConfig};
use crate::error::Result;

use super::client::ArmClient;
use super::predicates;
use super::types::{
    AddressSpace, StorageAccountCreate, StorageAccountCreateProperties, Subnet, SubnetProperties,
    VirtualNetwork, VirtualNetworkProperties,
};

/// Replication of storage accounts created for node disks.
const STORAGE_ACCOUNT_TYPE: &str = "Standard_LRS";

/// What a prepared group provides to the nodes created in it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupResources {
    /// Id of the subnet NICs attach to.
    pub subnet_id: String,
    /// Blob endpoint holding the node disks, with a trailing slash.
    pub blob: String,
}

/// Looks up or creates the shared resources of the configured group.
#[derive(Debug, Clone, Copy)]
pub struct ResourcePreparer<'a> {
    client: &'a ArmClient,
    config: &'a AzureConfig,
}

impl<'a> ResourcePreparer<'a> {
    /// Creates a preparer for the configured resource group.
    #[must_use]
    pub const fn new(client: &'a ArmClient, config: &'a AzureConfig) -> Self {
        Self { client, config }
    }

    /// Ensures everything nodes in `location` need.
    ///
    /// # Errors
    ///
    /// Returns an error if a resource cannot be read or created, or if the
    /// storage account does not become ready in time.
    pub async fn ensure(&self, location: &str) -> Result<GroupResources> {
        self.ensure_resource_group(location).await?;
        let subnet_id = self.ensure_subnet(location).await?;
        let blob = self.ensure_storage_account(location).await?;
        Ok(GroupResources { subnet_id, blob })
    }

    async fn ensure_resource_group(&self, location: &str) -> Result<()> {
        let groups = self.client.resource_groups();
        let name = &self.config.resource_group;
        if groups.get(name).await?.is_some() {
            debug!("Resource group {name} exists");
            return Ok(());
        }
        info!("Creating resource group {name} in {location}");
        groups.create(name, location, &self.config.tags).await?;
        Ok(())
    }

    async fn ensure_subnet(&self, location: &str) -> Result<String> {
        let group = self.config.resource_group.as_str();
        let defaults = &self.config.network;
        let networks = self.client.virtual_networks(group);

        let subnet = if networks.get(&defaults.virtual_network).await?.is_some() {
            let subnets = self.client.subnets(group, &defaults.virtual_network);
            match subnets.get(&defaults.subnet).await? {
                Some(subnet) => subnet,
                None => {
                    info!("Creating subnet {} in {}", defaults.subnet, defaults.virtual_network);
                    subnets.create_or_update(&self.default_subnet()).await?
                }
            }
        } else {
            info!("Creating virtual network {} in {location}", defaults.virtual_network);
            let network = VirtualNetwork {
                id: String::new(),
                name: defaults.virtual_network.clone(),
                location: location.to_string(),
                tags: self.config.tags.clone(),
                properties: VirtualNetworkProperties {
                    provisioning_state: None,
                    address_space: AddressSpace {
                        address_prefixes: vec![defaults.address_space.clone()],
                    },
                    subnets: vec![self.default_subnet()],
                },
            };
            let created = networks.create_or_update(&network).await?;
            created
                .properties
                .subnets
                .into_iter()
                .find(|s| s.name == defaults.subnet)
                .unwrap_or_else(|| self.default_subnet())
        };

        Ok(subnet.id.unwrap_or_else(|| self.subnet_id()))
    }

    async fn ensure_storage_account(&self, location: &str) -> Result<String> {
        let group = self.config.resource_group.as_str();
        let name = storage_account_name(&self.config.subscription_id, group, location);
        let accounts = self.client.storage_accounts(group);
        let poller = Poller::for_operations(&self.config.timeouts);

        let account = match accounts.get(&name).await? {
            Some(account) if account.is_ready() => account,
            Some(_) => predicates::storage_account_ready(self.client, group, &name, &poller).await?,
            None => {
                info!("Creating storage account {name} in {location}");
                let request = StorageAccountCreate {
                    location: location.to_string(),
                    tags: self.config.tags.clone(),
                    properties: StorageAccountCreateProperties {
                        account_type: String::from(STORAGE_ACCOUNT_TYPE),
                    },
                };
                if let Some(uri) = accounts.create(&name, &request).await? {
                    predicates::operation_completed(self.client, &uri, &poller).await?;
                }
                predicates::storage_account_ready(self.client, group, &name, &poller).await?
            }
        };

        let endpoint = account
            .blob_endpoint()
            .map_or_else(|| self.config.blob_endpoint_for(&name), ToString::to_string);
        Ok(with_trailing_slash(endpoint))
    }

    fn default_subnet(&self) -> Subnet {
        Subnet {
            id: None,
            name: self.config.network.subnet.clone(),
            properties: SubnetProperties {
                address_prefix: self.config.network.subnet_prefix.clone(),
                ..SubnetProperties::default()
            },
        }
    }

    fn subnet_id(&self) -> String {
        let network = &self.config.network;
        self.client.resource_path(
            &self.config.resource_group,
            "Microsoft.Network",
            &format!("virtualNetworks/{}/subnets/{}", network.virtual_network, network.subnet),
        )
    }
}

fn with_trailing_slash(mut endpoint: String) -> String {
    if !endpoint.ends_with('/') {
        endpoint.push('/');
    }
    endpoint
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::azure::client::tests::config_for;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const GROUP_PATH: &str = "/subscriptions/sub/resourceGroups/group";
    const VNET_PATH: &str = "/subscriptions/sub/resourceGroups/group/providers/Microsoft.Network/virtualNetworks/cloudport-virtualnetwork";

    fn storage_path() -> String {
        format!(
            "{GROUP_PATH}/providers/Microsoft.Storage/storageAccounts/{}",
            storage_account_name("sub", "group", "westeurope")
        )
    }

    fn subnet_json() -> serde_json::Value {
        serde_json::json!({
            "id": format!("{VNET_PATH}/subnets/cloudport-subnet"),
            "name": "cloudport-subnet",
            "properties": {"addressPrefix": "10.0.0.0/24", "provisioningState": "Succeeded"}
        })
    }

    #[tokio::test]
    async fn test_existing_resources_are_reused() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(GROUP_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "group", "location": "westeurope"
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(VNET_PATH))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "cloudport-virtualnetwork",
                "location": "westeurope",
                "properties": {"addressSpace": {"addressPrefixes": ["10.0.0.0/16"]}}
            })))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("{VNET_PATH}/subnets/cloudport-subnet")))
            .respond_with(ResponseTemplate::new(200).set_body_json(subnet_json()))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(storage_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "stor",
                "location": "westeurope",
                "properties": {
                    "provisioningState": "Succeeded",
                    "primaryEndpoints": {"blob": "https://stor.blob.core.windows.net"}
                }
            })))
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(500))
            .expect(0)
            .mount(&server)
            .await;

        let config = config_for(&server);
        let client = ArmClient::new(&config).expect("client");
        let prepared = ResourcePreparer::new(&client, &config)
            .ensure("westeurope")
            .await
            .expect("prepared");

        assert_eq!(prepared.subnet_id, format!("{VNET_PATH}/subnets/cloudport-subnet"));
        assert_eq!(prepared.blob, "https://stor.blob.core.windows.net/");
    }

    #[tokio::test]
    async fn test_missing_resources_are_created() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path(GROUP_PATH))
            .and(body_partial_json(serde_json::json!({"location": "westeurope"})))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "name": "group", "location": "westeurope"
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(VNET_PATH))
            .and(body_partial_json(serde_json::json!({
                "properties": {"subnets": [{"name": "cloudport-subnet"}]}
            })))
            .respond_with(ResponseTemplate::new(201).set_body_json(serde_json::json!({
                "name": "cloudport-virtualnetwork",
                "location": "westeurope",
                "properties": {
                    "addressSpace": {"addressPrefixes": ["10.0.0.0/16"]},
                    "subnets": [subnet_json()]
                }
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(storage_path()))
            .respond_with(
                ResponseTemplate::new(202)
                    .insert_header("Location", format!("{}/operations/storage", server.uri()).as_str()),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/operations/storage"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(storage_path()))
            .respond_with(ResponseTemplate::new(404))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(storage_path()))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "name": "stor",
                "location": "westeurope",
                "properties": {"provisioningState": "Succeeded"}
            })))
            .mount(&server)
            .await;

        let config = config_for(&server);
        let client = ArmClient::new(&config).expect("client");
        let prepared = ResourcePreparer::new(&client, &config)
            .ensure("westeurope")
            .await
            .expect("prepared");

        assert!(prepared.subnet_id.ends_with("/subnets/cloudport-subnet"));
        let account = storage_account_name("sub", "group", "westeurope");
        assert_eq!(prepared.blob, format!("{}/{account}/", server.uri()));
    }
}
