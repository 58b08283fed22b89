//! Generic compute service built on a provider adapter.

use tracing::{error, info, warn};

use crate::config::{is_valid_group_name, node_name};
use crate::error::{ProvisionError, Result};
use crate::planner::StepSummary;

use super::adapter::ComputeServiceAdapter;
use super::metadata::{
    HardwareMetadata, ImageMetadata, LocationMetadata, NodeMetadata, NodeStatus,
};
use super::poll::Poller;
use super::template::{LoginCredentials, Template};

/// A node created by [`ComputeService::create_nodes_in_group`].
#[derive(Debug, Clone)]
pub struct CreatedNode {
    /// The node once it reported running.
    pub node: NodeMetadata,
    /// Credentials it was created with.
    pub credentials: Option<LoginCredentials>,
}

/// Compute service over a single provider adapter.
#[derive(Debug)]
pub struct ComputeService<A> {
    adapter: A,
    running: Poller,
}

impl<A: ComputeServiceAdapter> ComputeService<A> {
    /// Creates a service; `running` bounds the wait for new nodes.
    #[must_use]
    pub const fn new(adapter: A, running: Poller) -> Self {
        Self { adapter, running }
    }

    /// Returns the underlying adapter.
    #[must_use]
    pub const fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Creates `count` nodes in `group` and waits for each to run.
    ///
    /// The template is prepared once for the group. A node that fails to come
    /// up is destroyed before the error is returned; nodes created before it
    /// are kept.
    ///
    /// # Errors
    ///
    /// Returns an error for an invalid group name, or the first creation or
    /// readiness failure.
    pub async fn create_nodes_in_group(
        &self,
        group: &str,
        count: u32,
        template: Template,
    ) -> Result<Vec<CreatedNode>> {
        if !is_valid_group_name(group) {
            return Err(ProvisionError::InvalidTemplate {
                message: format!(
                    "group '{group}' must be lowercase alphanumeric with single hyphens, starting with a letter"
                ),
            }
            .into());
        }

        if count == 0 {
            return Ok(Vec::new());
        }

        info!("Creating {count} node(s) in group {group}");
        let template = self.adapter.prepare_template(group, template).await?;

        let mut created = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let name = node_name(group);
            let result = self
                .adapter
                .create_node_with_group_encoded_into_name(group, &name, &template)
                .await?;

            let node_id = result.node_id.clone();
            match self.wait_until_running(&node_id).await {
                Ok(node) => {
                    info!("Node {node_id} is running");
                    created.push(CreatedNode {
                        node,
                        credentials: result.credentials,
                    });
                }
                Err(e) => {
                    error!("Node {node_id} did not come up: {e}");
                    if let Err(cleanup) = self.adapter.destroy_node(&node_id).await {
                        warn!("Failed to destroy node {node_id} after failed start: {cleanup}");
                    }
                    return Err(e);
                }
            }
        }

        Ok(created)
    }

    /// Describes how a node of `group` would be created from `template`.
    ///
    /// # Errors
    ///
    /// Returns an error if the adapter cannot plan the template.
    pub fn plan_creation(&self, group: &str, template: &Template) -> Result<Vec<StepSummary>> {
        self.adapter.describe_creation(&node_name(group), template)
    }

    /// Waits until the node reports running.
    async fn wait_until_running(&self, id: &str) -> Result<NodeMetadata> {
        let ready = self
            .running
            .until(&format!("node {id} running"), || async {
                match self.adapter.get_node(id).await? {
                    Some(node) => {
                        let metadata: NodeMetadata = node.into();
                        match metadata.status {
                            NodeStatus::Running => Ok(true),
                            NodeStatus::Error | NodeStatus::Terminated => {
                                Err(ProvisionError::StepFailed {
                                    node: id.to_string(),
                                    step: String::from("wait for running"),
                                    reason: format!("node entered {}", metadata.status),
                                }
                                .into())
                            }
                            _ => Ok(false),
                        }
                    }
                    None => Ok(false),
                }
            })
            .await?;

        if !ready {
            return Err(ProvisionError::timeout(format!("node {id}"), "RUNNING").into());
        }

        self.get_node(id)
            .await?
            .ok_or_else(|| ProvisionError::InvalidNodeId { id: id.to_string() }.into())
    }

    /// Destroys a node and its resources.
    ///
    /// # Errors
    ///
    /// Returns an error if anything created for the node remains.
    pub async fn destroy_node(&self, id: &str) -> Result<()> {
        info!("Destroying node {id}");
        self.adapter.destroy_node(id).await
    }

    /// Destroys every node of a group and returns their ids.
    ///
    /// # Errors
    ///
    /// Returns the first destroy failure.
    pub async fn destroy_nodes_in_group(&self, group: &str) -> Result<Vec<String>> {
        let ids: Vec<String> = self
            .list_nodes()
            .await?
            .into_iter()
            .filter(|n| n.group.as_deref() == Some(group))
            .map(|n| n.id)
            .collect();

        for id in &ids {
            self.destroy_node(id).await?;
        }
        Ok(ids)
    }

    /// Fetches a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn get_node(&self, id: &str) -> Result<Option<NodeMetadata>> {
        Ok(self.adapter.get_node(id).await?.map(Into::into))
    }

    /// Lists every node.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn list_nodes(&self) -> Result<Vec<NodeMetadata>> {
        Ok(self.adapter.list_nodes().await?.into_iter().map(Into::into).collect())
    }

    /// Lists the given nodes.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn list_nodes_by_ids(&self, ids: &[String]) -> Result<Vec<NodeMetadata>> {
        Ok(self
            .adapter
            .list_nodes_by_ids(ids)
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Lists hardware profiles.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn list_hardware_profiles(&self) -> Result<Vec<HardwareMetadata>> {
        Ok(self
            .adapter
            .list_hardware_profiles()
            .await?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    /// Lists images.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn list_images(&self) -> Result<Vec<ImageMetadata>> {
        Ok(self.adapter.list_images().await?.into_iter().map(Into::into).collect())
    }

    /// Resolves an image id.
    ///
    /// # Errors
    ///
    /// Returns an error if the id is malformed or the provider call fails.
    pub async fn get_image(&self, id: &str) -> Result<Option<ImageMetadata>> {
        Ok(self.adapter.get_image(id).await?.map(Into::into))
    }

    /// Lists locations.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn list_locations(&self) -> Result<Vec<LocationMetadata>> {
        Ok(self.adapter.list_locations().await?.into_iter().map(Into::into).collect())
    }

    /// Reboots a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn reboot_node(&self, id: &str) -> Result<()> {
        self.adapter.reboot_node(id).await
    }

    /// Stops a node.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn suspend_node(&self, id: &str) -> Result<()> {
        self.adapter.suspend_node(id).await
    }

    /// Starts a stopped node.
    ///
    /// # Errors
    ///
    /// Returns an error if the provider call fails.
    pub async fn resume_node(&self, id: &str) -> Result<()> {
        self.adapter.resume_node(id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::{NodeAndInitialCredentials, OsFamily};
    use crate::error::CloudportError;
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    #[derive(Debug, Clone)]
    struct FakeNode {
        id: String,
        group: String,
        status: NodeStatus,
    }

    impl From<FakeNode> for NodeMetadata {
        fn from(node: FakeNode) -> Self {
            Self {
                id: node.id.clone(),
                name: node.id,
                group: Some(node.group),
                status: node.status,
                location: None,
                hardware_id: None,
                image_id: None,
                public_addresses: Vec::new(),
                private_addresses: Vec::new(),
            }
        }
    }

    struct Unused;

    impl From<Unused> for HardwareMetadata {
        fn from(_: Unused) -> Self {
            unreachable!()
        }
    }

    impl From<Unused> for ImageMetadata {
        fn from(_: Unused) -> Self {
            unreachable!()
        }
    }

    impl From<Unused> for LocationMetadata {
        fn from(_: Unused) -> Self {
            unreachable!()
        }
    }

    /// In-memory adapter whose nodes start in `initial` status.
    struct FakeAdapter {
        initial: NodeStatus,
        nodes: Mutex<HashMap<String, FakeNode>>,
        prepared: Mutex<u32>,
        destroyed: Mutex<Vec<String>>,
    }

    impl FakeAdapter {
        fn new(initial: NodeStatus) -> Self {
            Self {
                initial,
                nodes: Mutex::new(HashMap::new()),
                prepared: Mutex::new(0),
                destroyed: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl ComputeServiceAdapter for FakeAdapter {
        type Node = FakeNode;
        type Hardware = Unused;
        type Image = Unused;
        type Location = Unused;

        async fn prepare_template(&self, _group: &str, template: Template) -> Result<Template> {
            *self.prepared.lock().unwrap() += 1;
            Ok(template)
        }

        fn describe_creation(&self, name: &str, _template: &Template) -> Result<Vec<StepSummary>> {
            Ok(vec![StepSummary {
                index: 0,
                description: format!("create {name}"),
                dependencies: Vec::new(),
            }])
        }

        async fn create_node_with_group_encoded_into_name(
            &self,
            group: &str,
            name: &str,
            _template: &Template,
        ) -> Result<NodeAndInitialCredentials<FakeNode>> {
            let node = FakeNode {
                id: name.to_string(),
                group: group.to_string(),
                status: self.initial,
            };
            self.nodes.lock().unwrap().insert(name.to_string(), node.clone());
            Ok(NodeAndInitialCredentials {
                node,
                node_id: name.to_string(),
                credentials: None,
            })
        }

        async fn list_hardware_profiles(&self) -> Result<Vec<Unused>> {
            Ok(Vec::new())
        }

        async fn list_images(&self) -> Result<Vec<Unused>> {
            Ok(Vec::new())
        }

        async fn get_image(&self, _id: &str) -> Result<Option<Unused>> {
            Ok(None)
        }

        async fn list_locations(&self) -> Result<Vec<Unused>> {
            Ok(Vec::new())
        }

        async fn get_node(&self, id: &str) -> Result<Option<FakeNode>> {
            Ok(self.nodes.lock().unwrap().get(id).cloned())
        }

        async fn destroy_node(&self, id: &str) -> Result<()> {
            self.nodes.lock().unwrap().remove(id);
            self.destroyed.lock().unwrap().push(id.to_string());
            Ok(())
        }

        async fn reboot_node(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn resume_node(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn suspend_node(&self, _id: &str) -> Result<()> {
            Ok(())
        }

        async fn list_nodes(&self) -> Result<Vec<FakeNode>> {
            Ok(self.nodes.lock().unwrap().values().cloned().collect())
        }

        async fn list_nodes_by_ids(&self, ids: &[String]) -> Result<Vec<FakeNode>> {
            Ok(self
                .nodes
                .lock()
                .unwrap()
                .values()
                .filter(|n| ids.contains(&n.id))
                .cloned()
                .collect())
        }
    }

    fn template() -> Template {
        Template::new(
            "westeurope",
            "Standard_A1",
            ImageMetadata {
                id: String::from("westeurope/Canonical/UbuntuServer/16.04-LTS"),
                provider_id: String::from("Canonical"),
                name: String::from("UbuntuServer"),
                version: String::from("16.04-LTS"),
                location: Some(String::from("westeurope")),
                os_family: OsFamily::Ubuntu,
                description: None,
                default_credentials: None,
            },
        )
    }

    fn poller() -> Poller {
        Poller::new(Duration::from_millis(40), Duration::from_millis(5))
    }

    #[tokio::test]
    async fn test_create_nodes_in_group() {
        let service = ComputeService::new(FakeAdapter::new(NodeStatus::Running), poller());
        let created = service
            .create_nodes_in_group("web", 2, template())
            .await
            .expect("nodes should be created");

        assert_eq!(created.len(), 2);
        assert!(created.iter().all(|c| c.node.name.starts_with("web-")));
        assert_eq!(*service.adapter().prepared.lock().unwrap(), 1);

        let destroyed = service
            .destroy_nodes_in_group("web")
            .await
            .expect("group should be destroyed");
        assert_eq!(destroyed.len(), 2);
        assert!(service.list_nodes().await.expect("list").is_empty());
    }

    #[tokio::test]
    async fn test_node_that_never_runs_is_destroyed() {
        let service = ComputeService::new(FakeAdapter::new(NodeStatus::Pending), poller());
        let result = service.create_nodes_in_group("web", 1, template()).await;

        assert!(matches!(
            result,
            Err(CloudportError::Provision(ProvisionError::Timeout { .. }))
        ));
        assert_eq!(service.adapter().destroyed.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_node_in_error_fails_fast() {
        let service = ComputeService::new(FakeAdapter::new(NodeStatus::Error), poller());
        let result = service.create_nodes_in_group("web", 1, template()).await;

        assert!(matches!(
            result,
            Err(CloudportError::Provision(ProvisionError::StepFailed { .. }))
        ));
    }

    #[tokio::test]
    async fn test_invalid_group_rejected() {
        let service = ComputeService::new(FakeAdapter::new(NodeStatus::Running), poller());
        let result = service.create_nodes_in_group("Web_Tier", 1, template()).await;
        assert!(matches!(
            result,
            Err(CloudportError::Provision(ProvisionError::InvalidTemplate { .. }))
        ));
        assert_eq!(*service.adapter().prepared.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_plan_creation_uses_group_name() {
        let service = ComputeService::new(FakeAdapter::new(NodeStatus::Running), poller());
        let steps = service.plan_creation("db", &template()).expect("plan");
        assert!(steps[0].description.starts_with("create db-"));
    }
}
