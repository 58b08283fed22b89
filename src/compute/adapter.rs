//! The seam between the generic compute service and a provider.

use async_trait::async_trait;

use crate::error::Result;
use crate::planner::StepSummary;

use super::metadata::{HardwareMetadata, ImageMetadata, LocationMetadata, NodeMetadata};
use super::template::{NodeAndInitialCredentials, Template};

/// Maps the compute service operations onto one provider's API.
///
/// Node ids are whatever the provider's [`get_node`](Self::get_node)
/// understands; they are returned in
/// [`NodeAndInitialCredentials::node_id`] when a node is created.
#[async_trait]
pub trait ComputeServiceAdapter: Send + Sync {
    /// Provider node type.
    type Node: Into<NodeMetadata> + Clone + Send + Sync;
    /// Provider hardware profile type.
    type Hardware: Into<HardwareMetadata> + Send;
    /// Provider image type.
    type Image: Into<ImageMetadata> + Send;
    /// Provider location type.
    type Location: Into<LocationMetadata> + Send;

    /// Ensures the shared resources a group needs exist and records them in
    /// the template options. Called once per group before nodes are created.
    async fn prepare_template(&self, _group: &str, template: Template) -> Result<Template> {
        Ok(template)
    }

    /// Describes the steps creating `name` from `template` would take.
    ///
    /// # Errors
    ///
    /// Returns an error if the template cannot be planned (for example an
    /// undecodable image id).
    fn describe_creation(&self, name: &str, template: &Template) -> Result<Vec<StepSummary>>;

    /// Creates a node whose name already encodes its group.
    async fn create_node_with_group_encoded_into_name(
        &self,
        group: &str,
        name: &str,
        template: &Template,
    ) -> Result<NodeAndInitialCredentials<Self::Node>>;

    /// Lists every hardware profile.
    async fn list_hardware_profiles(&self) -> Result<Vec<Self::Hardware>>;

    /// Lists every image.
    async fn list_images(&self) -> Result<Vec<Self::Image>>;

    /// Resolves an image id, `None` if it no longer exists.
    async fn get_image(&self, id: &str) -> Result<Option<Self::Image>>;

    /// Lists the locations nodes can be created in.
    async fn list_locations(&self) -> Result<Vec<Self::Location>>;

    /// Fetches a node, `None` if it does not exist.
    async fn get_node(&self, id: &str) -> Result<Option<Self::Node>>;

    /// Destroys a node and every resource created for it.
    async fn destroy_node(&self, id: &str) -> Result<()>;

    /// Reboots a node.
    async fn reboot_node(&self, id: &str) -> Result<()>;

    /// Starts a suspended node.
    async fn resume_node(&self, id: &str) -> Result<()>;

    /// Stops a node without destroying it.
    async fn suspend_node(&self, id: &str) -> Result<()>;

    /// Lists every node managed by this adapter.
    async fn list_nodes(&self) -> Result<Vec<Self::Node>>;

    /// Lists the nodes whose id is in `ids`.
    async fn list_nodes_by_ids(&self, ids: &[String]) -> Result<Vec<Self::Node>>;
}
