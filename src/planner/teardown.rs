//! Teardown plans: deleting a node's resources in reverse dependency order.
//!
//! Each step names one resource and the steps that must have reclaimed their
//! resource first. A step whose dependency is still present is not attempted;
//! it is reported as remaining together with the reason.

use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::error::{ProvisionError, Result};

/// Kinds of resources that can be torn down.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResourceKind {
    /// Azure virtual machine.
    VirtualMachine,
    /// Azure network interface card.
    NetworkInterface,
    /// Azure public IP address.
    PublicIpAddress,
    /// Azure network security group.
    SecurityGroup,
    /// Azure VHD disk blob.
    DiskBlob,
    /// `ProfitBricks` server.
    Server,
    /// `ProfitBricks` volume.
    Volume,
}

/// A resource to reclaim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResourceRef {
    /// Resource kind.
    pub kind: ResourceKind,
    /// Resource name.
    pub name: String,
    /// Provider address of the resource (ARM id, blob URI, `<dc>/<id>`).
    pub id: String,
}

/// A single teardown step.
#[derive(Debug, Clone)]
pub struct TeardownStep {
    /// Resource to reclaim.
    pub resource: ResourceRef,
    /// Steps that must succeed first.
    pub dependencies: Vec<usize>,
}

/// Ordered teardown for one node.
#[derive(Debug, Clone)]
pub struct TeardownPlan {
    /// Node being torn down.
    pub node: String,
    /// Steps in execution order.
    pub steps: Vec<TeardownStep>,
}

/// A resource that is still there after teardown.
#[derive(Debug, Clone, Serialize)]
pub struct RemainingResource {
    /// The resource.
    pub resource: ResourceRef,
    /// Why it remains.
    pub reason: String,
}

/// Outcome of a teardown.
#[derive(Debug, Clone, Serialize)]
pub struct CleanupReport {
    /// Node that was torn down.
    pub node: String,
    /// Resources confirmed gone.
    pub reclaimed: Vec<ResourceRef>,
    /// Resources still present.
    pub remaining: Vec<RemainingResource>,
}

/// Deletes single resources and waits for them to disappear.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait Reclaimer: Send + Sync {
    /// Deletes `resource` and waits until it is gone.
    ///
    /// Returns `Ok(true)` once the resource no longer exists (including when
    /// it was already absent) and `Ok(false)` if it is still present when the
    /// deadline passes.
    async fn reclaim(&self, resource: &ResourceRef) -> Result<bool>;
}

impl ResourceRef {
    /// Creates a resource reference.
    #[must_use]
    pub fn new(kind: ResourceKind, name: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            id: id.into(),
        }
    }
}

impl TeardownPlan {
    /// Creates an empty plan.
    #[must_use]
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step and returns its index.
    ///
    /// Dependencies on steps that do not exist yet are ignored.
    pub fn push(&mut self, resource: ResourceRef, dependencies: Vec<usize>) -> usize {
        let index = self.steps.len();
        let dependencies = dependencies.into_iter().filter(|d| *d < index).collect();
        self.steps.push(TeardownStep {
            resource,
            dependencies,
        });
        index
    }

    /// Returns true if there is nothing to tear down.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the resources in execution order.
    pub fn resources(&self) -> impl Iterator<Item = &ResourceRef> {
        self.steps.iter().map(|s| &s.resource)
    }

    /// Executes the plan with `reclaimer`.
    ///
    /// Unlike creation, teardown keeps going after a failure so that
    /// independent resources are still reclaimed.
    pub async fn execute(&self, reclaimer: &dyn Reclaimer) -> CleanupReport {
        info!("Tearing down {} ({} resources)", self.node, self.steps.len());

        let mut report = CleanupReport {
            node: self.node.clone(),
            reclaimed: Vec::new(),
            remaining: Vec::new(),
        };
        let mut failed: HashSet<usize> = HashSet::new();

        for (idx, step) in self.steps.iter().enumerate() {
            let resource = &step.resource;

            if let Some(dep) = step.dependencies.iter().find(|d| failed.contains(d)) {
                let blocker = &self.steps[*dep].resource;
                warn!("Not deleting {} {}: {} {} remains", resource.kind, resource.name, blocker.kind, blocker.name);
                failed.insert(idx);
                report.remaining.push(RemainingResource {
                    resource: resource.clone(),
                    reason: format!("{} {} still exists", blocker.kind, blocker.name),
                });
                continue;
            }

            debug!("Deleting {} {}", resource.kind, resource.name);
            match reclaimer.reclaim(resource).await {
                Ok(true) => report.reclaimed.push(resource.clone()),
                Ok(false) => {
                    warn!("{} {} still there after deleting", resource.kind, resource.name);
                    failed.insert(idx);
                    report.remaining.push(RemainingResource {
                        resource: resource.clone(),
                        reason: String::from("still present after the deletion deadline"),
                    });
                }
                Err(e) => {
                    warn!("Failed to delete {} {}: {e}", resource.kind, resource.name);
                    failed.insert(idx);
                    report.remaining.push(RemainingResource {
                        resource: resource.clone(),
                        reason: e.to_string(),
                    });
                }
            }
        }

        report
    }
}

impl CleanupReport {
    /// Returns true if nothing remains.
    #[must_use]
    pub const fn is_clean(&self) -> bool {
        self.remaining.is_empty()
    }

    /// Converts leftovers into an error.
    ///
    /// # Errors
    ///
    /// Returns [`ProvisionError::ResourcesRemain`] if anything remains.
    pub fn into_result(self) -> Result<()> {
        if self.is_clean() {
            return Ok(());
        }

        let remaining = self
            .remaining
            .iter()
            .map(|r| format!("{} {}", r.resource.kind, r.resource.name))
            .collect::<Vec<_>>()
            .join(", ");
        Err(ProvisionError::ResourcesRemain {
            node: self.node,
            remaining,
        }
        .into())
    }
}

impl std::fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::VirtualMachine => "virtual machine",
            Self::NetworkInterface => "network interface",
            Self::PublicIpAddress => "public IP",
            Self::SecurityGroup => "security group",
            Self::DiskBlob => "disk",
            Self::Server => "server",
            Self::Volume => "volume",
        };
        write!(f, "{s}")
    }
}

impl std::fmt::Display for CleanupReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} reclaimed, {} remaining",
            self.node,
            self.reclaimed.len(),
            self.remaining.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CloudportError;
    use std::sync::{Arc, Mutex};

    fn azure_plan() -> TeardownPlan {
        let mut plan = TeardownPlan::new("web-1a2b3c");
        let vm = plan.push(
            ResourceRef::new(ResourceKind::VirtualMachine, "web-1a2b3c", "vm-id"),
            vec![],
        );
        let nic = plan.push(
            ResourceRef::new(ResourceKind::NetworkInterface, "nic-web-1a2b3c", "nic-id"),
            vec![vm],
        );
        plan.push(
            ResourceRef::new(ResourceKind::PublicIpAddress, "public-address-web-1a2b3c", "ip-id"),
            vec![nic],
        );
        plan.push(
            ResourceRef::new(ResourceKind::DiskBlob, "web-1a2b3c.vhd", "https://blob/vhds/web-1a2b3c.vhd"),
            vec![vm],
        );
        plan
    }

    #[tokio::test]
    async fn test_reclaims_in_order() {
        let order = Arc::new(Mutex::new(Vec::new()));
        let seen = Arc::clone(&order);
        let mut reclaimer = MockReclaimer::new();
        reclaimer.expect_reclaim().times(4).returning(move |r| {
            seen.lock().unwrap().push(r.kind);
            Ok(true)
        });

        let report = azure_plan().execute(&reclaimer).await;

        assert!(report.is_clean());
        assert_eq!(report.reclaimed.len(), 4);
        assert_eq!(
            *order.lock().unwrap(),
            vec![
                ResourceKind::VirtualMachine,
                ResourceKind::NetworkInterface,
                ResourceKind::PublicIpAddress,
                ResourceKind::DiskBlob,
            ]
        );
        assert!(report.into_result().is_ok());
    }

    #[tokio::test]
    async fn test_dependents_of_stuck_vm_remain() {
        let mut reclaimer = MockReclaimer::new();
        reclaimer
            .expect_reclaim()
            .withf(|r| r.kind == ResourceKind::VirtualMachine)
            .times(1)
            .returning(|_| Ok(false));

        let report = azure_plan().execute(&reclaimer).await;

        assert!(report.reclaimed.is_empty());
        assert_eq!(report.remaining.len(), 4);
        assert!(report.remaining[1].reason.contains("virtual machine web-1a2b3c"));

        let err = report.into_result().expect_err("resources remain");
        assert!(err
            .to_string()
            .contains("server(web-1a2b3c) and its resources still there after deleting!?"));
    }

    #[tokio::test]
    async fn test_independent_branch_still_reclaimed() {
        let mut reclaimer = MockReclaimer::new();
        reclaimer.expect_reclaim().returning(|r| match r.kind {
            ResourceKind::NetworkInterface => Err(CloudportError::internal("conflict")),
            _ => Ok(true),
        });

        let report = azure_plan().execute(&reclaimer).await;

        let reclaimed: Vec<ResourceKind> = report.reclaimed.iter().map(|r| r.kind).collect();
        assert_eq!(reclaimed, vec![ResourceKind::VirtualMachine, ResourceKind::DiskBlob]);
        assert_eq!(report.remaining.len(), 2);
        assert!(report.remaining[0].reason.contains("conflict"));
    }

    #[test]
    fn test_forward_dependencies_ignored() {
        let mut plan = TeardownPlan::new("n");
        plan.push(ResourceRef::new(ResourceKind::Server, "s", "dc/s"), vec![3]);
        assert!(plan.steps[0].dependencies.is_empty());
    }
}
