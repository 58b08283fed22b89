//! Creation plan types.
//!
//! A [`CreatePlan`] lists the steps that synthesize one node out of several
//! provider resources, in execution order, each with the indices of the steps
//! whose results it consumes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::error::{ProvisionError, Result};

/// An ordered creation plan for one node.
#[derive(Debug, Clone)]
pub struct CreatePlan<K> {
    /// When the plan was created.
    pub created_at: DateTime<Utc>,
    /// Node the plan creates.
    pub node: String,
    /// Planned steps in execution order.
    pub steps: Vec<PlannedStep<K>>,
}

/// A single planned step.
#[derive(Debug, Clone)]
pub struct PlannedStep<K> {
    /// Provider specific step kind.
    pub kind: K,
    /// Name of the resource the step produces.
    pub resource_name: String,
    /// Dependencies (step indices that must complete first).
    pub dependencies: Vec<usize>,
}

/// Printable description of a planned step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StepSummary {
    /// Step index.
    pub index: usize,
    /// What the step does.
    pub description: String,
    /// Steps it depends on.
    pub dependencies: Vec<usize>,
}

impl<K: std::fmt::Display> CreatePlan<K> {
    /// Creates an empty plan for a node.
    #[must_use]
    pub fn new(node: impl Into<String>) -> Self {
        Self {
            created_at: Utc::now(),
            node: node.into(),
            steps: Vec::new(),
        }
    }

    /// Appends a step and returns its index.
    ///
    /// # Errors
    ///
    /// Returns an error if a dependency does not refer to an earlier step.
    pub fn push(
        &mut self,
        kind: K,
        resource_name: impl Into<String>,
        dependencies: Vec<usize>,
    ) -> Result<usize> {
        let index = self.steps.len();
        if let Some(bad) = dependencies.iter().find(|d| **d >= index) {
            return Err(ProvisionError::InvalidTemplate {
                message: format!("step {index} of {} depends on later step {bad}", self.node),
            }
            .into());
        }

        self.steps.push(PlannedStep {
            kind,
            resource_name: resource_name.into(),
            dependencies,
        });
        Ok(index)
    }

    /// Returns true if the plan has no steps.
    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Returns the number of steps.
    #[must_use]
    pub const fn step_count(&self) -> usize {
        self.steps.len()
    }

    /// Describes every step.
    #[must_use]
    pub fn summary(&self) -> Vec<StepSummary> {
        self.steps
            .iter()
            .enumerate()
            .map(|(index, step)| StepSummary {
                index,
                description: step.to_string(),
                dependencies: step.dependencies.clone(),
            })
            .collect()
    }
}

impl<K: std::fmt::Display> std::fmt::Display for PlannedStep<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.kind, self.resource_name)
    }
}

impl<K: std::fmt::Display> std::fmt::Display for CreatePlan<K> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.steps.is_empty() {
            return write!(f, "Nothing to create");
        }

        writeln!(f, "Creation plan for {} ({} steps):", self.node, self.steps.len())?;
        for (i, step) in self.steps.iter().enumerate() {
            write!(f, "  {i}. {step}")?;
            if !step.dependencies.is_empty() {
                let deps: Vec<String> = step.dependencies.iter().map(ToString::to_string).collect();
                write!(f, " (after {})", deps.join(", "))?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}

impl std::fmt::Display for StepSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}. {}", self.index, self.description)
    }
}
