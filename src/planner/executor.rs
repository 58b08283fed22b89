//! Plan executor for creation plans.
//!
//! The executor walks a [`CreatePlan`] in order and hands each step, together
//! with the outputs of the steps before it, to a provider [`StepRunner`].

use async_trait::async_trait;
use tracing::{error, info};

use crate::error::{CloudportError, Result};

use super::plan::{CreatePlan, PlannedStep};

/// Runs individual steps of a creation plan.
#[async_trait]
pub trait StepRunner<K: Send + Sync>: Send + Sync {
    /// What a step produces (typically the created resource).
    type Output: Send + Sync;

    /// Runs one step. Outputs of completed earlier steps are available in
    /// `outputs` by step index.
    async fn run(&self, step: &PlannedStep<K>, outputs: &StepOutputs<Self::Output>)
    -> Result<Self::Output>;
}

/// Outputs of completed steps, indexed by step.
#[derive(Debug)]
pub struct StepOutputs<O> {
    slots: Vec<Option<O>>,
}

/// Result of executing a plan.
#[derive(Debug)]
pub struct ExecutionResult<O> {
    /// Outputs of the steps that completed.
    pub outputs: StepOutputs<O>,
    /// Number of steps that completed.
    pub completed: usize,
    /// Index of the step that failed, if any.
    pub failed_step: Option<usize>,
    /// Error of the failed step.
    pub failure: Option<CloudportError>,
}

/// Executor for creation plans. Execution stops at the first failed step.
#[derive(Debug, Default, Clone, Copy)]
pub struct PlanExecutor;

impl<O> StepOutputs<O> {
    fn with_len(len: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(len).collect(),
        }
    }

    /// Output of step `index`, if it completed.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&O> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    /// Takes the output of step `index`.
    pub fn take(&mut self, index: usize) -> Option<O> {
        self.slots.get_mut(index).and_then(Option::take)
    }
}

impl PlanExecutor {
    /// Creates a plan executor.
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Executes a creation plan.
    pub async fn execute<K, R>(&self, plan: &CreatePlan<K>, runner: &R) -> ExecutionResult<R::Output>
    where
        K: std::fmt::Display + Send + Sync,
        R: StepRunner<K>,
    {
        info!("Executing creation plan for {} with {} steps", plan.node, plan.steps.len());

        let mut outputs = StepOutputs::with_len(plan.steps.len());
        let mut completed = 0;

        for (idx, step) in plan.steps.iter().enumerate() {
            info!("Executing step {idx}: {step}");
            match runner.run(step, &outputs).await {
                Ok(output) => {
                    outputs.slots[idx] = Some(output);
                    completed += 1;
                }
                Err(e) => {
                    error!("Step {idx} ({step}) failed: {e}");
                    return ExecutionResult {
                        outputs,
                        completed,
                        failed_step: Some(idx),
                        failure: Some(e),
                    };
                }
            }
        }

        ExecutionResult {
            outputs,
            completed,
            failed_step: None,
            failure: None,
        }
    }
}

impl<O> ExecutionResult<O> {
    /// Returns true if every step succeeded.
    #[must_use]
    pub const fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}
