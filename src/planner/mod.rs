//! Planning module for node creation and teardown.
//!
//! Creating a node means creating several dependent provider resources in
//! order; destroying it means deleting them in the reverse order. Both are
//! expressed as plans with explicit dependency indices. Creation stops at the
//! first failed step; teardown carries on but skips the dependents of a
//! failed delete.

mod executor;
mod plan;
mod teardown;

pub use executor::{ExecutionResult, PlanExecutor, StepOutputs, StepRunner};
pub use plan::{CreatePlan, PlannedStep, StepSummary};
pub use teardown::{
    CleanupReport, Reclaimer, RemainingResource, ResourceKind, ResourceRef, TeardownPlan,
    TeardownStep,
};
