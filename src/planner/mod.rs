//! The sync planner: compiles a classified merge into a `SyncPlan`
//! with disjoint operation sets plus the metadata sync set.

mod build;
mod plan;

pub use build::{build_plan, infer_kind, plan as compute_plan};
pub use plan::{OperationKind, SyncPlan};
