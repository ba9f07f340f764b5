//! Action graph execution.
//!
//! This module provides the entry points for running an [`ActionGraph`]. It handles:
//! - running every action reachable from a root at most once
//! - parallel execution of independent actions under a concurrency bound
//! - failure propagation: dependents of a failed action never run

mod scheduler;
pub mod types;

use std::sync::Arc;

use tracing::{debug, info};

use crate::action::{ActionGraph, ActionId};
use crate::error::BuildError;

use scheduler::Scheduler;

pub use types::{ActionState, ExecuteConfig, ExecuteReport};

/// Execute everything reachable from `root`.
///
/// Returns the root's result: `Ok` if every reachable action succeeded,
/// otherwise the first failure in dependency order.
///
/// # Errors
///
/// - `CycleDetected` if the graph contains a cycle; nothing is run.
/// - The error of the failed step otherwise.
pub async fn execute(graph: Arc<ActionGraph>, root: ActionId, config: &ExecuteConfig) -> Result<(), BuildError> {
  execute_with_report(graph, root, config).await?.into_result()
}

/// Execute everything reachable from `root` and report per-action outcomes.
///
/// The outer `Err` is reserved for graphs that cannot be executed at all;
/// step failures are reported in [`ExecuteReport::error`].
pub async fn execute_with_report(
  graph: Arc<ActionGraph>,
  root: ActionId,
  config: &ExecuteConfig,
) -> Result<ExecuteReport, BuildError> {
  graph.verify_acyclic()?;

  let reachable = graph.reachable(root);
  info!(
    actions = reachable.len(),
    parallelism = config.parallelism,
    root = %graph.name(root),
    "starting execution"
  );

  let scheduler = Arc::new(Scheduler::new(graph.clone(), config));
  let outcome = scheduler.clone().resolve(root).await;

  let mut report = ExecuteReport {
    error: outcome.err().map(|failure| failure.error),
    ..ExecuteReport::default()
  };

  for id in reachable {
    match scheduler.state(id) {
      ActionState::Succeeded => report.succeeded.push(id),
      ActionState::Failed(e) => report.failed.push((id, e)),
      ActionState::Skipped { failed_dependency, .. } => {
        report.skipped.insert(id, failed_dependency);
      }
      state => debug!(action = %graph.name(id), state = %state, "action left unfinished"),
    }
  }

  info!(
    succeeded = report.succeeded.len(),
    failed = report.failed.len(),
    skipped = report.skipped.len(),
    "execution complete"
  );

  Ok(report)
}
