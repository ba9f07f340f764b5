//! Types for action graph execution.

use std::collections::HashMap;
use std::fmt;

use crate::action::ActionId;
use crate::error::BuildError;

/// Lifecycle of one action during an execution.
#[derive(Debug, Clone, Default)]
pub enum ActionState {
  #[default]
  NotStarted,
  Running,
  Succeeded,
  Failed(BuildError),
  /// Never ran because `failed_dependency` failed first.
  Skipped {
    failed_dependency: ActionId,
    error: BuildError,
  },
}

impl fmt::Display for ActionState {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      ActionState::NotStarted => write!(f, "not started"),
      ActionState::Running => write!(f, "running"),
      ActionState::Succeeded => write!(f, "succeeded"),
      ActionState::Failed(e) => write!(f, "failed: {}", e),
      ActionState::Skipped { failed_dependency, .. } => write!(f, "skipped: {} failed", failed_dependency),
    }
  }
}

/// Outcome of executing everything reachable from a root action.
#[derive(Debug, Default)]
pub struct ExecuteReport {
  /// Actions whose step ran and succeeded, prerequisites first.
  pub succeeded: Vec<ActionId>,

  /// Actions whose step ran and failed.
  pub failed: Vec<(ActionId, BuildError)>,

  /// Actions that never ran. Maps skipped action -> the failed action that caused it.
  pub skipped: HashMap<ActionId, ActionId>,

  /// The root's result: the first failure in dependency order.
  pub error: Option<BuildError>,
}

impl ExecuteReport {
  pub fn is_success(&self) -> bool {
    self.error.is_none()
  }

  pub fn total(&self) -> usize {
    self.succeeded.len() + self.failed.len() + self.skipped.len()
  }

  /// Convert into the root's result.
  pub fn into_result(self) -> Result<(), BuildError> {
    match self.error {
      Some(e) => Err(e),
      None => Ok(()),
    }
  }
}

/// Configuration for graph execution.
#[derive(Debug, Clone)]
pub struct ExecuteConfig {
  /// Maximum number of steps running at once.
  pub parallelism: usize,

  /// After the first failure, steps that have not started are skipped
  /// instead of run. Steps already running finish normally.
  pub fail_fast: bool,
}

impl Default for ExecuteConfig {
  fn default() -> Self {
    Self {
      parallelism: num_cpus(),
      fail_fast: false,
    }
  }
}

/// Get the number of CPUs for default parallelism.
fn num_cpus() -> usize {
  std::thread::available_parallelism().map(|p| p.get()).unwrap_or(4)
}
