//! Single-flight scheduling of actions.
//!
//! Every action owns a once-cell holding its outcome. The first caller to
//! request an action runs it; everyone else awaits the same cell. An action
//! first resolves all its dependencies concurrently, then takes a permit from
//! the shared semaphore and runs its step on the blocking pool. Waiting never
//! holds a permit, so the bound applies only to running steps.

use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::sync::{OnceCell, Semaphore};
use tokio::task::JoinSet;
use tracing::{debug, error, warn};

use super::types::{ActionState, ExecuteConfig};
use crate::action::{ActionGraph, ActionId};
use crate::error::BuildError;

/// A failure and the action it started at.
#[derive(Debug, Clone)]
pub(crate) struct Failure {
  pub origin: ActionId,
  pub error: BuildError,
}

pub(crate) type Outcome = Result<(), Failure>;

type BoxOutcome = Pin<Box<dyn Future<Output = Outcome> + Send>>;

pub(crate) struct Scheduler {
  graph: Arc<ActionGraph>,
  cells: Vec<OnceCell<Outcome>>,
  states: Vec<Mutex<ActionState>>,
  permits: Semaphore,
  fail_fast: bool,
  first_failure: OnceLock<Failure>,
}

impl Scheduler {
  /// The graph must be acyclic; a cycle would wait on itself forever.
  pub fn new(graph: Arc<ActionGraph>, config: &ExecuteConfig) -> Self {
    let len = graph.len();
    Self {
      graph,
      cells: (0..len).map(|_| OnceCell::new()).collect(),
      states: (0..len).map(|_| Mutex::new(ActionState::NotStarted)).collect(),
      permits: Semaphore::new(config.parallelism.max(1)),
      fail_fast: config.fail_fast,
      first_failure: OnceLock::new(),
    }
  }

  /// Outcome of `id`, running it and its dependencies at most once.
  pub fn resolve(self: Arc<Self>, id: ActionId) -> BoxOutcome {
    Box::pin(async move {
      let runner = self.clone();
      self.cells[id.index()].get_or_init(|| runner.run(id)).await.clone()
    })
  }

  pub fn state(&self, id: ActionId) -> ActionState {
    self.states[id.index()]
      .lock()
      .unwrap_or_else(|e| e.into_inner())
      .clone()
  }

  fn set_state(&self, id: ActionId, state: ActionState) {
    *self.states[id.index()].lock().unwrap_or_else(|e| e.into_inner()) = state;
  }

  fn skip(&self, id: ActionId, failure: Failure) -> Outcome {
    warn!(
      action = %self.graph.name(id),
      failed_dep = %self.graph.name(failure.origin),
      "skipping action due to failed dependency"
    );
    self.set_state(
      id,
      ActionState::Skipped {
        failed_dependency: failure.origin,
        error: failure.error.clone(),
      },
    );
    Err(failure)
  }

  /// A failure that should stop `id` from starting, if fail-fast is on.
  fn stop_requested(&self) -> Option<Failure> {
    if self.fail_fast {
      self.first_failure.get().cloned()
    } else {
      None
    }
  }

  async fn run(self: Arc<Self>, id: ActionId) -> Outcome {
    let mut join_set = JoinSet::new();
    for (pos, dep) in self.graph.dependencies(id).into_iter().enumerate() {
      let scheduler = self.clone();
      join_set.spawn(async move { (pos, scheduler.resolve(dep).await) });
    }

    // every dependency is waited for; the first error in dependency order wins
    let results = collect_join_results(join_set, id).await;
    if let Some(failure) = results.into_iter().find_map(|(_, outcome)| outcome.err()) {
      return self.skip(id, failure);
    }

    if let Some(failure) = self.stop_requested() {
      return self.skip(id, failure);
    }

    let permit = match self.permits.acquire().await {
      Ok(permit) => permit,
      Err(e) => return self.fail(id, BuildError::Internal(format!("scheduler closed: {}", e))),
    };

    // a failure may have landed while this action waited for a permit
    if let Some(failure) = self.stop_requested() {
      return self.skip(id, failure);
    }

    self.set_state(id, ActionState::Running);
    let name = self.graph.name(id).to_string();
    debug!(action = %name, "running");

    let graph = self.graph.clone();
    let step_name = name.clone();
    let result = match tokio::task::spawn_blocking(move || graph.action(id).step.run(&step_name)).await {
      Ok(result) => result,
      Err(e) => Err(BuildError::Internal(format!("{}: step panicked: {}", name, e))),
    };
    drop(permit);

    match result {
      Ok(()) => {
        debug!(action = %name, "succeeded");
        self.set_state(id, ActionState::Succeeded);
        Ok(())
      }
      Err(e) => self.fail(id, e),
    }
  }

  fn fail(&self, id: ActionId, error: BuildError) -> Outcome {
    error!(action = %self.graph.name(id), error = %error, "action failed");
    self.set_state(id, ActionState::Failed(error.clone()));
    let failure = Failure { origin: id, error };
    let _ = self.first_failure.set(failure.clone());
    Err(failure)
  }
}

/// Collect dependency outcomes from a JoinSet, ordered by dependency position.
async fn collect_join_results(mut join_set: JoinSet<(usize, Outcome)>, id: ActionId) -> Vec<(usize, Outcome)> {
  let mut results = Vec::new();

  while let Some(join_result) = join_set.join_next().await {
    match join_result {
      Ok(result) => results.push(result),
      Err(e) => {
        error!(error = %e, "dependency task panicked");
        results.push((
          usize::MAX,
          Err(Failure {
            origin: id,
            error: BuildError::Internal(format!("dependency task failed: {}", e)),
          }),
        ));
      }
    }
  }

  results.sort_by_key(|(pos, _)| *pos);
  results
}
