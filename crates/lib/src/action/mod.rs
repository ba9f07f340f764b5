//! Build actions and the action graph.
//!
//! An [`Action`] is one node of build work: a name, a [`Step`] to run, and a
//! set of prerequisite actions. Actions live in an [`ActionGraph`] arena and
//! are addressed by [`ActionId`] handles, so the same action can be shared by
//! many dependents (diamond dependencies) without being duplicated.
//!
//! Edges point from an action to its prerequisites. The graph is only mutated
//! while it is being built; execution takes it behind an `Arc` and never
//! changes its structure.

mod step;

pub use step::{Step, StepFn, ToolStep};

use std::fmt;

use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::{DfsPostOrder, EdgeRef};

use crate::error::BuildError;

/// Handle to an action inside an [`ActionGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActionId(NodeIndex);

impl ActionId {
  /// Dense index of the action, usable to address per-action side tables.
  pub fn index(self) -> usize {
    self.0.index()
  }
}

impl fmt::Display for ActionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "#{}", self.0.index())
  }
}

/// A unit of build work.
#[derive(Debug)]
pub struct Action {
  /// Human-readable label, for diagnostics only.
  pub name: String,
  /// The work to perform once every prerequisite succeeded.
  pub step: Step,
}

/// Arena of actions with prerequisite edges.
#[derive(Debug, Default)]
pub struct ActionGraph {
  graph: DiGraph<Action, ()>,
}

impl ActionGraph {
  pub fn new() -> Self {
    Self::default()
  }

  /// Add an action depending on `dependencies`, in order.
  pub fn add_action(&mut self, name: impl Into<String>, step: Step, dependencies: &[ActionId]) -> ActionId {
    let id = ActionId(self.graph.add_node(Action {
      name: name.into(),
      step,
    }));
    for &dep in dependencies {
      self.add_dependency(id, dep);
    }
    id
  }

  /// Make `action` depend on `dependency`. Adding an existing edge is a no-op.
  pub fn add_dependency(&mut self, action: ActionId, dependency: ActionId) {
    if self.graph.find_edge(action.0, dependency.0).is_none() {
      self.graph.add_edge(action.0, dependency.0, ());
    }
  }

  /// Replace the step of `id` with `f(step)`.
  pub(crate) fn map_step(&mut self, id: ActionId, f: impl FnOnce(Step) -> Step) {
    let slot = &mut self.graph[id.0].step;
    let step = std::mem::replace(slot, Step::Noop);
    *slot = f(step);
  }

  pub fn action(&self, id: ActionId) -> &Action {
    &self.graph[id.0]
  }

  pub fn name(&self, id: ActionId) -> &str {
    &self.graph[id.0].name
  }

  /// Direct prerequisites of `id`, in the order they were added.
  pub fn dependencies(&self, id: ActionId) -> Vec<ActionId> {
    let mut edges: Vec<_> = self.graph.edges(id.0).map(|e| (e.id(), e.target())).collect();
    edges.sort_by_key(|(edge, _)| edge.index());
    edges.into_iter().map(|(_, target)| ActionId(target)).collect()
  }

  /// Actions that list `id` as a direct prerequisite, in index order.
  pub fn dependents(&self, id: ActionId) -> Vec<ActionId> {
    let mut dependents: Vec<_> = self
      .graph
      .neighbors_directed(id.0, Direction::Incoming)
      .map(ActionId)
      .collect();
    dependents.sort();
    dependents.dedup();
    dependents
  }

  pub fn len(&self) -> usize {
    self.graph.node_count()
  }

  pub fn is_empty(&self) -> bool {
    self.graph.node_count() == 0
  }

  /// All action handles in insertion order.
  pub fn ids(&self) -> impl Iterator<Item = ActionId> + '_ {
    self.graph.node_indices().map(ActionId)
  }

  /// Every action reachable from `root`, prerequisites before dependents.
  pub fn reachable(&self, root: ActionId) -> Vec<ActionId> {
    let mut dfs = DfsPostOrder::new(&self.graph, root.0);
    let mut out = Vec::new();
    while let Some(idx) = dfs.next(&self.graph) {
      out.push(ActionId(idx));
    }
    out
  }

  /// Fail if the graph contains a cycle.
  pub fn verify_acyclic(&self) -> Result<(), BuildError> {
    toposort(&self.graph, None)
      .map(|_| ())
      .map_err(|cycle| BuildError::CycleDetected(self.graph[cycle.node_id()].name.clone()))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn empty_graph() {
    let graph = ActionGraph::new();
    assert!(graph.is_empty());
    assert_eq!(graph.len(), 0);
    assert!(graph.verify_acyclic().is_ok());
  }

  #[test]
  fn dependencies_keep_insertion_order() {
    let mut graph = ActionGraph::new();
    let a = graph.add_action("a", Step::Noop, &[]);
    let b = graph.add_action("b", Step::Noop, &[]);
    let c = graph.add_action("c", Step::Noop, &[]);
    let d = graph.add_action("d", Step::Noop, &[c, a, b]);

    assert_eq!(graph.dependencies(d), vec![c, a, b]);
    assert_eq!(graph.dependents(a), vec![d]);
    assert!(graph.dependencies(a).is_empty());
  }

  #[test]
  fn duplicate_edges_are_ignored() {
    let mut graph = ActionGraph::new();
    let a = graph.add_action("a", Step::Noop, &[]);
    let b = graph.add_action("b", Step::Noop, &[a, a]);
    graph.add_dependency(b, a);

    assert_eq!(graph.dependencies(b), vec![a]);
  }

  #[test]
  fn diamond_reachable_visits_shared_node_once() {
    //     A
    //    / \
    //   B   C
    //    \ /
    //     D
    let mut graph = ActionGraph::new();
    let a = graph.add_action("a", Step::Noop, &[]);
    let b = graph.add_action("b", Step::Noop, &[a]);
    let c = graph.add_action("c", Step::Noop, &[a]);
    let d = graph.add_action("d", Step::Noop, &[b, c]);

    let order = graph.reachable(d);
    assert_eq!(order.len(), 4);
    assert_eq!(order.first(), Some(&a));
    assert_eq!(order.last(), Some(&d));
    assert_eq!(graph.dependents(a), vec![b, c]);
  }

  #[test]
  fn reachable_excludes_unrelated_actions() {
    let mut graph = ActionGraph::new();
    let a = graph.add_action("a", Step::Noop, &[]);
    let _lonely = graph.add_action("lonely", Step::Noop, &[]);
    let b = graph.add_action("b", Step::Noop, &[a]);

    assert_eq!(graph.reachable(b), vec![a, b]);
  }

  #[test]
  fn cycle_is_detected() {
    let mut graph = ActionGraph::new();
    let a = graph.add_action("a", Step::Noop, &[]);
    let b = graph.add_action("b", Step::Noop, &[a]);
    graph.add_dependency(a, b);

    assert!(matches!(graph.verify_acyclic(), Err(BuildError::CycleDetected(_))));
  }

  #[test]
  fn map_step_replaces_step() {
    let mut graph = ActionGraph::new();
    let a = graph.add_action("a", Step::Noop, &[]);
    graph.map_step(a, |_| Step::func(|| Ok(())));
    assert_eq!(graph.action(a).step.stage(), "func");
  }
}
