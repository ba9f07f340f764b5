//! Dependency graph construction.
//!
//! Walks the import graph of the requested units and builds one compile
//! pipeline per unique unit. Pipelines are memoized by import path, so a unit
//! imported from many places is built by a single shared action.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use super::BuildContext;
use super::pipeline::build_pipeline;
use crate::action::{ActionGraph, ActionId, Step};
use crate::error::BuildError;
use crate::unit::Unit;

/// A constructed action graph ready for execution.
#[derive(Debug)]
pub struct BuildPlan {
  pub graph: ActionGraph,
  /// Umbrella action depending on every requested unit.
  pub root: ActionId,
  /// Terminal action of every unit that needs building, by import path.
  pub targets: HashMap<String, ActionId>,
}

/// Builds the action graph for one build invocation.
///
/// The builder owns the memo table mapping import paths to terminal actions;
/// it is discarded together with the builder.
pub struct GraphBuilder<'a> {
  ctx: &'a BuildContext,
  graph: ActionGraph,
  targets: HashMap<String, ActionId>,
  in_progress: HashSet<String>,
}

impl<'a> GraphBuilder<'a> {
  pub fn new(ctx: &'a BuildContext) -> Self {
    Self {
      ctx,
      graph: ActionGraph::new(),
      targets: HashMap::new(),
      in_progress: HashSet::new(),
    }
  }

  /// Return the terminal action for `unit`, building its pipeline and those of
  /// its dependencies on first use.
  ///
  /// Returns `None` when the unit needs no work: it is up to date (which, by
  /// construction of the staleness computation, means its whole subtree is),
  /// or it has nothing to compile.
  pub fn build_unit(&mut self, unit: &Arc<Unit>) -> Result<Option<ActionId>, BuildError> {
    if unit.up_to_date {
      debug!(unit = %unit.import_path, "up to date");
      return Ok(None);
    }

    if let Some(&id) = self.targets.get(&unit.import_path) {
      return Ok(Some(id));
    }

    if !unit.has_sources() {
      debug!(unit = %unit.import_path, "no source files, dropping dependency");
      return Ok(None);
    }

    if !self.in_progress.insert(unit.import_path.clone()) {
      return Err(BuildError::CycleDetected(unit.import_path.clone()));
    }

    let deps = self.build_dependencies(unit)?;
    let id = build_pipeline(&mut self.graph, self.ctx, unit, deps)?;

    self.in_progress.remove(&unit.import_path);
    self.targets.insert(unit.import_path.clone(), id);
    Ok(Some(id))
  }

  /// Terminal actions of every import of `unit` plus its implicit dependencies.
  fn build_dependencies(&mut self, unit: &Arc<Unit>) -> Result<Vec<ActionId>, BuildError> {
    let mut units: Vec<Arc<Unit>> = unit.imports.clone();

    for name in self.implicit_dependencies(unit) {
      let dep = self
        .ctx
        .resolver()
        .resolve_unit(&name)
        .map_err(|source| BuildError::DependencyResolutionFailed {
          unit: unit.import_path.clone(),
          dependency: name.clone(),
          source,
        })?;
      units.push(dep);
    }

    let mut deps = Vec::with_capacity(units.len());
    for dep in &units {
      if let Some(id) = self.build_unit(dep)?
        && !deps.contains(&id)
      {
        deps.push(id);
      }
    }
    Ok(deps)
  }

  /// Units a unit needs without importing them explicitly.
  fn implicit_dependencies(&self, unit: &Unit) -> Vec<String> {
    let config = &self.ctx.config;
    if !config.implicit_dependencies {
      return Vec::new();
    }
    let names = &config.implicit;

    let mut extra = Vec::new();
    if unit.executable {
      // every binary links the runtime, even without importing it
      extra.push(names.runtime.clone());
      if unit.race {
        extra.push(names.race_runtime.clone());
      }
    } else if !unit.interop_sources.is_empty() {
      // only visible after interop generation; executables get it through the runtime
      extra.push(names.interop_runtime.clone());
    }
    if unit.test_scope {
      extra.push(names.regex.clone());
      if config.wants_test_deps() {
        extra.push(names.test_deps.clone());
      }
    }

    extra.retain(|name| name != &unit.import_path);
    extra
  }

  fn finish(self) -> (ActionGraph, HashMap<String, ActionId>) {
    (self.graph, self.targets)
  }
}

/// Build the action graph for `units`.
///
/// Units without sources are skipped with a diagnostic. All built units hang
/// off a single umbrella action, returned as [`BuildPlan::root`].
///
/// # Errors
///
/// - `NoUnitsSupplied` if `units` is empty.
/// - `DependencyResolutionFailed` if an implicit dependency cannot be resolved.
/// - `NoSourceFiles` / `ToolchainStepFailed` from pipeline construction.
///
/// No partial graph is returned on error.
pub fn build_graph(ctx: &BuildContext, units: &[Arc<Unit>]) -> Result<BuildPlan, BuildError> {
  if units.is_empty() {
    return Err(BuildError::NoUnitsSupplied);
  }

  let started = Instant::now();
  let mut builder = GraphBuilder::new(ctx);
  let mut roots = Vec::new();

  for unit in units {
    if !unit.has_sources() {
      debug!(unit = %unit.import_path, "skipping: no source files");
      continue;
    }
    if let Some(id) = builder.build_unit(unit)?
      && !roots.contains(&id)
    {
      roots.push(id);
    }
  }

  let names: Vec<&str> = units.iter().map(|u| u.import_path.as_str()).collect();
  let (mut graph, targets) = builder.finish();
  let root = graph.add_action(
    format!("build: {}", names.join(",")),
    Step::Summary {
      started,
      stats: ctx.statistics().clone(),
    },
    &roots,
  );

  debug!(actions = graph.len(), units = targets.len(), "built action graph");
  Ok(BuildPlan { graph, root, targets })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::unit::{ResolveError, UnitSet};
  use crate::util::testutil::{FakeToolchain, harness, test_context};

  #[test]
  fn interop_executable_depends_on_runtime_only() {
    let env = harness(FakeToolchain::default(), runtime_units());
    let cmd = Arc::new(
      Unit::new("cmd", "/src/cmd")
        .with_sources(["main.src"])
        .with_interop_sources(["x.ffi"])
        .executable(),
    );

    let plan = build_graph(&env.ctx, &[cmd]).unwrap();

    assert!(plan.targets.contains_key("runtime"));
    assert!(!plan.targets.contains_key("runtime/interop"));
  }

  fn leaf(name: &str) -> Arc<Unit> {
    Arc::new(Unit::new(name, format!("/src/{}", name)).with_sources([format!("{}.src", name)]))
  }

  fn unit_with(name: &str, imports: &[&Arc<Unit>]) -> Arc<Unit> {
    Arc::new(
      Unit::new(name, format!("/src/{}", name))
        .with_sources([format!("{}.src", name)])
        .with_imports(imports.iter().map(|u| Arc::clone(*u))),
    )
  }

  fn runtime_units() -> UnitSet {
    let mut set = UnitSet::new();
    for name in ["runtime", "runtime/race", "runtime/interop", "regexp", "testing/internal/testdeps"] {
      set.insert(leaf(name));
    }
    set
  }

  #[test]
  fn empty_input_is_rejected() {
    let (ctx, _) = test_context();
    let err = build_graph(&ctx, &[]).unwrap_err();
    assert!(matches!(err, BuildError::NoUnitsSupplied));
  }

  #[test]
  fn single_unit_under_umbrella() {
    let (ctx, _) = test_context();
    let a = leaf("a");

    let plan = build_graph(&ctx, &[a]).unwrap();

    assert_eq!(plan.graph.len(), 2);
    assert_eq!(plan.graph.name(plan.root), "build: a");
    assert_eq!(plan.graph.action(plan.root).step.stage(), "build");
    assert_eq!(plan.graph.dependencies(plan.root), vec![plan.targets["a"]]);
  }

  #[test]
  fn diamond_builds_shared_unit_once() {
    //     A
    //    / \
    //   B   C
    //    \ /
    //     D
    let (ctx, _) = test_context();
    let a = leaf("a");
    let b = unit_with("b", &[&a]);
    let c = unit_with("c", &[&a]);
    let d = unit_with("d", &[&b, &c]);

    let plan = build_graph(&ctx, &[d]).unwrap();

    let a_id = plan.targets["a"];
    assert_eq!(plan.graph.dependencies(plan.targets["b"]), vec![a_id]);
    assert_eq!(plan.graph.dependencies(plan.targets["c"]), vec![a_id]);
    assert_eq!(
      plan.graph.dependencies(plan.targets["d"]),
      vec![plan.targets["b"], plan.targets["c"]]
    );

    let compiles = plan
      .graph
      .ids()
      .filter(|&id| plan.graph.name(id) == "compile: a")
      .count();
    assert_eq!(compiles, 1);
    assert_eq!(plan.graph.len(), 5);
  }

  #[test]
  fn memo_returns_same_handle() {
    let (ctx, _) = test_context();
    let a = leaf("a");
    let b = unit_with("b", &[&a]);

    let mut builder = GraphBuilder::new(&ctx);
    let first = builder.build_unit(&a).unwrap();
    let via_b = builder.build_unit(&b).unwrap();
    let again = builder.build_unit(&a).unwrap();

    assert_eq!(first, again);
    let (graph, targets) = builder.finish();
    assert_eq!(targets.get("a").copied(), first);
    assert_eq!(graph.dependencies(via_b.unwrap()), vec![first.unwrap()]);
  }

  #[test]
  fn up_to_date_subtree_contributes_nothing() {
    let (ctx, _) = test_context();
    let a = leaf("a");
    let b = Arc::new(
      Unit::new("b", "/src/b")
        .with_sources(["b.src"])
        .with_imports([a])
        .up_to_date(),
    );
    let c = unit_with("c", &[&b]);

    let plan = build_graph(&ctx, &[c]).unwrap();

    assert!(!plan.targets.contains_key("a"));
    assert!(!plan.targets.contains_key("b"));
    assert!(plan.graph.dependencies(plan.targets["c"]).is_empty());
    assert_eq!(plan.graph.len(), 2);
  }

  #[test]
  fn up_to_date_roots_leave_empty_umbrella() {
    let (ctx, _) = test_context();
    let a = Arc::new(Unit::new("a", "/src/a").with_sources(["a.src"]).up_to_date());

    let plan = build_graph(&ctx, &[a]).unwrap();
    assert_eq!(plan.graph.len(), 1);
    assert!(plan.graph.dependencies(plan.root).is_empty());
  }

  #[test]
  fn roots_without_sources_are_skipped() {
    let (ctx, _) = test_context();
    let empty = Arc::new(Unit::new("empty", "/src/empty"));
    let a = leaf("a");

    let plan = build_graph(&ctx, &[empty, a]).unwrap();
    assert_eq!(plan.graph.dependencies(plan.root), vec![plan.targets["a"]]);
    assert_eq!(plan.graph.name(plan.root), "build: empty,a");
  }

  #[test]
  fn sourceless_dependency_edge_is_dropped() {
    let (ctx, _) = test_context();
    let empty = Arc::new(Unit::new("empty", "/src/empty"));
    let a = unit_with("a", &[&empty]);

    let plan = build_graph(&ctx, &[a]).unwrap();
    assert!(plan.graph.dependencies(plan.targets["a"]).is_empty());
    assert!(!plan.targets.contains_key("empty"));
  }

  #[test]
  fn executable_depends_on_runtime() {
    let env = harness(FakeToolchain::default(), runtime_units());
    let cmd = Arc::new(Unit::new("cmd", "/src/cmd").with_sources(["main.src"]).executable());

    let plan = build_graph(&env.ctx, &[cmd]).unwrap();

    let link = plan.targets["cmd"];
    let compile = plan.graph.dependencies(link)[0];
    assert_eq!(plan.graph.dependencies(compile), vec![plan.targets["runtime"]]);
    assert!(!plan.targets.contains_key("runtime/race"));
  }

  #[test]
  fn race_executable_adds_race_runtime() {
    let env = harness(FakeToolchain::default(), runtime_units());
    let cmd = Arc::new(
      Unit::new("cmd", "/src/cmd")
        .with_sources(["main.src"])
        .executable()
        .race(),
    );

    let plan = build_graph(&env.ctx, &[cmd]).unwrap();
    let compile = plan.graph.dependencies(plan.targets["cmd"])[0];
    assert_eq!(
      plan.graph.dependencies(compile),
      vec![plan.targets["runtime"], plan.targets["runtime/race"]]
    );
  }

  #[test]
  fn interop_units_depend_on_interop_runtime_except_itself() {
    let mut units = runtime_units();
    let interop_runtime = Arc::new(Unit::new("runtime/interop", "/src/rti").with_interop_sources(["rt.ffi"]));
    units.insert(interop_runtime.clone());
    let env = harness(FakeToolchain::default(), units);
    let ffi = Arc::new(Unit::new("ffi", "/src/ffi").with_interop_sources(["x.ffi"]));

    let plan = build_graph(&env.ctx, &[ffi]).unwrap();

    let rt = plan.targets["runtime/interop"];
    let rt_compile = plan.graph.dependencies(rt)[0];
    let rt_compile_deps: Vec<_> = plan
      .graph
      .dependencies(rt_compile)
      .into_iter()
      .map(|id| plan.graph.action(id).step.stage())
      .collect();
    assert_eq!(rt_compile_deps, vec!["interop"]);

    let ffi_compile = plan.graph.dependencies(plan.targets["ffi"])[0];
    assert!(plan.graph.dependencies(ffi_compile).contains(&rt));
  }

  #[test]
  fn test_scope_adds_test_support_by_version() {
    let env = harness(FakeToolchain::default(), runtime_units());
    let t = Arc::new(Unit::new("a", "/src/a").with_sources(["a_test.src"]).test_scope());

    let plan = build_graph(&env.ctx, &[t.clone()]).unwrap();
    assert_eq!(
      plan.graph.dependencies(plan.targets["a"]),
      vec![plan.targets["regexp"], plan.targets["testing/internal/testdeps"]]
    );

    let mut old = harness(FakeToolchain::default(), runtime_units());
    old.ctx.config.language_version = semver::Version::new(1, 7, 0);
    let plan = build_graph(&old.ctx, &[t]).unwrap();
    assert_eq!(plan.graph.dependencies(plan.targets["a"]), vec![plan.targets["regexp"]]);
  }

  #[test]
  fn implicit_dependencies_can_be_disabled() {
    let mut env = harness(FakeToolchain::default(), UnitSet::new());
    env.ctx.config.implicit_dependencies = false;
    let cmd = Arc::new(Unit::new("cmd", "/src/cmd").with_sources(["main.src"]).executable());

    assert!(build_graph(&env.ctx, &[cmd]).is_ok());
  }

  #[test]
  fn unresolvable_implicit_dependency_aborts() {
    let env = harness(FakeToolchain::default(), UnitSet::new());
    let cmd = Arc::new(Unit::new("cmd", "/src/cmd").with_sources(["main.src"]).executable());

    let err = build_graph(&env.ctx, &[cmd]).unwrap_err();
    match err {
      BuildError::DependencyResolutionFailed {
        unit,
        dependency,
        source: ResolveError::NotFound(_),
      } => {
        assert_eq!(unit, "cmd");
        assert_eq!(dependency, "runtime");
      }
      other => panic!("unexpected error {:?}", other),
    }
  }

  #[test]
  fn implicit_dependency_cycle_is_reported() {
    // an executable runtime would need itself through another executable
    let mut units = UnitSet::new();
    let helper = Arc::new(Unit::new("helper", "/src/helper").with_sources(["h.src"]).executable());
    let runtime = Arc::new(
      Unit::new("runtime", "/src/runtime")
        .with_sources(["rt.src"])
        .with_imports([helper.clone()]),
    );
    units.insert(helper.clone());
    units.insert(runtime);
    let env = harness(FakeToolchain::default(), units);

    let err = build_graph(&env.ctx, &[helper]).unwrap_err();
    assert!(matches!(err, BuildError::CycleDetected(ref unit) if unit == "helper"));
  }

  #[test]
  fn no_source_dependency_failure_aborts_without_graph() {
    let tc = FakeToolchain::default().with_interop_sources(false);
    let env = harness(tc, runtime_units());
    let ffi = Arc::new(Unit::new("ffi", "/src/ffi").with_interop_sources(["x.ffi"]));
    let top = unit_with("top", &[&ffi]);

    let err = build_graph(&env.ctx, &[top]).unwrap_err();
    assert!(matches!(err, BuildError::NoSourceFiles { ref unit } if unit == "ffi"));
  }
}
