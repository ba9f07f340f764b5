//! Per-unit compile pipeline.
//!
//! Builds the straight chain of actions that turns one unit into its terminal
//! action:
//!
//! ```text
//! interop? -> compile -> asm* -> archive? -> install? -> link? (+ completion report)
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use tracing::debug;

use super::BuildContext;
use crate::action::{ActionGraph, ActionId, Step, ToolStep};
use crate::error::BuildError;
use crate::unit::Unit;

/// Add the pipeline for `unit` to `graph` and return its terminal action.
///
/// `deps` are the terminal actions of the unit's dependencies; the compile
/// stage waits for all of them.
///
/// # Errors
///
/// - `ToolchainStepFailed` if interop planning fails.
/// - `NoSourceFiles` if nothing is left to compile after interop planning.
pub fn build_pipeline(
  graph: &mut ActionGraph,
  ctx: &BuildContext,
  unit: &Arc<Unit>,
  mut deps: Vec<ActionId>,
) -> Result<ActionId, BuildError> {
  let path = &unit.import_path;
  let tool = ToolStep::new(unit.clone(), ctx.toolchain().clone(), ctx.statistics().clone());

  let mut sources: Vec<PathBuf> = unit.sources.iter().map(|name| unit.file_path(name)).collect();
  // objects packed after the primary object, in order
  let mut extra_objects: Vec<PathBuf> = Vec::new();

  // step 1. interop preprocessing
  if !unit.interop_sources.is_empty() {
    let name = format!("interop: {}", path);
    let outputs = ctx
      .toolchain()
      .preprocess_interop(unit)
      .map_err(|source| BuildError::ToolchainStepFailed {
        action: name.clone(),
        source,
      })?;

    sources.extend(outputs.sources.iter().cloned());
    extra_objects.extend(outputs.objects.iter().cloned());

    let interop = graph.add_action(
      name,
      Step::Interop {
        tool: tool.clone(),
        outputs,
      },
      &[],
    );
    deps.push(interop);
  }

  if sources.is_empty() {
    return Err(BuildError::NoSourceFiles { unit: path.clone() });
  }

  // step 2. compile
  let compile = graph.add_action(
    format!("compile: {}", path),
    Step::Compile {
      tool: tool.clone(),
      sources,
    },
    &deps,
  );

  // step 3. assemble; each depends on compile, which may generate headers
  let mut assemble = Vec::with_capacity(unit.asm_files.len());
  for sfile in &unit.asm_files {
    let object = ctx.layout.asm_object(unit, sfile);
    let id = graph.add_action(
      format!("asm: {}/{}", path, sfile),
      Step::Assemble {
        tool: tool.clone(),
        object: object.clone(),
        source: unit.file_path(sfile),
      },
      &[compile],
    );
    assemble.push(id);
    extra_objects.push(object);
  }

  // step 4. precompiled objects
  extra_objects.extend(unit.objects.iter().map(|name| unit.file_path(name)));

  let mut build = compile;

  if !extra_objects.is_empty() {
    let mut objects = Vec::with_capacity(extra_objects.len() + 1);
    objects.push(ctx.layout.object_file(unit));
    objects.extend(extra_objects);

    let mut archive_deps = vec![compile];
    archive_deps.extend(assemble);

    build = graph.add_action(
      format!("archive: {}", path),
      Step::Archive {
        tool: tool.clone(),
        objects,
      },
      &archive_deps,
    );
  }

  if unit.install && !unit.test_scope {
    build = graph.add_action(
      format!("install: {}", path),
      Step::Install {
        unit: path.clone(),
        from: ctx.layout.object_file(unit),
        to: ctx.layout.install_path(unit),
        copier: ctx.copier().clone(),
      },
      &[build],
    );
  }

  if unit.executable {
    build = graph.add_action(format!("link: {}", path), Step::Link { tool }, &[build]);
  }

  if !unit.test_scope {
    let progress = ctx.progress().clone();
    graph.map_step(build, |step| step.reporting(path.clone(), progress));
  }

  debug!(unit = %path, terminal = %graph.name(build), "planned pipeline");
  Ok(build)
}
