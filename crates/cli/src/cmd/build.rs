//! Implementation of the `kiln build` command.
//!
//! Loads the manifest, builds the selected units and prints a summary.
//! Completed units are printed as they finish, unless JSON output is requested.

use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};

use kiln_lib::build::{Silent, build_graph};
use kiln_lib::execute::execute_with_report;

use super::Project;
use crate::output::{
  BuildSummary, FailedAction, OutputFormat, SkippedAction, UnitTiming, emit_json, render_failures, render_summary,
};

/// Run the build and print its summary.
///
/// Returns `Ok(false)` when a step failed; the failure has already been
/// printed. `Err` is reserved for problems before execution starts.
pub fn cmd_build(file: &Path, names: &[String], jobs: Option<usize>, fail_fast: bool, output: OutputFormat) -> Result<bool> {
  let start = Instant::now();
  let mut project = Project::load(file, names)?;

  if jobs.is_some() {
    project.manifest.build.parallelism = jobs;
  }
  project.manifest.build.fail_fast |= fail_fast;

  let mut ctx = project.build_context();
  if output.is_json() {
    ctx = ctx.with_progress(Arc::new(Silent));
  }

  let plan = build_graph(&ctx, &project.selected).context("Failed to plan build")?;
  let graph = Arc::new(plan.graph);

  let rt = tokio::runtime::Runtime::new().context("Failed to create async runtime")?;
  let report = rt
    .block_on(execute_with_report(graph.clone(), plan.root, &ctx.execute_config()))
    .context("Build failed")?;

  let stats = ctx.statistics();
  let mut units: Vec<UnitTiming> = plan
    .targets
    .keys()
    .map(|unit| UnitTiming {
      unit: unit.clone(),
      duration_ms: stats.unit_total(unit).as_millis(),
    })
    .collect();
  units.sort_by(|a, b| a.unit.cmp(&b.unit));

  let mut skipped: Vec<SkippedAction> = report
    .skipped
    .iter()
    .map(|(id, dep)| SkippedAction {
      action: graph.name(*id).to_string(),
      failed_dependency: graph.name(*dep).to_string(),
    })
    .collect();
  skipped.sort_by(|a, b| a.action.cmp(&b.action));

  let summary = BuildSummary {
    success: report.is_success(),
    units,
    succeeded: report.succeeded.iter().map(|&id| graph.name(id).to_string()).collect(),
    failed: report
      .failed
      .iter()
      .map(|(id, e)| FailedAction {
        action: graph.name(*id).to_string(),
        error: e.to_string(),
      })
      .collect(),
    skipped,
    actions: report.total(),
    compile_ms: stats.total("compile").as_millis(),
    duration_ms: start.elapsed().as_millis(),
  };

  if output.is_json() {
    emit_json(&summary)?;
  } else {
    print!("{}", render_summary(&summary));
    eprint!("{}", render_failures(&summary));
  }

  Ok(summary.success)
}
