//! Implementation of the `kiln graph` command.
//!
//! Plans the build and prints every action in dependency order without
//! running anything.

use std::path::Path;

use anyhow::{Context, Result};

use kiln_lib::action::{ActionGraph, ActionId};
use kiln_lib::build::build_graph;

use super::Project;
use crate::output::{GraphEntry, OutputFormat, emit_json, render_graph};

pub fn cmd_graph(file: &Path, names: &[String], output: OutputFormat) -> Result<()> {
  let project = Project::load(file, names)?;
  let ctx = project.build_context();
  let plan = build_graph(&ctx, &project.selected).context("Failed to plan build")?;
  let graph = &plan.graph;

  let entries: Vec<GraphEntry> = graph
    .reachable(plan.root)
    .into_iter()
    .map(|id| GraphEntry {
      name: graph.name(id).to_string(),
      stage: graph.action(id).step.stage(),
      dependencies: names_of(graph, graph.dependencies(id)),
      dependents: names_of(graph, graph.dependents(id)),
    })
    .collect();

  if output.is_json() {
    return emit_json(&entries);
  }

  print!("{}", render_graph(&entries));
  Ok(())
}

fn names_of(graph: &ActionGraph, ids: Vec<ActionId>) -> Vec<String> {
  ids.into_iter().map(|id| graph.name(id).to_string()).collect()
}
