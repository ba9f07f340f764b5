//! Build planning and execution.
//!
//! A build turns a set of units into an [`ActionGraph`](crate::action::ActionGraph):
//! one compile pipeline per unit that needs work, memoized so that shared
//! imports are built once, under a single umbrella action. The graph is then
//! handed to the [executor](crate::execute).
//!
//! # Submodules
//!
//! - [`graph`] - dependency graph construction
//! - [`pipeline`] - per-unit compile pipeline
//! - [`layout`] - derived output paths
//! - [`progress`] - unit completion reporting
//! - [`stats`] - per-stage timing

mod context;
pub mod graph;
mod layout;
pub mod pipeline;
mod progress;
mod stats;

use std::sync::Arc;

use tracing::info;

use crate::error::BuildError;
use crate::execute::{self, ExecuteReport};
use crate::unit::Unit;

pub use context::BuildContext;
pub use graph::{BuildPlan, GraphBuilder, build_graph};
pub use layout::Layout;
pub use progress::{ConsolePrinter, Progress, Silent};
pub use stats::Statistics;

/// Build `units` and everything they depend on.
///
/// # Errors
///
/// Any graph construction error, or the first step failure in dependency order.
pub async fn build(ctx: &BuildContext, units: &[Arc<Unit>]) -> Result<(), BuildError> {
  build_with_report(ctx, units).await?.into_result()
}

/// Like [`build`], but reports per-action outcomes instead of stopping at the
/// first error. Graph construction errors are still returned as `Err`.
pub async fn build_with_report(ctx: &BuildContext, units: &[Arc<Unit>]) -> Result<ExecuteReport, BuildError> {
  let plan = build_graph(ctx, units)?;
  info!(units = plan.targets.len(), actions = plan.graph.len(), "starting build");

  let graph = Arc::new(plan.graph);
  let report = execute::execute_with_report(graph, plan.root, &ctx.execute_config()).await?;

  info!(stats = %ctx.statistics(), success = report.is_success(), "build finished");
  Ok(report)
}
