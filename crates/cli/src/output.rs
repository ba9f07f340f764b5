//! Rendering of build results and action graphs.
//!
//! The `render_*` functions return the finished text so the layouts can be
//! checked without a terminal. Colors are applied only when the target stream
//! supports them.

use std::fmt::Write;
use std::time::Duration;

use anyhow::Context;
use clap::ValueEnum;
use owo_colors::{OwoColorize, Stream};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Default, ValueEnum)]
pub enum OutputFormat {
  #[default]
  Text,
  Json,
}

impl OutputFormat {
  pub fn is_json(self) -> bool {
    matches!(self, OutputFormat::Json)
  }
}

const BUILT: &str = "✓";
const FAILED: &str = "✗";
const SKIPPED: &str = "↷";

/// An action whose step ran and failed.
#[derive(Debug, Serialize)]
pub struct FailedAction {
  pub action: String,
  pub error: String,
}

/// An action that never ran because a prerequisite failed.
#[derive(Debug, Serialize)]
pub struct SkippedAction {
  pub action: String,
  pub failed_dependency: String,
}

/// Time spent in the pipeline stages of one unit.
#[derive(Debug, Serialize)]
pub struct UnitTiming {
  pub unit: String,
  pub duration_ms: u128,
}

/// Outcome of `kiln build`, printed as text or JSON.
#[derive(Debug, Serialize)]
pub struct BuildSummary {
  pub success: bool,
  pub units: Vec<UnitTiming>,
  pub succeeded: Vec<String>,
  pub failed: Vec<FailedAction>,
  pub skipped: Vec<SkippedAction>,
  /// Every action reached from the root, whatever its outcome.
  pub actions: usize,
  pub compile_ms: u128,
  pub duration_ms: u128,
}

/// One action of `kiln graph`.
#[derive(Debug, Serialize)]
pub struct GraphEntry {
  pub name: String,
  pub stage: &'static str,
  pub dependencies: Vec<String>,
  pub dependents: Vec<String>,
}

/// Short human form of a duration: `850ms`, `4.2s`, `3m07s`.
pub fn elapsed(duration: Duration) -> String {
  let millis = duration.as_millis();
  match millis {
    0..=999 => format!("{}ms", millis),
    1_000..=59_999 => format!("{:.1}s", duration.as_secs_f64()),
    _ => format!("{}m{:02}s", millis / 60_000, (millis / 1_000) % 60),
  }
}

/// Headline and counters for stdout.
pub fn render_summary(summary: &BuildSummary) -> String {
  let took = elapsed(Duration::from_millis(summary.duration_ms as u64));
  let mut out = String::from("\n");

  if summary.success {
    let _ = writeln!(
      out,
      "{} built {} unit(s) in {}",
      BUILT.if_supports_color(Stream::Stdout, |s| s.green()),
      summary.units.len(),
      took
    );
  } else {
    let _ = writeln!(
      out,
      "{} build failed after {}",
      FAILED.if_supports_color(Stream::Stdout, |s| s.red()),
      took
    );
  }

  let ran = summary.succeeded.len() + summary.failed.len();
  stat(&mut out, "actions", &format!("{} of {} ran", ran, summary.actions));
  stat(
    &mut out,
    "compiling",
    &elapsed(Duration::from_millis(summary.compile_ms as u64)),
  );
  if let Some(slowest) = summary.units.iter().max_by_key(|u| u.duration_ms) {
    stat(
      &mut out,
      "slowest",
      &format!(
        "{} ({})",
        slowest.unit,
        elapsed(Duration::from_millis(slowest.duration_ms as u64))
      ),
    );
  }
  out
}

/// Failed and skipped actions, for stderr. Empty on success.
pub fn render_failures(summary: &BuildSummary) -> String {
  let mut out = String::new();
  for failed in &summary.failed {
    let _ = writeln!(
      out,
      "{} {}",
      FAILED.if_supports_color(Stream::Stderr, |s| s.red()),
      failed.error.if_supports_color(Stream::Stderr, |s| s.red())
    );
  }
  for skipped in &summary.skipped {
    let _ = writeln!(
      out,
      "{} {} (needs {})",
      SKIPPED.if_supports_color(Stream::Stderr, |s| s.yellow()),
      skipped.action,
      skipped.failed_dependency
    );
  }
  out
}

/// Actions in the given order, each followed by its edges.
pub fn render_graph(entries: &[GraphEntry]) -> String {
  let mut out = String::new();
  for entry in entries {
    let _ = writeln!(
      out,
      "{} {}",
      entry.name,
      format!("[{}]", entry.stage).if_supports_color(Stream::Stdout, |s| s.dimmed())
    );
    for dep in &entry.dependencies {
      let _ = writeln!(out, "    needs {}", dep);
    }
    for user in &entry.dependents {
      let _ = writeln!(
        out,
        "    {}",
        format!("needed by {}", user).if_supports_color(Stream::Stdout, |s| s.dimmed())
      );
    }
  }
  out
}

pub fn emit_json<T: Serialize>(value: &T) -> anyhow::Result<()> {
  let json = serde_json::to_string_pretty(value).context("Failed to serialize to JSON")?;
  println!("{}", json);
  Ok(())
}

fn stat(out: &mut String, label: &str, value: &str) {
  let label = format!("{:<10}", label);
  let _ = writeln!(
    out,
    "  {} {}",
    label.if_supports_color(Stream::Stdout, |s| s.dimmed()),
    value
  );
}
