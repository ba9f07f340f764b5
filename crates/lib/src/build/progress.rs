//! Unit completion reporting.

use tracing::debug;

use crate::error::BuildError;

/// Receives a notification each time a unit's terminal step finishes.
///
/// Called for failures as well as successes. The failure itself still travels
/// the error path: it is returned by the build and logged by the executor, so
/// sinks that only report successes lose nothing.
///
/// Implementations must not fail the build; errors in reporting are their own concern.
pub trait Progress: Send + Sync {
  fn unit_finished(&self, unit: &str, result: Result<(), &BuildError>);
}

/// Prints the import path of every unit that built successfully.
///
/// Failed units are not printed; their errors reach the user through the
/// build result.
#[derive(Debug, Default, Clone, Copy)]
pub struct ConsolePrinter;

impl Progress for ConsolePrinter {
  fn unit_finished(&self, unit: &str, result: Result<(), &BuildError>) {
    if result.is_ok() {
      println!("{}", unit);
    }
  }
}

/// Reports nothing beyond a debug trace.
#[derive(Debug, Default, Clone, Copy)]
pub struct Silent;

impl Progress for Silent {
  fn unit_finished(&self, unit: &str, result: Result<(), &BuildError>) {
    debug!(unit = %unit, ok = result.is_ok(), "unit finished");
  }
}
