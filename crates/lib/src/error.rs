//! Error types for graph construction and execution.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;

use crate::toolchain::ToolchainError;
use crate::unit::ResolveError;

/// Errors that can occur while building or executing an action graph.
///
/// The type is `Clone` because the outcome of a shared action is observed by
/// every dependent waiting on it.
#[derive(Debug, Clone, Error)]
pub enum BuildError {
  /// Graph construction was called without any units.
  #[error("no units supplied")]
  NoUnitsSupplied,

  /// A unit reached the compile stage with nothing to compile.
  #[error("compile {unit}: no source files supplied")]
  NoSourceFiles { unit: String },

  /// An explicit or implicit dependency could not be resolved to a unit.
  #[error("{unit}: cannot resolve dependency {dependency}: {source}")]
  DependencyResolutionFailed {
    unit: String,
    dependency: String,
    #[source]
    source: ResolveError,
  },

  /// A compile/assemble/archive/link/interop invocation failed.
  #[error("{action}: {source}")]
  ToolchainStepFailed {
    action: String,
    #[source]
    source: ToolchainError,
  },

  /// Copying a compiled artifact to its install path failed.
  #[error("install {unit}: copy {} -> {}: {source}", .from.display(), .to.display())]
  InstallCopyFailed {
    unit: String,
    from: PathBuf,
    to: PathBuf,
    #[source]
    source: Arc<io::Error>,
  },

  /// A caller-supplied step reported a failure.
  #[error("{action}: {message}")]
  StepFailed { action: String, message: String },

  /// A caller-built action graph contains a cycle.
  #[error("dependency cycle detected at {0}")]
  CycleDetected(String),

  /// The scheduler broke one of its own invariants (e.g. a step panicked).
  #[error("internal error: {0}")]
  Internal(String),
}

impl BuildError {
  /// Convenience constructor for [`BuildError::StepFailed`].
  pub fn step(action: impl Into<String>, message: impl Into<String>) -> Self {
    BuildError::StepFailed {
      action: action.into(),
      message: message.into(),
    }
  }
}
