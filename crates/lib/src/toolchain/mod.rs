//! Toolchain capability interface.
//!
//! The build core never invokes compilers directly. Every pipeline stage goes
//! through a [`Toolchain`], which may run arbitrary external processes. The
//! crate ships [`shell::ShellToolchain`], driven by command templates from the
//! project manifest.

pub mod shell;

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;

use crate::unit::Unit;

pub use shell::{ShellToolchain, ShellToolchainConfig};

/// Errors reported by toolchain invocations.
#[derive(Debug, Clone, Error)]
pub enum ToolchainError {
  /// An external command exited unsuccessfully.
  #[error("command `{cmd}` failed with exit code {code:?}: {stderr}")]
  CmdFailed {
    cmd: String,
    code: Option<i32>,
    stderr: String,
  },

  /// The toolchain has no way to perform this stage.
  #[error("no {stage} command configured")]
  Unsupported { stage: &'static str },

  #[error("io error: {0}")]
  Io(Arc<io::Error>),

  #[error("{0}")]
  Other(String),
}

impl From<io::Error> for ToolchainError {
  fn from(err: io::Error) -> Self {
    ToolchainError::Io(Arc::new(err))
  }
}

/// Files produced by interop preprocessing.
///
/// Returned at plan time so later pipeline stages know what they will consume;
/// the files themselves only exist after [`Toolchain::run_interop`] ran.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InteropOutputs {
  /// Generated sources, compiled together with the unit's plain sources.
  pub sources: Vec<PathBuf>,
  /// Generated objects, packed into the unit's archive.
  pub objects: Vec<PathBuf>,
}

/// Compile, assemble, archive and link operations over a unit.
///
/// Implementations must be safe to invoke concurrently for distinct units.
pub trait Toolchain: Send + Sync {
  /// Compile `sources` into the unit's primary object file.
  fn compile(&self, unit: &Unit, sources: &[PathBuf]) -> Result<(), ToolchainError>;

  /// Assemble `source` into `object`.
  fn assemble(&self, unit: &Unit, object: &Path, source: &Path) -> Result<(), ToolchainError>;

  /// Pack `objects` into the unit's archive. The primary object file comes first.
  fn archive(&self, unit: &Unit, objects: &[PathBuf]) -> Result<(), ToolchainError>;

  /// Link the unit into its final binary.
  fn link(&self, unit: &Unit) -> Result<(), ToolchainError>;

  /// Plan interop preprocessing: name the sources and objects it will generate.
  fn preprocess_interop(&self, unit: &Unit) -> Result<InteropOutputs, ToolchainError>;

  /// Run interop preprocessing, producing the files named by `outputs`.
  fn run_interop(&self, unit: &Unit, outputs: &InteropOutputs) -> Result<(), ToolchainError>;
}
