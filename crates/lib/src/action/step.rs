//! Executable steps.
//!
//! A [`Step`] is a plain value describing the work an action performs and
//! carrying exactly the context it needs: the unit, the toolchain and the
//! statistics recorder. Keeping steps as data instead of closures makes the
//! graph inspectable (see [`Step::stage`]) and lets every stage be run in
//! isolation.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use tracing::{debug, error};

use crate::build::{Progress, Statistics};
use crate::error::BuildError;
use crate::toolchain::{InteropOutputs, Toolchain, ToolchainError};
use crate::unit::Unit;
use crate::util::fs::FileCopier;

/// Caller-supplied step body.
pub type StepFn = Arc<dyn Fn() -> Result<(), BuildError> + Send + Sync>;

/// Context shared by every stage that calls into the toolchain.
#[derive(Clone)]
pub struct ToolStep {
  pub unit: Arc<Unit>,
  toolchain: Arc<dyn Toolchain>,
  stats: Arc<Statistics>,
}

impl ToolStep {
  pub fn new(unit: Arc<Unit>, toolchain: Arc<dyn Toolchain>, stats: Arc<Statistics>) -> Self {
    Self { unit, toolchain, stats }
  }

  /// Run a toolchain call and record its duration against the unit.
  fn timed(
    &self,
    action: &str,
    stage: &str,
    f: impl FnOnce(&dyn Toolchain, &Unit) -> Result<(), ToolchainError>,
  ) -> Result<(), BuildError> {
    let t0 = Instant::now();
    let result = f(self.toolchain.as_ref(), &self.unit);
    self.stats.record(&self.unit.import_path, stage, t0.elapsed());
    result.map_err(|source| BuildError::ToolchainStepFailed {
      action: action.to_string(),
      source,
    })
  }
}

/// The work performed by an action.
pub enum Step {
  /// Does nothing.
  Noop,

  /// Umbrella step: logs the total build duration and statistics.
  Summary { started: Instant, stats: Arc<Statistics> },

  /// Interop preprocessing, generating the files named in `outputs`.
  Interop { tool: ToolStep, outputs: InteropOutputs },

  /// Compile all sources into the unit's primary object file.
  Compile { tool: ToolStep, sources: Vec<PathBuf> },

  /// Assemble one assembly file.
  Assemble {
    tool: ToolStep,
    object: PathBuf,
    source: PathBuf,
  },

  /// Pack the primary object and extra objects into the unit's archive.
  Archive { tool: ToolStep, objects: Vec<PathBuf> },

  /// Copy the compiled archive to its install path.
  Install {
    unit: String,
    from: PathBuf,
    to: PathBuf,
    copier: Arc<dyn FileCopier>,
  },

  /// Link the unit's binary.
  Link { tool: ToolStep },

  /// Runs `inner`, then reports the unit as finished.
  Report {
    inner: Box<Step>,
    unit: String,
    progress: Arc<dyn Progress>,
  },

  /// Arbitrary function, for caller-built graphs.
  Func(StepFn),
}

impl Step {
  pub fn func(f: impl Fn() -> Result<(), BuildError> + Send + Sync + 'static) -> Self {
    Step::Func(Arc::new(f))
  }

  /// Wrap this step so that `unit` is reported to `progress` once it finishes.
  ///
  /// The wrapped step's result is returned unchanged.
  pub fn reporting(self, unit: impl Into<String>, progress: Arc<dyn Progress>) -> Self {
    Step::Report {
      inner: Box::new(self),
      unit: unit.into(),
      progress,
    }
  }

  /// Short stage label, looking through [`Step::Report`].
  pub fn stage(&self) -> &'static str {
    match self {
      Step::Noop => "noop",
      Step::Summary { .. } => "build",
      Step::Interop { .. } => "interop",
      Step::Compile { .. } => "compile",
      Step::Assemble { .. } => "asm",
      Step::Archive { .. } => "archive",
      Step::Install { .. } => "install",
      Step::Link { .. } => "link",
      Step::Report { inner, .. } => inner.stage(),
      Step::Func(_) => "func",
    }
  }

  /// True if this step reports unit completion.
  pub fn reports_completion(&self) -> bool {
    matches!(self, Step::Report { .. })
  }

  /// Perform the step. `action` names the owning action in errors.
  pub fn run(&self, action: &str) -> Result<(), BuildError> {
    match self {
      Step::Noop => Ok(()),

      Step::Summary { started, stats } => {
        debug!(elapsed = ?started.elapsed(), stats = %stats, "build duration");
        Ok(())
      }

      Step::Interop { tool, outputs } => tool.timed(action, "interop", |tc, unit| tc.run_interop(unit, outputs)),

      Step::Compile { tool, sources } => tool.timed(action, "compile", |tc, unit| tc.compile(unit, sources)),

      Step::Assemble { tool, object, source } => {
        tool.timed(action, "asm", |tc, unit| tc.assemble(unit, object, source))
      }

      Step::Archive { tool, objects } => tool.timed(action, "archive", |tc, unit| tc.archive(unit, objects)),

      Step::Install { unit, from, to, copier } => {
        copier.copy_file(to, from).map_err(|e| BuildError::InstallCopyFailed {
          unit: unit.clone(),
          from: from.clone(),
          to: to.clone(),
          source: Arc::new(e),
        })
      }

      Step::Link { tool } => tool.timed(action, "link", |tc, unit| tc.link(unit)),

      Step::Report { inner, unit, progress } => {
        let result = inner.run(action);
        if let Err(e) = &result {
          error!(unit = %unit, error = %e, "unit failed");
        }
        progress.unit_finished(unit, result.as_ref().map(|_| ()));
        result
      }

      Step::Func(f) => f(),
    }
  }
}

impl fmt::Debug for Step {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Step::Interop { tool, .. }
      | Step::Compile { tool, .. }
      | Step::Assemble { tool, .. }
      | Step::Archive { tool, .. }
      | Step::Link { tool } => write!(f, "Step::{}({})", self.stage(), tool.unit.import_path),
      Step::Install { unit, .. } => write!(f, "Step::install({})", unit),
      Step::Report { inner, unit, .. } => write!(f, "Step::Report({:?}, {})", inner, unit),
      _ => write!(f, "Step::{}", self.stage()),
    }
  }
}
