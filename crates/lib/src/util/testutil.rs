//! Test utilities for kiln-lib.
//!
//! In-memory stand-ins for the toolchain, the progress reporter and the file
//! copier, plus helpers that assemble a [`BuildContext`] from them.

use std::collections::HashSet;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::build::{BuildContext, Layout, Progress};
use crate::config::BuildConfig;
use crate::error::BuildError;
use crate::toolchain::{InteropOutputs, Toolchain, ToolchainError};
use crate::unit::{Unit, UnitSet};
use crate::util::fs::FileCopier;

fn join(paths: &[PathBuf]) -> String {
  paths.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(" ")
}

/// Toolchain that records every call instead of running tools.
///
/// Calls are recorded as `"<stage> <unit> [args...]"`, e.g.
/// `"compile ex/a /src/a/a.src"`.
#[derive(Debug)]
pub struct FakeToolchain {
  calls: Mutex<Vec<String>>,
  failing: HashSet<String>,
  interop_sources: bool,
}

impl Default for FakeToolchain {
  fn default() -> Self {
    Self {
      calls: Mutex::new(Vec::new()),
      failing: HashSet::new(),
      interop_sources: true,
    }
  }
}

impl FakeToolchain {
  /// Fail every call whose description is, or starts with, one of `calls`.
  pub fn failing<I, S>(calls: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      failing: calls.into_iter().map(Into::into).collect(),
      ..Self::default()
    }
  }

  /// Whether interop preprocessing generates sources. It always generates an object.
  pub fn with_interop_sources(mut self, enabled: bool) -> Self {
    self.interop_sources = enabled;
    self
  }

  pub fn calls(&self) -> Vec<String> {
    self.calls.lock().unwrap().clone()
  }

  fn call(&self, call: String) -> Result<(), ToolchainError> {
    let fails = self
      .failing
      .iter()
      .any(|f| call == *f || call.starts_with(&format!("{} ", f)));
    self.calls.lock().unwrap().push(call.clone());
    if fails {
      return Err(ToolchainError::Other(format!("injected failure: {}", call)));
    }
    Ok(())
  }
}

impl Toolchain for FakeToolchain {
  fn compile(&self, unit: &Unit, sources: &[PathBuf]) -> Result<(), ToolchainError> {
    self.call(format!("compile {} {}", unit.import_path, join(sources)))
  }

  fn assemble(&self, unit: &Unit, _object: &Path, source: &Path) -> Result<(), ToolchainError> {
    self.call(format!("asm {} {}", unit.import_path, source.display()))
  }

  fn archive(&self, unit: &Unit, objects: &[PathBuf]) -> Result<(), ToolchainError> {
    self.call(format!("archive {} {}", unit.import_path, join(objects)))
  }

  fn link(&self, unit: &Unit) -> Result<(), ToolchainError> {
    self.call(format!("link {}", unit.import_path))
  }

  fn preprocess_interop(&self, unit: &Unit) -> Result<InteropOutputs, ToolchainError> {
    self.call(format!("preprocess {}", unit.import_path))?;

    let gen_dir = Path::new("/gen").join(&unit.import_path);
    let sources = if self.interop_sources {
      unit
        .interop_sources
        .iter()
        .map(|name| gen_dir.join(format!("{}.src", name)))
        .collect()
    } else {
      Vec::new()
    };
    Ok(InteropOutputs {
      sources,
      objects: vec![gen_dir.join("_interop.o")],
    })
  }

  fn run_interop(&self, unit: &Unit, _outputs: &InteropOutputs) -> Result<(), ToolchainError> {
    self.call(format!("interop {}", unit.import_path))
  }
}

/// Progress reporter that remembers every finished unit.
#[derive(Debug, Default)]
pub struct RecordingProgress {
  finished: Mutex<Vec<(String, bool)>>,
}

impl RecordingProgress {
  /// Finished units with whether they succeeded, in completion order.
  pub fn finished(&self) -> Vec<(String, bool)> {
    self.finished.lock().unwrap().clone()
  }
}

impl Progress for RecordingProgress {
  fn unit_finished(&self, unit: &str, result: Result<(), &BuildError>) {
    self.finished.lock().unwrap().push((unit.to_string(), result.is_ok()));
  }
}

/// Copier that records `(from, to)` pairs without touching the filesystem.
#[derive(Debug, Default)]
pub struct RecordingCopier {
  copies: Mutex<Vec<(PathBuf, PathBuf)>>,
}

impl RecordingCopier {
  pub fn copies(&self) -> Vec<(PathBuf, PathBuf)> {
    self.copies.lock().unwrap().clone()
  }
}

impl FileCopier for RecordingCopier {
  fn copy_file(&self, to: &Path, from: &Path) -> io::Result<()> {
    self.copies.lock().unwrap().push((from.to_path_buf(), to.to_path_buf()));
    Ok(())
  }
}

/// A context wired to fakes, with handles to inspect them.
pub struct TestEnv {
  pub ctx: BuildContext,
  pub toolchain: Arc<FakeToolchain>,
  pub progress: Arc<RecordingProgress>,
  pub copier: Arc<RecordingCopier>,
}

/// Context over `toolchain` resolving implicit dependencies from `units`,
/// with outputs laid out under `/proj`.
pub fn harness(toolchain: FakeToolchain, units: UnitSet) -> TestEnv {
  let toolchain = Arc::new(toolchain);
  let progress = Arc::new(RecordingProgress::default());
  let copier = Arc::new(RecordingCopier::default());

  let ctx = BuildContext::new(
    BuildConfig::default(),
    Layout::under(Path::new("/proj")),
    toolchain.clone(),
    Arc::new(units),
  )
  .with_progress(progress.clone())
  .with_copier(copier.clone());

  TestEnv {
    ctx,
    toolchain,
    progress,
    copier,
  }
}

/// Context with a default fake toolchain and no resolvable units.
pub fn test_context() -> (BuildContext, Arc<FakeToolchain>) {
  test_context_with(FakeToolchain::default())
}

pub fn test_context_with(toolchain: FakeToolchain) -> (BuildContext, Arc<FakeToolchain>) {
  let env = harness(toolchain, UnitSet::new());
  (env.ctx, env.toolchain)
}
