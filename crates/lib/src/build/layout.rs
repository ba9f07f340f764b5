//! On-disk layout of build outputs.

use std::path::{Path, PathBuf};

use crate::unit::Unit;

/// Directories that derived unit paths are computed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Layout {
  /// Scratch space for intermediate objects.
  pub workdir: PathBuf,
  /// Install cache for compiled archives.
  pub pkgdir: PathBuf,
  /// Destination for linked binaries.
  pub bindir: PathBuf,
}

impl Layout {
  pub fn new(workdir: impl Into<PathBuf>, pkgdir: impl Into<PathBuf>, bindir: impl Into<PathBuf>) -> Self {
    Self {
      workdir: workdir.into(),
      pkgdir: pkgdir.into(),
      bindir: bindir.into(),
    }
  }

  /// Default layout rooted at `root`: `work/`, `pkg/` and `bin/`.
  pub fn under(root: &Path) -> Self {
    Self::new(root.join("work"), root.join("pkg"), root.join("bin"))
  }

  /// Per-unit scratch directory.
  pub fn unit_workdir(&self, unit: &Unit) -> PathBuf {
    self.workdir.join(&unit.import_path)
  }

  /// The unit's primary compiled object, which doubles as its archive.
  pub fn object_file(&self, unit: &Unit) -> PathBuf {
    self.workdir.join(format!("{}.a", unit.import_path))
  }

  /// Where the compiled archive is cached. Race-instrumented builds use a separate tree.
  pub fn install_path(&self, unit: &Unit) -> PathBuf {
    let base = if unit.race { self.pkgdir.join("race") } else { self.pkgdir.clone() };
    base.join(format!("{}.a", unit.import_path))
  }

  /// Object produced by assembling `source`.
  pub fn asm_object(&self, unit: &Unit, source: &str) -> PathBuf {
    let stem = Path::new(source)
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_else(|| source.to_string());
    self.unit_workdir(unit).join(format!("{}.o", stem))
  }

  /// Directory receiving interop-generated files.
  pub fn interop_dir(&self, unit: &Unit) -> PathBuf {
    self.unit_workdir(unit).join("_interop")
  }

  /// Linked binary. Test binaries stay in the work directory.
  pub fn binary_path(&self, unit: &Unit) -> PathBuf {
    let suffix = std::env::consts::EXE_SUFFIX;
    if unit.test_scope {
      self
        .unit_workdir(unit)
        .join("_test")
        .join(format!("{}.test{}", unit.base_name(), suffix))
    } else {
      self.bindir.join(format!("{}{}", unit.base_name(), suffix))
    }
  }
}
