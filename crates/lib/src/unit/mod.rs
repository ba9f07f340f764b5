//! Compilable units.
//!
//! A [`Unit`] is the input to graph construction: a package with an import
//! identity, groups of source files, a list of imported units and a handful of
//! build flags. Units are produced by an external loader (see
//! [`crate::manifest`]) and are read-only to the build core.

mod resolver;

pub use resolver::{ResolveError, UnitResolver, UnitSet};

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// A compilable source unit.
///
/// File names in the source groups are relative to [`Unit::dir`] unless they
/// are already absolute.
#[derive(Debug, Clone, Default)]
pub struct Unit {
  /// Unique import identity, e.g. `example.com/net/http`.
  pub import_path: String,
  /// Directory holding the unit's sources.
  pub dir: PathBuf,
  /// Plain source files.
  pub sources: Vec<String>,
  /// Sources that need interop preprocessing before compilation.
  pub interop_sources: Vec<String>,
  /// Assembly files.
  pub asm_files: Vec<String>,
  /// Precompiled object files packed into the unit's archive.
  pub objects: Vec<String>,
  /// Imported units.
  pub imports: Vec<Arc<Unit>>,
  /// Produces a linked binary.
  pub executable: bool,
  /// Built for test execution: no install caching, no completion report.
  pub test_scope: bool,
  /// The compiled archive should be copied to its install path.
  pub install: bool,
  /// Built with race instrumentation.
  pub race: bool,
  /// Precomputed staleness result; up-to-date units contribute no actions.
  pub up_to_date: bool,
}

impl Unit {
  pub fn new(import_path: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
    Self {
      import_path: import_path.into(),
      dir: dir.into(),
      ..Default::default()
    }
  }

  pub fn with_sources<I, S>(mut self, files: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.sources = files.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_interop_sources<I, S>(mut self, files: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.interop_sources = files.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_asm_files<I, S>(mut self, files: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.asm_files = files.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_objects<I, S>(mut self, files: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.objects = files.into_iter().map(Into::into).collect();
    self
  }

  pub fn with_imports(mut self, imports: impl IntoIterator<Item = Arc<Unit>>) -> Self {
    self.imports = imports.into_iter().collect();
    self
  }

  pub fn executable(mut self) -> Self {
    self.executable = true;
    self
  }

  pub fn test_scope(mut self) -> Self {
    self.test_scope = true;
    self
  }

  pub fn install(mut self) -> Self {
    self.install = true;
    self
  }

  pub fn race(mut self) -> Self {
    self.race = true;
    self
  }

  pub fn up_to_date(mut self) -> Self {
    self.up_to_date = true;
    self
  }

  /// True if the unit has anything the compile stage could consume.
  pub fn has_sources(&self) -> bool {
    !self.sources.is_empty() || !self.interop_sources.is_empty()
  }

  /// Resolve a file name from one of the source groups against the unit directory.
  pub fn file_path(&self, name: &str) -> PathBuf {
    let name = Path::new(name);
    if name.is_absolute() {
      name.to_path_buf()
    } else {
      self.dir.join(name)
    }
  }

  /// Last element of the import path, used to name binaries.
  pub fn base_name(&self) -> &str {
    self.import_path.rsplit('/').next().unwrap_or(&self.import_path)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn has_sources_counts_interop_files() {
    let plain = Unit::new("a", "/src/a").with_sources(["a.src"]);
    let interop = Unit::new("b", "/src/b").with_interop_sources(["b.ffi"]);
    let asm_only = Unit::new("c", "/src/c").with_asm_files(["c.s"]);

    assert!(plain.has_sources());
    assert!(interop.has_sources());
    assert!(!asm_only.has_sources());
  }

  #[test]
  fn file_path_keeps_absolute_names() {
    let unit = Unit::new("a", "/src/a");
    assert_eq!(unit.file_path("x.src"), PathBuf::from("/src/a/x.src"));
    assert_eq!(unit.file_path("/gen/y.src"), PathBuf::from("/gen/y.src"));
  }

  #[test]
  fn base_name_is_last_element() {
    assert_eq!(Unit::new("example.com/cmd/tool", "/").base_name(), "tool");
    assert_eq!(Unit::new("tool", "/").base_name(), "tool");
  }
}
