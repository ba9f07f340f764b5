//! Build configuration.
//!
//! Read from the `[build]` table of `kiln.toml`. Every field has a default, so
//! an empty table (or none at all) is valid.

use std::io;
use std::path::{Path, PathBuf};

use semver::Version;
use serde::{Deserialize, Serialize};

use crate::build::Layout;
use crate::execute::ExecuteConfig;
use crate::util::fs::absolute;

/// Names of the units that are added as implicit dependencies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ImplicitDeps {
  /// Runtime support, linked into every executable.
  pub runtime: String,
  /// Race-detector runtime, linked into race-instrumented executables.
  pub race_runtime: String,
  /// Runtime support for units with interop sources.
  pub interop_runtime: String,
  /// Regular expression support needed by test scaffolding.
  pub regex: String,
  /// Test dependency-injection unit, needed from `test_deps_since` onwards.
  pub test_deps: String,
}

impl Default for ImplicitDeps {
  fn default() -> Self {
    Self {
      runtime: "runtime".to_string(),
      race_runtime: "runtime/race".to_string(),
      interop_runtime: "runtime/interop".to_string(),
      regex: "regexp".to_string(),
      test_deps: "testing/internal/testdeps".to_string(),
    }
  }
}

/// Configuration for graph construction and execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BuildConfig {
  /// Scratch directory for intermediate objects.
  pub workdir: PathBuf,
  /// Install cache for compiled archives.
  pub pkgdir: PathBuf,
  /// Destination for linked binaries.
  pub bindir: PathBuf,
  /// Maximum number of steps running at once. Defaults to the processor count.
  pub parallelism: Option<usize>,
  /// Stop starting new steps after the first failure.
  pub fail_fast: bool,
  /// Version of the language being built.
  pub language_version: Version,
  /// First language version whose tests need the test dependency-injection unit.
  pub test_deps_since: Version,
  /// Add runtime and test-support units as implicit dependencies.
  pub implicit_dependencies: bool,
  pub implicit: ImplicitDeps,
}

impl Default for BuildConfig {
  fn default() -> Self {
    Self {
      workdir: PathBuf::from(".kiln/work"),
      pkgdir: PathBuf::from("pkg"),
      bindir: PathBuf::from("bin"),
      parallelism: None,
      fail_fast: false,
      language_version: Version::new(1, 8, 0),
      test_deps_since: Version::new(1, 8, 0),
      implicit_dependencies: true,
      implicit: ImplicitDeps::default(),
    }
  }
}

impl BuildConfig {
  /// Output layout with relative directories resolved against `root`.
  ///
  /// A relative `root` is taken from the current directory, so every layout
  /// path is absolute.
  pub fn layout(&self, root: &Path) -> io::Result<Layout> {
    let root = absolute(root)?;
    Ok(Layout::new(root.join(&self.workdir), root.join(&self.pkgdir), root.join(&self.bindir)))
  }

  /// Whether test-scope units need the test dependency-injection unit.
  pub fn wants_test_deps(&self) -> bool {
    self.language_version >= self.test_deps_since
  }

  pub fn execute_config(&self) -> ExecuteConfig {
    let mut config = ExecuteConfig {
      fail_fast: self.fail_fast,
      ..ExecuteConfig::default()
    };
    if let Some(parallelism) = self.parallelism {
      config.parallelism = parallelism.max(1);
    }
    config
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn defaults_from_empty_table() {
    let config: BuildConfig = toml::from_str("").unwrap();
    assert_eq!(config, BuildConfig::default());
    assert!(config.implicit_dependencies);
    assert!(config.wants_test_deps());
  }

  #[test]
  fn parses_versions_and_names() {
    let config: BuildConfig = toml::from_str(
      r#"
        parallelism = 3
        fail_fast = true
        language_version = "1.7.4"

        [implicit]
        runtime = "core/rt"
      "#,
    )
    .unwrap();

    assert_eq!(config.parallelism, Some(3));
    assert_eq!(config.implicit.runtime, "core/rt");
    assert_eq!(config.implicit.regex, "regexp");
    assert!(!config.wants_test_deps());

    let exec = config.execute_config();
    assert_eq!(exec.parallelism, 3);
    assert!(exec.fail_fast);
  }

  #[test]
  fn zero_parallelism_is_clamped() {
    let config = BuildConfig {
      parallelism: Some(0),
      ..Default::default()
    };
    assert_eq!(config.execute_config().parallelism, 1);
  }

  #[test]
  fn unknown_fields_are_rejected() {
    assert!(toml::from_str::<BuildConfig>("jobs = 4").is_err());
  }

  #[test]
  fn layout_resolves_relative_dirs() {
    let layout = BuildConfig::default().layout(Path::new("/proj")).unwrap();
    assert_eq!(layout.workdir, PathBuf::from("/proj/.kiln/work"));
    assert_eq!(layout.pkgdir, PathBuf::from("/proj/pkg"));
  }

  #[test]
  fn layout_from_relative_root_is_absolute() {
    let layout = BuildConfig::default().layout(Path::new(".")).unwrap();
    let cwd = std::env::current_dir().unwrap();
    assert_eq!(layout.workdir, cwd.join(".kiln").join("work"));
    assert_eq!(layout.bindir, cwd.join("bin"));
  }
}
