//! Manifest file types.

use std::io;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::BuildConfig;
use crate::toolchain::ShellToolchainConfig;

/// Errors that can occur while loading a manifest.
#[derive(Debug, Error)]
pub enum ManifestError {
  #[error("failed to read {}: {source}", .path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("failed to parse {}: {source}", .path.display())]
  Parse {
    path: PathBuf,
    #[source]
    source: toml::de::Error,
  },

  #[error("cannot resolve project directory {}: {source}", .path.display())]
  Root {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  #[error("unit {0} is defined more than once")]
  DuplicateUnit(String),

  #[error("unit {unit} imports unknown unit {import}")]
  UnknownImport { unit: String, import: String },

  #[error("import cycle through unit {0}")]
  ImportCycle(String),
}

/// One `[[unit]]` entry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UnitDef {
  /// Import identity.
  pub path: String,
  /// Source directory relative to the manifest. Defaults to `path`.
  pub dir: Option<PathBuf>,
  pub sources: Vec<String>,
  pub interop_sources: Vec<String>,
  pub asm_files: Vec<String>,
  pub objects: Vec<String>,
  /// Import identities of other units in the same manifest.
  pub imports: Vec<String>,
  pub executable: bool,
  /// Build as a test binary.
  pub test: bool,
  pub install: bool,
  pub race: bool,
  pub up_to_date: bool,
}

/// The contents of a `kiln.toml` file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Manifest {
  pub build: BuildConfig,
  pub toolchain: ShellToolchainConfig,
  #[serde(rename = "unit")]
  pub units: Vec<UnitDef>,
}
