mod build;
mod graph;

pub use build::cmd_build;
pub use graph::cmd_graph;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use kiln_lib::build::{BuildContext, Layout};
use kiln_lib::manifest::Manifest;
use kiln_lib::toolchain::ShellToolchain;
use kiln_lib::unit::{Unit, UnitSet};

/// A loaded manifest with its units resolved.
struct Project {
  manifest: Manifest,
  layout: Layout,
  units: UnitSet,
  /// Units selected on the command line, or the roots.
  selected: Vec<Arc<Unit>>,
}

impl Project {
  fn load(file: &Path, names: &[String]) -> Result<Self> {
    let manifest = Manifest::load(file).with_context(|| format!("Failed to load manifest: {}", file.display()))?;

    let base_dir = match file.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
      _ => PathBuf::from("."),
    };
    let units = manifest.units(&base_dir).context("Invalid manifest")?;
    let layout = manifest
      .build
      .layout(&base_dir)
      .with_context(|| format!("Failed to resolve project directory: {}", base_dir.display()))?;

    let selected = if names.is_empty() {
      units.roots()
    } else {
      units.select(names).context("Unknown unit")?
    };

    Ok(Self {
      manifest,
      layout,
      units,
      selected,
    })
  }

  fn build_context(&self) -> BuildContext {
    let toolchain = Arc::new(ShellToolchain::new(self.manifest.toolchain.clone(), self.layout.clone()));
    BuildContext::new(
      self.manifest.build.clone(),
      self.layout.clone(),
      toolchain,
      Arc::new(self.units.clone()),
    )
  }
}
