//! Manifest loading.
//!
//! A manifest (`kiln.toml`) holds the build configuration, the toolchain
//! command templates and the unit definitions. Units reference each other by
//! import path; [`Manifest::units`] validates those references and turns the
//! definitions into shared [`Unit`] values.

mod types;

pub use types::*;

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use tracing::{debug, info};

use crate::unit::{Unit, UnitSet};
use crate::util::fs::absolute;

/// Default manifest file name.
pub const MANIFEST_FILE: &str = "kiln.toml";

impl Manifest {
  /// Read and parse a manifest file.
  pub fn load(path: &Path) -> Result<Self, ManifestError> {
    let content = fs::read_to_string(path).map_err(|source| ManifestError::Read {
      path: path.to_path_buf(),
      source,
    })?;
    let manifest: Manifest = toml::from_str(&content).map_err(|source| ManifestError::Parse {
      path: path.to_path_buf(),
      source,
    })?;
    info!(path = %path.display(), units = manifest.units.len(), "loaded manifest");
    Ok(manifest)
  }

  /// Build the unit set, resolving source directories against `base_dir`.
  ///
  /// A relative `base_dir` is taken from the current directory, so unit
  /// directories are always absolute.
  ///
  /// # Errors
  ///
  /// - `Root` if the current directory cannot be read.
  /// - `DuplicateUnit` if two entries share an import path.
  /// - `UnknownImport` if an import names no entry.
  /// - `ImportCycle` if units import each other in a loop.
  pub fn units(&self, base_dir: &Path) -> Result<UnitSet, ManifestError> {
    let base_dir = absolute(base_dir).map_err(|source| ManifestError::Root {
      path: base_dir.to_path_buf(),
      source,
    })?;

    let mut graph: DiGraph<usize, ()> = DiGraph::new();
    let mut nodes: HashMap<&str, NodeIndex> = HashMap::new();

    for (i, def) in self.units.iter().enumerate() {
      if nodes.insert(def.path.as_str(), graph.add_node(i)).is_some() {
        return Err(ManifestError::DuplicateUnit(def.path.clone()));
      }
    }

    // edges point from import to importer, so imports sort first
    for def in &self.units {
      let node = nodes[def.path.as_str()];
      for import in &def.imports {
        let dep = nodes.get(import.as_str()).ok_or_else(|| ManifestError::UnknownImport {
          unit: def.path.clone(),
          import: import.clone(),
        })?;
        graph.update_edge(*dep, node, ());
      }
    }

    let order = toposort(&graph, None)
      .map_err(|cycle| ManifestError::ImportCycle(self.units[graph[cycle.node_id()]].path.clone()))?;

    let mut set = UnitSet::new();
    for node in order {
      let def = &self.units[graph[node]];
      let imports = def
        .imports
        .iter()
        .filter_map(|import| set.get(import).cloned())
        .collect::<Vec<_>>();
      set.insert(Arc::new(unit_from_def(def, &base_dir, imports)));
    }

    debug!(units = set.len(), "resolved manifest units");
    Ok(set)
  }
}

fn unit_from_def(def: &UnitDef, base_dir: &Path, imports: Vec<Arc<Unit>>) -> Unit {
  let dir = match &def.dir {
    Some(dir) => base_dir.join(dir),
    None => base_dir.join(&def.path),
  };

  let mut unit = Unit::new(def.path.clone(), dir)
    .with_sources(def.sources.iter().cloned())
    .with_interop_sources(def.interop_sources.iter().cloned())
    .with_asm_files(def.asm_files.iter().cloned())
    .with_objects(def.objects.iter().cloned())
    .with_imports(imports);
  unit.executable = def.executable;
  unit.test_scope = def.test;
  unit.install = def.install;
  unit.race = def.race;
  unit.up_to_date = def.up_to_date;
  unit
}
