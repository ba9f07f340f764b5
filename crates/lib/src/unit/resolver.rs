//! Resolution of units by import path.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use thiserror::Error;

use super::Unit;

/// Errors returned by a [`UnitResolver`].
#[derive(Debug, Clone, Error)]
pub enum ResolveError {
  #[error("unit {0} not found")]
  NotFound(String),
}

/// Materializes units by import path.
///
/// Graph construction uses this to look up implicit dependencies (runtime
/// support, test scaffolding) that units never import explicitly.
pub trait UnitResolver: Send + Sync {
  fn resolve_unit(&self, import_path: &str) -> Result<Arc<Unit>, ResolveError>;
}

/// An owned set of loaded units keyed by import path.
#[derive(Debug, Clone, Default)]
pub struct UnitSet {
  units: BTreeMap<String, Arc<Unit>>,
}

impl UnitSet {
  pub fn new() -> Self {
    Self::default()
  }

  /// Insert a unit, replacing any previous unit with the same import path.
  pub fn insert(&mut self, unit: Arc<Unit>) {
    self.units.insert(unit.import_path.clone(), unit);
  }

  pub fn get(&self, import_path: &str) -> Option<&Arc<Unit>> {
    self.units.get(import_path)
  }

  pub fn len(&self) -> usize {
    self.units.len()
  }

  pub fn is_empty(&self) -> bool {
    self.units.is_empty()
  }

  /// All units in import-path order.
  pub fn iter(&self) -> impl Iterator<Item = &Arc<Unit>> {
    self.units.values()
  }

  /// Look up the named units, failing on the first unknown name.
  pub fn select(&self, names: &[String]) -> Result<Vec<Arc<Unit>>, ResolveError> {
    names.iter().map(|name| self.resolve_unit(name)).collect()
  }

  /// Units that no other unit in the set imports, in import-path order.
  pub fn roots(&self) -> Vec<Arc<Unit>> {
    let imported: HashSet<&str> = self
      .units
      .values()
      .flat_map(|unit| unit.imports.iter().map(|dep| dep.import_path.as_str()))
      .collect();

    self
      .units
      .values()
      .filter(|unit| !imported.contains(unit.import_path.as_str()))
      .cloned()
      .collect()
  }
}

impl UnitResolver for UnitSet {
  fn resolve_unit(&self, import_path: &str) -> Result<Arc<Unit>, ResolveError> {
    self
      .units
      .get(import_path)
      .cloned()
      .ok_or_else(|| ResolveError::NotFound(import_path.to_string()))
  }
}
