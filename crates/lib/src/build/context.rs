//! Everything graph construction needs besides the units themselves.

use std::sync::Arc;

use super::{ConsolePrinter, Layout, Progress, Statistics};
use crate::config::BuildConfig;
use crate::execute::ExecuteConfig;
use crate::toolchain::Toolchain;
use crate::unit::UnitResolver;
use crate::util::fs::{FileCopier, FsCopier};

/// Collaborators and settings for one build invocation.
#[derive(Clone)]
pub struct BuildContext {
  pub config: BuildConfig,
  pub layout: Layout,
  toolchain: Arc<dyn Toolchain>,
  resolver: Arc<dyn UnitResolver>,
  copier: Arc<dyn FileCopier>,
  progress: Arc<dyn Progress>,
  stats: Arc<Statistics>,
}

impl BuildContext {
  /// Create a context that installs with [`FsCopier`] and prints completed units.
  pub fn new(
    config: BuildConfig,
    layout: Layout,
    toolchain: Arc<dyn Toolchain>,
    resolver: Arc<dyn UnitResolver>,
  ) -> Self {
    Self {
      config,
      layout,
      toolchain,
      resolver,
      copier: Arc::new(FsCopier),
      progress: Arc::new(ConsolePrinter),
      stats: Arc::new(Statistics::new()),
    }
  }

  pub fn with_copier(mut self, copier: Arc<dyn FileCopier>) -> Self {
    self.copier = copier;
    self
  }

  pub fn with_progress(mut self, progress: Arc<dyn Progress>) -> Self {
    self.progress = progress;
    self
  }

  pub fn toolchain(&self) -> &Arc<dyn Toolchain> {
    &self.toolchain
  }

  pub fn resolver(&self) -> &Arc<dyn UnitResolver> {
    &self.resolver
  }

  pub fn copier(&self) -> &Arc<dyn FileCopier> {
    &self.copier
  }

  pub fn progress(&self) -> &Arc<dyn Progress> {
    &self.progress
  }

  pub fn statistics(&self) -> &Arc<Statistics> {
    &self.stats
  }

  pub fn execute_config(&self) -> ExecuteConfig {
    self.config.execute_config()
  }
}
