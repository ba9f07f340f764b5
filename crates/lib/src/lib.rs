//! kiln-lib: incremental build orchestration.
//!
//! This crate turns a set of compilable units into a graph of build actions
//! and runs it:
//! - `Unit`: a package with sources, imports and build flags
//! - `ActionGraph`: shared, deduplicated build actions with prerequisites
//! - `build`: per-unit compile pipelines, memoized across the import graph
//! - `execute`: single-flight, bounded-concurrency execution with failure propagation
//! - `Manifest`: the `kiln.toml` file units and settings are loaded from

pub mod action;
pub mod build;
pub mod config;
pub mod error;
pub mod execute;
pub mod manifest;
pub mod toolchain;
pub mod unit;
pub mod util;

pub use action::{ActionGraph, ActionId, Step};
pub use build::{BuildContext, BuildPlan, Layout, build, build_graph};
pub use config::BuildConfig;
pub use error::BuildError;
pub use execute::{ExecuteConfig, ExecuteReport, execute};
pub use manifest::Manifest;
pub use unit::{Unit, UnitResolver, UnitSet};
