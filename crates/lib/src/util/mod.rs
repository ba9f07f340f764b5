//! Shared utilities.
//!
//! Filesystem helpers used by install steps, and test helpers.

pub mod fs;

#[cfg(test)]
pub mod testutil;
