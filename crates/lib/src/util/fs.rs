//! Filesystem helpers.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tracing::debug;

/// Copies a file to a destination, creating parent directories as needed.
pub trait FileCopier: Send + Sync {
  fn copy_file(&self, to: &Path, from: &Path) -> io::Result<()>;
}

/// Copies on the local filesystem.
///
/// The copy is written to a temporary file next to `to` and renamed into
/// place, so readers never observe a half-written archive.
#[derive(Debug, Default, Clone, Copy)]
pub struct FsCopier;

impl FileCopier for FsCopier {
  fn copy_file(&self, to: &Path, from: &Path) -> io::Result<()> {
    let dir = match to.parent() {
      Some(dir) if !dir.as_os_str().is_empty() => dir,
      _ => Path::new("."),
    };
    fs::create_dir_all(dir)?;

    let mut src = fs::File::open(from)?;
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    let bytes = io::copy(&mut src, tmp.as_file_mut())?;
    tmp.persist(to).map_err(|e| e.error)?;

    debug!(from = %from.display(), to = %to.display(), bytes, "copied file");
    Ok(())
  }
}

/// Resolve `path` against the current directory if it is relative.
///
/// Toolchain commands run inside unit directories, so every path handed to
/// them must be absolute. `.` components are dropped; `..` is kept as is.
pub fn absolute(path: &Path) -> io::Result<PathBuf> {
  let path = if path.is_absolute() {
    path.to_path_buf()
  } else {
    std::env::current_dir()?.join(path)
  };
  Ok(path.components().filter(|c| !matches!(c, Component::CurDir)).collect())
}
