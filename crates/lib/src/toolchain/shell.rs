//! Toolchain backed by shell command templates.
//!
//! Each stage is a command line with `{placeholder}` markers that are expanded
//! per invocation and run through the platform shell in the unit directory:
//!
//! | placeholder | value |
//! |-------------|-------|
//! | `{unit}`    | import path |
//! | `{dir}`     | unit source directory |
//! | `{sources}` | compile inputs, or interop inputs for the interop stage |
//! | `{source}`  | assembly input |
//! | `{object}`  | compile/assemble/interop output object |
//! | `{objects}` | archive inputs, primary object first |
//! | `{archive}` | the unit's primary object/archive file |
//! | `{binary}`  | link output |
//! | `{outdir}`  | directory for interop-generated files |
//! | `{workdir}`, `{pkgdir}` | build layout directories |

use std::path::{Path, PathBuf};
use std::process::Command;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{InteropOutputs, Toolchain, ToolchainError};
use crate::build::Layout;
use crate::unit::Unit;

/// Name of the object produced by the interop stage inside the interop directory.
pub const INTEROP_OBJECT: &str = "_interop.o";

/// Command templates for each toolchain stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ShellToolchainConfig {
  pub compile: Option<String>,
  pub assemble: Option<String>,
  pub archive: Option<String>,
  pub link: Option<String>,
  pub interop: Option<String>,
  /// Shell override. Defaults to `/bin/sh` on Unix and `cmd.exe` on Windows.
  pub shell: Option<String>,
}

/// A [`Toolchain`] that runs configured shell commands.
#[derive(Debug, Clone)]
pub struct ShellToolchain {
  config: ShellToolchainConfig,
  layout: Layout,
}

impl ShellToolchain {
  pub fn new(config: ShellToolchainConfig, layout: Layout) -> Self {
    Self { config, layout }
  }

  fn template(&self, stage: &'static str, template: &Option<String>) -> Result<String, ToolchainError> {
    template.clone().ok_or(ToolchainError::Unsupported { stage })
  }

  /// Placeholder values shared by every stage.
  fn base_vars(&self, unit: &Unit) -> Vec<(&'static str, String)> {
    vec![
      ("unit", unit.import_path.clone()),
      ("dir", quote(&unit.dir)),
      ("archive", quote(&self.layout.object_file(unit))),
      ("binary", quote(&self.layout.binary_path(unit))),
      ("outdir", quote(&self.layout.interop_dir(unit))),
      ("workdir", quote(&self.layout.workdir)),
      ("pkgdir", quote(&self.layout.pkgdir)),
    ]
  }

  fn run(&self, unit: &Unit, cmd: &str) -> Result<(), ToolchainError> {
    let (shell, args) = get_shell(self.config.shell.as_deref());

    debug!(unit = %unit.import_path, shell = %shell, cmd = %cmd, "spawning toolchain command");

    let mut command = Command::new(&shell);
    command.args(&args).arg(cmd);
    if unit.dir.is_dir() {
      command.current_dir(&unit.dir);
    }

    let output = command.output()?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
      let stdout = String::from_utf8_lossy(&output.stdout);
      if !stdout.is_empty() {
        debug!(stdout = %stdout, "command stdout");
      }
      return Err(ToolchainError::CmdFailed {
        cmd: cmd.to_string(),
        code: output.status.code(),
        stderr: if stderr.is_empty() { "no output".to_string() } else { stderr },
      });
    }

    Ok(())
  }
}

impl Toolchain for ShellToolchain {
  fn compile(&self, unit: &Unit, sources: &[PathBuf]) -> Result<(), ToolchainError> {
    let template = self.template("compile", &self.config.compile)?;
    let object = self.layout.object_file(unit);
    ensure_parent(&object)?;

    let mut vars = self.base_vars(unit);
    vars.push(("sources", quote_all(sources)));
    vars.push(("object", quote(&object)));
    self.run(unit, &expand(&template, &vars))
  }

  fn assemble(&self, unit: &Unit, object: &Path, source: &Path) -> Result<(), ToolchainError> {
    let template = self.template("assemble", &self.config.assemble)?;
    ensure_parent(object)?;

    let mut vars = self.base_vars(unit);
    vars.push(("source", quote(source)));
    vars.push(("object", quote(object)));
    self.run(unit, &expand(&template, &vars))
  }

  fn archive(&self, unit: &Unit, objects: &[PathBuf]) -> Result<(), ToolchainError> {
    let template = self.template("archive", &self.config.archive)?;

    let mut vars = self.base_vars(unit);
    vars.push(("objects", quote_all(objects)));
    self.run(unit, &expand(&template, &vars))
  }

  fn link(&self, unit: &Unit) -> Result<(), ToolchainError> {
    let template = self.template("link", &self.config.link)?;
    ensure_parent(&self.layout.binary_path(unit))?;

    let vars = self.base_vars(unit);
    self.run(unit, &expand(&template, &vars))
  }

  fn preprocess_interop(&self, unit: &Unit) -> Result<InteropOutputs, ToolchainError> {
    self.template("interop", &self.config.interop)?;

    let outdir = self.layout.interop_dir(unit);
    let sources = unit
      .interop_sources
      .iter()
      .map(|name| {
        let file_name = Path::new(name).file_name().map(PathBuf::from).unwrap_or_else(|| PathBuf::from(name));
        outdir.join(file_name)
      })
      .collect();

    Ok(InteropOutputs {
      sources,
      objects: vec![outdir.join(INTEROP_OBJECT)],
    })
  }

  fn run_interop(&self, unit: &Unit, outputs: &InteropOutputs) -> Result<(), ToolchainError> {
    let template = self.template("interop", &self.config.interop)?;
    std::fs::create_dir_all(self.layout.interop_dir(unit))?;

    let inputs: Vec<PathBuf> = unit.interop_sources.iter().map(|name| unit.file_path(name)).collect();
    let object = outputs
      .objects
      .first()
      .cloned()
      .unwrap_or_else(|| self.layout.interop_dir(unit).join(INTEROP_OBJECT));

    let mut vars = self.base_vars(unit);
    vars.push(("sources", quote_all(&inputs)));
    vars.push(("object", quote(&object)));
    self.run(unit, &expand(&template, &vars))
  }
}

fn ensure_parent(path: &Path) -> Result<(), ToolchainError> {
  if let Some(parent) = path.parent() {
    std::fs::create_dir_all(parent)?;
  }
  Ok(())
}

/// Replace every `{name}` in `template` with its value.
fn expand(template: &str, vars: &[(&str, String)]) -> String {
  let mut out = template.to_string();
  for (name, value) in vars {
    out = out.replace(&format!("{{{}}}", name), value);
  }
  out
}

fn quote_all(paths: &[PathBuf]) -> String {
  paths.iter().map(|p| quote(p)).collect::<Vec<_>>().join(" ")
}

/// Quote a path for the shell if it contains anything unusual.
fn quote(path: &Path) -> String {
  let s = path.to_string_lossy();
  let plain = s
    .chars()
    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '/' | '\\' | '.' | '_' | '-' | ':' | '+' | '='));
  if plain {
    s.into_owned()
  } else if cfg!(windows) {
    format!("\"{}\"", s)
  } else {
    format!("'{}'", s.replace('\'', r"'\''"))
  }
}

/// Get the shell command and arguments for the current platform.
fn get_shell(override_shell: Option<&str>) -> (String, Vec<String>) {
  if let Some(shell) = override_shell {
    let args = if shell.contains("powershell") || shell.contains("pwsh") {
      vec!["-NoProfile".to_string(), "-Command".to_string()]
    } else if shell.contains("cmd") {
      vec!["/C".to_string()]
    } else {
      vec!["-c".to_string()]
    };
    return (shell.to_string(), args);
  }

  #[cfg(unix)]
  {
    ("/bin/sh".to_string(), vec!["-c".to_string()])
  }

  #[cfg(windows)]
  {
    ("cmd.exe".to_string(), vec!["/C".to_string()])
  }
}
