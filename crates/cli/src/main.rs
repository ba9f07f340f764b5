mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use crate::output::OutputFormat;

/// kiln - incremental build orchestrator
#[derive(Parser)]
#[command(name = "kiln")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable debug logging (overridden by RUST_LOG)
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

#[derive(Subcommand)]
enum Commands {
  /// Build units and everything they import
  Build {
    /// Units to build (default: every unit no other unit imports)
    units: Vec<String>,

    /// Path to the manifest
    #[arg(short, long, default_value = "kiln.toml")]
    file: PathBuf,

    /// Maximum number of steps to run at once
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Stop starting new steps after the first failure
    #[arg(long)]
    fail_fast: bool,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },

  /// Print the action graph without running it
  Graph {
    /// Units to plan (default: every unit no other unit imports)
    units: Vec<String>,

    /// Path to the manifest
    #[arg(short, long, default_value = "kiln.toml")]
    file: PathBuf,

    #[arg(short, long, value_enum, default_value_t)]
    output: OutputFormat,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  let default_level = if cli.verbose { "debug" } else { "warn" };
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Build {
      units,
      file,
      jobs,
      fail_fast,
      output,
    } => {
      if !cmd::cmd_build(&file, &units, jobs, fail_fast, output)? {
        std::process::exit(1);
      }
      Ok(())
    }
    Commands::Graph { units, file, output } => cmd::cmd_graph(&file, &units, output),
  }
}
