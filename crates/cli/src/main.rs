mod cmd;
mod output;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use deepfreeze_lib::merge::UpgradeDirective;

use crate::output::OutputFormat;

/// pip-df - keep a Python project's frozen dependencies in sync
#[derive(Parser)]
#[command(name = "pip-df")]
#[command(author, version, about, long_about = None)]
struct Cli {
  /// Enable verbose output
  #[arg(short, long, global = true)]
  verbose: bool,

  #[command(subcommand)]
  command: Commands,
}

/// Selection of requirements files and upgrade intent shared by all commands.
#[derive(Args, Debug)]
struct ProjectArgs {
  /// Project directory containing requirements.txt.in
  #[arg(long, default_value = ".")]
  project_root: PathBuf,

  /// Extras to include (comma separated, repeatable)
  #[arg(short = 'x', long = "extras", value_delimiter = ',')]
  extras: Vec<String>,

  /// Distributions to upgrade (comma separated, repeatable)
  #[arg(short = 'u', long = "upgrade", value_delimiter = ',')]
  upgrade: Vec<String>,

  /// Upgrade every frozen distribution
  #[arg(long)]
  upgrade_all: bool,
}

impl ProjectArgs {
  fn upgrade_directive(&self) -> UpgradeDirective {
    UpgradeDirective::from_flags(self.upgrade_all, &self.upgrade)
  }
}

#[derive(Subcommand)]
enum Commands {
  /// Print the constraints the installer would run with
  Merge {
    #[command(flatten)]
    project: ProjectArgs,

    /// Output format
    #[arg(long, value_enum, default_value = "text")]
    format: OutputFormat,
  },

  /// Install the project and update the frozen requirements files
  Sync {
    #[command(flatten)]
    project: ProjectArgs,

    /// Python interpreter whose environment is synced
    #[arg(long, env = "PIP_DF_PYTHON", default_value = "python")]
    python: PathBuf,

    /// Install the project in editable mode (default)
    #[arg(long, overrides_with = "no_editable")]
    editable: bool,

    /// Install the project in non-editable mode
    #[arg(long, overrides_with = "editable")]
    no_editable: bool,

    /// Uninstall distributions the project does not depend on
    #[arg(long, overrides_with = "no_uninstall_unneeded")]
    uninstall_unneeded: bool,

    /// Keep distributions the project does not depend on, without reporting them
    #[arg(long, overrides_with = "uninstall_unneeded")]
    no_uninstall_unneeded: bool,
  },
}

fn main() -> Result<()> {
  let cli = Cli::parse();

  // RUST_LOG wins; --verbose only changes the default.
  let default_level = if cli.verbose { "debug" } else { "warn" };
  tracing_subscriber::fmt()
    .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
    .with_writer(std::io::stderr)
    .without_time()
    .init();

  match cli.command {
    Commands::Merge { project, format } => cmd::cmd_merge(
      &project.project_root,
      &project.extras,
      project.upgrade_directive(),
      format,
    ),
    Commands::Sync {
      project,
      python,
      editable: _,
      no_editable,
      uninstall_unneeded,
      no_uninstall_unneeded,
    } => {
      let uninstall_unneeded = match (uninstall_unneeded, no_uninstall_unneeded) {
        (true, _) => Some(true),
        (_, true) => Some(false),
        _ => None,
      };
      cmd::cmd_sync(cmd::SyncArgs {
        upgrade: project.upgrade_directive(),
        project_root: project.project_root,
        extras: project.extras,
        python,
        editable: !no_editable,
        uninstall_unneeded,
      })
    }
  }
}
