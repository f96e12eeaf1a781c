//! Implementation of the `pip-df sync` command.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result};
use owo_colors::OwoColorize;

use deepfreeze_lib::installer::PipInstaller;
use deepfreeze_lib::merge::UpgradeDirective;
use deepfreeze_lib::reqfile::HttpFetcher;
use deepfreeze_lib::sync::{SyncOptions, sync};

use crate::output::{format_duration, print_info, print_success, print_warning, symbols};

/// Arguments of the sync command, resolved from the command line.
#[derive(Debug)]
pub struct SyncArgs {
  pub project_root: PathBuf,
  pub extras: Vec<String>,
  pub upgrade: UpgradeDirective,
  pub python: PathBuf,
  pub editable: bool,
  pub uninstall_unneeded: Option<bool>,
}

/// Execute the sync command.
///
/// Installs the project with `<python> -m pip` under the merged constraints,
/// then rewrites the frozen requirements files from what got installed.
///
/// # Errors
///
/// Returns an error if merging, installing, freezing or writing fails. Frozen
/// files are left untouched when the install does not succeed.
pub fn cmd_sync(args: SyncArgs) -> Result<()> {
  let start = Instant::now();
  let installer = PipInstaller::new(&args.python);
  let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;

  let options = SyncOptions {
    project_root: args.project_root,
    extras: args.extras,
    upgrade: args.upgrade,
    editable: args.editable,
    uninstall_unneeded: args.uninstall_unneeded,
  };

  print_info(&format!(
    "Syncing {} with {}",
    options.project_root.display(),
    installer.python().display()
  ));

  let report = sync(&options, &installer, &fetcher).context("Failed to sync project")?;

  for path in &report.written {
    println!("  {} Updated {}", symbols::MODIFY.yellow(), path.display().cyan());
  }

  if !report.unneeded.is_empty() {
    if report.uninstalled {
      for name in &report.unneeded {
        println!("  {} Uninstalled {}", symbols::REMOVE.red(), name.cyan());
      }
    } else if options.uninstall_unneeded.is_none() {
      print_warning(&format!(
        "Not needed by the project: {} (use --uninstall-unneeded to remove)",
        report.unneeded.join(", ")
      ));
    }
  }

  print_success(&format!(
    "Synced {} constraint(s) in {}",
    report.constraints.constraints.len(),
    format_duration(start.elapsed()).dimmed()
  ));

  Ok(())
}
