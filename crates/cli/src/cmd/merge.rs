//! Implementation of the `pip-df merge` command.
//!
//! Prints the constraints `sync` would hand to the installer, without
//! installing or writing anything.

use std::path::Path;

use anyhow::{Context, Result};
use tracing::debug;

use deepfreeze_lib::layout::ProjectLayout;
use deepfreeze_lib::merge::{UpgradeDirective, merge};
use deepfreeze_lib::reqfile::HttpFetcher;

use crate::output::{OutputFormat, print_info, print_json};

/// Execute the merge command.
///
/// Text output is the constraints file content, one line each. JSON output
/// adds the name and origin of every constraint.
///
/// # Errors
///
/// Returns an error if a requirements file cannot be read or parsed.
pub fn cmd_merge(project_root: &Path, extras: &[String], upgrade: UpgradeDirective, format: OutputFormat) -> Result<()> {
  let layout = ProjectLayout::new(project_root);
  let input = layout.merge_input(extras, upgrade);
  debug!(
    frozen = input.frozen_files.len(),
    input = ?input.input_file,
    "merging requirements files"
  );

  let fetcher = HttpFetcher::new().context("Failed to create HTTP client")?;
  let merged = merge(&input, &fetcher).context("Failed to merge requirements files")?;

  if format.is_json() {
    return print_json(&merged);
  }

  if merged.is_empty() {
    print_info(&format!("No requirements found in {}", layout.root().display()));
  }
  print!("{}", merged.to_text());
  Ok(())
}
