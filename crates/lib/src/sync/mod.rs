//! The sync workflow.
//!
//! Brings an environment in line with the project's requirements files:
//!
//! 1. Merge the frozen files and the input file into constraints.
//! 2. Install the project under those constraints (temporary constraints file).
//! 3. Freeze what got installed and rewrite the frozen files.
//! 4. Optionally uninstall distributions nothing depends on anymore.
//!
//! Frozen files are only rewritten once the install succeeded, each one
//! atomically.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::{Builder, NamedTempFile};
use thiserror::Error;
use tracing::{debug, info};

use crate::consts::{CONSTRAINTS_PREFIX, CONSTRAINTS_SUFFIX, FROZEN_HEADER};
use crate::installer::{InstallRequest, Installer, InstallerError};
use crate::layout::ProjectLayout;
use crate::merge::{MergeError, MergedConstraints, UpgradeDirective, merge};
use crate::reqfile::Fetch;

/// Options for one sync run.
#[derive(Debug, Clone)]
pub struct SyncOptions {
  pub project_root: PathBuf,
  /// Extras to install, in the order their frozen files are consulted.
  pub extras: Vec<String>,
  pub upgrade: UpgradeDirective,
  /// Install the project in editable mode.
  pub editable: bool,
  /// `Some(true)` uninstalls unneeded distributions, `Some(false)` keeps them
  /// quietly, `None` keeps them and reports them.
  pub uninstall_unneeded: Option<bool>,
}

impl SyncOptions {
  pub fn new(project_root: impl Into<PathBuf>) -> Self {
    Self {
      project_root: project_root.into(),
      extras: Vec::new(),
      upgrade: UpgradeDirective::default(),
      editable: true,
      uninstall_unneeded: None,
    }
  }
}

/// Result of a successful sync.
#[derive(Debug)]
pub struct SyncReport {
  /// The constraints the installer ran with.
  pub constraints: MergedConstraints,
  /// Frozen files that were rewritten.
  pub written: Vec<PathBuf>,
  /// Installed distributions nothing depends on.
  pub unneeded: Vec<String>,
  /// Whether `unneeded` was uninstalled.
  pub uninstalled: bool,
}

/// Errors that can occur during sync.
#[derive(Debug, Error)]
pub enum SyncError {
  /// Merging the requirements files failed.
  #[error(transparent)]
  Merge(#[from] MergeError),

  /// The constraints file could not be written.
  #[error("failed to write constraints file: {0}")]
  Constraints(#[source] io::Error),

  /// Installing the project failed.
  #[error("failed to install project: {0}")]
  Install(#[source] InstallerError),

  /// Freezing the environment failed.
  #[error("failed to freeze installed distributions: {0}")]
  Freeze(#[source] InstallerError),

  /// Uninstalling unneeded distributions failed.
  #[error("failed to uninstall unneeded distributions: {0}")]
  Uninstall(#[source] InstallerError),

  /// A frozen file could not be written.
  #[error("failed to write {}: {source}", path.display())]
  WriteFrozen {
    path: PathBuf,
    #[source]
    source: io::Error,
  },
}

/// Run the sync workflow for `options.project_root`.
pub fn sync(options: &SyncOptions, installer: &dyn Installer, fetcher: &dyn Fetch) -> Result<SyncReport, SyncError> {
  let layout = ProjectLayout::new(&options.project_root);

  let merged = merge(&layout.merge_input(&options.extras, options.upgrade.clone()), fetcher)?;

  {
    // Removed when dropped, whatever the install outcome.
    let constraints = write_constraints(&layout, &merged).map_err(SyncError::Constraints)?;
    debug!(path = %constraints.path().display(), "wrote constraints file");
    installer
      .install(&InstallRequest {
        project_root: layout.root(),
        constraints: constraints.path(),
        extras: &options.extras,
        editable: options.editable,
      })
      .map_err(SyncError::Install)?;
  }

  let frozen = installer
    .freeze(layout.root(), &options.extras)
    .map_err(SyncError::Freeze)?;

  let mut written = Vec::new();
  for (extra, lines) in &frozen.by_extra {
    let path = layout.frozen_path(extra.as_deref());
    info!(path = %path.display(), "updating frozen requirements");
    // Installer options only go to the main file.
    let options_lines: &[String] = if extra.is_none() { &merged.options } else { &[] };
    write_frozen_file(&path, options_lines, lines).map_err(|source| SyncError::WriteFrozen {
      path: path.clone(),
      source,
    })?;
    written.push(path);
  }

  let unneeded = frozen.unneeded;
  let mut uninstalled = false;
  if !unneeded.is_empty() {
    let listed = unneeded.join(",");
    match options.uninstall_unneeded {
      Some(true) => {
        info!(distributions = %listed, "uninstalling unneeded distributions");
        installer.uninstall(&unneeded).map_err(SyncError::Uninstall)?;
        uninstalled = true;
      }
      Some(false) => debug!(distributions = %listed, "keeping unneeded distributions"),
      None => info!(distributions = %listed, "installed distributions are not dependencies of the project"),
    }
  }

  Ok(SyncReport {
    constraints: merged,
    written,
    unneeded,
    uninstalled,
  })
}

/// Write `merged` to a `requirements.*.txt.df` temp file in the project root.
pub fn write_constraints(layout: &ProjectLayout, merged: &MergedConstraints) -> io::Result<NamedTempFile> {
  let mut file = Builder::new()
    .prefix(CONSTRAINTS_PREFIX)
    .suffix(CONSTRAINTS_SUFFIX)
    .tempfile_in(layout.root())?;
  file.write_all(merged.to_text().as_bytes())?;
  file.flush()?;
  Ok(file)
}

/// Atomically replace a frozen file: header, options lines, requirement lines.
pub fn write_frozen_file(path: &Path, options: &[String], requirements: &[String]) -> io::Result<()> {
  let dir = match path.parent() {
    Some(dir) if !dir.as_os_str().is_empty() => dir,
    _ => Path::new("."),
  };
  fs::create_dir_all(dir)?;

  let mut file = NamedTempFile::new_in(dir)?;
  writeln!(file, "{FROZEN_HEADER}")?;
  for line in options.iter().chain(requirements) {
    writeln!(file, "{line}")?;
  }
  file.flush()?;

  // Temp files are created private; keep the mode a replaced file had.
  match fs::metadata(path) {
    Ok(existing) => file.as_file().set_permissions(existing.permissions())?,
    Err(e) if e.kind() == io::ErrorKind::NotFound => set_default_mode(file.as_file())?,
    Err(e) => return Err(e),
  }
  file.persist(path).map_err(|e| e.error)?;
  Ok(())
}

#[cfg(unix)]
fn set_default_mode(file: &fs::File) -> io::Result<()> {
  use std::os::unix::fs::PermissionsExt;
  file.set_permissions(fs::Permissions::from_mode(0o644))
}

#[cfg(not(unix))]
fn set_default_mode(_file: &fs::File) -> io::Result<()> {
  Ok(())
}
