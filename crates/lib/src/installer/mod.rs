//! The package installer seam.
//!
//! Installing, freezing and uninstalling distributions is delegated to an
//! external installer. The sync workflow talks to it through [`Installer`];
//! [`PipInstaller`] drives `python -m pip`.

mod pip;

use std::collections::BTreeMap;
use std::io;
use std::path::Path;

use thiserror::Error;

pub use pip::PipInstaller;

/// Errors reported by an installer.
#[derive(Debug, Error)]
pub enum InstallerError {
  /// The installer process could not be started.
  #[error("failed to run '{command}': {source}")]
  Spawn {
    command: String,
    #[source]
    source: io::Error,
  },

  /// The installer process exited unsuccessfully.
  #[error("'{command}' failed with exit code {}", code.map_or_else(|| "none".to_string(), |c| c.to_string()))]
  Failed {
    command: String,
    code: Option<i32>,
    stderr: String,
  },
}

/// What to install in one pass.
#[derive(Debug, Clone)]
pub struct InstallRequest<'a> {
  pub project_root: &'a Path,
  /// Constraints file produced by the merge.
  pub constraints: &'a Path,
  pub extras: &'a [String],
  pub editable: bool,
}

/// Frozen pins reported by the installer after an install pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FrozenDependencies {
  /// Requirement lines per group: `None` is the project itself, `Some(extra)`
  /// the additional dependencies of one extra.
  pub by_extra: BTreeMap<Option<String>, Vec<String>>,
  /// Installed distributions nothing depends on.
  pub unneeded: Vec<String>,
}

/// An external package installer.
pub trait Installer {
  /// Install or upgrade the project under the given constraints.
  fn install(&self, request: &InstallRequest<'_>) -> Result<(), InstallerError>;

  /// Report the installed dependencies of the project, grouped by extra.
  fn freeze(&self, project_root: &Path, extras: &[String]) -> Result<FrozenDependencies, InstallerError>;

  /// Remove the named distributions.
  fn uninstall(&self, names: &[String]) -> Result<(), InstallerError>;
}
