//! Where a project keeps its requirements files.
//!
//! ```text
//! project/
//!   requirements.txt.in      # user-authored input constraints
//!   requirements.txt         # frozen pins for the project itself
//!   requirements-<extra>.txt # frozen pins added by each extra
//! ```

use std::path::{Path, PathBuf};

use crate::consts::{FROZEN_EXTRA_PREFIX, FROZEN_FILENAME, INPUT_FILENAME};
use crate::merge::{MergeInput, UpgradeDirective};
use crate::reqfile::name::canonicalize;

/// Requirements file locations for one project root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProjectLayout {
  root: PathBuf,
}

impl ProjectLayout {
  pub fn new(root: impl Into<PathBuf>) -> Self {
    Self { root: root.into() }
  }

  pub fn root(&self) -> &Path {
    &self.root
  }

  /// `requirements.txt` for `None`, `requirements-<extra>.txt` otherwise.
  pub fn frozen_path(&self, extra: Option<&str>) -> PathBuf {
    match extra {
      Some(extra) => self
        .root
        .join(format!("{FROZEN_EXTRA_PREFIX}{}.txt", canonicalize(extra))),
      None => self.root.join(FROZEN_FILENAME),
    }
  }

  /// Main frozen file first, then one per extra in the given order.
  pub fn frozen_paths<S: AsRef<str>>(&self, extras: &[S]) -> Vec<PathBuf> {
    std::iter::once(self.frozen_path(None))
      .chain(extras.iter().map(|extra| self.frozen_path(Some(extra.as_ref()))))
      .collect()
  }

  pub fn input_path(&self) -> PathBuf {
    self.root.join(INPUT_FILENAME)
  }

  /// The input file, if the project has one.
  pub fn existing_input(&self) -> Option<PathBuf> {
    let path = self.input_path();
    path.is_file().then_some(path)
  }

  /// The merge for this project with the given extras and upgrade directive.
  pub fn merge_input<S: AsRef<str>>(&self, extras: &[S], upgrade: UpgradeDirective) -> MergeInput {
    let input = MergeInput::new(self.frozen_paths(extras)).with_upgrade(upgrade);
    match self.existing_input() {
      Some(path) => input.with_input_file(path),
      None => input,
    }
  }
}
