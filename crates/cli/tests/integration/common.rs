//! Shared test helpers for CLI integration tests.

use std::path::PathBuf;

use assert_cmd::Command;
use assert_cmd::cargo::cargo_bin_cmd;
use tempfile::TempDir;

/// Isolated test environment.
///
/// The project lives in `<temp>/project`; helper programs such as a fake
/// Python interpreter go next to it so they never show up in the project.
pub struct TestEnv {
  pub temp: TempDir,
}

impl TestEnv {
  pub fn new() -> Self {
    let temp = TempDir::new().unwrap();
    std::fs::create_dir_all(temp.path().join("project")).unwrap();
    Self { temp }
  }

  /// Project root passed to pip-df.
  pub fn project_root(&self) -> PathBuf {
    self.temp.path().join("project")
  }

  /// Write a file relative to the project root.
  pub fn write_file(&self, relative_path: &str, content: &str) {
    let path = self.project_root().join(relative_path);
    if let Some(parent) = path.parent() {
      std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(&path, content).unwrap();
  }

  /// Read a file relative to the project root.
  pub fn read_file(&self, relative_path: &str) -> String {
    let path = self.project_root().join(relative_path);
    std::fs::read_to_string(&path).unwrap_or_else(|e| panic!("Failed to read {}: {}", path.display(), e))
  }

  /// Names of the files in the project root, sorted.
  pub fn project_files(&self) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(self.project_root())
      .unwrap()
      .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
      .collect();
    names.sort();
    names
  }

  /// Path of a helper file written by a fake interpreter.
  pub fn helper_path(&self, name: &str) -> PathBuf {
    self.temp.path().join(name)
  }

  /// A pip-df command running inside the project root with a clean environment.
  pub fn pip_df_cmd(&self) -> Command {
    let mut cmd = cargo_bin_cmd!("pip-df");
    cmd
      .current_dir(self.project_root())
      .env_remove("RUST_LOG")
      .env_remove("PIP_DF_PYTHON");
    cmd
  }

  /// Write a fake `python` that answers `-m pip install|freeze|uninstall`.
  ///
  /// `install` records its arguments in `install-args.txt` and copies the
  /// constraints file to `constraints.txt`; `freeze` prints `freeze_output`.
  #[cfg(unix)]
  pub fn fake_python(&self, freeze_output: &str) -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    let path = self.temp.path().join("python");
    let script = format!(
      r#"#!/bin/sh
dir="$(dirname "$0")"
case "$3" in
  install)
    echo "$@" > "$dir/install-args.txt"
    cp "$6" "$dir/constraints.txt"
    ;;
  freeze)
    cat <<'FROZEN'
{freeze_output}FROZEN
    ;;
  uninstall)
    echo "$@" > "$dir/uninstall-args.txt"
    ;;
esac
"#
    );
    std::fs::write(&path, script).unwrap();
    std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
    path
  }
}
