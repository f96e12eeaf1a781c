use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::{debug, info};

use super::{FrozenDependencies, InstallRequest, Installer, InstallerError};
use crate::reqfile::name::canonicalize;
use crate::reqfile::requirement::{Source, parse_requirement};

/// Distributions that belong to the installer rather than to the project.
const INSTALLER_DISTRIBUTIONS: [&str; 4] = ["pip", "setuptools", "wheel", "distribute"];

/// Installer backed by `<python> -m pip`.
#[derive(Debug, Clone)]
pub struct PipInstaller {
  python: PathBuf,
}

impl PipInstaller {
  pub fn new(python: impl Into<PathBuf>) -> Self {
    Self { python: python.into() }
  }

  pub fn python(&self) -> &Path {
    &self.python
  }

  fn command(&self, args: &[OsString]) -> (Command, String) {
    let mut command = Command::new(&self.python);
    command.arg("-m").arg("pip").args(args);
    let command_line = std::iter::once(self.python.as_os_str().to_string_lossy().into_owned())
      .chain(["-m".to_string(), "pip".to_string()])
      .chain(args.iter().map(|a| a.to_string_lossy().into_owned()))
      .collect::<Vec<_>>()
      .join(" ");
    (command, command_line)
  }

  /// Run pip with the terminal attached so progress stays visible.
  fn run_attached(&self, args: &[OsString]) -> Result<(), InstallerError> {
    let (mut command, command_line) = self.command(args);
    info!(command = %command_line, "running installer");
    let status = command.status().map_err(|source| InstallerError::Spawn {
      command: command_line.clone(),
      source,
    })?;
    if !status.success() {
      return Err(InstallerError::Failed {
        command: command_line,
        code: status.code(),
        stderr: String::new(),
      });
    }
    Ok(())
  }

  /// Run pip and return its standard output.
  fn run_captured(&self, args: &[OsString]) -> Result<String, InstallerError> {
    let (mut command, command_line) = self.command(args);
    debug!(command = %command_line, "running installer");
    let output = command
      .stdin(Stdio::null())
      .output()
      .map_err(|source| InstallerError::Spawn {
        command: command_line.clone(),
        source,
      })?;

    if !output.status.success() {
      let stderr = String::from_utf8_lossy(&output.stderr).into_owned();
      if !stderr.is_empty() {
        debug!(stderr = %stderr, "installer stderr");
      }
      return Err(InstallerError::Failed {
        command: command_line,
        code: output.status.code(),
        stderr,
      });
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
  }
}

impl Installer for PipInstaller {
  fn install(&self, request: &InstallRequest<'_>) -> Result<(), InstallerError> {
    self.run_attached(&install_args(request))
  }

  fn freeze(&self, project_root: &Path, extras: &[String]) -> Result<FrozenDependencies, InstallerError> {
    let args: Vec<OsString> = ["freeze", "--all", "--exclude-editable"].map(OsString::from).into();
    let stdout = self.run_captured(&args)?;
    Ok(group_freeze_output(&stdout, project_root, extras))
  }

  fn uninstall(&self, names: &[String]) -> Result<(), InstallerError> {
    if names.is_empty() {
      return Ok(());
    }
    let mut args: Vec<OsString> = ["uninstall", "--yes"].map(OsString::from).into();
    args.extend(names.iter().map(OsString::from));
    self.run_attached(&args)
  }
}

/// `install --upgrade -c <constraints> [-e] <root>[extras]`.
fn install_args(request: &InstallRequest<'_>) -> Vec<OsString> {
  let mut target = request.project_root.as_os_str().to_os_string();
  if !request.extras.is_empty() {
    target.push(format!("[{}]", request.extras.join(",")));
  }

  let mut args: Vec<OsString> = ["install", "--upgrade", "-c"].map(OsString::from).into();
  args.push(request.constraints.as_os_str().to_os_string());
  if request.editable {
    args.push(OsString::from("-e"));
  }
  args.push(target);
  args
}

/// Put every frozen line in the main group, minus installer tooling and the
/// project itself. Extra groups are reported empty.
fn group_freeze_output(stdout: &str, project_root: &Path, extras: &[String]) -> FrozenDependencies {
  let root = dunce::canonicalize(project_root).unwrap_or_else(|_| project_root.to_path_buf());

  let main: Vec<String> = stdout
    .lines()
    .map(str::trim)
    .filter(|line| !line.is_empty() && !line.starts_with('#') && !line.starts_with('-'))
    .filter(|line| match parse_requirement(line) {
      Ok(requirement) => {
        let is_tooling = requirement
          .name
          .as_ref()
          .is_some_and(|name| INSTALLER_DISTRIBUTIONS.contains(&name.as_str()));
        let is_project = matches!(&requirement.source, Source::DirectUrl(url) if points_to(url, &root));
        !is_tooling && !is_project
      }
      Err(_) => true,
    })
    .map(str::to_string)
    .collect();

  let mut frozen = FrozenDependencies::default();
  frozen.by_extra.insert(None, main);
  for extra in extras {
    frozen.by_extra.insert(Some(canonicalize(extra)), Vec::new());
  }
  frozen
}

fn points_to(url: &str, dir: &Path) -> bool {
  url::Url::parse(url)
    .ok()
    .and_then(|u| u.to_file_path().ok())
    .map(|path| dunce::canonicalize(&path).unwrap_or(path) == dir)
    .unwrap_or(false)
}
