//! Sync command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn sync_with_missing_interpreter_leaves_project_untouched() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "pkga\n");
  env.write_file("requirements.txt", "pkga==1.0\n");

  env
    .pip_df_cmd()
    .arg("sync")
    .arg("--python")
    .arg(env.helper_path("no-such-python"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("Failed to sync project"))
    .stderr(predicate::str::contains("no-such-python"));

  // Constraints temp file is gone, frozen file unchanged.
  assert_eq!(env.project_files(), vec!["requirements.txt", "requirements.txt.in"]);
  assert_eq!(env.read_file("requirements.txt"), "pkga==1.0\n");
}

#[test]
fn sync_does_not_install_when_merge_fails() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "-r requirements.txt.in\n");

  env
    .pip_df_cmd()
    .arg("sync")
    .arg("--python")
    .arg(env.helper_path("no-such-python"))
    .assert()
    .failure()
    .stderr(predicate::str::contains("circular include"));
}

#[cfg(unix)]
#[test]
fn sync_rewrites_frozen_file_from_installed_distributions() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "--pre\npkga<1\n");
  env.write_file("requirements.txt", "pkga==0.9\npkgb==2.0\n");
  let python = env.fake_python("pkga==0.9\npkgb==2.1\npip==24.0\nsetuptools==70.0\n");

  env
    .pip_df_cmd()
    .args(["sync", "-u", "pkgb", "--no-editable"])
    .arg("--python")
    .arg(&python)
    .assert()
    .success()
    .stdout(predicate::str::contains("requirements.txt"));

  let constraints = std::fs::read_to_string(env.helper_path("constraints.txt")).unwrap();
  assert_eq!(constraints, "--pre\npkga==0.9\npkgb\n");

  let install_args = std::fs::read_to_string(env.helper_path("install-args.txt")).unwrap();
  assert!(install_args.starts_with("-m pip install --upgrade -c "));
  assert!(!install_args.contains(" -e "));

  assert_eq!(
    env.read_file("requirements.txt"),
    "# frozen requirements generated by pip-deepfreeze\n--pre\npkga==0.9\npkgb==2.1\n"
  );
  assert_eq!(env.project_files(), vec!["requirements.txt", "requirements.txt.in"]);
}

#[cfg(unix)]
#[test]
fn sync_reads_interpreter_from_environment() {
  let env = TestEnv::new();
  env.write_file("requirements.txt", "pkga==1.0\n");
  let python = env.fake_python("pkga==1.0\n");

  env
    .pip_df_cmd()
    .arg("sync")
    .env("PIP_DF_PYTHON", &python)
    .assert()
    .success();

  let install_args = std::fs::read_to_string(env.helper_path("install-args.txt")).unwrap();
  assert!(install_args.contains(" -e "));
  assert_eq!(
    env.read_file("requirements.txt"),
    "# frozen requirements generated by pip-deepfreeze\npkga==1.0\n"
  );
}

#[cfg(unix)]
#[test]
fn sync_writes_extra_frozen_files() {
  let env = TestEnv::new();
  env.write_file("requirements.txt", "pkga==1.0\n");
  let python = env.fake_python("pkga==1.0\n");

  env
    .pip_df_cmd()
    .args(["sync", "-x", "Test_Tools"])
    .arg("--python")
    .arg(&python)
    .assert()
    .success();

  assert_eq!(
    env.project_files(),
    vec!["requirements-test-tools.txt", "requirements.txt"]
  );
  assert_eq!(
    env.read_file("requirements-test-tools.txt"),
    "# frozen requirements generated by pip-deepfreeze\n"
  );
}
