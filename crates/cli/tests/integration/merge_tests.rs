//! Merge command integration tests.

use predicates::prelude::*;

use super::common::TestEnv;

#[test]
fn merge_keeps_pins_and_releases_upgraded_names() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "--pre\npkga<1\n");
  env.write_file("requirements.txt", "pkga==0.9\npkgb==2.0\n");

  env
    .pip_df_cmd()
    .args(["merge", "-u", "pkgb"])
    .assert()
    .success()
    .stdout("--pre\npkga==0.9\npkgb\n");
}

#[test]
fn merge_accepts_comma_separated_upgrades() {
  let env = TestEnv::new();
  env.write_file("requirements.txt", "pkga==1.0\npkgb==2.0\npkg-c==3.0\n");

  env
    .pip_df_cmd()
    .args(["merge", "-u", "pkga,PKG_C"])
    .assert()
    .success()
    .stdout("pkga\npkgb==2.0\npkg-c\n");
}

#[test]
fn merge_reads_extra_frozen_files_after_main() {
  let env = TestEnv::new();
  env.write_file("requirements.txt", "pkga==1.0\n");
  env.write_file("requirements-test.txt", "pkga==0.5\npytest==8.0\n");

  env
    .pip_df_cmd()
    .args(["merge", "-x", "test"])
    .assert()
    .success()
    .stdout("pkga==1.0\npytest==8.0\n");

  env
    .pip_df_cmd()
    .args(["merge", "-x", "test", "--upgrade-all"])
    .assert()
    .success()
    .stdout("pkga\npytest\n");
}

#[test]
fn merge_with_explicit_project_root() {
  let env = TestEnv::new();
  env.write_file("requirements.txt", "pkga==1.0\n");

  let mut cmd = env.pip_df_cmd();
  cmd
    .current_dir(env.temp.path())
    .arg("merge")
    .arg("--project-root")
    .arg(env.project_root())
    .assert()
    .success()
    .stdout("pkga==1.0\n");
}

#[test]
fn merge_json_reports_origins() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "--index-url https://pypi.example/simple\nnewdep>=1\n");
  env.write_file("requirements.txt", "pkga==0.9\npkgb==2.0\n");

  let output = env
    .pip_df_cmd()
    .args(["merge", "-u", "pkgb", "--format", "json"])
    .output()
    .unwrap();
  assert!(output.status.success());

  let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
  assert_eq!(value["options"], serde_json::json!(["--index-url https://pypi.example/simple"]));
  let origins: Vec<(&str, &str)> = value["constraints"]
    .as_array()
    .unwrap()
    .iter()
    .map(|c| (c["line"].as_str().unwrap(), c["origin"].as_str().unwrap()))
    .collect();
  assert_eq!(
    origins,
    vec![("newdep>=1", "input"), ("pkga==0.9", "frozen"), ("pkgb", "upgraded")]
  );
}

#[test]
fn merge_follows_includes_from_input_file() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "-r base.in\n-c constraints/pins.txt\nextra-dep\n");
  env.write_file("base.in", "basedep\n");
  env.write_file("constraints/pins.txt", "pinned==1.2\n");

  env
    .pip_df_cmd()
    .arg("merge")
    .assert()
    .success()
    .stdout("basedep\npinned==1.2\nextra-dep\n");
}

#[test]
fn merge_fails_on_circular_include() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "-r other.in\n");
  env.write_file("other.in", "pkga\n-r requirements.txt.in\n");

  env
    .pip_df_cmd()
    .arg("merge")
    .assert()
    .failure()
    .stdout("")
    .stderr(predicate::str::contains("circular include"));
}

#[test]
fn merge_reports_location_of_malformed_input_line() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "pkga\nthis is not valid\n");

  env
    .pip_df_cmd()
    .arg("merge")
    .assert()
    .failure()
    .stderr(predicate::str::contains("requirements.txt.in:2"))
    .stderr(predicate::str::contains("this is not valid"));
}

#[test]
fn merge_warns_about_unpinned_upgrade_names() {
  let env = TestEnv::new();
  env.write_file("requirements.txt", "pkga==1.0\n");

  env
    .pip_df_cmd()
    .args(["merge", "-u", "nothere"])
    .assert()
    .success()
    .stdout("pkga==1.0\n")
    .stderr(predicate::str::contains("nothere"));
}

#[test]
fn merge_writes_nothing() {
  let env = TestEnv::new();
  env.write_file("requirements.txt.in", "pkga\n");
  env.write_file("requirements.txt", "pkga==1.0\n");

  env.pip_df_cmd().args(["merge", "--upgrade-all"]).assert().success();

  assert_eq!(env.project_files(), vec!["requirements.txt", "requirements.txt.in"]);
  assert_eq!(env.read_file("requirements.txt"), "pkga==1.0\n");
}
