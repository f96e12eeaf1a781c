//! Project-level merges through the public API.

use std::fs;

use deepfreeze_lib::layout::ProjectLayout;
use deepfreeze_lib::merge::{ConstraintOrigin, MergeError, UpgradeDirective, merge};
use deepfreeze_lib::reqfile::{FetchError, NoFetch, ParseError};
use tempfile::TempDir;

struct Project {
  temp: TempDir,
}

impl Project {
  fn new(files: &[(&str, &str)]) -> Self {
    let temp = TempDir::new().unwrap();
    for (name, content) in files {
      fs::write(temp.path().join(name), content).unwrap();
    }
    Self { temp }
  }

  fn layout(&self) -> ProjectLayout {
    ProjectLayout::new(self.temp.path())
  }
}

#[test]
fn project_merge_combines_input_main_and_extras() {
  let project = Project::new(&[
    ("requirements.txt.in", "--extra-index-url https://idx.example/simple\ndjango>=4\nrequests==2.32.0\n"),
    ("requirements.txt", "Django==4.2.1\nrequests==2.31.0\nurllib3==2.0.7\n"),
    ("requirements-test.txt", "pytest==8.0.0\nurllib3==1.26.0\n"),
  ]);

  let input = project.layout().merge_input(&["test"], UpgradeDirective::default());
  let merged = merge(&input, &NoFetch).unwrap();

  assert_eq!(
    merged.to_text(),
    "--extra-index-url https://idx.example/simple\nrequests==2.32.0\ndjango==4.2.1\nurllib3==2.0.7\npytest==8.0.0\n"
  );
  assert_eq!(merged.get("Django").unwrap().origin, ConstraintOrigin::Frozen);
  assert_eq!(merged.get("requests").unwrap().origin, ConstraintOrigin::Input);
}

#[test]
fn upgrade_all_keeps_exact_input_pins() {
  let project = Project::new(&[
    ("requirements.txt.in", "pkga==1.5\npkgb\n"),
    ("requirements.txt", "pkga==1.0\npkgb==2.0\npkgc==3.0\n"),
  ]);

  let input = project.layout().merge_input::<&str>(&[], UpgradeDirective::All);
  let merged = merge(&input, &NoFetch).unwrap();

  let lines: Vec<(&str, ConstraintOrigin)> = merged
    .constraints
    .iter()
    .map(|c| (c.line.as_str(), c.origin))
    .collect();
  assert_eq!(
    lines,
    vec![
      ("pkga==1.5", ConstraintOrigin::Input),
      ("pkgb", ConstraintOrigin::Input),
      ("pkgc", ConstraintOrigin::Upgraded),
    ]
  );
}

#[test]
fn input_file_may_include_remote_files() {
  let project = Project::new(&[
    ("requirements.txt.in", "-c https://example.com/constraints.txt\npkga\n"),
    ("requirements.txt", "pkga==1.0\n"),
  ]);
  let fetcher = |url: &str| -> Result<String, FetchError> {
    match url {
      "https://example.com/constraints.txt" => Ok("shared==0.3\n".to_string()),
      other => Err(FetchError::Unsupported(other.to_string())),
    }
  };

  let input = project.layout().merge_input::<&str>(&[], UpgradeDirective::default());
  let merged = merge(&input, &fetcher).unwrap();

  assert_eq!(merged.to_text(), "shared==0.3\npkga==1.0\n");
}

#[test]
fn remote_include_without_fetcher_fails_the_merge() {
  let project = Project::new(&[("requirements.txt.in", "-r https://example.com/base.txt\n")]);

  let input = project.layout().merge_input::<&str>(&[], UpgradeDirective::default());
  let err = merge(&input, &NoFetch).unwrap_err();

  assert!(matches!(
    err,
    MergeError::Input(ParseError::Fetch {
      source: FetchError::Unsupported(_),
      ..
    })
  ));
}
