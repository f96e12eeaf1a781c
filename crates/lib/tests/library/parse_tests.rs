//! Requirements parsing through the public API.

use std::fs;
use std::path::PathBuf;

use deepfreeze_lib::reqfile::{
  FetchError, Origin, ParseError, ParseOptions, ParsedLine, RequirementsParser,
};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
  let path = dir.path().join(name);
  if let Some(parent) = path.parent() {
    fs::create_dir_all(parent).unwrap();
  }
  fs::write(&path, content).unwrap();
  path
}

fn remote(url: &str) -> Result<String, FetchError> {
  match url {
    "https://example.com/reqs/base.txt" => Ok("-r extra.txt\nbase==1.0\n".to_string()),
    "https://example.com/reqs/extra.txt" => Ok("extra==2.0 # pinned upstream\n".to_string()),
    other => Err(FetchError::Unsupported(other.to_string())),
  }
}

#[test]
fn remote_includes_are_spliced_in_place() {
  let temp = TempDir::new().unwrap();
  let path = write(&temp, "requirements.txt.in", "first\n-r https://example.com/reqs/base.txt\nlast\n");

  let parser = RequirementsParser::new(ParseOptions::strict(), &remote);
  let parsed = parser.parse_file(&path).unwrap();

  let raws: Vec<&str> = parsed.requirements().map(|r| r.raw.as_str()).collect();
  assert_eq!(raws, vec!["first", "extra==2.0", "base==1.0", "last"]);

  let extra = parsed.requirements().nth(1).unwrap();
  assert_eq!(
    extra.location.origin,
    Origin::Url("https://example.com/reqs/extra.txt".to_string())
  );
  assert_eq!(extra.location.line, 1);
  assert_eq!(parsed.origin, Origin::File(path));
}

#[test]
fn unreachable_remote_include_names_the_directive() {
  let temp = TempDir::new().unwrap();
  let path = write(&temp, "requirements.txt.in", "pkga\n-r https://example.com/missing.txt\n");

  let parser = RequirementsParser::new(ParseOptions::lenient(), &remote);
  let err = parser.parse_file(&path).unwrap_err();

  match err {
    ParseError::Fetch { url, included_from, .. } => {
      assert_eq!(url, "https://example.com/missing.txt");
      assert_eq!(included_from.unwrap().line, 2);
    }
    other => panic!("unexpected error: {other}"),
  }
}

#[test]
fn parsing_is_restartable() {
  let temp = TempDir::new().unwrap();
  write(&temp, "nested/base.txt", "--pre\nbase\n");
  let path = write(&temp, "requirements.txt.in", "-r nested/base.txt\ntop>=1 \\\n  ; python_version >= \"3.8\"\n");

  let parser = RequirementsParser::new(ParseOptions::strict(), &remote);
  let first: Vec<ParsedLine> = parser.parse(&path).map(Result::unwrap).collect();
  let second: Vec<ParsedLine> = parser.parse(&path).map(Result::unwrap).collect();

  assert_eq!(first, second);
  let raws: Vec<&str> = first.iter().map(ParsedLine::raw).collect();
  assert_eq!(raws, vec!["--pre", "base", "top>=1   ; python_version >= \"3.8\""]);
}

#[test]
fn iteration_stops_after_first_error() {
  let temp = TempDir::new().unwrap();
  let path = write(&temp, "requirements.txt.in", "ok\nnot a requirement\nafter\n");

  let parser = RequirementsParser::new(ParseOptions::strict(), &remote);
  let results: Vec<_> = parser.parse(&path).collect();

  assert_eq!(results.len(), 2);
  assert!(results[0].is_ok());
  assert!(matches!(results[1], Err(ParseError::MalformedLine { .. })));
}

#[test]
fn lenient_parse_skips_what_strict_rejects() {
  let temp = TempDir::new().unwrap();
  let path = write(
    &temp,
    "requirements.txt",
    "pkga==1.0\n-r does-not-exist.txt\nnot a requirement\npkgb==2.0\ntrailing \\",
  );

  let lenient = RequirementsParser::new(ParseOptions::lenient(), &remote);
  let names: Vec<String> = lenient
    .parse_file(&path)
    .unwrap()
    .requirements()
    .filter_map(|r| r.name().map(|n| n.to_string()))
    .collect();
  assert_eq!(names, vec!["pkga", "pkgb", "trailing"]);

  let strict = RequirementsParser::new(ParseOptions::strict(), &remote);
  assert!(matches!(
    strict.parse_file(&path),
    Err(ParseError::MissingFile { included_from: Some(_), .. })
  ));
}

#[test]
fn remote_top_level_file_resolves_relative_includes_against_its_url() {
  let parser = RequirementsParser::new(ParseOptions::strict(), &remote);

  let lines: Vec<ParsedLine> = parser
    .parse_url("https://example.com/reqs/base.txt")
    .collect::<Result<_, _>>()
    .unwrap();

  let locations: Vec<String> = lines.iter().map(|l| l.location().to_string()).collect();
  assert_eq!(
    locations,
    vec!["https://example.com/reqs/extra.txt:1", "https://example.com/reqs/base.txt:2"]
  );
}
