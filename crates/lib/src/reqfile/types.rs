use std::fmt;
use std::path::PathBuf;

use super::name::CanonicalName;
use super::requirement::Requirement;

/// The file or URL a line was read from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Origin {
  File(PathBuf),
  Url(String),
}

impl fmt::Display for Origin {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Origin::File(path) => write!(f, "{}", path.display()),
      Origin::Url(url) => f.write_str(url),
    }
  }
}

/// Origin plus the 1-based number of the first physical line of a logical line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
  pub origin: Origin,
  pub line: usize,
}

impl fmt::Display for SourceLocation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}:{}", self.origin, self.line)
  }
}

/// A package requirement read from a requirements file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequirementLine {
  /// The logical line after continuation joining and comment stripping.
  pub raw: String,
  pub requirement: Requirement,
  /// Options trailing the requirement, such as `--hash=sha256:...`.
  pub options: Vec<String>,
  pub location: SourceLocation,
}

impl RequirementLine {
  pub fn name(&self) -> Option<&CanonicalName> {
    self.requirement.name.as_ref()
  }
}

/// An installer directive passed through verbatim (`--pre`, `--index-url ...`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OptionsLine {
  pub raw: String,
  pub location: SourceLocation,
}

/// One record produced by the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsedLine {
  Requirement(RequirementLine),
  Options(OptionsLine),
}

impl ParsedLine {
  pub fn raw(&self) -> &str {
    match self {
      ParsedLine::Requirement(line) => &line.raw,
      ParsedLine::Options(line) => &line.raw,
    }
  }

  pub fn location(&self) -> &SourceLocation {
    match self {
      ParsedLine::Requirement(line) => &line.location,
      ParsedLine::Options(line) => &line.location,
    }
  }
}
