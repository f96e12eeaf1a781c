//! Dependency specifier parsing.
//!
//! Accepts the requirement forms found in requirements files:
//!
//! - `name[extra1,extra2]>=1.0,<2; python_version < "3.12"`
//! - `name[extra] @ https://example.com/name-1.0.tar.gz ; sys_platform == "linux"`
//! - bare locations such as `./vendor/pkg` or `git+https://host/repo.git#egg=name`
//!
//! Markers are carried as opaque text; only their outer shape (balanced
//! parentheses and quotes) is checked.

use std::collections::BTreeSet;
use std::fmt;

use thiserror::Error;

use super::name::{CanonicalName, canonicalize, is_valid_name};

/// Errors produced while parsing a single requirement.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequirementError {
  #[error("invalid distribution name '{0}'")]
  InvalidName(String),

  #[error("missing closing ']' after extras")]
  UnclosedExtras,

  #[error("invalid extra name '{0}'")]
  InvalidExtra(String),

  #[error("missing closing ')' in version specifier")]
  UnclosedParen,

  #[error("invalid version specifier '{0}'")]
  InvalidSpecifier(String),

  #[error("missing URL after '@'")]
  EmptyUrl,

  #[error("empty environment marker")]
  EmptyMarker,

  #[error("unbalanced environment marker '{0}'")]
  UnbalancedMarker(String),

  #[error("unexpected text '{0}'")]
  UnexpectedText(String),
}

/// Comparison operator of a version clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operator {
  Compatible,
  Equal,
  NotEqual,
  LessEqual,
  GreaterEqual,
  Less,
  Greater,
  ArbitraryEqual,
}

impl Operator {
  // Longest spellings first so `===` wins over `==` and `<=` over `<`.
  const SPELLINGS: [(&'static str, Operator); 8] = [
    ("===", Operator::ArbitraryEqual),
    ("~=", Operator::Compatible),
    ("==", Operator::Equal),
    ("!=", Operator::NotEqual),
    ("<=", Operator::LessEqual),
    (">=", Operator::GreaterEqual),
    ("<", Operator::Less),
    (">", Operator::Greater),
  ];

  pub fn as_str(self) -> &'static str {
    match self {
      Operator::Compatible => "~=",
      Operator::Equal => "==",
      Operator::NotEqual => "!=",
      Operator::LessEqual => "<=",
      Operator::GreaterEqual => ">=",
      Operator::Less => "<",
      Operator::Greater => ">",
      Operator::ArbitraryEqual => "===",
    }
  }

  fn split_prefix(text: &str) -> Option<(Operator, &str)> {
    Self::SPELLINGS
      .iter()
      .find_map(|(spelling, op)| text.strip_prefix(spelling).map(|rest| (*op, rest)))
  }
}

/// One `<op><version>` clause of a specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Clause {
  pub op: Operator,
  pub version: String,
}

impl fmt::Display for Clause {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}{}", self.op.as_str(), self.version)
  }
}

/// A comma-separated list of version clauses. Empty means unconstrained.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Specifier(Vec<Clause>);

impl Specifier {
  pub fn parse(text: &str) -> Result<Self, RequirementError> {
    let text = text.trim();
    if text.is_empty() {
      return Ok(Self::default());
    }
    text.split(',').map(parse_clause).collect::<Result<Vec<_>, _>>().map(Self)
  }

  pub fn is_empty(&self) -> bool {
    self.0.is_empty()
  }

  pub fn clauses(&self) -> &[Clause] {
    &self.0
  }

  /// True for a single `==X` (without wildcard) or `===X` clause.
  pub fn is_exact(&self) -> bool {
    match self.0.as_slice() {
      [clause] => match clause.op {
        Operator::Equal => !clause.version.ends_with(".*"),
        Operator::ArbitraryEqual => true,
        _ => false,
      },
      _ => false,
    }
  }
}

impl fmt::Display for Specifier {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for (i, clause) in self.0.iter().enumerate() {
      if i > 0 {
        f.write_str(",")?;
      }
      write!(f, "{clause}")?;
    }
    Ok(())
  }
}

fn parse_clause(text: &str) -> Result<Clause, RequirementError> {
  let trimmed = text.trim();
  let invalid = || RequirementError::InvalidSpecifier(trimmed.to_string());

  let (op, rest) = Operator::split_prefix(trimmed).ok_or_else(invalid)?;
  let version = rest.trim();
  if version.is_empty() {
    return Err(invalid());
  }

  let valid = match op {
    Operator::ArbitraryEqual => !version.chars().any(char::is_whitespace),
    Operator::Equal | Operator::NotEqual => {
      let base = version.strip_suffix(".*").unwrap_or(version);
      !base.is_empty() && base.chars().all(is_version_char)
    }
    _ => version.chars().all(is_version_char),
  };
  if !valid {
    return Err(invalid());
  }

  Ok(Clause {
    op,
    version: version.to_string(),
  })
}

fn is_version_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '!' | '_' | '-')
}

/// Where a requirement gets its distribution from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Source {
  /// Index lookup constrained by a (possibly empty) version specifier.
  Specifier(Specifier),
  /// `name @ url`.
  DirectUrl(String),
  /// A bare URL or local path, optionally named through `#egg=`.
  Location(String),
}

/// A parsed dependency specifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Requirement {
  /// Canonical name; `None` for locations without an `#egg=` fragment.
  pub name: Option<CanonicalName>,
  pub extras: BTreeSet<String>,
  pub source: Source,
  pub marker: Option<String>,
}

impl Requirement {
  /// An unconstrained requirement on `name`.
  pub fn bare(name: CanonicalName) -> Self {
    Self {
      name: Some(name),
      extras: BTreeSet::new(),
      source: Source::Specifier(Specifier::default()),
      marker: None,
    }
  }

  /// Whether this requirement names one exact distribution: an `==`/`===`
  /// pin or a direct reference.
  pub fn is_exact(&self) -> bool {
    match &self.source {
      Source::Specifier(spec) => spec.is_exact(),
      Source::DirectUrl(_) | Source::Location(_) => true,
    }
  }

  /// Whether anything beyond the bare name constrains the version.
  pub fn is_constrained(&self) -> bool {
    !matches!(&self.source, Source::Specifier(spec) if spec.is_empty())
  }
}

impl fmt::Display for Requirement {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    if let Source::Location(location) = &self.source {
      f.write_str(location)?;
    } else if let Some(name) = &self.name {
      write!(f, "{name}")?;
      if !self.extras.is_empty() {
        let extras: Vec<&str> = self.extras.iter().map(String::as_str).collect();
        write!(f, "[{}]", extras.join(","))?;
      }
      match &self.source {
        Source::Specifier(spec) => write!(f, "{spec}")?,
        Source::DirectUrl(url) => write!(f, " @ {url}")?,
        Source::Location(_) => {}
      }
    }

    if let Some(marker) = &self.marker {
      // A URL swallows an unspaced ';', so separate it.
      if matches!(self.source, Source::Specifier(_)) {
        write!(f, "; {marker}")?;
      } else {
        write!(f, " ; {marker}")?;
      }
    }
    Ok(())
  }
}

/// Parse one requirement specification (comments already stripped).
pub fn parse_requirement(text: &str) -> Result<Requirement, RequirementError> {
  let text = text.trim();
  if looks_like_location(text) {
    return parse_location(text);
  }

  let name_end = text
    .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.')))
    .unwrap_or(text.len());
  // `some/dir/pkg.whl` style relative paths have no scheme or leading dot.
  if text[name_end..].starts_with(['/', '\\']) {
    return parse_location(text);
  }

  let raw_name = &text[..name_end];
  if !is_valid_name(raw_name) {
    let shown = if raw_name.is_empty() { text } else { raw_name };
    return Err(RequirementError::InvalidName(shown.to_string()));
  }

  let mut rest = text[name_end..].trim_start();
  let mut extras = BTreeSet::new();
  if let Some(after) = rest.strip_prefix('[') {
    let close = after.find(']').ok_or(RequirementError::UnclosedExtras)?;
    for extra in after[..close].split(',').map(str::trim).filter(|e| !e.is_empty()) {
      if !is_valid_name(extra) {
        return Err(RequirementError::InvalidExtra(extra.to_string()));
      }
      extras.insert(canonicalize(extra));
    }
    rest = after[close + 1..].trim_start();
  }

  let (source, marker) = if let Some(after) = rest.strip_prefix('@') {
    let (url, marker) = split_url_marker(after);
    let url = url.trim();
    if url.is_empty() {
      return Err(RequirementError::EmptyUrl);
    }
    if url.chars().any(char::is_whitespace) {
      return Err(RequirementError::UnexpectedText(url.to_string()));
    }
    (Source::DirectUrl(url.to_string()), marker)
  } else {
    let (spec_text, tail) = if let Some(after) = rest.strip_prefix('(') {
      let close = after.find(')').ok_or(RequirementError::UnclosedParen)?;
      (&after[..close], after[close + 1..].trim_start())
    } else {
      match rest.find(';') {
        Some(idx) => (&rest[..idx], &rest[idx..]),
        None => (rest, ""),
      }
    };

    let marker = match tail.strip_prefix(';') {
      Some(marker) => Some(marker),
      None if tail.is_empty() => None,
      None => return Err(RequirementError::UnexpectedText(tail.to_string())),
    };
    (Source::Specifier(Specifier::parse(spec_text)?), marker)
  };

  Ok(Requirement {
    name: Some(CanonicalName::new(raw_name)),
    extras,
    source,
    marker: marker.map(parse_marker).transpose()?,
  })
}

fn parse_location(text: &str) -> Result<Requirement, RequirementError> {
  let (location, marker) = split_url_marker(text);
  let location = location.trim();
  if location.chars().any(char::is_whitespace) {
    return Err(RequirementError::UnexpectedText(location.to_string()));
  }

  Ok(Requirement {
    name: egg_name(location).map(CanonicalName::new),
    extras: BTreeSet::new(),
    source: Source::Location(location.to_string()),
    marker: marker.map(parse_marker).transpose()?,
  })
}

/// Split `url ; marker`. Inside a URL a `;` only starts a marker when it is
/// preceded by whitespace.
fn split_url_marker(text: &str) -> (&str, Option<&str>) {
  let bytes = text.as_bytes();
  for (idx, byte) in bytes.iter().enumerate() {
    if *byte == b';' && idx > 0 && bytes[idx - 1].is_ascii_whitespace() {
      return (&text[..idx], Some(&text[idx + 1..]));
    }
  }
  (text, None)
}

fn parse_marker(text: &str) -> Result<String, RequirementError> {
  let marker = text.trim();
  if marker.is_empty() {
    return Err(RequirementError::EmptyMarker);
  }

  let mut depth = 0i32;
  let mut quote = None;
  for c in marker.chars() {
    match (quote, c) {
      (Some(q), c) if c == q => quote = None,
      (Some(_), _) => {}
      (None, '"' | '\'') => quote = Some(c),
      (None, '(') => depth += 1,
      (None, ')') => {
        depth -= 1;
        if depth < 0 {
          break;
        }
      }
      (None, _) => {}
    }
  }
  if depth != 0 || quote.is_some() {
    return Err(RequirementError::UnbalancedMarker(marker.to_string()));
  }
  Ok(marker.to_string())
}

fn looks_like_location(text: &str) -> bool {
  if text.starts_with(['.', '/', '~']) {
    return true;
  }
  match text.find("://") {
    Some(idx) => {
      let scheme = &text[..idx];
      !scheme.is_empty() && scheme.chars().all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
    }
    None => text.to_ascii_lowercase().starts_with("file:"),
  }
}

fn egg_name(location: &str) -> Option<&str> {
  let fragment = &location[location.find('#')? + 1..];
  fragment.split('&').find_map(|part| {
    let name = part.strip_prefix("egg=")?;
    is_valid_name(name).then_some(name)
  })
}
