//! Requirements-file parsing.
//!
//! A requirements file is line oriented:
//!
//! ```text
//! # comments and blank lines are ignored
//! --index-url https://pypi.example.com/simple   # options pass through
//! -r base.txt                                   # includes are expanded in place
//! -c constraints.txt
//! requests[socks]>=2.0 ; python_version >= "3.8"
//! long-package-name \
//!     ==1.0
//! ```
//!
//! [`RequirementsParser::parse`] returns a [`ParsedLines`] iterator. Each file
//! is read when it is first reached; include directives push a new frame on an
//! explicit stack, so a file that includes itself (directly or through other
//! files) is reported as [`ParseError::CircularInclude`] before any of its
//! lines are read a second time.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use super::fetch::{Fetch, FetchError};
use super::requirement::parse_requirement;
use super::types::{OptionsLine, Origin, ParsedLine, RequirementLine, SourceLocation};

/// Errors that can occur while parsing a requirements file.
#[derive(Debug, Error)]
pub enum ParseError {
  /// A line does not follow the requirements-file grammar.
  #[error("{location}: invalid line '{text}': {reason}")]
  MalformedLine {
    location: SourceLocation,
    text: String,
    reason: String,
  },

  /// The last line of a file ends with a continuation backslash.
  #[error("{location}: line continuation at end of file")]
  UnterminatedContinuation { location: SourceLocation },

  /// An include directive names a file that is already being parsed.
  #[error("{location}: circular include of '{target}'")]
  CircularInclude { location: SourceLocation, target: String },

  /// A requirements file does not exist.
  #[error("requirements file not found: {}", path.display())]
  MissingFile {
    path: PathBuf,
    included_from: Option<SourceLocation>,
  },

  /// A requirements file exists but could not be read.
  #[error("failed to read '{}': {source}", path.display())]
  Read {
    path: PathBuf,
    #[source]
    source: io::Error,
  },

  /// A remote requirements file could not be fetched.
  #[error("failed to fetch '{url}': {source}")]
  Fetch {
    url: String,
    included_from: Option<SourceLocation>,
    #[source]
    source: FetchError,
  },
}

/// Parsing mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
  /// Fail on missing files, malformed lines and dangling continuations.
  pub strict: bool,
  /// Follow `-r`/`-c` includes. When off they are emitted as options lines.
  pub recurse: bool,
}

impl ParseOptions {
  /// Strict and recursive; used for the user's input file.
  pub const fn strict() -> Self {
    Self {
      strict: true,
      recurse: true,
    }
  }

  /// Lenient and recursive; used when re-reading generated frozen files.
  pub const fn lenient() -> Self {
    Self {
      strict: false,
      recurse: true,
    }
  }
}

impl Default for ParseOptions {
  fn default() -> Self {
    Self::strict()
  }
}

/// A fully materialized requirements file, includes expanded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedFile {
  pub origin: Origin,
  pub lines: Vec<ParsedLine>,
}

impl ParsedFile {
  pub fn requirements(&self) -> impl Iterator<Item = &RequirementLine> {
    self.lines.iter().filter_map(|line| match line {
      ParsedLine::Requirement(req) => Some(req),
      ParsedLine::Options(_) => None,
    })
  }

  pub fn options(&self) -> impl Iterator<Item = &OptionsLine> {
    self.lines.iter().filter_map(|line| match line {
      ParsedLine::Options(opt) => Some(opt),
      ParsedLine::Requirement(_) => None,
    })
  }
}

/// Entry point for parsing requirements files.
///
/// The parser holds no state between calls: every [`parse`](Self::parse)
/// starts from scratch, and the only side effects are file reads and calls to
/// the fetch capability.
#[derive(Clone, Copy)]
pub struct RequirementsParser<'f> {
  options: ParseOptions,
  fetcher: &'f dyn Fetch,
}

impl<'f> RequirementsParser<'f> {
  pub fn new(options: ParseOptions, fetcher: &'f dyn Fetch) -> Self {
    Self { options, fetcher }
  }

  pub fn options(&self) -> ParseOptions {
    self.options
  }

  /// Lazily parse the local file at `path`.
  pub fn parse(&self, path: impl AsRef<Path>) -> ParsedLines<'f> {
    self.lines_from(Target::Path(path.as_ref().to_path_buf()))
  }

  /// Lazily parse a remote requirements file.
  pub fn parse_url(&self, url: &str) -> ParsedLines<'f> {
    self.lines_from(Target::Url(url.to_string()))
  }

  /// Parse `path` to completion.
  pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<ParsedFile, ParseError> {
    let path = path.as_ref();
    let lines = self.parse(path).collect::<Result<Vec<_>, _>>()?;
    Ok(ParsedFile {
      origin: Origin::File(path.to_path_buf()),
      lines,
    })
  }

  fn lines_from(&self, root: Target) -> ParsedLines<'f> {
    ParsedLines {
      options: self.options,
      fetcher: self.fetcher,
      root: Some(root),
      stack: Vec::new(),
      done: false,
    }
  }
}

/// Iterator over the records of a requirements file and everything it includes.
///
/// Yields records in file order with included files spliced in at the point of
/// inclusion. After the first error it yields nothing more.
pub struct ParsedLines<'f> {
  options: ParseOptions,
  fetcher: &'f dyn Fetch,
  root: Option<Target>,
  stack: Vec<Frame>,
  done: bool,
}

#[derive(Debug, Clone)]
enum Target {
  Path(PathBuf),
  Url(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum FileId {
  Path(PathBuf),
  Url(String),
}

impl Target {
  fn id(&self) -> FileId {
    match self {
      Target::Path(path) => FileId::Path(dunce::canonicalize(path).unwrap_or_else(|_| path.clone())),
      Target::Url(url) => FileId::Url(url.clone()),
    }
  }

  fn describe(&self) -> String {
    match self {
      Target::Path(path) => path.display().to_string(),
      Target::Url(url) => url.clone(),
    }
  }
}

struct Frame {
  origin: Origin,
  id: FileId,
  lines: Vec<LogicalLine>,
  next: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct LogicalLine {
  number: usize,
  text: String,
  terminated: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum IncludeKind {
  Requirements,
  Constraints,
}

impl Iterator for ParsedLines<'_> {
  type Item = Result<ParsedLine, ParseError>;

  fn next(&mut self) -> Option<Self::Item> {
    loop {
      if self.done {
        return None;
      }

      if let Some(root) = self.root.take() {
        if let Err(e) = self.open(root, None) {
          return Some(self.fail(e));
        }
        continue;
      }

      let Some(frame) = self.stack.last_mut() else {
        self.done = true;
        return None;
      };
      let Some(logical) = frame.lines.get(frame.next).cloned() else {
        self.stack.pop();
        continue;
      };
      frame.next += 1;
      let location = SourceLocation {
        origin: frame.origin.clone(),
        line: logical.number,
      };

      match self.classify(logical, location) {
        Ok(Some(line)) => return Some(Ok(line)),
        Ok(None) => {}
        Err(e) => return Some(self.fail(e)),
      }
    }
  }
}

impl ParsedLines<'_> {
  fn fail(&mut self, error: ParseError) -> Result<ParsedLine, ParseError> {
    self.done = true;
    self.stack.clear();
    Err(error)
  }

  /// Turn one logical line into a record, following includes.
  fn classify(&mut self, logical: LogicalLine, location: SourceLocation) -> Result<Option<ParsedLine>, ParseError> {
    if !logical.terminated {
      if self.options.strict {
        return Err(ParseError::UnterminatedContinuation { location });
      }
      debug!(%location, "ignoring dangling line continuation");
    }

    let text = logical.text;
    if text.is_empty() {
      return Ok(None);
    }

    if let Some((kind, target)) = split_include(&text) {
      if !self.options.recurse {
        return Ok(Some(ParsedLine::Options(OptionsLine { raw: text, location })));
      }
      if target.is_empty() {
        if self.options.strict {
          return Err(ParseError::MalformedLine {
            location,
            text,
            reason: "include directive without a file".to_string(),
          });
        }
        debug!(%location, "ignoring include directive without a file");
        return Ok(None);
      }

      let Some(target) = resolve_target(&location.origin, target) else {
        if self.options.strict {
          return Err(ParseError::MalformedLine {
            location,
            text: text.clone(),
            reason: "cannot resolve include target".to_string(),
          });
        }
        debug!(%location, line = %text, "ignoring include directive with unresolvable target");
        return Ok(None);
      };
      debug!(%location, ?kind, target = %target.describe(), "following include");
      self.open(target, Some(location))?;
      return Ok(None);
    }

    if text.starts_with('-') {
      return Ok(Some(ParsedLine::Options(OptionsLine { raw: text, location })));
    }

    let (requirement_text, options) = split_requirement_options(&text);
    match parse_requirement(requirement_text) {
      Ok(requirement) => Ok(Some(ParsedLine::Requirement(RequirementLine {
        requirement,
        options,
        raw: text,
        location,
      }))),
      Err(e) if self.options.strict => Err(ParseError::MalformedLine {
        location,
        text,
        reason: e.to_string(),
      }),
      Err(e) => {
        debug!(%location, line = %text, error = %e, "skipping malformed requirement");
        Ok(None)
      }
    }
  }

  /// Read `target` and push it on the stack.
  fn open(&mut self, target: Target, included_from: Option<SourceLocation>) -> Result<(), ParseError> {
    let id = target.id();
    if let Some(location) = included_from.as_ref()
      && self.stack.iter().any(|frame| frame.id == id)
    {
      return Err(ParseError::CircularInclude {
        location: location.clone(),
        target: target.describe(),
      });
    }

    let (origin, content) = match target {
      Target::Path(path) => match fs::read_to_string(&path) {
        Ok(content) => (Origin::File(path), content),
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
          if self.options.strict {
            return Err(ParseError::MissingFile { path, included_from });
          }
          debug!(path = %path.display(), "requirements file not found, treating as empty");
          return Ok(());
        }
        Err(source) => return Err(ParseError::Read { path, source }),
      },
      Target::Url(url) => match self.fetcher.fetch(&url) {
        Ok(content) => (Origin::Url(url), content),
        Err(source) => {
          return Err(ParseError::Fetch {
            url,
            included_from,
            source,
          });
        }
      },
    };

    self.stack.push(Frame {
      origin,
      id,
      lines: logical_lines(&content),
      next: 0,
    });
    Ok(())
  }
}

/// Recognise `-r`, `--requirement`, `-c` and `--constraint` in their spaced,
/// `=` and glued spellings. Returns the (possibly empty) target.
fn split_include(text: &str) -> Option<(IncludeKind, &str)> {
  for (flag, kind) in [
    ("--requirement", IncludeKind::Requirements),
    ("--constraint", IncludeKind::Constraints),
  ] {
    if let Some(rest) = text.strip_prefix(flag) {
      if rest.is_empty() {
        return Some((kind, ""));
      }
      if let Some(value) = rest.strip_prefix('=') {
        return Some((kind, value.trim()));
      }
      if rest.starts_with(char::is_whitespace) {
        return Some((kind, rest.trim()));
      }
      return None;
    }
  }

  for (flag, kind) in [("-r", IncludeKind::Requirements), ("-c", IncludeKind::Constraints)] {
    if let Some(rest) = text.strip_prefix(flag) {
      let rest = rest.trim_start();
      return Some((kind, rest.strip_prefix('=').unwrap_or(rest).trim()));
    }
  }
  None
}

/// Split per-requirement options (`--hash=...`, `--config-settings k=v`) off
/// the end of a requirement line. Options start at the first ` --` outside
/// quotes; a value may follow its flag after `=` or whitespace.
fn split_requirement_options(text: &str) -> (&str, Vec<String>) {
  let mut quote = None;
  let mut prev_is_space = false;
  let mut start = None;
  for (idx, c) in text.char_indices() {
    match quote {
      Some(q) if c == q => quote = None,
      Some(_) => {}
      None if c == '"' || c == '\'' => quote = Some(c),
      None if prev_is_space && text[idx..].starts_with("--") => {
        start = Some(idx);
        break;
      }
      None => {}
    }
    prev_is_space = c.is_whitespace();
  }

  let Some(start) = start else {
    return (text, Vec::new());
  };
  let mut options: Vec<String> = Vec::new();
  for token in text[start..].split_whitespace() {
    match options.last_mut() {
      Some(last) if !token.starts_with("--") => {
        last.push(' ');
        last.push_str(token);
      }
      _ => options.push(token.to_string()),
    }
  }
  (text[..start].trim_end(), options)
}

fn is_url(text: &str) -> bool {
  let lower = text.get(..8).unwrap_or(text).to_ascii_lowercase();
  lower.starts_with("http://") || lower.starts_with("https://") || lower.starts_with("file://")
}

/// Resolve an include target relative to the file containing the directive.
fn resolve_target(including: &Origin, target: &str) -> Option<Target> {
  if is_url(target) {
    return Some(Target::Url(target.to_string()));
  }
  match including {
    Origin::Url(base) => {
      let base = url::Url::parse(base).ok()?;
      base.join(target).ok().map(|url| Target::Url(url.to_string()))
    }
    Origin::File(path) => {
      let dir = path.parent().unwrap_or(Path::new("."));
      Some(Target::Path(dir.join(target)))
    }
  }
}

/// Split file content into logical lines: continuations joined, comments
/// stripped, environment variables expanded, blanks dropped.
fn logical_lines(content: &str) -> Vec<LogicalLine> {
  let mut lines = Vec::new();
  let mut buffer = String::new();
  let mut start: Option<usize> = None;

  for (idx, physical) in content.lines().enumerate() {
    let number = idx + 1;

    // A comment line is never continued, and it ends a pending continuation.
    if physical.trim_start().starts_with('#') {
      if let Some(first) = start.take() {
        finish_line(&mut lines, &mut buffer, first, true);
      }
      continue;
    }

    let first = *start.get_or_insert(number);
    match physical.strip_suffix('\\') {
      Some(body) => buffer.push_str(body),
      None => {
        buffer.push_str(physical);
        start = None;
        finish_line(&mut lines, &mut buffer, first, true);
      }
    }
  }

  if let Some(first) = start {
    finish_line(&mut lines, &mut buffer, first, false);
  }
  lines
}

fn finish_line(lines: &mut Vec<LogicalLine>, buffer: &mut String, number: usize, terminated: bool) {
  let text = expand_env_vars(strip_comment(buffer)).trim().to_string();
  buffer.clear();
  if !text.is_empty() || !terminated {
    lines.push(LogicalLine {
      number,
      text,
      terminated,
    });
  }
}

/// Drop an inline comment: `#` at the start of the line or after whitespace,
/// outside quotes.
fn strip_comment(line: &str) -> &str {
  let mut quote = None;
  let mut prev_is_space = true;
  for (idx, c) in line.char_indices() {
    match quote {
      Some(q) if c == q => quote = None,
      Some(_) => {}
      None if c == '"' || c == '\'' => quote = Some(c),
      None if c == '#' && prev_is_space => return &line[..idx],
      None => {}
    }
    prev_is_space = c.is_whitespace();
  }
  line
}

/// Expand `${NAME}` where NAME is `[A-Z0-9_]+` and set in the environment.
fn expand_env_vars(line: &str) -> String {
  let mut out = String::with_capacity(line.len());
  let mut rest = line;
  while let Some(start) = rest.find("${") {
    out.push_str(&rest[..start]);
    let after = &rest[start + 2..];
    let expanded = after.find('}').and_then(|end| {
      let name = &after[..end];
      let valid = !name.is_empty() && name.bytes().all(|b| b.is_ascii_uppercase() || b.is_ascii_digit() || b == b'_');
      if !valid {
        return None;
      }
      env::var(name).ok().map(|value| (value, end))
    });
    match expanded {
      Some((value, end)) => {
        out.push_str(&value);
        rest = &after[end + 1..];
      }
      None => {
        out.push_str("${");
        rest = after;
      }
    }
  }
  out.push_str(rest);
  out
}
