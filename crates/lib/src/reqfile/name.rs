//! Distribution name canonicalization.

use std::fmt;

use serde::Serialize;

/// A normalized distribution name: lowercase, with every run of `-`, `_`
/// and `.` folded into a single `-`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct CanonicalName(String);

impl CanonicalName {
  /// Canonicalize an arbitrary distribution name.
  pub fn new(name: &str) -> Self {
    Self(canonicalize(name))
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for CanonicalName {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for CanonicalName {
  fn from(name: &str) -> Self {
    Self::new(name)
  }
}

impl AsRef<str> for CanonicalName {
  fn as_ref(&self) -> &str {
    &self.0
  }
}

/// Lowercase `name` and fold separator runs (`-`, `_`, `.`) into `-`.
pub fn canonicalize(name: &str) -> String {
  let mut out = String::with_capacity(name.len());
  let mut in_separator = false;
  for c in name.trim().chars() {
    if matches!(c, '-' | '_' | '.') {
      if !in_separator {
        out.push('-');
        in_separator = true;
      }
    } else {
      out.extend(c.to_lowercase());
      in_separator = false;
    }
  }
  out
}

/// Whether `name` is a syntactically valid distribution name.
pub fn is_valid_name(name: &str) -> bool {
  let bytes = name.as_bytes();
  match (bytes.first(), bytes.last()) {
    (Some(first), Some(last)) if first.is_ascii_alphanumeric() && last.is_ascii_alphanumeric() => {
      bytes.iter().all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'.'))
    }
    _ => false,
  }
}
