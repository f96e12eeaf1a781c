//! Freeze-merge: combine previous frozen pins with the user's input file.
//!
//! The merge produces the constraints handed to the installer for the next
//! install pass:
//!
//! 1. Read the input file (strict). Options lines are collected; requirement
//!    lines are keyed by canonical name, the last occurrence winning.
//! 2. Read each frozen file in order (lenient). The first file to pin a name
//!    keeps it; later files never re-pin.
//! 3. Drop frozen pins selected by the upgrade directive. They are emitted
//!    as bare names so the installer picks a fresh version.
//! 4. Overlay the input file: an exact input pin always replaces the frozen
//!    entry, and any input requirement fills in where no frozen entry is left.
//! 5. Emit options (deduplicated), then the requirements taken from the
//!    input file in the order their key was first seen there, then the
//!    frozen and upgraded entries in frozen-file order. Lines coming from the
//!    same file never change their relative order.

use std::collections::{BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::reqfile::{
  CanonicalName, Fetch, ParseError, ParseOptions, ParsedLine, Requirement, RequirementLine, RequirementsParser,
};

/// Errors that can occur while merging.
#[derive(Debug, Error)]
pub enum MergeError {
  /// The input constraints file could not be parsed.
  #[error("failed to parse input file: {0}")]
  Input(#[source] ParseError),

  /// A frozen file could not be parsed (circular include or failed fetch).
  #[error("failed to parse frozen file: {0}")]
  Frozen(#[source] ParseError),
}

/// Which frozen pins to drop.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpgradeDirective {
  /// Drop every frozen pin.
  All,
  /// Drop only the named pins. Empty means "upgrade nothing".
  Only(BTreeSet<CanonicalName>),
}

impl Default for UpgradeDirective {
  fn default() -> Self {
    Self::Only(BTreeSet::new())
  }
}

impl UpgradeDirective {
  /// Build a directive from command-line style flags; `all` wins.
  pub fn from_flags<I, S>(all: bool, names: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
  {
    if all {
      return Self::All;
    }
    Self::Only(names.into_iter().map(|n| CanonicalName::new(n.as_ref())).collect())
  }

  pub fn is_empty(&self) -> bool {
    matches!(self, Self::Only(names) if names.is_empty())
  }
}

/// Everything one merge needs.
#[derive(Debug, Clone)]
pub struct MergeInput {
  /// Frozen files, main first, then one per extra.
  pub frozen_files: Vec<PathBuf>,
  /// The user's input constraints file, if the project has one.
  pub input_file: Option<PathBuf>,
  pub upgrade: UpgradeDirective,
  /// Whether the input file is parsed strictly. Frozen files never are.
  pub strict: bool,
}

impl MergeInput {
  pub fn new<I>(frozen_files: I) -> Self
  where
    I: IntoIterator<Item = PathBuf>,
  {
    Self {
      frozen_files: frozen_files.into_iter().collect(),
      input_file: None,
      upgrade: UpgradeDirective::default(),
      strict: true,
    }
  }

  pub fn with_input_file(mut self, path: impl Into<PathBuf>) -> Self {
    self.input_file = Some(path.into());
    self
  }

  pub fn with_upgrade(mut self, upgrade: UpgradeDirective) -> Self {
    self.upgrade = upgrade;
    self
  }

  pub fn with_strict(mut self, strict: bool) -> Self {
    self.strict = strict;
    self
  }
}

/// Where a merged constraint came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConstraintOrigin {
  /// A pin kept from a frozen file.
  Frozen,
  /// A frozen pin released by the upgrade directive.
  Upgraded,
  /// A requirement declared in the input file.
  Input,
}

/// One merged requirement line.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Constraint {
  /// Canonical name; `None` for unnamed URL or path requirements.
  pub name: Option<CanonicalName>,
  pub line: String,
  pub origin: ConstraintOrigin,
}

/// The merged constraint list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct MergedConstraints {
  /// Options lines from the input file, first occurrence of each kept.
  pub options: Vec<String>,
  pub constraints: Vec<Constraint>,
}

impl MergedConstraints {
  /// Options lines followed by requirement lines.
  pub fn lines(&self) -> impl Iterator<Item = &str> {
    self
      .options
      .iter()
      .map(String::as_str)
      .chain(self.constraints.iter().map(|c| c.line.as_str()))
  }

  pub fn is_empty(&self) -> bool {
    self.options.is_empty() && self.constraints.is_empty()
  }

  /// Render as file content, one line each, newline terminated.
  pub fn to_text(&self) -> String {
    self.lines().fold(String::new(), |mut out, line| {
      out.push_str(line);
      out.push('\n');
      out
    })
  }

  /// The constraint for `name`, if any.
  pub fn get(&self, name: &str) -> Option<&Constraint> {
    let name = CanonicalName::new(name);
    self.constraints.iter().find(|c| c.name.as_ref() == Some(&name))
  }
}

/// Merge identity: canonical name, or the raw text for unnamed requirements.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Key {
  Name(CanonicalName),
  Raw(String),
}

impl Key {
  fn of(line: &RequirementLine) -> Self {
    match line.name() {
      Some(name) => Key::Name(name.clone()),
      None => Key::Raw(line.raw.clone()),
    }
  }
}

/// Keys in the order they were first seen.
#[derive(Default)]
struct Encounters {
  order: Vec<Key>,
  seen: HashSet<Key>,
}

impl Encounters {
  fn note(&mut self, key: &Key) {
    if self.seen.insert(key.clone()) {
      self.order.push(key.clone());
    }
  }
}

/// Requirements and options read from the input file.
#[derive(Default)]
struct InputRecords {
  options: Vec<String>,
  requirements: HashMap<Key, RequirementLine>,
}

/// Merge the frozen files and the input file of `input` into one constraint list.
///
/// Either the whole list is produced or an error is returned; nothing is
/// written anywhere.
pub fn merge(input: &MergeInput, fetcher: &dyn Fetch) -> Result<MergedConstraints, MergeError> {
  let mut input_order = Encounters::default();
  let mut frozen_order = Encounters::default();

  let records = match &input.input_file {
    Some(path) => read_input(path, input.strict, fetcher, &mut input_order)?,
    None => InputRecords::default(),
  };
  let mut frozen = fold_frozen(&input.frozen_files, fetcher, &mut frozen_order)?;
  let upgraded = release_upgrades(&input.upgrade, &mut frozen, &records);

  let mut merged: HashMap<Key, Constraint> = HashMap::new();
  for (key, line) in frozen {
    merged.insert(
      key,
      Constraint {
        name: line.name().cloned(),
        line: line.requirement.to_string(),
        origin: ConstraintOrigin::Frozen,
      },
    );
  }
  for name in upgraded {
    merged.insert(
      Key::Name(name.clone()),
      Constraint {
        line: Requirement::bare(name.clone()).to_string(),
        name: Some(name),
        origin: ConstraintOrigin::Upgraded,
      },
    );
  }
  for (key, line) in records.requirements {
    let frozen_stands = matches!(merged.get(&key), Some(c) if c.origin == ConstraintOrigin::Frozen);
    if frozen_stands && !line.requirement.is_exact() {
      debug!(requirement = %line.raw, "frozen pin satisfies non-exact input requirement");
      continue;
    }
    merged.insert(
      key,
      Constraint {
        name: line.name().cloned(),
        line: line.requirement.to_string(),
        origin: ConstraintOrigin::Input,
      },
    );
  }

  let mut constraints = Vec::with_capacity(merged.len());
  for key in &input_order.order {
    if matches!(merged.get(key), Some(c) if c.origin == ConstraintOrigin::Input) {
      constraints.extend(merged.remove(key));
    }
  }
  // Everything left was pinned or released from a frozen file.
  constraints.extend(frozen_order.order.iter().filter_map(|key| merged.remove(key)));

  info!(
    options = records.options.len(),
    constraints = constraints.len(),
    "merged constraints"
  );

  Ok(MergedConstraints {
    options: records.options,
    constraints,
  })
}

/// Step 1: options in order (deduplicated), requirements last-wins.
fn read_input(
  path: &Path,
  strict: bool,
  fetcher: &dyn Fetch,
  encounters: &mut Encounters,
) -> Result<InputRecords, MergeError> {
  debug!(path = %path.display(), "reading input file");
  let parser = RequirementsParser::new(ParseOptions { strict, recurse: true }, fetcher);

  let mut records = InputRecords::default();
  let mut seen_options = HashSet::new();
  for line in parser.parse(path) {
    match line.map_err(MergeError::Input)? {
      ParsedLine::Options(options) => {
        if seen_options.insert(options.raw.clone()) {
          records.options.push(options.raw);
        }
      }
      ParsedLine::Requirement(requirement) => {
        let key = Key::of(&requirement);
        encounters.note(&key);
        records.requirements.insert(key, requirement);
      }
    }
  }
  Ok(records)
}

/// Step 2: the first frozen file to mention a name keeps it.
fn fold_frozen(
  paths: &[PathBuf],
  fetcher: &dyn Fetch,
  encounters: &mut Encounters,
) -> Result<HashMap<Key, RequirementLine>, MergeError> {
  let parser = RequirementsParser::new(ParseOptions::lenient(), fetcher);

  let mut frozen: HashMap<Key, RequirementLine> = HashMap::new();
  for path in paths {
    debug!(path = %path.display(), "reading frozen file");
    for line in parser.parse(path) {
      // Options in frozen files are regenerated from the input file.
      let ParsedLine::Requirement(requirement) = line.map_err(MergeError::Frozen)? else {
        continue;
      };
      let key = Key::of(&requirement);
      encounters.note(&key);
      if let Some(existing) = frozen.get(&key) {
        debug!(
          kept = %existing.raw,
          ignored = %requirement.raw,
          at = %requirement.location,
          "name already pinned by an earlier frozen file"
        );
        continue;
      }
      frozen.insert(key, requirement);
    }
  }
  Ok(frozen)
}

/// Step 3: remove pins selected for upgrade and return their names.
fn release_upgrades(
  upgrade: &UpgradeDirective,
  frozen: &mut HashMap<Key, RequirementLine>,
  records: &InputRecords,
) -> Vec<CanonicalName> {
  let selected: Vec<CanonicalName> = match upgrade {
    UpgradeDirective::All => frozen
      .keys()
      .filter_map(|key| match key {
        Key::Name(name) => Some(name.clone()),
        Key::Raw(_) => None,
      })
      .collect(),
    UpgradeDirective::Only(names) => names.iter().cloned().collect(),
  };

  let mut released = Vec::new();
  for name in selected {
    let key = Key::Name(name.clone());
    if frozen.remove(&key).is_some() {
      debug!(%name, "releasing frozen pin for upgrade");
      released.push(name);
    } else if !records.requirements.contains_key(&key) {
      warn!(%name, "upgrade requested for a distribution that is not pinned");
    }
  }
  released
}
