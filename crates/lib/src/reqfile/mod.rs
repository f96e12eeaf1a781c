//! Requirements-file handling.
//!
//! # Modules
//!
//! - [`name`] - Distribution name canonicalization
//! - [`requirement`] - Dependency specifier parsing and rendering
//! - [`parser`] - Line grammar, include expansion and cycle detection
//! - [`fetch`] - Fetch capability for remote includes
//! - `types` - Parsed line records, re-exported here

pub mod fetch;
pub mod name;
pub mod parser;
pub mod requirement;
mod types;

pub use fetch::{Fetch, FetchError, HttpFetcher, NoFetch};
pub use name::CanonicalName;
pub use parser::{ParseError, ParseOptions, ParsedFile, ParsedLines, RequirementsParser};
pub use requirement::{Requirement, RequirementError};
pub use types::*;
