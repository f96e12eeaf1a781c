//! deepfreeze-lib: requirements files and freeze merging for pip-deepfreeze
//!
//! This crate provides:
//! - `reqfile`: a lazy parser for pip requirements files, includes and all
//! - `merge`: folding frozen pins, input requirements and upgrade requests into constraints
//! - `layout`: where a project keeps its requirements files
//! - `installer`: the seam to the external package installer
//! - `sync`: install under merged constraints and rewrite the frozen files

pub mod consts;
pub mod installer;
pub mod layout;
pub mod merge;
pub mod reqfile;
pub mod sync;
