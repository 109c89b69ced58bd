//! File Discovery
//!
//! Resolves path templates against real storage.
//!
//! # Structure
//!
//! - [`lister`]: The lister trait, glob scanning and path parsing
//! - [`cmip5`]: Templates and facet helpers for CMIP5 archives

pub mod cmip5;
pub mod lister;

pub use lister::{parse_path, FileLister, GlobLister, StaticLister};
