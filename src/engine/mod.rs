//! Constraint Propagation Engine
//!
//! The heart of the crate: datasets described by constrained path
//! templates, and process units that merge, expand and schedule them.
//!
//! # Structure
//!
//! - [`constraint`]: Constraints, constraint sets and combinations
//! - [`dataset`]: Pattern datasets and template substitution
//! - [`process`]: Process units turning datasets into job scripts

pub mod constraint;
pub mod dataset;
pub mod process;

pub use constraint::{Combination, Constraint, ConstraintSet};
pub use dataset::{DataFile, PatternDataSet};
pub use process::ProcessUnit;
