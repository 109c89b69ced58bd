//! Pipeline Documents
//!
//! The YAML-facing layer: document structures, loading and whole-pipeline
//! execution, plus the CDO operator catalog.
//!
//! # Structure
//!
//! - [`model`]: Serde structures and document validation
//! - [`parser`]: File loading and step-by-step execution
//! - [`cdo`]: Climate Data Operators as catalog entries

pub mod cdo;
pub mod model;
pub mod parser;

pub use cdo::{builtin_operator, builtin_operators, CdoOperator, OperatorArity};
pub use model::{DatasetDef, PipelineDoc, StepDef};
pub use parser::{execute_pipeline, load_pipeline, StepReport};
