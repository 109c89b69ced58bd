//! Pipeline Error Types
//!
//! One taxonomy for the whole engine, split by when an error can surface:
//!
//! - Construction-time errors (`TemplateConstraintMismatch`,
//!   `ConstraintConflict`, `UnconstrainedAxis`, `NoInputDatasets`,
//!   `OperatorArity`, `InvalidPipeline`) abort pipeline assembly before any
//!   script text is generated.
//! - Execution-time errors (`StepExecutionFailure`, `Discovery`) abort only
//!   the step that raised them; already-created directories and files from
//!   earlier steps are left in place.

use thiserror::Error;

/// Errors produced while assembling or executing a pipeline.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PipelineError {
    /// A path or command template references an axis that the constraint
    /// set in scope does not declare. Raised instead of silently
    /// substituting an empty string.
    #[error("template '{template}' references axis '{axis}' which is not constrained")]
    TemplateConstraintMismatch { axis: String, template: String },

    /// An axis would have to hold incompatible values at once, either
    /// inside a single combination or across input datasets whose value
    /// sets share no common member.
    #[error("conflicting values for axis '{axis}': {detail}")]
    ConstraintConflict { axis: String, detail: String },

    /// A combination lacks a binding for an axis a template needs. Cannot
    /// occur while the dataset construction invariants hold.
    #[error("no binding for axis '{axis}' required by template '{template}'")]
    UnboundAxis { axis: String, template: String },

    /// The runner reported a non-zero exit for a generated job script.
    #[error("step command '{command}' failed: {detail}")]
    StepExecutionFailure { command: String, detail: String },

    /// A process unit was given an empty input list.
    #[error("a process unit requires at least one input dataset")]
    NoInputDatasets,

    /// A combination binds an axis the owning dataset does not constrain.
    #[error("combination binds axis '{axis}' which is not part of the constraint set")]
    UnconstrainedAxis { axis: String },

    /// An operator was wired to the wrong number of input datasets.
    #[error("operator '{operator}' takes {expected} input dataset(s), got {actual}")]
    OperatorArity {
        operator: String,
        expected: String,
        actual: usize,
    },

    /// An operator synopsis does not follow the `<name> ifile... ofile`
    /// or `<name> ifiles ofile` grammar.
    #[error("invalid operator synopsis: '{0}'")]
    InvalidSynopsis(String),

    /// A pipeline document failed structural validation.
    #[error("invalid pipeline: {0}")]
    InvalidPipeline(String),

    /// The file lister could not enumerate storage.
    #[error("file discovery failed: {0}")]
    Discovery(String),
}
