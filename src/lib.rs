//! PatternRunner - Declarative Pipeline Engine
//!
//! A library and command-line tool for generating and running
//! file-processing pipelines over pattern-described scientific datasets.
//! A dataset is a path template with named axes (`%model%`, `%variable%`)
//! each restricted to a finite value set; steps consume datasets, expand
//! every valid axis combination, and materialize deterministic shell
//! scripts that create output directories and run one command per file.
//!
//! # Architecture
//!
//! The library is organized into four main modules:
//!
//! - [`engine`]: Constraint algebra, pattern datasets and process units
//! - [`schedule`]: Job script assembly and dispatch to runner backends
//! - [`discovery`]: File listers resolving templates against storage
//! - [`pipeline`]: YAML pipeline documents and the CDO operator catalog
//!
//! # Example
//!
//! ```rust,no_run
//! use patternrunner::discovery::lister::GlobLister;
//! use patternrunner::schedule::runner::LocalShellRunner;
//! use patternrunner::{execute_pipeline, load_pipeline, EngineConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Load a pipeline from YAML
//!     let doc = load_pipeline("pipeline.yaml")?;
//!
//!     // Generate the job scripts without running anything
//!     let config = EngineConfig::from_env();
//!     let reports =
//!         execute_pipeline(&doc, &config, &GlobLister, &LocalShellRunner::new(), true)?;
//!
//!     for report in reports {
//!         println!("{}", report.script);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod discovery;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod schedule;

// Re-export commonly used types
pub use config::EngineConfig;
pub use engine::constraint::{Combination, Constraint, ConstraintSet};
pub use engine::dataset::{DataFile, PatternDataSet};
pub use engine::process::ProcessUnit;
pub use error::PipelineError;
pub use pipeline::parser::{execute_pipeline, load_pipeline, StepReport};
pub use schedule::job::Job;
pub use schedule::scheduler::Scheduler;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = "PatternRunner";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_version() {
        assert!(!VERSION.is_empty());
        assert!(VERSION.contains('.'));
    }

    #[test]
    fn test_app_name() {
        assert_eq!(APP_NAME, "PatternRunner");
    }

    #[test]
    fn test_module_exports_constraint() {
        let constraint = Constraint::single("model", "ACCESS1-0");
        assert_eq!(constraint.name(), "model");
        assert!(constraint.allows("ACCESS1-0"));
    }

    #[test]
    fn test_module_exports_dataset() {
        let dataset = PatternDataSet::new("/plain/path.nc", ConstraintSet::new()).unwrap();
        assert!(dataset.is_empty());
    }

    #[test]
    fn test_version_format() {
        let parts: Vec<&str> = VERSION.split('.').collect();
        assert!(parts.len() >= 2, "Version should have at least major.minor");
        for part in parts {
            assert!(part.parse::<u32>().is_ok(), "Version components should be numeric");
        }
    }
}
