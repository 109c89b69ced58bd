//! Job Scheduling and Dispatch
//!
//! Everything between an expanded process unit and a running shell
//! script.
//!
//! # Structure
//!
//! - [`job`]: Append-only script buffer with the standard header
//! - [`scheduler`]: Directory and command line accumulation
//! - [`runner`]: Runner trait and the local shell backend

pub mod job;
pub mod runner;
pub mod scheduler;

pub use job::Job;
pub use runner::{JobRunner, LocalShellRunner, RunError};
pub use scheduler::Scheduler;
