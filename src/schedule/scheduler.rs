//! Command Scheduler
//!
//! Owns one [`Job`] and the memory of which output directories it has
//! already created. Process units drive it in row order: directory first,
//! command second, so every command's target directory exists by the time
//! the script reaches it.

use std::collections::HashSet;

use log::debug;

use crate::config::EngineConfig;
use crate::schedule::job::Job;
use crate::schedule::runner::{JobRunner, RunError};

/// Accumulates directory and command lines into a job script.
#[derive(Debug)]
pub struct Scheduler {
    job: Job,
    created_dirs: HashSet<String>,
}

impl Scheduler {
    /// Creates a scheduler with a fresh standard job.
    pub fn new(config: &EngineConfig) -> Self {
        Self {
            job: Job::new(config),
            created_dirs: HashSet::new(),
        }
    }

    /// The job accumulated so far.
    pub fn job(&self) -> &Job {
        &self.job
    }

    /// Emits `mkdir -p <dir>` the first time a directory is needed.
    /// Subsequent requests for the same directory add nothing.
    pub fn ensure_directory(&mut self, dir: &str) {
        if self.created_dirs.insert(dir.to_string()) {
            self.job.add_line(format!("mkdir -p {}", dir));
        }
    }

    /// Emits one command line: the command text, the input paths in
    /// dataset order, then the output path, space-separated.
    pub fn add_command(&mut self, command: &str, inputs: &[String], output: &str) {
        let mut line = String::from(command);
        for input in inputs {
            line.push(' ');
            line.push_str(input);
        }
        line.push(' ');
        line.push_str(output);
        self.job.add_line(line);
    }

    /// Hands the accumulated job to a runner.
    pub fn dispatch(&self, runner: &dyn JobRunner) -> Result<(), RunError> {
        debug!("Dispatching job with {} line(s)", self.job.len());
        runner.run(&self.job)
    }
}
