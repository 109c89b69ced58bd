//! Job Runner Backends
//!
//! A [`JobRunner`] takes a finished [`Job`] and executes it somewhere.
//! The crate ships [`LocalShellRunner`], which writes the script to a
//! temporary file and hands it to `sh`; batch submission backends (PBS,
//! Slurm) implement the same trait out of tree.

use std::fmt;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, error, warn};

use crate::schedule::job::Job;

// Distinguishes scripts written by concurrent runners in one process.
static NEXT_SCRIPT_ID: AtomicU64 = AtomicU64::new(0);

/// A failed or unstartable job run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunError {
    /// Exit code of the script, if it started at all.
    pub exit_code: Option<i32>,
    /// Stderr text or an I/O description of what went wrong.
    pub detail: String,
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.exit_code {
            Some(code) => write!(f, "exit code {}: {}", code, self.detail),
            None => write!(f, "{}", self.detail),
        }
    }
}

impl std::error::Error for RunError {}

/// Executes finished job scripts.
pub trait JobRunner {
    /// Runs the job to completion. `Ok(())` means the script exited
    /// successfully; anything else is a [`RunError`].
    fn run(&self, job: &Job) -> Result<(), RunError>;
}

/// Runs job scripts through `sh` on the local machine.
///
/// Each job is written to a uniquely named file under the script
/// directory, executed synchronously with captured output, and removed
/// afterwards whether or not it succeeded.
pub struct LocalShellRunner {
    script_dir: PathBuf,
}

impl LocalShellRunner {
    /// Creates a runner writing scripts under the system temp directory.
    pub fn new() -> Self {
        Self {
            script_dir: std::env::temp_dir().join("patternrunner_scripts"),
        }
    }

    /// Creates a runner writing scripts under the given directory.
    pub fn with_script_dir(script_dir: impl Into<PathBuf>) -> Self {
        Self {
            script_dir: script_dir.into(),
        }
    }

    fn write_script(&self, job: &Job) -> io::Result<PathBuf> {
        fs::create_dir_all(&self.script_dir)?;
        let id = NEXT_SCRIPT_ID.fetch_add(1, Ordering::Relaxed);
        let script_path = self
            .script_dir
            .join(format!("job_{}_{}.sh", std::process::id(), id));

        let mut file = File::create(&script_path)?;
        file.write_all(job.to_str().as_bytes())?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&script_path, fs::Permissions::from_mode(0o755))?;
        }

        Ok(script_path)
    }
}

impl Default for LocalShellRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl JobRunner for LocalShellRunner {
    fn run(&self, job: &Job) -> Result<(), RunError> {
        let script_path = self.write_script(job).map_err(|e| RunError {
            exit_code: None,
            detail: format!("could not write job script: {}", e),
        })?;
        debug!("Running job script: {}", script_path.display());

        let output = Command::new("sh").arg(&script_path).output().map_err(|e| RunError {
            exit_code: None,
            detail: format!("could not start sh: {}", e),
        });

        if let Err(e) = fs::remove_file(&script_path) {
            warn!("Failed to clean up script {}: {}", script_path.display(), e);
        }

        let output = output?;

        if output.status.success() {
            let stdout = String::from_utf8_lossy(&output.stdout);
            if !stdout.trim().is_empty() {
                debug!("Job output:\n{}", stdout);
            }
            Ok(())
        } else {
            let stderr = String::from_utf8_lossy(&output.stderr);
            error!("Job failed with exit code: {:?}", output.status.code());
            if !stderr.trim().is_empty() {
                error!("Job stderr:\n{}", stderr);
            }
            let detail = if stderr.trim().is_empty() {
                "job script exited with a failure status".to_string()
            } else {
                stderr.trim().to_string()
            };
            Err(RunError {
                exit_code: output.status.code(),
                detail,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    // Tests use a bare header: the standard one runs `module purge`,
    // which is absent on development machines.

    #[test]
    fn test_successful_run_and_cleanup() {
        let temp = tempdir().unwrap();
        let out_file = temp.path().join("out.txt");
        let script_dir = temp.path().join("scripts");

        let mut job = Job::with_header("#!/bin/sh\nset -e\n");
        job.add_line(format!("echo hello > {}", out_file.display()));

        let runner = LocalShellRunner::with_script_dir(&script_dir);
        runner.run(&job).unwrap();

        assert_eq!(fs::read_to_string(&out_file).unwrap().trim(), "hello");
        let leftovers: Vec<_> = fs::read_dir(&script_dir).unwrap().collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn test_failure_reports_exit_code() {
        let temp = tempdir().unwrap();
        let mut job = Job::with_header("#!/bin/sh\n");
        job.add_line("exit 3");

        let runner = LocalShellRunner::with_script_dir(temp.path().join("scripts"));
        let err = runner.run(&job).unwrap_err();
        assert_eq!(err.exit_code, Some(3));
    }

    #[test]
    fn test_fail_fast_stops_later_lines() {
        let temp = tempdir().unwrap();
        let marker = temp.path().join("marker.txt");

        let mut job = Job::with_header("#!/bin/sh\nset -e\n");
        job.add_line("false");
        job.add_line(format!("touch {}", marker.display()));

        let runner = LocalShellRunner::with_script_dir(temp.path().join("scripts"));
        assert!(runner.run(&job).is_err());
        assert!(!marker.exists());
    }

    #[test]
    fn test_failure_captures_stderr() {
        let temp = tempdir().unwrap();
        let mut job = Job::with_header("#!/bin/sh\n");
        job.add_line("echo broken >&2");
        job.add_line("exit 1");

        let runner = LocalShellRunner::with_script_dir(temp.path().join("scripts"));
        let err = runner.run(&job).unwrap_err();
        assert_eq!(err.exit_code, Some(1));
        assert!(err.detail.contains("broken"));
    }

    #[test]
    fn test_run_error_display() {
        let with_code = RunError {
            exit_code: Some(2),
            detail: "bad input".to_string(),
        };
        assert_eq!(with_code.to_string(), "exit code 2: bad input");

        let without_code = RunError {
            exit_code: None,
            detail: "could not start sh".to_string(),
        };
        assert_eq!(without_code.to_string(), "could not start sh");
    }
}
