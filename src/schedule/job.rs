//! Job Script Buffer
//!
//! A [`Job`] is the text of one shell script under construction: a fixed
//! bootstrap header followed by an append-only list of body lines. Nothing
//! is executed here; dispatch belongs to the runner backends.

use std::fmt;

use crate::config::EngineConfig;

/// A shell script under construction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Job {
    header: String,
    lines: Vec<String>,
}

impl Job {
    /// Creates a job with the standard bootstrap header: `sh` shebang,
    /// fail-fast `set -e`, a module purge, and exports for `CWSL_CTOOLS`
    /// and `PYTHONPATH` taken from the configuration.
    pub fn new(config: &EngineConfig) -> Self {
        let header = format!(
            "#!/bin/sh\nset -e\n\nmodule purge\nexport CWSL_CTOOLS={}\nexport PYTHONPATH=$PYTHONPATH:{}\n",
            config.ctools_path, config.pythonlib_path
        );
        Self {
            header,
            lines: Vec::new(),
        }
    }

    /// Creates a job with a caller-supplied bootstrap header, for sites
    /// whose scripts start differently.
    pub fn with_header(header: impl Into<String>) -> Self {
        Self {
            header: header.into(),
            lines: Vec::new(),
        }
    }

    /// Appends one body line. Lines are emitted in append order and are
    /// never reordered or removed.
    pub fn add_line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    /// The bootstrap header.
    pub fn header(&self) -> &str {
        &self.header
    }

    /// The body lines in append order.
    pub fn lines(&self) -> &[String] {
        &self.lines
    }

    /// Number of body lines.
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns true if no body line has been appended.
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Renders the full script: the header followed by each body line
    /// terminated with a newline.
    pub fn to_str(&self) -> String {
        let mut script = self.header.clone();
        for line in &self.lines {
            script.push_str(line);
            script.push('\n');
        }
        script
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_header_text() {
        let config = EngineConfig::with_ctools("/opt/ct");
        let job = Job::new(&config);
        assert_eq!(
            job.header(),
            "#!/bin/sh\nset -e\n\nmodule purge\nexport CWSL_CTOOLS=/opt/ct\nexport PYTHONPATH=$PYTHONPATH:/opt/ct/pythonlib\n"
        );
    }

    #[test]
    fn test_empty_job_renders_header_only() {
        let job = Job::new(&EngineConfig::default());
        assert!(job.is_empty());
        assert_eq!(job.to_str(), job.header());
    }

    #[test]
    fn test_lines_render_in_append_order() {
        let mut job = Job::with_header("#!/bin/sh\n");
        job.add_line("mkdir -p /out");
        job.add_line("echo one");
        job.add_line("echo two");
        assert_eq!(job.len(), 3);
        assert_eq!(
            job.to_str(),
            "#!/bin/sh\nmkdir -p /out\necho one\necho two\n"
        );
    }

    #[test]
    fn test_display_matches_to_str() {
        let mut job = Job::with_header("#!/bin/sh\n");
        job.add_line("echo hello");
        assert_eq!(job.to_string(), job.to_str());
    }
}
