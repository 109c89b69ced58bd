//! Engine Configuration
//!
//! Carries the two installation paths every generated job script exports:
//! the climate tools checkout (`CWSL_CTOOLS`) and the Python library
//! directory appended to `PYTHONPATH`. Values resolve in order from
//! explicit construction, the process environment, and compiled defaults,
//! so the same pipeline document runs unchanged on differently laid out
//! hosts.

use std::env;

/// Default installation prefix for the climate tools collection.
pub const DEFAULT_CTOOLS_PATH: &str = "/usr/local/cwsl-ctools";

/// Paths stamped into the header of every generated job script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    /// Value exported as `CWSL_CTOOLS`.
    pub ctools_path: String,
    /// Directory appended to `PYTHONPATH`.
    pub pythonlib_path: String,
}

impl EngineConfig {
    /// Creates a configuration rooted at the given tools path, with the
    /// Python library directory derived as `<path>/pythonlib`.
    pub fn with_ctools(path: impl Into<String>) -> Self {
        let ctools_path = path.into();
        let pythonlib_path = format!("{}/pythonlib", ctools_path);
        Self {
            ctools_path,
            pythonlib_path,
        }
    }

    /// Resolves the configuration from the process environment.
    ///
    /// `CWSL_CTOOLS` overrides the tools path; `CWSL_PYTHONLIB` overrides
    /// the library directory independently. Unset variables fall back to
    /// the compiled defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let ctools_path =
            lookup("CWSL_CTOOLS").unwrap_or_else(|| DEFAULT_CTOOLS_PATH.to_string());
        let pythonlib_path =
            lookup("CWSL_PYTHONLIB").unwrap_or_else(|| format!("{}/pythonlib", ctools_path));
        Self {
            ctools_path,
            pythonlib_path,
        }
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::with_ctools(DEFAULT_CTOOLS_PATH)
    }
}
