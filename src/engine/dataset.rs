//! Pattern Datasets
//!
//! A [`PatternDataSet`] describes a family of files with a single path
//! template instead of an explicit file list. Templates embed axis names
//! between percent signs (`/data/%model%/%variable%.nc`); the dataset
//! pairs the template with a [`ConstraintSet`] bounding each axis and the
//! list of [`Combination`]s actually present.
//!
//! Construction enforces two invariants:
//! - every axis the template references is constrained, and
//! - every axis a combination binds is constrained.
//!
//! Concrete paths are never stored; [`PatternDataSet::get_files`]
//! substitutes combinations into the template on demand.

use std::collections::HashSet;
use std::fmt;

use log::info;

use crate::discovery::lister::FileLister;
use crate::engine::constraint::{Combination, ConstraintSet};
use crate::error::PipelineError;

/// Extracts the axis names referenced by `%axis%` tokens in a template.
///
/// Names appear in template order and a name referenced twice appears
/// twice; callers needing uniqueness deduplicate themselves. An empty
/// token (`%%`) and an unterminated trailing `%` carry no axis name and
/// are skipped, matching how [`substitute`] leaves them verbatim.
pub fn placeholder_axes(template: &str) -> Vec<String> {
    let mut names = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    for ch in template.chars() {
        if ch == '%' {
            if in_token {
                if !current.is_empty() {
                    names.push(current.clone());
                }
                current.clear();
                in_token = false;
            } else {
                in_token = true;
            }
        } else if in_token {
            current.push(ch);
        }
    }
    names
}

/// Substitutes every `%axis%` token with the combination's bound value.
///
/// Fails with [`PipelineError::UnboundAxis`] if the combination lacks a
/// binding for a referenced axis; an empty string is never silently
/// substituted. `%%` and an unterminated trailing token are reproduced
/// verbatim.
///
/// # Example
///
/// ```
/// use patternrunner::engine::constraint::Combination;
/// use patternrunner::engine::dataset::substitute;
///
/// let combo = Combination::from_pairs([("model", "ACCESS1-0"), ("variable", "tas")]);
/// let path = substitute("/data/%model%/%variable%.nc", &combo).unwrap();
/// assert_eq!(path, "/data/ACCESS1-0/tas.nc");
/// ```
pub fn substitute(template: &str, combination: &Combination) -> Result<String, PipelineError> {
    let mut result = String::with_capacity(template.len());
    let mut token = String::new();
    let mut in_token = false;
    for ch in template.chars() {
        if ch == '%' {
            if in_token {
                if token.is_empty() {
                    result.push_str("%%");
                } else {
                    match combination.get(&token) {
                        Some(value) => result.push_str(value),
                        None => {
                            return Err(PipelineError::UnboundAxis {
                                axis: token,
                                template: template.to_string(),
                            });
                        }
                    }
                }
                token.clear();
                in_token = false;
            } else {
                in_token = true;
            }
        } else if in_token {
            token.push(ch);
        } else {
            result.push(ch);
        }
    }
    if in_token {
        // Unterminated token, keep the raw text
        result.push('%');
        result.push_str(&token);
    }
    Ok(result)
}

/// Checks that every axis a template references is constrained.
pub fn validate_template(template: &str, constraints: &ConstraintSet) -> Result<(), PipelineError> {
    for axis in placeholder_axes(template) {
        if !constraints.contains_axis(&axis) {
            return Err(PipelineError::TemplateConstraintMismatch {
                axis,
                template: template.to_string(),
            });
        }
    }
    Ok(())
}

/// One concrete file produced by substituting a combination into a
/// dataset's path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DataFile {
    pub full_path: String,
}

impl fmt::Display for DataFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_path)
    }
}

/// A family of files described by a path template, axis constraints and
/// the combinations present.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatternDataSet {
    path_template: String,
    constraints: ConstraintSet,
    combinations: Vec<Combination>,
}

impl PatternDataSet {
    /// Creates a dataset with no combinations yet.
    ///
    /// Fails with [`PipelineError::TemplateConstraintMismatch`] if the
    /// template references an unconstrained axis.
    pub fn new(
        path_template: impl Into<String>,
        constraints: ConstraintSet,
    ) -> Result<Self, PipelineError> {
        Self::with_combinations(path_template, constraints, Vec::new())
    }

    /// Creates a dataset from an explicit combination list.
    ///
    /// Combinations are kept in the order given, minus duplicates: a
    /// combination equal to an earlier one is dropped. Every axis a
    /// combination binds must be constrained.
    pub fn with_combinations(
        path_template: impl Into<String>,
        constraints: ConstraintSet,
        combinations: Vec<Combination>,
    ) -> Result<Self, PipelineError> {
        let path_template = path_template.into();
        validate_template(&path_template, &constraints)?;

        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(combinations.len());
        for combination in combinations {
            for axis in combination.axes() {
                if !constraints.contains_axis(axis) {
                    return Err(PipelineError::UnconstrainedAxis {
                        axis: axis.to_string(),
                    });
                }
            }
            if seen.insert(combination.clone()) {
                unique.push(combination);
            }
        }

        Ok(Self {
            path_template,
            constraints,
            combinations: unique,
        })
    }

    /// Creates a dataset by asking a [`FileLister`] which combinations
    /// exist on storage for the template, filtered to the constraint set.
    pub fn from_lister(
        path_template: impl Into<String>,
        constraints: ConstraintSet,
        lister: &dyn FileLister,
    ) -> Result<Self, PipelineError> {
        let path_template = path_template.into();
        let combinations = lister.list(&path_template, &constraints)?;
        info!(
            "Resolved {} combination(s) for {}",
            combinations.len(),
            path_template
        );
        Self::with_combinations(path_template, constraints, combinations)
    }

    /// The path template.
    pub fn path_template(&self) -> &str {
        &self.path_template
    }

    /// The axis constraints.
    pub fn constraints(&self) -> &ConstraintSet {
        &self.constraints
    }

    /// The combinations present, in stored order.
    pub fn combinations(&self) -> &[Combination] {
        &self.combinations
    }

    /// Returns true if the dataset holds no combinations.
    pub fn is_empty(&self) -> bool {
        self.combinations.is_empty()
    }

    /// Yields the concrete files for the stored combinations, in stored
    /// order. Paths are built lazily; nothing touches the filesystem.
    pub fn get_files(&self) -> impl Iterator<Item = Result<DataFile, PipelineError>> + '_ {
        self.combinations.iter().map(move |combination| {
            substitute(&self.path_template, combination).map(|full_path| DataFile { full_path })
        })
    }
}
