//! File Listers
//!
//! A [`FileLister`] answers one question: which combinations exist on
//! storage for a path template? The crate ships two implementations:
//!
//! - [`GlobLister`]: scans the filesystem with a glob pattern derived
//!   from the template
//! - [`StaticLister`]: matches against a fixed path list, for tests and
//!   for archives indexed elsewhere
//!
//! Both share [`parse_path`], the inverse of template substitution.

use std::collections::HashSet;

use glob::glob;
use log::{debug, info, warn};

use crate::engine::constraint::{Combination, ConstraintSet};
use crate::error::PipelineError;

/// Enumerates the combinations present on storage for a template,
/// filtered to the given constraint set.
pub trait FileLister {
    fn list(
        &self,
        template: &str,
        constraints: &ConstraintSet,
    ) -> Result<Vec<Combination>, PipelineError>;
}

enum Segment {
    Literal(String),
    Axis(String),
}

fn parse_template(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut literal = String::new();
    let mut token = String::new();
    let mut in_token = false;
    for ch in template.chars() {
        if ch == '%' {
            if in_token {
                if token.is_empty() {
                    literal.push_str("%%");
                } else {
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Axis(std::mem::take(&mut token)));
                }
                in_token = false;
            } else {
                in_token = true;
            }
        } else if in_token {
            token.push(ch);
        } else {
            literal.push(ch);
        }
    }
    if in_token {
        literal.push('%');
        literal.push_str(&token);
    }
    if !literal.is_empty() {
        segments.push(Segment::Literal(literal));
    }
    segments
}

/// Matches a concrete path against a template, recovering the axis
/// bindings. Returns `None` when the path does not fit the template's
/// structure or a repeated axis would take two different values.
///
/// Axis values are matched non-greedily: a value ends at the next
/// occurrence of the following literal.
///
/// # Example
///
/// ```
/// use patternrunner::discovery::lister::parse_path;
///
/// let combo = parse_path("/data/%model%/%variable%.nc", "/data/ACCESS1-0/tas.nc").unwrap();
/// assert_eq!(combo.get("model"), Some("ACCESS1-0"));
/// assert_eq!(combo.get("variable"), Some("tas"));
/// ```
pub fn parse_path(template: &str, path: &str) -> Option<Combination> {
    let segments = parse_template(template);
    let mut combination = Combination::new();
    let mut pos = 0;

    let mut iter = segments.iter().peekable();
    while let Some(segment) = iter.next() {
        match segment {
            Segment::Literal(text) => {
                if !path[pos..].starts_with(text.as_str()) {
                    return None;
                }
                pos += text.len();
            }
            Segment::Axis(axis) => {
                let value_end = match iter.peek() {
                    Some(Segment::Literal(next)) => pos + path[pos..].find(next.as_str())?,
                    // An axis directly followed by another axis takes the
                    // empty value; the rest goes to the later axis.
                    Some(Segment::Axis(_)) => pos,
                    None => path.len(),
                };
                let value = &path[pos..value_end];
                if let Some(existing) = combination.get(axis) {
                    if existing != value {
                        return None;
                    }
                } else {
                    combination = combination.bind(axis.clone(), value);
                }
                pos = value_end;
            }
        }
    }

    if pos == path.len() {
        Some(combination)
    } else {
        None
    }
}

/// Renders a template as a glob pattern, one `*` per axis token.
pub fn glob_pattern(template: &str) -> String {
    let mut pattern = String::with_capacity(template.len());
    for segment in parse_template(template) {
        match segment {
            Segment::Literal(text) => pattern.push_str(&text),
            Segment::Axis(_) => pattern.push('*'),
        }
    }
    pattern
}

/// Lists combinations by scanning the filesystem with a glob derived
/// from the template.
pub struct GlobLister;

impl FileLister for GlobLister {
    fn list(
        &self,
        template: &str,
        constraints: &ConstraintSet,
    ) -> Result<Vec<Combination>, PipelineError> {
        let pattern = glob_pattern(template);
        debug!("Scanning for files matching: {}", pattern);

        let entries = glob(&pattern).map_err(|e| {
            PipelineError::Discovery(format!("bad glob pattern '{}': {}", pattern, e))
        })?;

        let mut combinations = Vec::new();
        let mut seen = HashSet::new();
        for entry in entries {
            let path = entry.map_err(|e| {
                PipelineError::Discovery(format!(
                    "unreadable path while scanning '{}': {}",
                    pattern, e
                ))
            })?;
            let Some(text) = path.to_str() else {
                warn!("Skipping non-UTF-8 path: {}", path.display());
                continue;
            };
            let Some(combination) = parse_path(template, text) else {
                debug!("Path does not match template structure: {}", text);
                continue;
            };
            if !combination.satisfies(constraints) {
                debug!("Excluding {} (outside the constraint set)", text);
                continue;
            }
            if seen.insert(combination.clone()) {
                combinations.push(combination);
            }
        }

        info!(
            "Found {} combination(s) for template {}",
            combinations.len(),
            template
        );
        Ok(combinations)
    }
}

/// Lists combinations from a fixed set of paths.
pub struct StaticLister {
    paths: Vec<String>,
}

impl StaticLister {
    pub fn new<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }
}

impl FileLister for StaticLister {
    fn list(
        &self,
        template: &str,
        constraints: &ConstraintSet,
    ) -> Result<Vec<Combination>, PipelineError> {
        let mut combinations = Vec::new();
        let mut seen = HashSet::new();
        for path in &self.paths {
            let Some(combination) = parse_path(template, path) else {
                continue;
            };
            if combination.satisfies(constraints) && seen.insert(combination.clone()) {
                combinations.push(combination);
            }
        }
        Ok(combinations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::constraint::Constraint;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_parse_path_recovers_bindings() {
        let combo = parse_path("/d/%model%/%variable%.nc", "/d/ACCESS1-0/tas.nc").unwrap();
        assert_eq!(combo.get("model"), Some("ACCESS1-0"));
        assert_eq!(combo.get("variable"), Some("tas"));
    }

    #[test]
    fn test_parse_path_rejects_structure_mismatch() {
        assert!(parse_path("/d/%model%/tas.nc", "/other/m1/tas.nc").is_none());
        assert!(parse_path("/d/%model%/tas.nc", "/d/m1/tas.nc.bak").is_none());
        assert!(parse_path("/d/%model%/tas.nc", "/d/m1").is_none());
    }

    #[test]
    fn test_parse_path_repeated_axis_must_agree() {
        assert_eq!(
            parse_path("/%v%/%v%.nc", "/tas/tas.nc")
                .unwrap()
                .get("v"),
            Some("tas")
        );
        assert!(parse_path("/%v%/%v%.nc", "/tas/pr.nc").is_none());
    }

    #[test]
    fn test_parse_path_values_are_non_greedy() {
        let combo = parse_path("%a%_%b%", "x_y_z").unwrap();
        assert_eq!(combo.get("a"), Some("x"));
        assert_eq!(combo.get("b"), Some("y_z"));
    }

    #[test]
    fn test_glob_pattern_replaces_axes() {
        assert_eq!(
            glob_pattern("/d/%model%/%variable%.nc"),
            "/d/*/*.nc"
        );
        assert_eq!(glob_pattern("/plain/path.nc"), "/plain/path.nc");
    }

    #[test]
    fn test_glob_lister_scans_tree() {
        let temp = tempdir().unwrap();
        for model in ["m1", "m2"] {
            let dir = temp.path().join(model);
            fs::create_dir_all(&dir).unwrap();
            for variable in ["tas", "pr"] {
                fs::write(dir.join(format!("{}.nc", variable)), "x").unwrap();
            }
        }
        let template = format!("{}/%model%/%variable%.nc", temp.path().display());

        let all = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m1", "m2"]),
            Constraint::new("variable", ["tas", "pr"]),
        ]);
        let combos = GlobLister.list(&template, &all).unwrap();
        assert_eq!(combos.len(), 4);

        let narrowed = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m1"]),
            Constraint::new("variable", ["tas", "pr"]),
        ]);
        let combos = GlobLister.list(&template, &narrowed).unwrap();
        assert_eq!(combos.len(), 2);
        assert!(combos.iter().all(|c| c.get("model") == Some("m1")));
    }

    #[test]
    fn test_glob_lister_filters_by_constraints() {
        let temp = tempdir().unwrap();
        fs::create_dir_all(temp.path().join("m1")).unwrap();
        fs::write(temp.path().join("m1").join("tas.nc"), "x").unwrap();
        // Parses, but falls outside the constraint set.
        fs::write(temp.path().join("m1").join("notes.nc"), "x").unwrap();

        let template = format!("{}/%model%/%variable%.nc", temp.path().display());
        let constraints = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m1"]),
            Constraint::new("variable", ["tas"]),
        ]);
        let combos = GlobLister.list(&template, &constraints).unwrap();
        assert_eq!(combos.len(), 1);
        assert_eq!(combos[0].get("variable"), Some("tas"));
    }

    #[test]
    fn test_static_lister_filters_and_deduplicates() {
        let lister = StaticLister::new([
            "/d/m1/tas.nc",
            "/d/m1/tas.nc",
            "/d/m2/tas.nc",
            "/d/m9/tas.nc",
            "/elsewhere/file",
        ]);
        let constraints = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m1", "m2"]),
            Constraint::new("variable", ["tas"]),
        ]);

        let combos = lister.list("/d/%model%/%variable%.nc", &constraints).unwrap();
        assert_eq!(combos.len(), 2);
        assert_eq!(combos[0].get("model"), Some("m1"));
        assert_eq!(combos[1].get("model"), Some("m2"));
    }
}
