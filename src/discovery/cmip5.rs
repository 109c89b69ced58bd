//! CMIP5 Archive Layout
//!
//! Templates and constraint builders for archives following the CMIP5
//! Data Reference Syntax: nine directory facets below a base path, then a
//! filename of six underscore-separated facets. `model`, `experiment`,
//! `variable` and `ensemble` appear in both the directory tree and the
//! filename, so a parsed path must agree with itself on them.

use once_cell::sync::Lazy;

use crate::engine::constraint::{Constraint, ConstraintSet};

/// Directory facets below the base path, in path order.
pub const FACETS: &[&str] = &[
    "mip",
    "product",
    "institute",
    "model",
    "experiment",
    "frequency",
    "realm",
    "variable",
    "ensemble",
];

/// Facets encoded in a CMIP5 filename, in order.
pub const FILENAME_FACETS: &[&str] = &[
    "variable",
    "mip_table",
    "model",
    "experiment",
    "ensemble",
    "time_span",
];

static DIRECTORY_PART: Lazy<String> = Lazy::new(|| {
    FACETS
        .iter()
        .map(|facet| format!("%{}%", facet))
        .collect::<Vec<_>>()
        .join("/")
});

static FILENAME_PART: Lazy<String> = Lazy::new(|| {
    let stem = FILENAME_FACETS
        .iter()
        .map(|facet| format!("%{}%", facet))
        .collect::<Vec<_>>()
        .join("_");
    format!("{}.nc", stem)
});

/// Builds the full path template for a CMIP5 archive rooted at `base`.
pub fn cmip5_template(base: &str) -> String {
    format!(
        "{}/{}/{}",
        base.trim_end_matches('/'),
        *DIRECTORY_PART,
        *FILENAME_PART
    )
}

/// Parses one facet selection into a constraint.
///
/// The text is a comma-separated value list; surrounding whitespace is
/// stripped. Blank text means the facet is unrestricted and yields
/// `None` rather than an empty constraint.
pub fn facet_constraint(name: &str, selection: &str) -> Option<Constraint> {
    let values: Vec<String> = selection
        .split(',')
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
        .collect();
    if values.is_empty() {
        None
    } else {
        Some(Constraint::new(name, values))
    }
}

/// Builds a constraint set from `(facet, selection)` pairs, skipping
/// blank selections.
pub fn facet_constraints<'a, I>(pairs: I) -> ConstraintSet
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    pairs
        .into_iter()
        .filter_map(|(name, selection)| facet_constraint(name, selection))
        .collect()
}
