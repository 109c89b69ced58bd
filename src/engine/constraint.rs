//! Constraint Algebra
//!
//! The vocabulary every other module builds on:
//!
//! - [`Constraint`]: one axis name bound to a finite set of string values
//! - [`ConstraintSet`]: a collection of constraints with unique axis names
//! - [`Combination`]: a fully bound axis-to-value assignment naming one file
//!
//! All containers are ordered (`BTreeMap`/`BTreeSet`), so iteration and
//! every derived artifact (expansion order, script text) is deterministic
//! regardless of insertion order.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::PipelineError;

/// A named axis restricted to a finite set of allowed string values.
///
/// Values are held in a `BTreeSet`, so duplicates collapse and equality
/// ignores the order values were supplied in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Constraint {
    name: String,
    values: BTreeSet<String>,
}

impl Constraint {
    /// Creates a constraint over the given values.
    pub fn new<I, S>(name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    /// Creates a constraint that allows exactly one value.
    pub fn single(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self::new(name, [value.into()])
    }

    /// The axis name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The allowed values, in sorted order.
    pub fn values(&self) -> &BTreeSet<String> {
        &self.values
    }

    /// Returns true if the constraint allows the given value.
    pub fn allows(&self, value: &str) -> bool {
        self.values.contains(value)
    }
}

/// A set of constraints with at most one entry per axis name.
///
/// Adding a second constraint for an axis unions the value sets; replacing
/// a value set wholesale is the separate [`ConstraintSet::apply_overrides`]
/// operation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct ConstraintSet {
    axes: BTreeMap<String, BTreeSet<String>>,
}

impl ConstraintSet {
    /// Creates an empty constraint set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a set from constraints, unioning value sets when two entries
    /// name the same axis.
    pub fn from_constraints<I>(constraints: I) -> Self
    where
        I: IntoIterator<Item = Constraint>,
    {
        let mut set = Self::new();
        for constraint in constraints {
            set.add(constraint);
        }
        set
    }

    /// Adds a constraint, unioning with any existing values for the axis.
    pub fn add(&mut self, constraint: Constraint) {
        self.axes
            .entry(constraint.name)
            .or_default()
            .extend(constraint.values);
    }

    /// Inserts a constraint, replacing any existing values for the axis.
    pub fn set(&mut self, constraint: Constraint) {
        self.axes.insert(constraint.name, constraint.values);
    }

    /// Returns the union of two sets: every axis from either side, with
    /// value sets unioned where both sides constrain the same axis.
    pub fn union(&self, other: &ConstraintSet) -> ConstraintSet {
        let mut merged = self.clone();
        for (axis, values) in &other.axes {
            merged
                .axes
                .entry(axis.clone())
                .or_default()
                .extend(values.iter().cloned());
        }
        merged
    }

    /// Returns a copy with every axis named in `overrides` replaced by the
    /// override's value set. Axes only in `self` carry through unchanged;
    /// axes only in `overrides` are added.
    ///
    /// # Example
    ///
    /// ```
    /// use patternrunner::engine::constraint::{Constraint, ConstraintSet};
    ///
    /// let base = ConstraintSet::from_constraints(vec![
    ///     Constraint::new("model", ["ACCESS1-0"]),
    ///     Constraint::new("variable", ["tas"]),
    /// ]);
    /// let overrides = ConstraintSet::from_constraints(vec![
    ///     Constraint::new("model", ["CSIRO-Mk3-6-0"]),
    /// ]);
    ///
    /// let merged = base.apply_overrides(&overrides);
    /// assert!(merged.get("model").unwrap().contains("CSIRO-Mk3-6-0"));
    /// assert!(!merged.get("model").unwrap().contains("ACCESS1-0"));
    /// assert!(merged.get("variable").unwrap().contains("tas"));
    /// ```
    pub fn apply_overrides(&self, overrides: &ConstraintSet) -> ConstraintSet {
        let mut merged = self.clone();
        for (axis, values) in &overrides.axes {
            merged.axes.insert(axis.clone(), values.clone());
        }
        merged
    }

    /// The value set for an axis, if constrained.
    pub fn get(&self, axis: &str) -> Option<&BTreeSet<String>> {
        self.axes.get(axis)
    }

    /// Returns true if the set constrains the given axis.
    pub fn contains_axis(&self, axis: &str) -> bool {
        self.axes.contains_key(axis)
    }

    /// Axis names in sorted order.
    pub fn axis_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.axes.keys().map(String::as_str)
    }

    /// Iterates over `(axis, values)` pairs in sorted axis order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> + '_ {
        self.axes.iter().map(|(axis, values)| (axis.as_str(), values))
    }

    /// Materializes the set back into owned [`Constraint`] values.
    pub fn constraints(&self) -> Vec<Constraint> {
        self.axes
            .iter()
            .map(|(name, values)| Constraint {
                name: name.clone(),
                values: values.clone(),
            })
            .collect()
    }

    /// Number of constrained axes.
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// Returns true if no axis is constrained.
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }
}

impl FromIterator<Constraint> for ConstraintSet {
    fn from_iter<I: IntoIterator<Item = Constraint>>(iter: I) -> Self {
        Self::from_constraints(iter)
    }
}

/// A fully bound assignment of axis names to single values.
///
/// One combination names exactly one concrete file once substituted into a
/// path template.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct Combination {
    bindings: BTreeMap<String, String>,
}

impl Combination {
    /// Creates an empty combination.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds a combination from `(axis, value)` pairs. A later pair for
    /// the same axis replaces the earlier one.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            bindings: pairs
                .into_iter()
                .map(|(axis, value)| (axis.into(), value.into()))
                .collect(),
        }
    }

    /// The bound value for an axis, if present.
    pub fn get(&self, axis: &str) -> Option<&str> {
        self.bindings.get(axis).map(String::as_str)
    }

    /// Returns a copy with one axis bound to a new value, replacing any
    /// existing binding for that axis.
    pub fn bind(&self, axis: impl Into<String>, value: impl Into<String>) -> Combination {
        let mut bound = self.clone();
        bound.bindings.insert(axis.into(), value.into());
        bound
    }

    /// Bound axis names in sorted order.
    pub fn axes(&self) -> impl Iterator<Item = &str> + '_ {
        self.bindings.keys().map(String::as_str)
    }

    /// Iterates over `(axis, value)` pairs in sorted axis order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.bindings
            .iter()
            .map(|(axis, value)| (axis.as_str(), value.as_str()))
    }

    /// Number of bound axes.
    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    /// Returns true if no axis is bound.
    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Returns true if every axis bound by both combinations carries the
    /// same value in each.
    pub fn agrees_with(&self, other: &Combination) -> bool {
        self.bindings.iter().all(|(axis, value)| {
            other
                .bindings
                .get(axis)
                .map_or(true, |other_value| other_value == value)
        })
    }

    /// Merges two combinations into one binding every axis from either
    /// side. Fails with [`PipelineError::ConstraintConflict`] if a shared
    /// axis disagrees.
    pub fn merged(&self, other: &Combination) -> Result<Combination, PipelineError> {
        let mut merged = self.clone();
        for (axis, value) in &other.bindings {
            if let Some(existing) = merged.bindings.get(axis) {
                if existing != value {
                    return Err(PipelineError::ConstraintConflict {
                        axis: axis.clone(),
                        detail: format!("'{}' vs '{}'", existing, value),
                    });
                }
            } else {
                merged.bindings.insert(axis.clone(), value.clone());
            }
        }
        Ok(merged)
    }

    /// Returns true if every bound value is allowed by the corresponding
    /// constraint. A binding on an axis the set does not constrain fails.
    pub fn satisfies(&self, constraints: &ConstraintSet) -> bool {
        self.bindings.iter().all(|(axis, value)| {
            constraints
                .get(axis)
                .map_or(false, |values| values.contains(value))
        })
    }
}

impl fmt::Display for Combination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (axis, value) in &self.bindings {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{}={}", axis, value)?;
            first = false;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constraint_deduplicates_values() {
        let constraint = Constraint::new("model", ["m1", "m2", "m1"]);
        assert_eq!(constraint.values().len(), 2);
        assert!(constraint.allows("m1"));
        assert!(constraint.allows("m2"));
        assert!(!constraint.allows("m3"));
    }

    #[test]
    fn test_constraint_equality_ignores_order() {
        let a = Constraint::new("model", ["m1", "m2"]);
        let b = Constraint::new("model", ["m2", "m1"]);
        assert_eq!(a, b);
    }

    #[test]
    fn test_from_constraints_unions_same_axis() {
        let set = ConstraintSet::from_constraints(vec![
            Constraint::single("model", "m1"),
            Constraint::single("model", "m2"),
            Constraint::single("variable", "tas"),
        ]);
        assert_eq!(set.len(), 2);
        let models = set.get("model").unwrap();
        assert!(models.contains("m1"));
        assert!(models.contains("m2"));
    }

    #[test]
    fn test_union_is_additive() {
        let a = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m1"]),
            Constraint::new("variable", ["tas"]),
        ]);
        let b = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m2"]),
            Constraint::new("experiment", ["historical"]),
        ]);

        let merged = a.union(&b);
        assert_eq!(merged.len(), 3);
        assert_eq!(merged.get("model").unwrap().len(), 2);
        assert_eq!(merged.get("variable").unwrap().len(), 1);

        // union is symmetric
        assert_eq!(merged, b.union(&a));
    }

    #[test]
    fn test_apply_overrides_replaces_whole_value_set() {
        let base = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m1", "m2", "m3"]),
            Constraint::new("variable", ["tas"]),
        ]);
        let overrides =
            ConstraintSet::from_constraints(vec![Constraint::new("model", ["override"])]);

        let merged = base.apply_overrides(&overrides);
        assert_eq!(
            merged.get("model").unwrap().iter().collect::<Vec<_>>(),
            vec!["override"]
        );
        assert!(merged.contains_axis("variable"));
    }

    #[test]
    fn test_apply_overrides_adds_new_axes() {
        let base = ConstraintSet::from_constraints(vec![Constraint::new("model", ["m1"])]);
        let overrides =
            ConstraintSet::from_constraints(vec![Constraint::new("extras", ["thing"])]);

        let merged = base.apply_overrides(&overrides);
        assert_eq!(merged.len(), 2);
        assert!(merged.get("extras").unwrap().contains("thing"));
    }

    #[test]
    fn test_set_replaces_add_unions() {
        let mut set = ConstraintSet::new();
        set.add(Constraint::new("x", ["a"]));
        set.add(Constraint::new("x", ["b"]));
        assert_eq!(set.get("x").unwrap().len(), 2);

        set.set(Constraint::new("x", ["c"]));
        assert_eq!(set.get("x").unwrap().iter().collect::<Vec<_>>(), vec!["c"]);
    }

    #[test]
    fn test_iteration_is_sorted() {
        let set = ConstraintSet::from_constraints(vec![
            Constraint::new("zebra", ["z"]),
            Constraint::new("alpha", ["a"]),
            Constraint::new("mid", ["m"]),
        ]);
        let names: Vec<&str> = set.axis_names().collect();
        assert_eq!(names, vec!["alpha", "mid", "zebra"]);
    }

    #[test]
    fn test_combination_bind_returns_new() {
        let combo = Combination::from_pairs([("model", "m1")]);
        let bound = combo.bind("variable", "tas");
        assert_eq!(combo.len(), 1);
        assert_eq!(bound.len(), 2);
        assert_eq!(bound.get("variable"), Some("tas"));

        let rebound = bound.bind("model", "m2");
        assert_eq!(rebound.get("model"), Some("m2"));
        assert_eq!(bound.get("model"), Some("m1"));
    }

    #[test]
    fn test_combination_agreement() {
        let a = Combination::from_pairs([("model", "m1"), ("variable", "tas")]);
        let b = Combination::from_pairs([("model", "m1"), ("experiment", "historical")]);
        let c = Combination::from_pairs([("model", "m2")]);

        assert!(a.agrees_with(&b));
        assert!(b.agrees_with(&a));
        assert!(!a.agrees_with(&c));
    }

    #[test]
    fn test_merged_combines_disjoint_axes() {
        let a = Combination::from_pairs([("model", "m1")]);
        let b = Combination::from_pairs([("variable", "tas")]);
        let merged = a.merged(&b).unwrap();
        assert_eq!(merged.get("model"), Some("m1"));
        assert_eq!(merged.get("variable"), Some("tas"));
    }

    #[test]
    fn test_merged_rejects_disagreement() {
        let a = Combination::from_pairs([("model", "m1")]);
        let b = Combination::from_pairs([("model", "m2")]);
        let err = a.merged(&b).unwrap_err();
        assert!(matches!(
            err,
            PipelineError::ConstraintConflict { ref axis, .. } if axis == "model"
        ));
    }

    #[test]
    fn test_satisfies_checks_value_membership() {
        let constraints = ConstraintSet::from_constraints(vec![
            Constraint::new("model", ["m1", "m2"]),
            Constraint::new("variable", ["tas"]),
        ]);

        let good = Combination::from_pairs([("model", "m1"), ("variable", "tas")]);
        let bad_value = Combination::from_pairs([("model", "m9"), ("variable", "tas")]);
        let unknown_axis = Combination::from_pairs([("region", "aus")]);

        assert!(good.satisfies(&constraints));
        assert!(!bad_value.satisfies(&constraints));
        assert!(!unknown_axis.satisfies(&constraints));
    }

    #[test]
    fn test_combination_display() {
        let combo = Combination::from_pairs([("variable", "tas"), ("model", "m1")]);
        assert_eq!(combo.to_string(), "model=m1, variable=tas");
    }
}
