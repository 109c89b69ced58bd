//! Pipeline Document Model
//!
//! Serde structures for the YAML pipeline format: named datasets rooted
//! on storage, then steps consuming datasets or earlier steps by name.
//! Scalar fields accept either a single string or a list wherever a list
//! is the natural type.
//!
//! # Example YAML Format
//!
//! ```yaml
//! datasets:
//!   - name: monthly_temps
//!     template: /data/%model%/%variable%.nc
//!     constraints:
//!       model: [ACCESS1-0, CSIRO-Mk3-6-0]
//!       variable: tas
//!
//! steps:
//!   - name: monthly_mean
//!     inputs: monthly_temps
//!     output: /results/%model%/%variable%_mean.nc
//!     command: cdo monmean
//!
//!   - name: anomaly
//!     inputs: [monthly_temps, monthly_mean]
//!     output: /results/%model%/%variable%_anom.nc
//!     command: cdo monsub
//! ```

use std::collections::{BTreeMap, HashSet};

use serde::de::{self, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::engine::constraint::{Constraint, ConstraintSet};
use crate::error::PipelineError;

/// A named dataset rooted on storage.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct DatasetDef {
    /// Name steps refer to the dataset by.
    pub name: String,
    /// Path template with `%axis%` tokens.
    pub template: String,
    /// Allowed values per axis.
    #[serde(deserialize_with = "constraint_map", default)]
    pub constraints: BTreeMap<String, Vec<String>>,
}

impl DatasetDef {
    /// The constraints as an engine [`ConstraintSet`].
    pub fn constraint_set(&self) -> ConstraintSet {
        to_constraint_set(&self.constraints)
    }
}

/// One processing step.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct StepDef {
    /// Name later steps refer to this step's output by.
    pub name: String,
    /// Names of input datasets or earlier steps. Accepts a single string
    /// or a list.
    #[serde(deserialize_with = "single_or_vec", default)]
    pub inputs: Vec<String>,
    /// Output path template.
    pub output: String,
    /// Command text, optionally carrying `%axis%` tokens.
    pub command: String,
    /// Per-axis value overrides applied on top of the merged input
    /// constraints.
    #[serde(deserialize_with = "constraint_map", default)]
    pub overrides: BTreeMap<String, Vec<String>>,
}

impl StepDef {
    /// The overrides as an engine [`ConstraintSet`].
    pub fn override_set(&self) -> ConstraintSet {
        to_constraint_set(&self.overrides)
    }
}

/// A whole pipeline document.
#[derive(Serialize, Deserialize, Debug, Clone, Default)]
pub struct PipelineDoc {
    #[serde(default)]
    pub datasets: Vec<DatasetDef>,
    #[serde(default)]
    pub steps: Vec<StepDef>,
}

impl PipelineDoc {
    /// Validates document structure before any storage access:
    /// at least one step, non-blank unique names across datasets and
    /// steps, and every step input naming a dataset or an earlier step.
    pub fn validate(&self) -> Result<(), PipelineError> {
        if self.steps.is_empty() {
            return Err(PipelineError::InvalidPipeline(
                "pipeline has no steps".to_string(),
            ));
        }

        let mut known: HashSet<&str> = HashSet::new();
        for dataset in &self.datasets {
            if dataset.name.trim().is_empty() {
                return Err(PipelineError::InvalidPipeline(
                    "dataset with an empty name".to_string(),
                ));
            }
            if !known.insert(dataset.name.as_str()) {
                return Err(PipelineError::InvalidPipeline(format!(
                    "duplicate name '{}'",
                    dataset.name
                )));
            }
        }

        for step in &self.steps {
            if step.name.trim().is_empty() {
                return Err(PipelineError::InvalidPipeline(
                    "step with an empty name".to_string(),
                ));
            }
            if step.command.trim().is_empty() {
                return Err(PipelineError::InvalidPipeline(format!(
                    "step '{}' has no command",
                    step.name
                )));
            }
            if step.output.trim().is_empty() {
                return Err(PipelineError::InvalidPipeline(format!(
                    "step '{}' has no output template",
                    step.name
                )));
            }
            if step.inputs.is_empty() {
                return Err(PipelineError::InvalidPipeline(format!(
                    "step '{}' has no inputs",
                    step.name
                )));
            }
            for input in &step.inputs {
                if !known.contains(input.as_str()) {
                    return Err(PipelineError::InvalidPipeline(format!(
                        "step '{}' references '{}' before it is defined",
                        step.name, input
                    )));
                }
            }
            if !known.insert(step.name.as_str()) {
                return Err(PipelineError::InvalidPipeline(format!(
                    "duplicate name '{}'",
                    step.name
                )));
            }
        }

        Ok(())
    }
}

fn to_constraint_set(axes: &BTreeMap<String, Vec<String>>) -> ConstraintSet {
    axes.iter()
        .map(|(axis, values)| Constraint::new(axis.clone(), values.clone()))
        .collect()
}

/// Deserializes either a single string or an array of strings.
fn single_or_vec<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    string_values(Value::deserialize(deserializer)?)
}

/// Deserializes a map whose values are each a single string or an array
/// of strings.
fn constraint_map<'de, D>(deserializer: D) -> Result<BTreeMap<String, Vec<String>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, Value>::deserialize(deserializer)?;
    raw.into_iter()
        .map(|(axis, value)| Ok((axis, string_values::<D::Error>(value)?)))
        .collect()
}

fn string_values<E: de::Error>(value: Value) -> Result<Vec<String>, E> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::String(s) if s.is_empty() => Ok(Vec::new()),
        Value::String(s) => Ok(vec![s]),
        Value::Array(arr) => arr
            .into_iter()
            .map(|item| match item {
                Value::String(s) => Ok(s),
                _ => Err(de::Error::custom("Expected string in array")),
            })
            .collect(),
        _ => Err(de::Error::custom("Expected string or array of strings")),
    }
}
