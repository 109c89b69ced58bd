//! Process Units
//!
//! A [`ProcessUnit`] is one step of a pipeline: input datasets in, a new
//! dataset plus a runnable job script out. Execution walks five stages:
//!
//! 1. Merge input constraints (additive union) and apply the step's
//!    overrides (replacement).
//! 2. Expand the concrete combinations: natural join across inputs, then
//!    a Cartesian product with each override axis's value set.
//! 3. Describe the output as a [`PatternDataSet`] over the merged
//!    constraints.
//! 4. Materialize the job script: per output row, a deduplicated
//!    `mkdir -p` followed by the expanded command line.
//! 5. Dispatch the script through a [`JobRunner`], unless simulating.
//!
//! Expansion order is deterministic: input rows in stored order, override
//! axes in name order with their values in sorted order, the first axis
//! varying slowest.
//!
//! # Example
//!
//! ```rust,no_run
//! use patternrunner::discovery::lister::GlobLister;
//! use patternrunner::engine::constraint::{Constraint, ConstraintSet};
//! use patternrunner::engine::dataset::PatternDataSet;
//! use patternrunner::engine::process::ProcessUnit;
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let constraints = ConstraintSet::from_constraints(vec![
//!         Constraint::new("model", ["ACCESS1-0", "CSIRO-Mk3-6-0"]),
//!         Constraint::new("variable", ["tas"]),
//!     ]);
//!     let input =
//!         PatternDataSet::from_lister("/data/%model%/%variable%.nc", constraints, &GlobLister)?;
//!
//!     let mut unit = ProcessUnit::new(
//!         vec![input],
//!         "/results/%model%/%variable%_mean.nc",
//!         "cdo monmean",
//!         ConstraintSet::new(),
//!     )?;
//!     let output = unit.execute(false)?;
//!     println!("{} file(s) produced", output.combinations().len());
//!     Ok(())
//! }
//! ```

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use log::{debug, info, warn};

use crate::config::EngineConfig;
use crate::engine::constraint::{Combination, ConstraintSet};
use crate::engine::dataset::{substitute, validate_template, PatternDataSet};
use crate::error::PipelineError;
use crate::schedule::runner::{JobRunner, LocalShellRunner};
use crate::schedule::scheduler::Scheduler;

/// One output row of the expansion: the fully bound output combination
/// and the input combination it came from in each source dataset.
struct ExpandedRow {
    sources: Vec<Combination>,
    output: Combination,
}

/// One pipeline step: input datasets, an output template, a command
/// template and override constraints.
#[derive(Debug)]
pub struct ProcessUnit {
    inputs: Vec<PatternDataSet>,
    output_template: String,
    command: String,
    extra_constraints: ConstraintSet,
    config: EngineConfig,
    scheduler: Option<Scheduler>,
}

impl ProcessUnit {
    /// Creates a process unit, validating it against its inputs.
    ///
    /// # Arguments
    ///
    /// * `inputs` - Input datasets; at least one is required
    /// * `output_template` - Path template for produced files
    /// * `command` - Command text, optionally carrying `%axis%` tokens
    /// * `extra_constraints` - Per-axis overrides replacing merged values
    ///
    /// # Errors
    ///
    /// * [`PipelineError::NoInputDatasets`] for an empty input list
    /// * [`PipelineError::TemplateConstraintMismatch`] if the output
    ///   template references an axis no input or override constrains
    /// * [`PipelineError::ConstraintConflict`] if two inputs share an
    ///   axis whose value sets are disjoint and no override resolves it
    pub fn new(
        inputs: Vec<PatternDataSet>,
        output_template: impl Into<String>,
        command: impl Into<String>,
        extra_constraints: ConstraintSet,
    ) -> Result<Self, PipelineError> {
        if inputs.is_empty() {
            return Err(PipelineError::NoInputDatasets);
        }
        let output_template = output_template.into();
        let command = command.into();

        let merged = merge_input_constraints(&inputs, &extra_constraints);
        validate_template(&output_template, &merged)?;
        check_shared_axes(&inputs, &extra_constraints)?;

        Ok(Self {
            inputs,
            output_template,
            command,
            extra_constraints,
            config: EngineConfig::default(),
            scheduler: None,
        })
    }

    /// Replaces the engine configuration used for job headers.
    pub fn set_config(&mut self, config: EngineConfig) {
        self.config = config;
    }

    /// The output path template.
    pub fn output_template(&self) -> &str {
        &self.output_template
    }

    /// The merged constraint view: the union of all input constraints
    /// with the overrides applied on top.
    pub fn merged_constraints(&self) -> ConstraintSet {
        merge_input_constraints(&self.inputs, &self.extra_constraints)
    }

    /// The scheduler from the most recent execution, script included.
    /// `None` until [`ProcessUnit::execute`] has run.
    pub fn scheduler(&self) -> Option<&Scheduler> {
        self.scheduler.as_ref()
    }

    /// Executes the step with the local shell runner.
    ///
    /// With `simulate` set, the job script is built and retained for
    /// inspection but never run.
    pub fn execute(&mut self, simulate: bool) -> Result<PatternDataSet, PipelineError> {
        self.execute_with_runner(simulate, &LocalShellRunner::new())
    }

    /// Executes the step, dispatching through the given runner.
    ///
    /// Returns the output dataset. The generated script stays available
    /// through [`ProcessUnit::scheduler`] even when dispatch fails.
    pub fn execute_with_runner(
        &mut self,
        simulate: bool,
        runner: &dyn JobRunner,
    ) -> Result<PatternDataSet, PipelineError> {
        info!(
            "Executing process unit: {} input dataset(s) -> {}",
            self.inputs.len(),
            self.output_template
        );

        let rows = self.expand_combinations();
        debug!("Expanded {} output combination(s)", rows.len());
        if rows.is_empty() {
            warn!("No combinations to process for {}", self.output_template);
        }

        let output = PatternDataSet::with_combinations(
            self.output_template.clone(),
            self.merged_constraints(),
            rows.iter().map(|row| row.output.clone()).collect(),
        )?;

        let mut scheduler = Scheduler::new(&self.config);
        for row in &rows {
            let output_path = substitute(&self.output_template, &row.output)?;
            let mut input_paths = Vec::with_capacity(row.sources.len());
            for (dataset, source) in self.inputs.iter().zip(&row.sources) {
                input_paths.push(substitute(dataset.path_template(), source)?);
            }
            let command = substitute(&self.command, &row.output)?;

            if let Some(dir) = Path::new(&output_path).parent() {
                let dir = dir.to_string_lossy();
                if !dir.is_empty() {
                    scheduler.ensure_directory(&dir);
                }
            }
            scheduler.add_command(&command, &input_paths, &output_path);
        }

        let dispatch_result = if simulate {
            Ok(())
        } else {
            scheduler.dispatch(runner)
        };
        self.scheduler = Some(scheduler);

        dispatch_result.map_err(|e| PipelineError::StepExecutionFailure {
            command: self.command.clone(),
            detail: e.to_string(),
        })?;
        if !simulate {
            info!("Job for {} completed", self.output_template);
        }

        Ok(output)
    }

    /// Expands the output rows: a natural join of the input combination
    /// lists followed by the Cartesian product with each override axis.
    fn expand_combinations(&self) -> Vec<ExpandedRow> {
        // Join across inputs, first input outermost. Pairs disagreeing on
        // a shared axis are excluded, not an error.
        let mut rows: Vec<ExpandedRow> = self.inputs[0]
            .combinations()
            .iter()
            .map(|combination| ExpandedRow {
                sources: vec![combination.clone()],
                output: combination.clone(),
            })
            .collect();

        for input in &self.inputs[1..] {
            let mut joined = Vec::new();
            for row in &rows {
                for combination in input.combinations() {
                    match row.output.merged(combination) {
                        Ok(output) => {
                            let mut sources = row.sources.clone();
                            sources.push(combination.clone());
                            joined.push(ExpandedRow { sources, output });
                        }
                        Err(_) => {
                            debug!(
                                "Excluding pair disagreeing on a shared axis: ({}) / ({})",
                                row.output, combination
                            );
                        }
                    }
                }
            }
            rows = joined;
        }

        // Each override axis multiplies the rows by its value set. Axes
        // iterate in name order, so the first axis varies slowest.
        for (axis, values) in self.extra_constraints.iter() {
            let mut expanded = Vec::with_capacity(rows.len() * values.len());
            for row in &rows {
                for value in values {
                    expanded.push(ExpandedRow {
                        sources: row.sources.clone(),
                        output: row.output.bind(axis, value),
                    });
                }
            }
            rows = expanded;
        }

        // Rows collapsing to the same output combination emit once, the
        // first source set winning.
        let mut seen = HashSet::new();
        rows.retain(|row| seen.insert(row.output.clone()));
        rows
    }
}

fn merge_input_constraints(
    inputs: &[PatternDataSet],
    overrides: &ConstraintSet,
) -> ConstraintSet {
    let mut merged = ConstraintSet::new();
    for input in inputs {
        merged = merged.union(input.constraints());
    }
    merged.apply_overrides(overrides)
}

/// Rejects construction when two inputs constrain a shared axis to
/// disjoint value sets and no override rebinds the axis; the join could
/// only ever produce zero rows.
fn check_shared_axes(
    inputs: &[PatternDataSet],
    overrides: &ConstraintSet,
) -> Result<(), PipelineError> {
    let mut axis_sets: BTreeMap<&str, Vec<&BTreeSet<String>>> = BTreeMap::new();
    for input in inputs {
        for (axis, values) in input.constraints().iter() {
            axis_sets.entry(axis).or_default().push(values);
        }
    }

    for (axis, sets) in axis_sets {
        if sets.len() < 2 || overrides.contains_axis(axis) {
            continue;
        }
        let mut common = sets[0].clone();
        for set in &sets[1..] {
            common = common.intersection(set).cloned().collect();
        }
        if common.is_empty() {
            let listed = sets
                .iter()
                .map(|set| {
                    let values: Vec<&str> = set.iter().map(String::as_str).collect();
                    format!("[{}]", values.join(", "))
                })
                .collect::<Vec<_>>()
                .join(" vs ");
            return Err(PipelineError::ConstraintConflict {
                axis: axis.to_string(),
                detail: format!("input value sets share no common value ({})", listed),
            });
        }
    }
    Ok(())
}
