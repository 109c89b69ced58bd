//! Pipeline Loading and Execution
//!
//! Reads a YAML pipeline document, resolves its datasets through a
//! [`FileLister`], and runs the steps in declaration order. Each step's
//! output dataset is registered under the step's name so later steps can
//! consume it without touching storage.

use std::collections::HashMap;
use std::error::Error;
use std::fs;
use std::path::Path;

use log::{debug, error, info};

use crate::config::EngineConfig;
use crate::discovery::lister::FileLister;
use crate::engine::dataset::PatternDataSet;
use crate::engine::process::ProcessUnit;
use crate::error::PipelineError;
use crate::pipeline::model::PipelineDoc;
use crate::schedule::runner::JobRunner;

/// What one executed step produced.
#[derive(Debug, Clone)]
pub struct StepReport {
    /// Step name from the document.
    pub name: String,
    /// Full text of the generated job script.
    pub script: String,
    /// Output path template.
    pub output_template: String,
    /// Number of output combinations the step expanded to.
    pub combination_count: usize,
}

/// Loads and validates a pipeline document from a YAML file.
///
/// # Arguments
///
/// * `path` - Path to the pipeline file
///
/// # Returns
///
/// The parsed [`PipelineDoc`], or an error describing what failed.
pub fn load_pipeline(path: &str) -> Result<PipelineDoc, Box<dyn Error>> {
    info!("Loading pipeline from: {}", path);

    if !Path::new(path).exists() {
        return Err(format!("Pipeline file not found: {}", path).into());
    }

    let content = fs::read_to_string(path).map_err(|e| {
        format!(
            "Failed to read pipeline file '{}': {}. Check that the file exists and is readable.",
            path, e
        )
    })?;

    let doc: PipelineDoc = serde_yaml::from_str(&content)
        .map_err(|e| format!("Failed to parse pipeline file '{}': {}", path, e))?;

    doc.validate()
        .map_err(|e| format!("Pipeline file '{}' is invalid: {}", path, e))?;

    info!(
        "Pipeline loaded: {} dataset(s), {} step(s)",
        doc.datasets.len(),
        doc.steps.len()
    );
    Ok(doc)
}

/// Runs every step of a pipeline document in declaration order.
///
/// Root datasets resolve through `lister`; each step's output becomes
/// available to later steps under the step's name. With `simulate` set,
/// scripts are generated but never dispatched. Execution stops at the
/// first failing step; completed steps are not rolled back.
pub fn execute_pipeline(
    doc: &PipelineDoc,
    config: &EngineConfig,
    lister: &dyn FileLister,
    runner: &dyn JobRunner,
    simulate: bool,
) -> Result<Vec<StepReport>, PipelineError> {
    doc.validate()?;

    let mut datasets: HashMap<String, PatternDataSet> = HashMap::new();
    for def in &doc.datasets {
        debug!("Resolving dataset '{}' from {}", def.name, def.template);
        let dataset =
            PatternDataSet::from_lister(def.template.clone(), def.constraint_set(), lister)?;
        if dataset.is_empty() {
            info!("Dataset '{}' matched no files", def.name);
        }
        datasets.insert(def.name.clone(), dataset);
    }

    let mut reports = Vec::with_capacity(doc.steps.len());
    for step in &doc.steps {
        info!("Running step: {}", step.name);

        let inputs: Vec<PatternDataSet> = step
            .inputs
            .iter()
            .map(|name| {
                datasets
                    .get(name)
                    .cloned()
                    .ok_or_else(|| {
                        PipelineError::InvalidPipeline(format!(
                            "step '{}' references unknown input '{}'",
                            step.name, name
                        ))
                    })
            })
            .collect::<Result<_, _>>()?;

        let mut unit = ProcessUnit::new(
            inputs,
            step.output.clone(),
            step.command.clone(),
            step.override_set(),
        )
        .map_err(|e| {
            error!("Step '{}' failed to assemble: {}", step.name, e);
            e
        })?;
        unit.set_config(config.clone());

        let output = unit
            .execute_with_runner(simulate, runner)
            .map_err(|e| {
                error!("Step '{}' failed: {}", step.name, e);
                e
            })?;

        let script = unit
            .scheduler()
            .map(|scheduler| scheduler.job().to_str())
            .unwrap_or_default();
        reports.push(StepReport {
            name: step.name.clone(),
            script,
            output_template: step.output.clone(),
            combination_count: output.combinations().len(),
        });

        datasets.insert(step.name.clone(), output);
    }

    info!("Pipeline finished: {} step(s) run", reports.len());
    Ok(reports)
}
