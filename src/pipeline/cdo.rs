//! CDO Operator Catalog
//!
//! Describes Climate Data Operators as catalog entries rather than code:
//! each operator carries a name, a short description and a synopsis line
//! from which its input arity is parsed. An operator plus datasets yields
//! a ready-made [`ProcessUnit`] whose command is `cdo <name>`.
//!
//! Synopsis grammar: `<name> ifile... ofile` for a fixed input count, or
//! `<name> ifiles ofile` for one-or-more.

use std::collections::BTreeMap;
use std::error::Error;
use std::fs;

use log::{debug, info};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};

use crate::engine::constraint::ConstraintSet;
use crate::engine::dataset::PatternDataSet;
use crate::engine::process::ProcessUnit;
use crate::error::PipelineError;

/// One catalog entry for a CDO operator.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct CdoOperator {
    /// Operator name as passed to `cdo`.
    pub name: String,
    /// One-line description.
    #[serde(default)]
    pub brief: String,
    /// Longer manual text.
    #[serde(default)]
    pub man: String,
    /// Synopsis line the arity is parsed from.
    pub synopsis: String,
}

/// How many input datasets an operator consumes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OperatorArity {
    /// Exactly this many inputs.
    Fixed(usize),
    /// One or more inputs.
    Variadic,
}

impl OperatorArity {
    /// Returns true if the arity admits the given input count.
    pub fn accepts(&self, count: usize) -> bool {
        match self {
            Self::Fixed(n) => *n == count,
            Self::Variadic => count >= 1,
        }
    }

    fn describe(&self) -> String {
        match self {
            Self::Fixed(n) => format!("exactly {}", n),
            Self::Variadic => "one or more".to_string(),
        }
    }
}

/// Parses a synopsis line into its operator name and arity.
pub fn parse_synopsis(synopsis: &str) -> Result<(String, OperatorArity), PipelineError> {
    let invalid = || PipelineError::InvalidSynopsis(synopsis.to_string());
    let tokens: Vec<&str> = synopsis.split_whitespace().collect();

    let (first, rest) = tokens.split_first().ok_or_else(invalid)?;
    let name = *first;
    if name.is_empty() || !name.chars().all(|c| c.is_ascii_alphabetic()) {
        return Err(invalid());
    }

    match rest {
        ["ifiles", "ofile"] => Ok((name.to_string(), OperatorArity::Variadic)),
        [inputs @ .., "ofile"]
            if !inputs.is_empty() && inputs.iter().all(|token| *token == "ifile") =>
        {
            Ok((name.to_string(), OperatorArity::Fixed(inputs.len())))
        }
        _ => Err(invalid()),
    }
}

impl CdoOperator {
    /// The operator's arity, parsed from its synopsis. Fails if the
    /// synopsis is malformed or names a different operator.
    pub fn arity(&self) -> Result<OperatorArity, PipelineError> {
        let (name, arity) = parse_synopsis(&self.synopsis)?;
        if name != self.name {
            return Err(PipelineError::InvalidSynopsis(self.synopsis.clone()));
        }
        Ok(arity)
    }

    /// The command text a process unit prefixes each script line with.
    pub fn command(&self) -> String {
        format!("cdo {}", self.name)
    }

    /// Wires the operator into a [`ProcessUnit`] over the given inputs.
    ///
    /// # Errors
    ///
    /// [`PipelineError::OperatorArity`] when the input count does not
    /// match the synopsis, before any dataset validation runs.
    pub fn process_unit(
        &self,
        inputs: Vec<PatternDataSet>,
        output_template: impl Into<String>,
        overrides: ConstraintSet,
    ) -> Result<ProcessUnit, PipelineError> {
        let arity = self.arity()?;
        if !arity.accepts(inputs.len()) {
            return Err(PipelineError::OperatorArity {
                operator: self.name.clone(),
                expected: arity.describe(),
                actual: inputs.len(),
            });
        }
        debug!("Operator {} over {} input dataset(s)", self.name, inputs.len());
        ProcessUnit::new(inputs, output_template, self.command(), overrides)
    }
}

static BUILTIN_OPERATORS: Lazy<BTreeMap<String, CdoOperator>> = Lazy::new(|| {
    let operators = vec![
        CdoOperator {
            name: "monsub".to_string(),
            brief: "Monthly arithmetic".to_string(),
            man: "Subtracts the second dataset from the first, month by month".to_string(),
            synopsis: "monsub ifile ifile ofile".to_string(),
        },
        CdoOperator {
            name: "monmean".to_string(),
            brief: "Monthly statistical values".to_string(),
            man: "Computes the mean over each month".to_string(),
            synopsis: "monmean ifile ofile".to_string(),
        },
        CdoOperator {
            name: "merge".to_string(),
            brief: "Merge datasets".to_string(),
            man: "Merges any number of datasets into one".to_string(),
            synopsis: "merge ifiles ofile".to_string(),
        },
        CdoOperator {
            name: "test".to_string(),
            brief: "Test operator".to_string(),
            man: "Exercises operator plumbing over two input datasets".to_string(),
            synopsis: "test ifile ifile ofile".to_string(),
        },
    ];
    operators
        .into_iter()
        .map(|operator| (operator.name.clone(), operator))
        .collect()
});

/// The compiled-in operator catalog, keyed by name.
pub fn builtin_operators() -> &'static BTreeMap<String, CdoOperator> {
    &BUILTIN_OPERATORS
}

/// Looks up one compiled-in operator.
pub fn builtin_operator(name: &str) -> Option<&'static CdoOperator> {
    BUILTIN_OPERATORS.get(name)
}

/// Loads an operator catalog from a YAML file and verifies every
/// synopsis parses.
pub fn load_operators(path: &str) -> Result<Vec<CdoOperator>, Box<dyn Error>> {
    info!("Loading operator catalog from: {}", path);

    let content = fs::read_to_string(path).map_err(|e| {
        format!(
            "Failed to read operator catalog '{}': {}. Check that the file exists and is readable.",
            path, e
        )
    })?;

    let operators: Vec<CdoOperator> = serde_yaml::from_str(&content)
        .map_err(|e| format!("Failed to parse operator catalog '{}': {}", path, e))?;

    for operator in &operators {
        operator
            .arity()
            .map_err(|e| format!("Operator '{}': {}", operator.name, e))?;
    }

    debug!("Catalog contains {} operator(s)", operators.len());
    Ok(operators)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::constraint::{Combination, Constraint};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn one_file_dataset() -> PatternDataSet {
        let constraints = ConstraintSet::from_constraints(vec![Constraint::new("x", ["a"])]);
        PatternDataSet::with_combinations(
            "/in/%x%.nc",
            constraints,
            vec![Combination::from_pairs([("x", "a")])],
        )
        .unwrap()
    }

    #[test]
    fn test_parse_fixed_synopsis() {
        let (name, arity) = parse_synopsis("monsub ifile ifile ofile").unwrap();
        assert_eq!(name, "monsub");
        assert_eq!(arity, OperatorArity::Fixed(2));
    }

    #[test]
    fn test_parse_variadic_synopsis() {
        let (name, arity) = parse_synopsis("merge ifiles ofile").unwrap();
        assert_eq!(name, "merge");
        assert_eq!(arity, OperatorArity::Variadic);
    }

    #[test]
    fn test_parse_rejects_malformed_synopses() {
        for synopsis in [
            "",
            "monmean",
            "monmean ofile",
            "monmean ifile",
            "monmean ofile ifile",
            "monmean ifile ifiles ofile",
            "mon2mean ifile ofile",
            "monmean ifile ofile extra",
        ] {
            assert!(
                matches!(parse_synopsis(synopsis), Err(PipelineError::InvalidSynopsis(_))),
                "accepted: {:?}",
                synopsis
            );
        }
    }

    #[test]
    fn test_arity_checks_name_agreement() {
        let operator = CdoOperator {
            name: "monmean".to_string(),
            brief: String::new(),
            man: String::new(),
            synopsis: "monsub ifile ifile ofile".to_string(),
        };
        assert!(operator.arity().is_err());
    }

    #[test]
    fn test_builtin_catalog() {
        assert_eq!(builtin_operators().len(), 4);
        let monsub = builtin_operator("monsub").unwrap();
        assert_eq!(monsub.arity().unwrap(), OperatorArity::Fixed(2));
        let test_op = builtin_operator("test").unwrap();
        assert_eq!(test_op.arity().unwrap(), OperatorArity::Fixed(2));
        assert_eq!(test_op.command(), "cdo test");
        let merge = builtin_operator("merge").unwrap();
        assert_eq!(merge.arity().unwrap(), OperatorArity::Variadic);
        assert!(builtin_operator("nonexistent").is_none());
    }

    #[test]
    fn test_arity_mismatch_rejected() {
        let monsub = builtin_operator("monsub").unwrap();
        let err = monsub
            .process_unit(
                vec![one_file_dataset()],
                "/out/%x%.nc",
                ConstraintSet::new(),
            )
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::OperatorArity { ref operator, actual: 1, .. } if operator == "monsub"
        ));
    }

    #[test]
    fn test_variadic_rejects_zero_inputs() {
        let merge = builtin_operator("merge").unwrap();
        let err = merge
            .process_unit(Vec::new(), "/out/x.nc", ConstraintSet::new())
            .unwrap_err();
        assert!(matches!(err, PipelineError::OperatorArity { actual: 0, .. }));
    }

    #[test]
    fn test_operator_builds_runnable_unit() {
        let monmean = builtin_operator("monmean").unwrap();
        let mut unit = monmean
            .process_unit(
                vec![one_file_dataset()],
                "/out/%x%_mean.nc",
                ConstraintSet::new(),
            )
            .unwrap();
        unit.execute(true).unwrap();

        let script = unit.scheduler().unwrap().job().to_str();
        assert!(script.contains("cdo monmean /in/a.nc /out/a_mean.nc\n"));
    }

    #[test]
    fn test_load_operators_from_yaml() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            "- name: timmean\n  brief: Temporal mean\n  synopsis: timmean ifile ofile\n\
             - name: mergetime\n  synopsis: mergetime ifiles ofile\n"
        )
        .unwrap();

        let operators = load_operators(file.path().to_str().unwrap()).unwrap();
        assert_eq!(operators.len(), 2);
        assert_eq!(operators[0].arity().unwrap(), OperatorArity::Fixed(1));
        assert_eq!(operators[1].arity().unwrap(), OperatorArity::Variadic);
        assert_eq!(operators[1].man, "");
    }

    #[test]
    fn test_load_operators_rejects_bad_synopsis() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "- name: broken\n  synopsis: broken ofile ifile\n").unwrap();
        assert!(load_operators(file.path().to_str().unwrap()).is_err());
    }

    #[test]
    fn test_load_operators_missing_file() {
        let err = load_operators("/nonexistent/catalog.yaml").unwrap_err();
        assert!(err.to_string().contains("Failed to read"));
    }
}
