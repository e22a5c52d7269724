//! Running a scenario: building the optimisation problem for a model, solving it and reporting the
//! results.
use crate::feature::{add_custom_constraints, add_tech_group_constraints};
use crate::model::Model;
use crate::optimisation::{OptimisationModel, Solution};
use crate::output::metadata::write_metadata;
use crate::report::report;
use anyhow::{Context, Result, ensure};
use log::info;
use std::path::Path;

/// The scenario name used if none is given
pub const DEFAULT_SCENARIO_NAME: &str = "base";

/// Check that a scenario name can be used as a file name
pub fn check_scenario_name(name: &str) -> Result<()> {
    ensure!(
        !name.is_empty()
            && name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.')),
        "Invalid scenario name '{name}': only letters, digits, '_', '-' and '.' are allowed"
    );

    Ok(())
}

/// Build the full optimisation problem for a model, with the regional and technology group
/// constraints, and solve it
pub fn solve_model(model: &Model) -> Result<Solution> {
    let mut opt = OptimisationModel::new(model);
    add_custom_constraints(&mut opt, model);
    add_tech_group_constraints(&mut opt, model);

    opt.solve()
}

/// Run a scenario and write its results to `output_path`.
///
/// # Arguments
///
/// * `model` - The model to run
/// * `output_path` - The folder to which results will be written
/// * `scenario` - The name of the scenario, used to label the results
/// * `input_report` - Whether to write a snapshot of the input data
pub fn run(model: &Model, output_path: &Path, scenario: &str, input_report: bool) -> Result<()> {
    check_scenario_name(scenario)?;
    info!("Running scenario {scenario}");

    let solution = solve_model(model)
        .with_context(|| format!("Failed to solve scenario {scenario}"))?;
    report(model, &solution, output_path, scenario, input_report)
        .context("Failed to write results")?;
    write_metadata(
        output_path,
        &model.model_path,
        scenario,
        solution.objective_value(),
    )?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{assert_error, model};
    use crate::report::{RESULT_DATABASE_FILE_NAME, SCENARIO_DIR};
    use rstest::rstest;
    use tempfile::tempdir;

    #[rstest]
    #[case("base")]
    #[case("co2-limit_2.0")]
    fn test_check_scenario_name_ok(#[case] name: &str) {
        assert!(check_scenario_name(name).is_ok());
    }

    #[rstest]
    #[case("")]
    #[case("../base")]
    #[case("high co2")]
    fn test_check_scenario_name_bad(#[case] name: &str) {
        assert!(check_scenario_name(name).is_err());
    }

    #[rstest]
    fn test_run(model: Model) {
        let dir = tempdir().unwrap();
        run(&model, dir.path(), DEFAULT_SCENARIO_NAME, false).unwrap();

        assert!(dir.path().join(RESULT_DATABASE_FILE_NAME).is_file());
        assert!(dir.path().join(SCENARIO_DIR).join("base.xlsx").is_file());
        assert!(dir.path().join("metadata.toml").is_file());
    }

    #[rstest]
    fn test_run_bad_scenario_name(model: Model) {
        let dir = tempdir().unwrap();
        assert_error!(
            run(&model, dir.path(), "a/b", false),
            "Invalid scenario name 'a/b': only letters, digits, '_', '-' and '.' are allowed"
        );
    }
}
