//! Reporting of solved models: annual summaries written to a workbook per scenario and, together
//! with raw variable values and dual prices, to the results database.
use crate::input::read_input_tables;
use crate::model::Model;
use crate::optimisation::Solution;
use crate::output::database::{IfExists, open_database, write_table};
use crate::output::spreadsheet::write_workbook;
use crate::table::{Cell, Table};
use anyhow::{Context, Result};
use log::info;
use std::fs;
use std::path::Path;

pub mod constants;
pub use constants::{Constants, get_constants, objective_costs};
pub mod summary;
use summary::{
    SCENARIO_COLUMN, annual_costs, process_summary, storage_summary, transmission_summary,
};
pub mod timeseries;
pub use timeseries::{Balance, Timeseries, get_timeseries};
pub mod transmission;
pub use transmission::get_transmissions;

/// The database holding a snapshot of the input data of every scenario
pub const INPUT_DATABASE_FILE_NAME: &str = "Input.db";

/// The database holding the results of every scenario
pub const RESULT_DATABASE_FILE_NAME: &str = "result.db";

/// The folder holding one workbook per scenario
pub const SCENARIO_DIR: &str = "Scenarios";

/// Constraints whose dual values are written to the results database
pub const DUAL_CONSTRAINTS: [&str; 4] = [
    "res_vertex",
    "res_env_total",
    "res_process_throughput_by_capacity",
    "res_transmission_input_by_capacity",
];

/// Annual results of a solved scenario
pub struct Report {
    /// Costs by type and installed capacities
    pub constants: Constants,
    /// Results per timestep
    pub timeseries: Timeseries,
    /// Capacity, generation and costs per year, site and process
    pub processes: Table,
    /// Capacity, flows and costs per year and line direction (if the model has transmission)
    pub transmissions: Option<Table>,
    /// Capacity and costs per year and storage (if the model has storage)
    pub storages: Option<Table>,
    /// Total costs per year and cost type
    pub costs: Table,
}

impl Report {
    /// The sheets of the scenario workbook
    fn sheets(&self) -> Vec<(&'static str, &Table)> {
        let mut sheets = vec![("Costs", &self.costs), ("Proc", &self.processes)];
        if let Some(transmissions) = &self.transmissions {
            sheets.push(("Trans", transmissions));
        }
        if let Some(storages) = &self.storages {
            sheets.push(("Storage caps", storages));
        }

        sheets
    }
}

/// Build the annual summaries of a solved model
pub fn build_report(model: &Model, solution: &Solution, scenario: &str) -> Report {
    let constants = get_constants(model, solution);
    let timeseries = get_timeseries(model, solution);
    let processes = process_summary(model, solution, &timeseries.balance, scenario);
    let transmissions = model
        .has_transmission()
        .then(|| transmission_summary(model, solution, scenario));
    let storages = model
        .has_storage()
        .then(|| storage_summary(model, solution, scenario));

    let mut summaries = vec![&processes];
    summaries.extend(transmissions.as_ref());
    summaries.extend(storages.as_ref());
    let costs = annual_costs(&summaries, scenario);

    Report {
        constants,
        timeseries,
        processes,
        transmissions,
        storages,
        costs,
    }
}

/// Append a snapshot of the input files of a model to a database, tagged with the scenario name
pub fn input_data_report(model_dir: &Path, file_path: &Path, scenario: &str) -> Result<()> {
    let mut conn = open_database(file_path)?;
    for (name, mut table) in read_input_tables(model_dir)? {
        if !table.is_empty() {
            table.push_constant_column(SCENARIO_COLUMN, &Cell::text(scenario));
        }
        write_table(&mut conn, name, &table, IfExists::Append)
            .with_context(|| format!("Failed to write snapshot of input table {name}"))?;
    }

    Ok(())
}

/// Write the input files of a model to a database, replacing any tables already there
pub fn export_input_tables(model_dir: &Path, file_path: &Path) -> Result<()> {
    let mut conn = open_database(file_path)?;
    for (name, table) in read_input_tables(model_dir)? {
        write_table(&mut conn, name, &table, IfExists::Replace)?;
    }
    info!("Input tables written to {}", file_path.display());

    Ok(())
}

/// The raw values of the variables written to the results database
fn variable_tables(solution: &Solution) -> [(&'static str, Table); 3] {
    let vars = &solution.variables;
    [
        (
            "e_co_stock",
            solution.variable_table("e_co_stock", &vars.e_co_stock),
        ),
        (
            "e_pro_in",
            solution.variable_table("e_pro_in", &vars.e_pro_in),
        ),
        (
            "e_pro_out",
            solution.variable_table("e_pro_out", &vars.e_pro_out),
        ),
    ]
}

/// Write the results of a solved scenario to `result_dir`.
///
/// The annual summaries go to `Scenarios/<scenario>.xlsx`, replacing any previous workbook for the
/// scenario. They are also appended to the results database along with the raw values of the
/// stock and process flow variables and the dual values of the balance, emission and capacity
/// constraints present in the model. If `input_report` is set, a snapshot of the input data is
/// appended to the input database too.
pub fn report(
    model: &Model,
    solution: &Solution,
    result_dir: &Path,
    scenario: &str,
    input_report: bool,
) -> Result<()> {
    if input_report {
        input_data_report(
            &model.model_path,
            &result_dir.join(INPUT_DATABASE_FILE_NAME),
            scenario,
        )?;
    }

    let report = build_report(model, solution, scenario);
    for row in report.constants.costs.rows() {
        info!("{scenario}: {} costs {}", row[0], row[1]);
    }

    let scenario_dir = result_dir.join(SCENARIO_DIR);
    fs::create_dir_all(&scenario_dir)
        .with_context(|| format!("Failed to create {}", scenario_dir.display()))?;
    write_workbook(
        &scenario_dir.join(format!("{scenario}.xlsx")),
        &report.sheets(),
    )?;

    let mut conn = open_database(&result_dir.join(RESULT_DATABASE_FILE_NAME))?;
    write_table(&mut conn, "Proc", &report.processes, IfExists::Append)?;
    write_table(&mut conn, "Cost", &report.costs, IfExists::Append)?;
    if let Some(transmissions) = &report.transmissions {
        write_table(&mut conn, "Trans", transmissions, IfExists::Append)?;
    }

    let scenario_cell = Cell::text(scenario);
    for (name, mut table) in variable_tables(solution) {
        table.insert_constant_column(0, SCENARIO_COLUMN, &scenario_cell);
        write_table(&mut conn, &format!("Var_{name}"), &table, IfExists::Append)?;
    }
    for name in DUAL_CONSTRAINTS {
        let Some(mut table) = solution.dual_table(name) else {
            continue;
        };
        table.insert_constant_column(0, SCENARIO_COLUMN, &scenario_cell);
        write_table(&mut conn, &format!("Dual_{name}"), &table, IfExists::Append)?;
    }
    info!("Results written to {}", result_dir.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{demo_model_dir, solved_model};
    use crate::output::database::read_table;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;
    use std::path::PathBuf;
    use tempfile::tempdir;

    #[rstest]
    fn test_build_report(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let report = build_report(&model, &solution, "base");

        assert!(report.transmissions.is_some());
        assert!(report.storages.is_some());
        assert_eq!(
            report
                .sheets()
                .iter()
                .map(|(name, _)| *name)
                .collect::<Vec<_>>(),
            ["Costs", "Proc", "Trans", "Storage caps"]
        );
        assert_approx_eq!(
            f64,
            report.costs.column_sum("Costs"),
            solution.objective_value(),
            epsilon = 1e-6 * solution.objective_value()
        );
    }

    #[rstest]
    fn test_report(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let dir = tempdir().unwrap();
        report(&model, &solution, dir.path(), "base", true).unwrap();
        report(&model, &solution, dir.path(), "high_co2", false).unwrap();

        assert!(dir.path().join(SCENARIO_DIR).join("base.xlsx").is_file());
        assert!(dir.path().join(SCENARIO_DIR).join("high_co2.xlsx").is_file());

        // Results of both scenarios are appended
        let conn = open_database(&dir.path().join(RESULT_DATABASE_FILE_NAME)).unwrap();
        let proc = read_table(&conn, "Proc").unwrap();
        let scenarios: Vec<_> = proc.column(SCENARIO_COLUMN).unwrap().collect();
        assert!(scenarios.contains(&&Cell::from("base")));
        assert!(scenarios.contains(&&Cell::from("high_co2")));

        let vertex = read_table(&conn, "Dual_res_vertex").unwrap();
        assert_eq!(vertex.columns()[0], SCENARIO_COLUMN);
        assert_eq!(
            vertex.len(),
            2 * solution.dual_table("res_vertex").unwrap().len()
        );
        for name in ["Cost", "Trans", "Var_e_co_stock", "Var_e_pro_in", "Var_e_pro_out"] {
            assert!(!read_table(&conn, name).unwrap().is_empty());
        }

        // Input snapshot only written for the first scenario
        let conn = open_database(&dir.path().join(INPUT_DATABASE_FILE_NAME)).unwrap();
        let sites = read_table(&conn, "Site").unwrap();
        assert!(
            sites
                .column(SCENARIO_COLUMN)
                .unwrap()
                .all(|cell| *cell == "base".into())
        );
    }

    #[rstest]
    fn test_export_input_tables(demo_model_dir: PathBuf) {
        let dir = tempdir().unwrap();
        let file_path = dir.path().join("inputs.db");
        export_input_tables(&demo_model_dir, &file_path).unwrap();
        export_input_tables(&demo_model_dir, &file_path).unwrap();

        let conn = open_database(&file_path).unwrap();
        let expected = Table::from_csv_path(&demo_model_dir.join("site.csv")).unwrap();
        assert_eq!(read_table(&conn, "Site").unwrap(), expected);
    }
}
