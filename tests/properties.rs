//! Checks that the solved demo model honours the regional constraints and that its reports are
//! consistent with the solution.
use calamine::{Reader, Xlsx, open_workbook};
use float_cmp::assert_approx_eq;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::tempdir;
use urbs_apg::commodity::CommodityID;
use urbs_apg::input::load_model;
use urbs_apg::model::Model;
use urbs_apg::optimisation::Solution;
use urbs_apg::output::database::{IfExists, open_database, read_table, write_table};
use urbs_apg::process::ProcessKey;
use urbs_apg::report::{build_report, get_transmissions, report};
use urbs_apg::scenario::solve_model;
use urbs_apg::table::Cell;

const TOLERANCE: f64 = 1e-6;

/// Get the path to the demo model.
fn get_model_dir() -> PathBuf {
    PathBuf::from("demos/simple")
}

fn solve_demo() -> (Model, Solution) {
    let model = load_model(get_model_dir()).unwrap();
    let solution = solve_model(&model).unwrap();
    (model, solution)
}

/// Total demand for electricity at the given sites in a year
fn elec_demand(model: &Model, year: u32, site: Option<&str>) -> f64 {
    let elec = CommodityID::new("Elec");
    model
        .site_tuples
        .iter()
        .filter(|(y, s)| *y == year && site.is_none_or(|site| s.as_str() == site))
        .map(|(_, s)| model.demand.total(s, &elec, year, model.timesteps()))
        .sum()
}

/// Total electricity output of processes in a year, for those matching a predicate
fn elec_output<F>(solution: &Solution, year: u32, mut predicate: F) -> f64
where
    F: FnMut(&ProcessKey) -> bool,
{
    solution
        .iter_values(&solution.variables.e_pro_out)
        .filter(|(key, _)| {
            let flow = &key.key;
            flow.year == year
                && flow.commodity.as_str() == "Elec"
                && predicate(&ProcessKey::new(flow.year, &flow.site, &flow.process))
        })
        .map(|(_, value)| value)
        .sum()
}

#[test]
fn test_constraint_properties() {
    let (model, solution) = solve_demo();
    let vars = &solution.variables;

    // No new solar capacity after 2030
    for (key, value) in solution.iter_values(&vars.cap_pro_new) {
        if key.year > 2030 && key.process.as_str() == "Solar" {
            assert!(value <= TOLERANCE, "New solar capacity in {}", key.year);
        }
    }

    for &year in &model.years {
        // Renewable output is at most half of total demand
        let vre = elec_output(&solution, year, |key| {
            matches!(key.process.as_str(), "Solar" | "Wind")
        });
        assert!(vre <= 0.5 * elec_demand(&model, year, None) + TOLERANCE);

        // North generates at least 60% of its own demand
        let domestic = elec_output(&solution, year, |key| key.site.as_str() == "North");
        assert!(domestic >= 0.6 * elec_demand(&model, year, Some("North")) - TOLERANCE);
    }

    // Tech group capacities lie within their bounds
    for (key, bounds) in &model.tech_group_bounds {
        let capacity: f64 = model.tech_groups[&key.techgroup]
            .iter()
            .map(|process| {
                solution.value(&vars.cap_pro, &ProcessKey::new(key.year, &key.site, process))
            })
            .sum();
        assert!(capacity >= bounds.cap_lo - TOLERANCE);
        assert!(capacity <= bounds.cap_up + TOLERANCE);
    }
}

#[test]
fn test_report_costs_sum_to_objective() {
    let (model, solution) = solve_demo();
    let report = build_report(&model, &solution, "base");

    assert_approx_eq!(
        f64,
        report.costs.column_sum("Costs"),
        solution.objective_value(),
        epsilon = TOLERANCE * solution.objective_value()
    );
    assert_approx_eq!(
        f64,
        report.constants.costs.column_sum("costs"),
        solution.objective_value(),
        epsilon = TOLERANCE * solution.objective_value()
    );
}

#[test]
fn test_workbook_sheets() {
    let (model, solution) = solve_demo();
    let dir = tempdir().unwrap();
    report(&model, &solution, dir.path(), "base", false).unwrap();

    let mut workbook: Xlsx<_> =
        open_workbook(dir.path().join("Scenarios").join("base.xlsx")).unwrap();
    assert_eq!(
        workbook.sheet_names(),
        ["Costs", "Proc", "Trans", "Storage caps"]
    );
    let proc = workbook.worksheet_range("Proc").unwrap();
    let header: Vec<_> = proc.rows().next().unwrap().iter().map(ToString::to_string).collect();
    assert_eq!(header[..3], ["Year", "Site", "Process"]);
    assert!(header.iter().any(|column| column == "Generation.Elec"));
}

#[test]
fn test_database_round_trip() {
    let (model, solution) = solve_demo();
    let report = build_report(&model, &solution, "base");

    let dir = tempdir().unwrap();
    let mut conn = open_database(&dir.path().join("result.db")).unwrap();
    write_table(&mut conn, "Proc", &report.processes, IfExists::Replace).unwrap();
    let read = read_table(&conn, "Proc").unwrap();

    assert_eq!(read.columns(), report.processes.columns());
    assert_eq!(read.len(), report.processes.len());
    for (expected, actual) in report.processes.rows().iter().zip(read.rows()) {
        for (expected, actual) in expected.iter().zip(actual) {
            match (expected, actual) {
                // Integers in a column with reals are widened
                (Cell::Int(e), Cell::Real(a)) => assert_approx_eq!(f64, *e as f64, *a),
                _ => assert_eq!(expected, actual),
            }
        }
    }
}

/// Copy the demo model without its transmission lines
fn copy_without_transmission(dest: &Path) {
    fs::create_dir(dest).unwrap();
    for entry in fs::read_dir(get_model_dir()).unwrap() {
        let path = entry.unwrap().path();
        if path.file_name().unwrap() != "transmission.csv" {
            fs::copy(&path, dest.join(path.file_name().unwrap())).unwrap();
        }
    }
}

#[test]
fn test_no_transmission() {
    let dir = tempdir().unwrap();
    let model_dir = dir.path().join("isolated");
    copy_without_transmission(&model_dir);

    let model = load_model(&model_dir).unwrap();
    assert!(!model.has_transmission());
    let solution = solve_model(&model).unwrap();

    let report = build_report(&model, &solution, "isolated");
    assert!(report.transmissions.is_none());

    let (net, flows) = get_transmissions(&model, &solution, &"Elec".into());
    assert!(net.is_empty());
    assert!(flows.is_empty());
}
