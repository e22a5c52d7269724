//! Annual summary tables for processes, transmission lines and storage, and the annual costs
//! derived from them.
use super::timeseries::{AnnualKey, Balance};
use crate::commodity::{CommodityID, CommodityKey, CommodityType};
use crate::model::Model;
use crate::optimisation::Solution;
use crate::optimisation::costs::{self, CostBreakdown, CostType};
use crate::table::{Cell, Table};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use strum::IntoEnumIterator;

/// Name of the column holding the scenario name
pub const SCENARIO_COLUMN: &str = "Scenario";

/// Name of the column holding the support timeframe
pub const YEAR_COLUMN: &str = "Year";

/// Name of the summary column for a cost type
pub fn cost_column(cost_type: CostType) -> String {
    format!("Cost.{cost_type}")
}

/// One cell per cost type; types listed in `missing` are null
fn cost_cells(costs: &CostBreakdown, missing: &[CostType]) -> Vec<Cell> {
    CostType::iter()
        .map(|cost_type| {
            if missing.contains(&cost_type) {
                Cell::Null
            } else {
                costs.get(cost_type).into()
            }
        })
        .collect()
}

#[derive(Default)]
struct ProcessRow {
    capacity: Option<(f64, f64)>,
    costs: CostBreakdown,
}

/// Annual summary per (year, site, technology).
///
/// Technologies are the processes plus the imports, exports and storage pseudo-technologies from
/// the balance. Pseudo-technologies have no capacity and no costs. A cost column is null
/// throughout if the results it is computed from are empty; for fuel costs these are the inputs of
/// stock commodities.
pub fn process_summary(
    model: &Model,
    solution: &Solution,
    balance: &Balance,
    scenario: &str,
) -> Table {
    let vars = &solution.variables;
    let mut rows: BTreeMap<AnnualKey, ProcessRow> = BTreeMap::new();

    for (key, total) in solution.iter_values(&vars.cap_pro) {
        let process = &model.processes[key];
        let new = solution.value(&vars.cap_pro_new, key);
        let row = rows
            .entry((key.year, key.site.clone(), key.process.to_string()))
            .or_default();
        row.capacity = Some((total, new));
        row.costs.invest += new * costs::process_invest(model, key, process);
        row.costs.fix += total * costs::process_fix(model, key, process);
    }
    for (key, tau) in solution.iter_values(&vars.tau_pro) {
        let process = &model.processes[&key.key];
        rows.entry((key.key.year, key.key.site.clone(), key.key.process.to_string()))
            .or_default()
            .costs
            .var += tau * costs::process_var(model, &key.key, process);
    }

    let mut has_stock_inputs = false;
    for (key, flow) in solution.iter_values(&vars.e_pro_in) {
        let com = CommodityKey::new(key.key.year, &key.key.site, &key.key.commodity);
        let Some(commodity) = model.commodities.get(&com) else {
            continue;
        };
        if commodity.kind != CommodityType::Stock {
            continue;
        }

        has_stock_inputs = true;
        rows.entry((key.key.year, key.key.site.clone(), key.key.process.to_string()))
            .or_default()
            .costs
            .fuel += flow * costs::stock_fuel(model, &com, commodity);
    }

    let generation = balance.annual();
    for key in generation.keys() {
        rows.entry(key.clone()).or_default();
    }
    let commodities: BTreeSet<&CommodityID> =
        generation.values().flat_map(|by_com| by_com.keys()).collect();

    let mut missing = Vec::new();
    if vars.cap_pro.is_empty() {
        missing.extend([CostType::Invest, CostType::Fix]);
    }
    if vars.tau_pro.is_empty() {
        missing.push(CostType::Var);
    }
    if !has_stock_inputs {
        missing.push(CostType::Fuel);
    }

    let mut columns: Vec<String> = [
        YEAR_COLUMN,
        "Site",
        "Process",
        "Capacity.Total",
        "Capacity.New",
    ]
    .map(String::from)
    .into();
    columns.extend(commodities.iter().map(|com| format!("Generation.{com}")));
    columns.extend(CostType::iter().map(cost_column));
    columns.push(SCENARIO_COLUMN.into());

    let mut table = Table::new(columns);
    for (key, row) in &rows {
        let (year, site, technology) = key;
        let mut cells = vec![(*year).into(), Cell::text(site), Cell::text(technology)];
        let (total, new) = row.capacity.unzip();
        cells.extend([total.into(), new.into()]);
        let by_com = generation.get(key);
        cells.extend(commodities.iter().map(|com| {
            by_com
                .and_then(|by_com| by_com.get(*com))
                .copied()
                .unwrap_or_default()
                .into()
        }));
        cells.extend(cost_cells(&row.costs, &missing));
        cells.push(scenario.into());
        table.push_row(cells);
    }

    table
}

/// Annual summary per transmission line and direction.
///
/// Each line is identified by its two sites in alphabetical order (`site1`, `site2`) and a
/// direction, 0 for flows from `site1` to `site2` and 1 otherwise. Investment and fixed costs are
/// split equally between the two directions.
pub fn transmission_summary(model: &Model, solution: &Solution, scenario: &str) -> Table {
    let vars = &solution.variables;
    let mut flows: HashMap<_, (f64, f64)> = HashMap::new();
    for (key, exported) in solution.iter_values(&vars.e_tra_in) {
        let imported = solution.value(&vars.e_tra_out, key);
        let entry = flows.entry(&key.key).or_default();
        entry.0 += exported;
        entry.1 += imported;
    }

    let hours = model.dt() * model.timesteps().count() as f64;
    let mut rows = Vec::new();
    for (key, total) in solution.iter_values(&vars.cap_tra) {
        let tra = &model.transmissions[key];
        let new = solution.value(&vars.cap_tra_new, key);
        let (exported, imported) = flows.get(key).copied().unwrap_or_default();
        let utilization = (total > 0.0).then(|| exported / (total * hours));
        let costs = CostBreakdown {
            invest: new * costs::transmission_invest(model, key, tra),
            fix: total * costs::transmission_fix(model, key, tra),
            var: exported * costs::transmission_var(model, key, tra),
            fuel: 0.0,
        };

        let (site1, site2, direction) = if key.site_in < key.site_out {
            (&key.site_in, &key.site_out, 0)
        } else {
            (&key.site_out, &key.site_in, 1)
        };
        let sort_key = (
            key.year,
            site1.clone(),
            site2.clone(),
            direction,
            key.transmission.clone(),
            key.commodity.clone(),
        );

        let mut cells = vec![
            key.year.into(),
            Cell::text(site1),
            Cell::text(site2),
            Cell::Int(direction),
            Cell::text(&key.site_in),
            Cell::text(&key.site_out),
            Cell::text(&key.transmission),
            Cell::text(&key.commodity),
            total.into(),
            new.into(),
            exported.into(),
            imported.into(),
            (total * hours - exported).into(),
            utilization.into(),
        ];
        cells.extend(cost_cells(&costs, &[]));
        cells.push(scenario.into());
        rows.push((sort_key, cells));
    }
    rows.sort_by(|a, b| a.0.cmp(&b.0));

    let mut columns: Vec<String> = [
        YEAR_COLUMN,
        "site1",
        "site2",
        "Direction",
        "From",
        "To",
        "Transmission",
        "Commodity",
        "Capacity.Total",
        "Capacity.New",
        "Transmission.exported",
        "Transmission.imported",
        "Transmission.residue",
        "utilization",
    ]
    .map(String::from)
    .into();
    columns.extend(CostType::iter().map(cost_column));
    columns.push(SCENARIO_COLUMN.into());

    let mut table = Table::new(columns);
    for (_, cells) in rows {
        table.push_row(cells);
    }

    table
}

/// Annual summary per storage: capacities, power and costs
pub fn storage_summary(model: &Model, solution: &Solution, scenario: &str) -> Table {
    let vars = &solution.variables;
    let mut var_costs: HashMap<_, f64> = HashMap::new();
    for (key, level) in solution.iter_values(&vars.e_sto_con) {
        let storage = &model.storages[&key.key];
        *var_costs.entry(&key.key).or_default() +=
            level * costs::storage_content_var(model, key, storage);
    }
    for (key, charged) in solution.iter_values(&vars.e_sto_in) {
        let storage = &model.storages[&key.key];
        let discharged = solution.value(&vars.e_sto_out, key);
        *var_costs.entry(&key.key).or_default() +=
            (charged + discharged) * costs::storage_var(model, &key.key, storage).1;
    }

    let mut columns: Vec<String> = [
        YEAR_COLUMN,
        "Site",
        "Storage",
        "Commodity",
        "C Total",
        "C New",
        "P Total",
        "P New",
    ]
    .map(String::from)
    .into();
    columns.extend(CostType::iter().map(cost_column));
    columns.push(SCENARIO_COLUMN.into());

    let mut keys: Vec<_> = vars.cap_sto_c.keys().collect();
    keys.sort();

    let mut table = Table::new(columns);
    for key in keys {
        let storage = &model.storages[key];
        let c_total = solution.value(&vars.cap_sto_c, key);
        let c_new = solution.value(&vars.cap_sto_c_new, key);
        let p_total = solution.value(&vars.cap_sto_p, key);
        let p_new = solution.value(&vars.cap_sto_p_new, key);
        let (invest_c, invest_p) = costs::storage_invest(model, key, storage);
        let (fix_c, fix_p) = costs::storage_fix(model, key, storage);
        let costs = CostBreakdown {
            invest: c_new * invest_c + p_new * invest_p,
            fix: c_total * fix_c + p_total * fix_p,
            var: var_costs.get(key).copied().unwrap_or_default(),
            fuel: 0.0,
        };

        let mut cells = vec![
            key.year.into(),
            Cell::text(&key.site),
            Cell::text(&key.storage),
            Cell::text(&key.commodity),
            c_total.into(),
            c_new.into(),
            p_total.into(),
            p_new.into(),
        ];
        cells.extend(cost_cells(&costs, &[]));
        cells.push(scenario.into());
        table.push_row(cells);
    }

    table
}

/// Total costs per year and cost type, summed over the cost columns of the given summaries.
///
/// Null costs count as zero.
pub fn annual_costs(summaries: &[&Table], scenario: &str) -> Table {
    let mut costs: BTreeMap<(i64, CostType), f64> = BTreeMap::new();
    for summary in summaries {
        let Some(year_idx) = summary.column_index(YEAR_COLUMN) else {
            continue;
        };

        for cost_type in CostType::iter() {
            let Some(idx) = summary.column_index(&cost_column(cost_type)) else {
                continue;
            };

            for row in summary.rows() {
                let Cell::Int(year) = row[year_idx] else {
                    continue;
                };
                *costs.entry((year, cost_type)).or_default() +=
                    row[idx].as_f64().unwrap_or_default();
            }
        }
    }

    let mut table = Table::new([YEAR_COLUMN, "Type", "Costs", SCENARIO_COLUMN]);
    for ((year, cost_type), value) in costs {
        table.push_row(vec![
            year.into(),
            Cell::text(cost_type),
            value.into(),
            scenario.into(),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{model, solved_model};
    use crate::optimisation::OptimisationModel;
    use crate::report::timeseries::{EXPORTS, IMPORTS, get_timeseries};
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[test]
    fn test_cost_cells() {
        let costs = CostBreakdown {
            invest: 1.0,
            fix: 2.0,
            var: 3.0,
            fuel: 4.0,
        };
        assert_eq!(
            cost_cells(&costs, &[CostType::Fix]),
            [Cell::Real(1.0), Cell::Null, Cell::Real(3.0), Cell::Real(4.0)]
        );
    }

    #[test]
    fn test_annual_costs() {
        let mut proc = Table::new([YEAR_COLUMN, "Cost.Invest", "Cost.Fuel"]);
        proc.push_row(vec![2030.into(), 1.0.into(), Cell::Null]);
        proc.push_row(vec![2030.into(), 2.0.into(), 5.0.into()]);
        let mut trans = Table::new([YEAR_COLUMN, "Cost.Invest"]);
        trans.push_row(vec![2035.into(), 4.0.into()]);

        let costs = annual_costs(&[&proc, &trans], "base");
        assert_eq!(
            costs.rows(),
            [
                vec![2030.into(), "Invest".into(), 3.0.into(), "base".into()],
                vec![2030.into(), "Fuel".into(), 5.0.into(), "base".into()],
                vec![2035.into(), "Invest".into(), 4.0.into(), "base".into()],
            ]
        );
    }

    #[rstest]
    fn test_process_summary(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let timeseries = get_timeseries(&model, &solution);
        let proc = process_summary(&model, &solution, &timeseries.balance, "base");

        // One row per process tuple plus the imports and exports of each site and year
        let n_pseudo = proc
            .column("Process")
            .unwrap()
            .filter(|cell| matches!(cell, Cell::Text(t) if t == IMPORTS || t == EXPORTS))
            .count();
        assert!(n_pseudo > 0);
        assert!(proc.len() >= model.processes.len() + n_pseudo);
        assert!(proc.column_index("Generation.Elec").is_some());
        assert!(proc.column_index("Generation.CO2").is_some());

        // Pseudo-technologies have no capacity
        let process_idx = proc.column_index("Process").unwrap();
        let capacity_idx = proc.column_index("Capacity.Total").unwrap();
        for row in proc.rows() {
            if row[process_idx] == Cell::text(IMPORTS) {
                assert!(row[capacity_idx].is_null());
            }
        }

        assert!(proc.column("Scenario").unwrap().all(|cell| *cell == "base".into()));
    }

    /// The cost columns of a process summary
    fn cost_columns(proc: &Table) -> BTreeMap<CostType, Vec<Cell>> {
        CostType::iter()
            .map(|cost_type| {
                let cells = proc.column(&cost_column(cost_type)).unwrap().cloned();
                (cost_type, cells.collect())
            })
            .collect()
    }

    #[rstest]
    fn test_process_summary_without_processes(mut model: Model) {
        model.processes.clear();
        model.demand = Default::default();
        model.tech_groups.clear();
        model.tech_group_bounds.clear();
        let solution = OptimisationModel::new(&model).solve().unwrap();
        let timeseries = get_timeseries(&model, &solution);
        let proc = process_summary(&model, &solution, &timeseries.balance, "base");

        // Only the pseudo-technologies remain and every cost column is a placeholder
        assert_eq!(proc.len(), timeseries.balance.annual().len());
        for (cost_type, cells) in cost_columns(&proc) {
            assert_eq!(cells.len(), proc.len());
            assert!(cells.iter().all(Cell::is_null), "Cost.{cost_type} is not null");
        }
    }

    #[rstest]
    fn test_process_summary_without_stock_inputs(mut model: Model) {
        // Only the intermittent processes are left, which have no fuel
        model
            .processes
            .retain(|key, _| matches!(key.process.as_str(), "Solar" | "Wind"));
        model.tech_groups.clear();
        model.tech_group_bounds.clear();
        let solution = OptimisationModel::new(&model).solve().unwrap();
        assert!(!solution.variables.e_pro_in.is_empty());
        let timeseries = get_timeseries(&model, &solution);
        let proc = process_summary(&model, &solution, &timeseries.balance, "base");

        let columns = cost_columns(&proc);
        assert!(columns[&CostType::Fuel].iter().all(Cell::is_null));
        for cost_type in [CostType::Invest, CostType::Fix, CostType::Var] {
            assert!(!columns[&cost_type].iter().all(Cell::is_null));
        }
    }

    #[rstest]
    fn test_costs_match_objective(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let timeseries = get_timeseries(&model, &solution);
        let proc = process_summary(&model, &solution, &timeseries.balance, "base");
        let trans = transmission_summary(&model, &solution, "base");
        let storage = storage_summary(&model, &solution, "base");

        let costs = annual_costs(&[&proc, &trans, &storage], "base");
        assert_eq!(costs.len(), model.years.len() * CostType::iter().count());
        assert_approx_eq!(
            f64,
            costs.column_sum("Costs"),
            solution.objective_value(),
            epsilon = 1e-6 * solution.objective_value()
        );
    }

    #[rstest]
    fn test_transmission_summary(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let trans = transmission_summary(&model, &solution, "base");
        assert_eq!(trans.len(), model.transmissions.len());

        let site1 = trans.column_index("site1").unwrap();
        let site2 = trans.column_index("site2").unwrap();
        let direction = trans.column_index("Direction").unwrap();
        let from = trans.column_index("From").unwrap();
        for row in trans.rows() {
            assert!(row[site1].to_string() < row[site2].to_string());
            let expected_from = if row[direction] == Cell::Int(0) {
                &row[site1]
            } else {
                &row[site2]
            };
            assert_eq!(&row[from], expected_from);
        }
    }

    #[rstest]
    fn test_storage_summary(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let storage = storage_summary(&model, &solution, "base");
        assert_eq!(storage.len(), model.storages.len());
        assert_eq!(storage.column_sum("Cost.Fuel"), 0.0);
    }
}
