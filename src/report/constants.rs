//! Objective costs and installed capacities.
use crate::model::Model;
use crate::optimisation::costs::{self, CostBreakdown, CostType};
use crate::optimisation::{Solution, Timed, VariableFamily};
use crate::storage::StorageKey;
use crate::table::{Cell, IndexKey, Table};
use std::hash::Hash;
use strum::IntoEnumIterator;

/// Costs and capacities of a solved model
pub struct Constants {
    /// Total costs by cost type
    pub costs: Table,
    /// Total and new capacity of each process tuple
    pub cpro: Table,
    /// Total and new capacity of each transmission line
    pub ctra: Table,
    /// Total and new capacity and power of each storage
    pub csto: Table,
}

/// Sum of `coefficient(key) · value` over a family of variables
fn weighted_sum<K, F>(solution: &Solution, family: &VariableFamily<K>, mut coefficient: F) -> f64
where
    K: Eq + Hash,
    F: FnMut(&K) -> f64,
{
    solution
        .iter_values(family)
        .map(|(key, value)| coefficient(key) * value)
        .sum()
}

/// The objective value split by cost type
pub fn objective_costs(model: &Model, solution: &Solution) -> CostBreakdown {
    let vars = &solution.variables;

    let invest = weighted_sum(solution, &vars.cap_pro_new, |key| {
        costs::process_invest(model, key, &model.processes[key])
    }) + weighted_sum(solution, &vars.cap_tra_new, |key| {
        costs::transmission_invest(model, key, &model.transmissions[key])
    }) + weighted_sum(solution, &vars.cap_sto_c_new, |key| {
        costs::storage_invest(model, key, &model.storages[key]).0
    }) + weighted_sum(solution, &vars.cap_sto_p_new, |key| {
        costs::storage_invest(model, key, &model.storages[key]).1
    });

    let fix = weighted_sum(solution, &vars.cap_pro, |key| {
        costs::process_fix(model, key, &model.processes[key])
    }) + weighted_sum(solution, &vars.cap_tra, |key| {
        costs::transmission_fix(model, key, &model.transmissions[key])
    }) + weighted_sum(solution, &vars.cap_sto_c, |key| {
        costs::storage_fix(model, key, &model.storages[key]).0
    }) + weighted_sum(solution, &vars.cap_sto_p, |key| {
        costs::storage_fix(model, key, &model.storages[key]).1
    });

    let storage_power = |key: &Timed<StorageKey>| {
        costs::storage_var(model, &key.key, &model.storages[&key.key]).1
    };
    let var = weighted_sum(solution, &vars.tau_pro, |key| {
        costs::process_var(model, &key.key, &model.processes[&key.key])
    }) + weighted_sum(solution, &vars.e_tra_in, |key| {
        costs::transmission_var(model, &key.key, &model.transmissions[&key.key])
    }) + weighted_sum(solution, &vars.e_sto_con, |key| {
        costs::storage_content_var(model, key, &model.storages[&key.key])
    }) + weighted_sum(solution, &vars.e_sto_in, storage_power)
        + weighted_sum(solution, &vars.e_sto_out, storage_power);

    let fuel = weighted_sum(solution, &vars.e_co_stock, |key| {
        costs::stock_fuel(model, &key.key, &model.commodities[&key.key])
    });

    CostBreakdown {
        invest,
        fix,
        var,
        fuel,
    }
}

/// A table of the values of several variable families sharing a key, sorted by key
fn capacity_table<K>(
    solution: &Solution,
    index_names: &[&str],
    families: &[(&str, &VariableFamily<K>)],
) -> Table
where
    K: Eq + Hash + Ord + IndexKey,
{
    let mut columns = index_names.to_vec();
    columns.extend(families.iter().map(|(name, _)| *name));
    let mut table = Table::new(columns);

    let Some((_, first)) = families.first() else {
        return table;
    };
    let mut keys: Vec<_> = first.keys().collect();
    keys.sort();
    for key in keys {
        let mut row = key.index_cells();
        row.extend(
            families
                .iter()
                .map(|(_, family)| Cell::from(solution.value(family, key))),
        );
        table.push_row(row);
    }

    table
}

/// Get the total costs by type and the capacities of processes, transmission lines and storage
pub fn get_constants(model: &Model, solution: &Solution) -> Constants {
    let breakdown = objective_costs(model, solution);
    let mut costs = Table::new(["cost_type", "costs"]);
    for cost_type in CostType::iter() {
        costs.push_row(vec![Cell::text(cost_type), breakdown.get(cost_type).into()]);
    }

    let vars = &solution.variables;
    let cpro = capacity_table(
        solution,
        &["Year", "Site", "Process"],
        &[("Total", &vars.cap_pro), ("New", &vars.cap_pro_new)],
    );
    let ctra = capacity_table(
        solution,
        &["Year", "Site In", "Site Out", "Transmission", "Commodity"],
        &[("Total", &vars.cap_tra), ("New", &vars.cap_tra_new)],
    );
    let csto = capacity_table(
        solution,
        &["Year", "Site", "Storage", "Commodity"],
        &[
            ("C Total", &vars.cap_sto_c),
            ("C New", &vars.cap_sto_c_new),
            ("P Total", &vars.cap_sto_p),
            ("P New", &vars.cap_sto_p_new),
        ],
    );

    Constants {
        costs,
        cpro,
        ctra,
        csto,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::solved_model;
    use float_cmp::assert_approx_eq;
    use rstest::rstest;

    #[rstest]
    fn test_get_constants(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let constants = get_constants(&model, &solution);

        assert_approx_eq!(
            f64,
            constants.costs.column_sum("costs"),
            solution.objective_value(),
            epsilon = 1e-6 * solution.objective_value()
        );
        assert_eq!(constants.cpro.len(), model.processes.len());
        assert_eq!(
            constants.cpro.columns(),
            ["Year", "Site", "Process", "Total", "New"]
        );
        assert_eq!(constants.ctra.len(), model.transmissions.len());
        assert_eq!(constants.csto.columns().len(), 8);

        // Sorted by year first
        let years: Vec<_> = constants.cpro.column("Year").unwrap().collect();
        assert!(years.windows(2).all(|w| w[0].as_f64() <= w[1].as_f64()));
    }
}
