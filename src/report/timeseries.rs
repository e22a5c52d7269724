//! Timeseries of commodity creation, transmission and storage.
use crate::commodity::CommodityID;
use crate::model::Model;
use crate::optimisation::{Solution, Timed};
use crate::site::SiteID;
use crate::table::{Cell, IndexKey, Table};
use crate::transmission::TransmissionKey;
use indexmap::IndexSet;
use std::collections::{BTreeMap, BTreeSet};

/// Technology name for commodity arriving from other sites
pub const IMPORTS: &str = "imports";

/// Technology name for commodity sent to other sites
pub const EXPORTS: &str = "exports";

/// Technology name for commodity put into storage
pub const CHARGING: &str = "Storage(charging)";

/// Technology name for commodity taken out of storage
pub const DISCHARGING: &str = "Storage(discharging)";

/// Key of a row of a timeseries table: timestep, support timeframe, site and commodity
type SeriesKey = (u32, u32, SiteID, CommodityID);

/// Key of a row of an annual summary: support timeframe, site and technology
pub type AnnualKey = (u32, SiteID, String);

/// Amounts of each commodity created (positive) or removed (negative) per technology and
/// timestep.
///
/// Technologies are processes plus the pseudo-technologies for transmission and storage.
#[derive(Debug, Clone, Default)]
pub struct Balance {
    values: BTreeMap<SeriesKey, BTreeMap<String, f64>>,
    processes: BTreeSet<String>,
    pseudo: IndexSet<&'static str>,
}

impl Balance {
    fn add(&mut self, key: SeriesKey, technology: &str, value: f64) {
        *self
            .values
            .entry(key)
            .or_default()
            .entry(technology.to_string())
            .or_default() += value;
    }

    fn add_process(&mut self, key: SeriesKey, process: &str, value: f64) {
        self.processes.insert(process.to_string());
        self.add(key, process, value);
    }

    fn add_pseudo(&mut self, key: SeriesKey, technology: &'static str, value: f64) {
        self.pseudo.insert(technology);
        self.add(key, technology, value);
    }

    /// Whether there are no values
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Sum over timesteps, giving the amount of each commodity per support timeframe, site and
    /// technology
    pub fn annual(&self) -> BTreeMap<AnnualKey, BTreeMap<CommodityID, f64>> {
        let mut annual: BTreeMap<AnnualKey, BTreeMap<CommodityID, f64>> = BTreeMap::new();
        for ((_, year, site, commodity), by_tech) in &self.values {
            for (technology, value) in by_tech {
                *annual
                    .entry((*year, site.clone(), technology.clone()))
                    .or_default()
                    .entry(commodity.clone())
                    .or_default() += value;
            }
        }

        annual
    }

    /// A table with one column per technology, processes first, missing values as zero
    pub fn to_table(&self) -> Table {
        let technologies: Vec<&str> = self
            .processes
            .iter()
            .map(String::as_str)
            .chain(self.pseudo.iter().copied())
            .collect();
        let mut columns = vec!["t", "stf", "sit", "com"];
        columns.extend(&technologies);

        let mut table = Table::new(columns);
        for ((t, year, site, commodity), by_tech) in &self.values {
            let mut row = vec![
                (*t).into(),
                (*year).into(),
                Cell::text(site),
                Cell::text(commodity),
            ];
            row.extend(
                technologies
                    .iter()
                    .map(|tech| by_tech.get(*tech).copied().unwrap_or_default().into()),
            );
            table.push_row(row);
        }

        table
    }
}

/// Timeseries results of a solved model
pub struct Timeseries {
    /// Process output per timestep, one column per process
    pub created: Table,
    /// Flows, residual capacity and utilisation of each transmission line per timestep
    pub transmitted: Table,
    /// Storage level, charging and discharging per timestep, summed over storage technologies
    pub stored: Table,
    /// Process output joined with imports, exports and storage flows
    pub balance: Balance,
}

/// Get the timeseries results over the modelled timesteps
pub fn get_timeseries(model: &Model, solution: &Solution) -> Timeseries {
    let vars = &solution.variables;

    let mut balance = Balance::default();
    for (key, value) in solution.iter_values(&vars.e_pro_out) {
        let series = (key.t, key.key.year, key.key.site.clone(), key.key.commodity.clone());
        balance.add_process(series, key.key.process.as_str(), value);
    }
    let created = balance.to_table();

    for (key, value) in solution.iter_values(&vars.e_tra_out) {
        let series = (key.t, key.key.year, key.key.site_out.clone(), key.key.commodity.clone());
        balance.add_pseudo(series, IMPORTS, value);
    }
    for (key, value) in solution.iter_values(&vars.e_tra_in) {
        let series = (key.t, key.key.year, key.key.site_in.clone(), key.key.commodity.clone());
        balance.add_pseudo(series, EXPORTS, -value);
    }

    let mut stored: BTreeMap<SeriesKey, [f64; 3]> = BTreeMap::new();
    let timesteps = model.timesteps();
    for (key, level) in solution.iter_values(&vars.e_sto_con) {
        if !timesteps.contains(&key.t) {
            continue;
        }
        let series = (key.t, key.key.year, key.key.site.clone(), key.key.commodity.clone());
        let charging = solution.value(&vars.e_sto_in, key);
        let discharging = solution.value(&vars.e_sto_out, key);
        let entry = stored.entry(series.clone()).or_default();
        entry[0] += level;
        entry[1] += charging;
        entry[2] += discharging;
        balance.add_pseudo(series.clone(), CHARGING, -charging);
        balance.add_pseudo(series, DISCHARGING, discharging);
    }

    Timeseries {
        created,
        transmitted: transmitted_table(model, solution),
        stored: stored_table(&stored),
        balance,
    }
}

fn transmitted_table(model: &Model, solution: &Solution) -> Table {
    let vars = &solution.variables;
    let mut columns = Timed::<TransmissionKey>::index_names();
    columns.extend(["exported", "imported", "residue", "utilization"]);

    let mut table = Table::new(columns);
    for (key, exported) in solution.iter_values(&vars.e_tra_in) {
        let imported = solution.value(&vars.e_tra_out, key);
        let capacity = solution.value(&vars.cap_tra, &key.key) * model.dt();
        let utilization = (capacity > 0.0).then(|| exported / capacity);

        let mut row = key.index_cells();
        row.extend([
            exported.into(),
            imported.into(),
            (capacity - exported).into(),
            utilization.into(),
        ]);
        table.push_row(row);
    }

    table
}

fn stored_table(stored: &BTreeMap<SeriesKey, [f64; 3]>) -> Table {
    let mut table = Table::new(["t", "stf", "sit", "com", "Level", CHARGING, DISCHARGING]);
    for ((t, year, site, commodity), [level, charging, discharging]) in stored {
        table.push_row(vec![
            (*t).into(),
            (*year).into(),
            Cell::text(site),
            Cell::text(commodity),
            (*level).into(),
            (*charging).into(),
            (*discharging).into(),
        ]);
    }

    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::solved_model;
    use float_cmp::assert_approx_eq;
    use map_macro::btree_map;
    use rstest::rstest;

    #[test]
    fn test_balance_annual() {
        let mut balance = Balance::default();
        let north = SiteID::new("North");
        let elec = CommodityID::new("Elec");
        balance.add_process((1, 2030, north.clone(), elec.clone()), "Wind", 2.0);
        balance.add_process((2, 2030, north.clone(), elec.clone()), "Wind", 3.0);
        balance.add_pseudo((2, 2030, north.clone(), elec.clone()), EXPORTS, -1.0);

        let annual = balance.annual();
        assert_eq!(annual.len(), 2);
        assert_eq!(
            annual[&(2030, north.clone(), "Wind".to_string())],
            btree_map! {elec.clone() => 5.0}
        );
        assert_eq!(annual[&(2030, north, EXPORTS.to_string())][&elec], -1.0);

        let table = balance.to_table();
        assert_eq!(table.columns(), ["t", "stf", "sit", "com", "Wind", EXPORTS]);
        assert_eq!(table.rows()[0][5], Cell::Real(0.0));
    }

    #[rstest]
    fn test_get_timeseries(solved_model: (Model, Solution)) {
        let (model, solution) = solved_model;
        let timeseries = get_timeseries(&model, &solution);

        assert!(!timeseries.balance.is_empty());
        assert_eq!(
            timeseries.transmitted.len(),
            solution.variables.e_tra_in.len()
        );
        assert_eq!(
            timeseries.stored.columns()[4..],
            ["Level", CHARGING, DISCHARGING]
        );

        assert!(timeseries.created.column_index("Gas").is_some());

        // Imports in the balance match the flows arriving from transmission lines
        let imports: f64 = solution
            .iter_values(&solution.variables.e_tra_out)
            .map(|(_, v)| v)
            .sum();
        let annual_imports: f64 = timeseries
            .balance
            .annual()
            .iter()
            .filter(|((_, _, tech), _)| tech == IMPORTS)
            .flat_map(|(_, by_com)| by_com.values())
            .sum();
        assert_approx_eq!(f64, imports, annual_imports, epsilon = 1e-6);
    }
}
