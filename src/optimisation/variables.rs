//! The decision variables of the optimisation problem.
use super::Variable;
use super::costs;
use crate::commodity::{CommodityKey, CommodityType};
use crate::model::Model;
use crate::process::{FlowDirection, ProcessCommodityKey, ProcessKey};
use crate::storage::StorageKey;
use crate::table::{Cell, IndexKey, Table};
use crate::transmission::TransmissionKey;
use highs::RowProblem as Problem;
use indexmap::IndexMap;
use std::hash::Hash;
use std::ops::{Range, RangeInclusive};

/// A key qualified by a timestep
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timed<K> {
    /// The timestep
    pub t: u32,
    /// The rest of the key
    pub key: K,
}

impl<K> Timed<K> {
    /// Create a new [`Timed`] key
    pub fn new(t: u32, key: K) -> Self {
        Self { t, key }
    }
}

impl<K: IndexKey> IndexKey for Timed<K> {
    fn index_names() -> Vec<&'static str> {
        let mut names = vec!["t"];
        names.extend(K::index_names());
        names
    }

    fn index_cells(&self) -> Vec<Cell> {
        let mut cells = vec![self.t.into()];
        cells.extend(self.key.index_cells());
        cells
    }
}

/// A family of variables sharing a name, occupying a contiguous range of columns
pub struct VariableFamily<K> {
    vars: IndexMap<K, Variable>,
    columns: Range<usize>,
}

impl<K: Eq + Hash> VariableFamily<K> {
    /// Add one column per key to the problem.
    ///
    /// `column` gives the objective coefficient and bounds for each key.
    fn add<I, F>(problem: &mut Problem, keys: I, mut column: F) -> Self
    where
        I: IntoIterator<Item = K>,
        F: FnMut(&K) -> (f64, RangeInclusive<f64>),
    {
        let start = problem.num_cols();
        let mut vars = IndexMap::new();
        for key in keys {
            let (cost, bounds) = column(&key);
            let var = problem.add_column(cost, bounds);
            let existing = vars.insert(key, var).is_some();
            assert!(!existing, "Duplicate entry for var");
        }

        Self {
            vars,
            columns: start..problem.num_cols(),
        }
    }

    /// Get the variable for the given key, if there is one
    pub fn get(&self, key: &K) -> Option<Variable> {
        self.vars.get(key).copied()
    }

    /// Get the variable for the given key.
    ///
    /// # Panics
    ///
    /// If there is no variable for the key.
    pub fn var(&self, key: &K) -> Variable {
        *self.vars.get(key).expect("No variable found for given key")
    }

    /// Iterate over keys and variables
    pub fn iter(&self) -> impl Iterator<Item = (&K, Variable)> {
        self.vars.iter().map(|(key, var)| (key, *var))
    }

    /// Iterate over keys
    pub fn keys(&self) -> impl Iterator<Item = &K> {
        self.vars.keys()
    }

    /// Number of variables
    pub fn len(&self) -> usize {
        self.vars.len()
    }

    /// Whether the family has no variables
    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    /// Iterate over keys and their values in the solution
    pub(super) fn iter_values<'a>(
        &'a self,
        columns: &'a [f64],
    ) -> impl Iterator<Item = (&'a K, f64)> + 'a {
        assert!(
            self.columns.end <= columns.len(),
            "Bad variable family: columns out of range"
        );

        self.vars
            .keys()
            .zip(columns[self.columns.clone()].iter().copied())
    }

    /// The value of the variable for the given key in the solution
    pub(super) fn value(&self, columns: &[f64], key: &K) -> Option<f64> {
        self.vars
            .get_index_of(key)
            .map(|idx| columns[self.columns.start + idx])
    }
}

impl<K: Eq + Hash + IndexKey> VariableFamily<K> {
    /// Convert the values of the variables into a table with one column per index level
    pub(super) fn to_table(&self, name: &str, columns: &[f64]) -> Table {
        let mut names = K::index_names();
        names.push(name);
        let mut table = Table::new(names);
        for (key, value) in self.iter_values(columns) {
            let mut row = key.index_cells();
            row.push(value.into());
            table.push_row(row);
        }

        table
    }
}

/// One key per timestep for each of `keys`, ordered by timestep
fn timed<K: Clone>(timesteps: RangeInclusive<u32>, keys: &[K]) -> Vec<Timed<K>> {
    timesteps
        .flat_map(|t| keys.iter().cloned().map(move |key| Timed::new(t, key)))
        .collect()
}

/// Bounds for a non-negative variable with an optional upper limit
fn non_negative(upper: f64) -> RangeInclusive<f64> {
    0.0..=upper
}

/// All decision variables of the problem
pub struct VariableMap {
    /// Total process capacity
    pub cap_pro: VariableFamily<ProcessKey>,
    /// New process capacity
    pub cap_pro_new: VariableFamily<ProcessKey>,
    /// Process throughput
    pub tau_pro: VariableFamily<Timed<ProcessKey>>,
    /// Commodity consumed by processes
    pub e_pro_in: VariableFamily<Timed<ProcessCommodityKey>>,
    /// Commodity produced by processes
    pub e_pro_out: VariableFamily<Timed<ProcessCommodityKey>>,
    /// Stock commodity bought
    pub e_co_stock: VariableFamily<Timed<CommodityKey>>,
    /// Total transmission capacity
    pub cap_tra: VariableFamily<TransmissionKey>,
    /// New transmission capacity
    pub cap_tra_new: VariableFamily<TransmissionKey>,
    /// Commodity exported into a line
    pub e_tra_in: VariableFamily<Timed<TransmissionKey>>,
    /// Commodity arriving from a line
    pub e_tra_out: VariableFamily<Timed<TransmissionKey>>,
    /// Total storage capacity
    pub cap_sto_c: VariableFamily<StorageKey>,
    /// New storage capacity
    pub cap_sto_c_new: VariableFamily<StorageKey>,
    /// Total storage power
    pub cap_sto_p: VariableFamily<StorageKey>,
    /// New storage power
    pub cap_sto_p_new: VariableFamily<StorageKey>,
    /// Commodity charged into storage
    pub e_sto_in: VariableFamily<Timed<StorageKey>>,
    /// Commodity discharged from storage
    pub e_sto_out: VariableFamily<Timed<StorageKey>>,
    /// Storage content, including the initial timestep
    pub e_sto_con: VariableFamily<Timed<StorageKey>>,
}

impl VariableMap {
    /// Add all variables for the model to the problem
    pub fn new(problem: &mut Problem, model: &Model) -> Self {
        let timesteps = model.timesteps();
        let all_timesteps = model.initial_timestep()..=*timesteps.end();
        let process_keys: Vec<_> = model.processes.keys().cloned().collect();
        let transmission_keys: Vec<_> = model.transmissions.keys().cloned().collect();
        let storage_keys: Vec<_> = model.storages.keys().cloned().collect();

        // Processes
        let cap_pro = VariableFamily::add(problem, model.processes.keys().cloned(), |key| {
            let process = &model.processes[key];
            (
                costs::process_fix(model, key, process),
                process.cap_lo..=process.cap_up,
            )
        });
        let cap_pro_new = VariableFamily::add(problem, model.processes.keys().cloned(), |key| {
            let process = &model.processes[key];
            (
                costs::process_invest(model, key, process),
                non_negative(f64::INFINITY),
            )
        });
        let tau_pro = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &process_keys),
            |key| {
                let process = &model.processes[&key.key];
                (
                    costs::process_var(model, &key.key, process),
                    non_negative(f64::INFINITY),
                )
            },
        );
        let flow_keys = |direction| -> Vec<ProcessCommodityKey> {
            model
                .iter_process_flows(direction)
                .map(|(key, commodity, _)| key.with_commodity(commodity))
                .collect()
        };
        let e_pro_in = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &flow_keys(FlowDirection::In)),
            |_| (0.0, non_negative(f64::INFINITY)),
        );
        let e_pro_out = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &flow_keys(FlowDirection::Out)),
            |_| (0.0, non_negative(f64::INFINITY)),
        );

        // Stock commodities
        let stock_keys: Vec<_> = model
            .commodities
            .iter()
            .filter(|(_, commodity)| commodity.kind == CommodityType::Stock)
            .map(|(key, _)| key.clone())
            .collect();
        let e_co_stock = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &stock_keys),
            |key| {
                let commodity = &model.commodities[&key.key];
                (
                    costs::stock_fuel(model, &key.key, commodity),
                    non_negative(commodity.max_per_hour * model.dt()),
                )
            },
        );

        // Transmission
        let cap_tra = VariableFamily::add(problem, transmission_keys.clone(), |key| {
            let tra = &model.transmissions[key];
            (
                costs::transmission_fix(model, key, tra),
                tra.cap_lo..=tra.cap_up,
            )
        });
        let cap_tra_new = VariableFamily::add(problem, transmission_keys.clone(), |key| {
            let tra = &model.transmissions[key];
            (
                costs::transmission_invest(model, key, tra),
                non_negative(f64::INFINITY),
            )
        });
        let e_tra_in = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &transmission_keys),
            |key| {
                let tra = &model.transmissions[&key.key];
                (
                    costs::transmission_var(model, &key.key, tra),
                    non_negative(f64::INFINITY),
                )
            },
        );
        let e_tra_out = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &transmission_keys),
            |_| (0.0, non_negative(f64::INFINITY)),
        );

        // Storage
        let cap_sto_c = VariableFamily::add(problem, storage_keys.clone(), |key| {
            let storage = &model.storages[key];
            (
                costs::storage_fix(model, key, storage).0,
                storage.cap_lo_c..=storage.cap_up_c,
            )
        });
        let cap_sto_c_new = VariableFamily::add(problem, storage_keys.clone(), |key| {
            let storage = &model.storages[key];
            (
                costs::storage_invest(model, key, storage).0,
                non_negative(f64::INFINITY),
            )
        });
        let cap_sto_p = VariableFamily::add(problem, storage_keys.clone(), |key| {
            let storage = &model.storages[key];
            (
                costs::storage_fix(model, key, storage).1,
                storage.cap_lo_p..=storage.cap_up_p,
            )
        });
        let cap_sto_p_new = VariableFamily::add(problem, storage_keys.clone(), |key| {
            let storage = &model.storages[key];
            (
                costs::storage_invest(model, key, storage).1,
                non_negative(f64::INFINITY),
            )
        });
        let storage_power_cost = |key: &Timed<StorageKey>| {
            let storage = &model.storages[&key.key];
            (
                costs::storage_var(model, &key.key, storage).1,
                non_negative(f64::INFINITY),
            )
        };
        let e_sto_in = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &storage_keys),
            storage_power_cost,
        );
        let e_sto_out = VariableFamily::add(
            problem,
            timed(timesteps.clone(), &storage_keys),
            storage_power_cost,
        );
        let e_sto_con = VariableFamily::add(
            problem,
            timed(all_timesteps, &storage_keys),
            |key| {
                let storage = &model.storages[&key.key];
                (
                    costs::storage_content_var(model, key, storage),
                    non_negative(f64::INFINITY),
                )
            },
        );

        Self {
            cap_pro,
            cap_pro_new,
            tau_pro,
            e_pro_in,
            e_pro_out,
            e_co_stock,
            cap_tra,
            cap_tra_new,
            e_tra_in,
            e_tra_out,
            cap_sto_c,
            cap_sto_c_new,
            cap_sto_p,
            cap_sto_p_new,
            e_sto_in,
            e_sto_out,
            e_sto_con,
        }
    }
}
