//! Cost coefficients of the objective function.
//!
//! Each decision variable contributes to exactly one [`CostType`]. The same coefficients are used
//! to build the objective and to attribute costs to technologies when reporting, so the two always
//! agree.
use super::variables::Timed;
use crate::commodity::{Commodity, CommodityKey};
use crate::model::Model;
use crate::process::{Process, ProcessKey};
use crate::storage::{Storage, StorageKey};
use crate::transmission::{Transmission, TransmissionKey, direction_share};
use derive_more::Add;
use strum::{Display, EnumIter};

/// The categories in which costs are reported
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumIter)]
pub enum CostType {
    /// Annuities of new capacity
    Invest,
    /// Fixed costs of total capacity
    Fix,
    /// Variable costs of operation
    Var,
    /// Purchase of stock commodities
    Fuel,
}

/// Costs split by [`CostType`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Add)]
pub struct CostBreakdown {
    pub invest: f64,
    pub fix: f64,
    pub var: f64,
    pub fuel: f64,
}

impl CostBreakdown {
    /// The cost of the given type
    pub fn get(&self, cost_type: CostType) -> f64 {
        match cost_type {
            CostType::Invest => self.invest,
            CostType::Fix => self.fix,
            CostType::Var => self.var,
            CostType::Fuel => self.fuel,
        }
    }

    /// The sum of all cost types
    pub fn total(&self) -> f64 {
        self.invest + self.fix + self.var + self.fuel
    }
}

/// Cost per unit of new process capacity
pub fn process_invest(model: &Model, key: &ProcessKey, process: &Process) -> f64 {
    process.inv_cost
        * model
            .cost_factors
            .investment_factor(key.year, process.depreciation, process.wacc)
}

/// Cost per unit of total process capacity
pub fn process_fix(model: &Model, key: &ProcessKey, process: &Process) -> f64 {
    process.fix_cost * model.cost_factors.cost_factor(key.year)
}

/// Cost per unit of process throughput in one timestep
pub fn process_var(model: &Model, key: &ProcessKey, process: &Process) -> f64 {
    process.var_cost * model.weight() * model.cost_factors.cost_factor(key.year)
}

/// Cost per unit of stock commodity bought in one timestep
pub fn stock_fuel(model: &Model, key: &CommodityKey, commodity: &Commodity) -> f64 {
    commodity.price * model.weight() * model.cost_factors.cost_factor(key.year)
}

/// Cost per unit of new transmission capacity in one direction
pub fn transmission_invest(model: &Model, key: &TransmissionKey, tra: &Transmission) -> f64 {
    direction_share(&model.transmissions, key)
        * tra.inv_cost
        * model
            .cost_factors
            .investment_factor(key.year, tra.depreciation, tra.wacc)
}

/// Cost per unit of total transmission capacity in one direction
pub fn transmission_fix(model: &Model, key: &TransmissionKey, tra: &Transmission) -> f64 {
    direction_share(&model.transmissions, key)
        * tra.fix_cost
        * model.cost_factors.cost_factor(key.year)
}

/// Cost per unit exported through a line in one timestep
pub fn transmission_var(model: &Model, key: &TransmissionKey, tra: &Transmission) -> f64 {
    tra.var_cost * model.weight() * model.cost_factors.cost_factor(key.year)
}

/// Costs per unit of new storage capacity and power
pub fn storage_invest(model: &Model, key: &StorageKey, storage: &Storage) -> (f64, f64) {
    let factor = model
        .cost_factors
        .investment_factor(key.year, storage.depreciation, storage.wacc);
    (storage.inv_cost_c * factor, storage.inv_cost_p * factor)
}

/// Costs per unit of total storage capacity and power
pub fn storage_fix(model: &Model, key: &StorageKey, storage: &Storage) -> (f64, f64) {
    let factor = model.cost_factors.cost_factor(key.year);
    (storage.fix_cost_c * factor, storage.fix_cost_p * factor)
}

/// Costs per unit of storage content and per unit charged or discharged in one timestep
pub fn storage_var(model: &Model, key: &StorageKey, storage: &Storage) -> (f64, f64) {
    let factor = model.weight() * model.cost_factors.cost_factor(key.year);
    (storage.var_cost_c * factor, storage.var_cost_p * factor)
}

/// Cost per unit of storage content at a timestep.
///
/// The content at the initial timestep is free, as that timestep is not modelled.
pub fn storage_content_var(model: &Model, key: &Timed<StorageKey>, storage: &Storage) -> f64 {
    if key.t == model.initial_timestep() {
        0.0
    } else {
        storage_var(model, &key.key, storage).0
    }
}
