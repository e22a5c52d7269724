//! Storage holds a commodity at a site for later use (e.g. batteries, pumped hydro).
use crate::commodity::CommodityID;
use crate::id::define_id_type;
use crate::site::SiteID;
use crate::table::{Cell, IndexKey};
use indexmap::IndexMap;

define_id_type! {StorageID}

/// A map of [`Storage`] parameters, keyed by [`StorageKey`]
pub type StorageMap = IndexMap<StorageKey, Storage>;

/// Identifies a storage technology at a site in a given support timeframe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorageKey {
    /// Support timeframe
    pub year: u32,
    /// Site where the storage is located
    pub site: SiteID,
    /// The storage technology
    pub storage: StorageID,
    /// The commodity stored
    pub commodity: CommodityID,
}

impl IndexKey for StorageKey {
    fn index_names() -> Vec<&'static str> {
        vec!["stf", "sit", "sto", "com"]
    }

    fn index_cells(&self) -> Vec<Cell> {
        vec![
            self.year.into(),
            Cell::text(&self.site),
            Cell::text(&self.storage),
            Cell::text(&self.commodity),
        ]
    }
}

/// Parameters of a storage technology.
///
/// Suffix `c` refers to the energy content (capacity) and `p` to the charging/discharging power.
#[derive(Debug, Clone, PartialEq)]
pub struct Storage {
    pub inst_cap_c: f64,
    pub cap_lo_c: f64,
    pub cap_up_c: f64,
    pub inst_cap_p: f64,
    pub cap_lo_p: f64,
    pub cap_up_p: f64,
    /// Charging efficiency
    pub eff_in: f64,
    /// Discharging efficiency
    pub eff_out: f64,
    pub inv_cost_c: f64,
    pub inv_cost_p: f64,
    pub fix_cost_c: f64,
    pub fix_cost_p: f64,
    pub var_cost_c: f64,
    pub var_cost_p: f64,
    /// Weighted average cost of capital
    pub wacc: f64,
    /// Economic lifetime in years
    pub depreciation: u32,
    /// Initial and final state of charge as a fraction of capacity (free if absent)
    pub init: Option<f64>,
}
