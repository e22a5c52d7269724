//! Transmission lines carry a commodity from one site to another.
use crate::commodity::CommodityID;
use crate::id::define_id_type;
use crate::site::SiteID;
use crate::table::{Cell, IndexKey};
use indexmap::IndexMap;

define_id_type! {TransmissionID}

/// A map of [`Transmission`] parameters, keyed by [`TransmissionKey`]
pub type TransmissionMap = IndexMap<TransmissionKey, Transmission>;

/// Identifies a directed transmission line in a given support timeframe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TransmissionKey {
    /// Support timeframe
    pub year: u32,
    /// Site the commodity is exported from
    pub site_in: SiteID,
    /// Site the commodity is imported into
    pub site_out: SiteID,
    /// The transmission technology
    pub transmission: TransmissionID,
    /// The commodity carried
    pub commodity: CommodityID,
}

impl TransmissionKey {
    /// The key of the same line in the opposite direction
    pub fn reverse(&self) -> Self {
        Self {
            year: self.year,
            site_in: self.site_out.clone(),
            site_out: self.site_in.clone(),
            transmission: self.transmission.clone(),
            commodity: self.commodity.clone(),
        }
    }
}

impl IndexKey for TransmissionKey {
    fn index_names() -> Vec<&'static str> {
        vec!["stf", "sit", "sit_", "tra", "com"]
    }

    fn index_cells(&self) -> Vec<Cell> {
        vec![
            self.year.into(),
            Cell::text(&self.site_in),
            Cell::text(&self.site_out),
            Cell::text(&self.transmission),
            Cell::text(&self.commodity),
        ]
    }
}

/// Parameters of a directed transmission line
#[derive(Debug, Clone, PartialEq)]
pub struct Transmission {
    /// Fraction of the exported commodity arriving at the destination
    pub eff: f64,
    /// Investment cost per unit of new capacity
    pub inv_cost: f64,
    /// Fixed cost per unit of capacity per year
    pub fix_cost: f64,
    /// Variable cost per unit transported
    pub var_cost: f64,
    /// Capacity installed before the first support timeframe
    pub inst_cap: f64,
    /// Lower bound on total capacity
    pub cap_lo: f64,
    /// Upper bound on total capacity
    pub cap_up: f64,
    /// Weighted average cost of capital
    pub wacc: f64,
    /// Economic lifetime in years
    pub depreciation: u32,
}

/// The share of a line's capacity costs attributed to one direction.
///
/// A line defined in both directions is a single physical asset, so each direction carries half
/// of its investment and fixed costs.
pub fn direction_share(transmissions: &TransmissionMap, key: &TransmissionKey) -> f64 {
    if transmissions.contains_key(&key.reverse()) {
        0.5
    } else {
        1.0
    }
}
