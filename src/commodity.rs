//! Commodities are the goods and energy carriers which flow through the energy system.
use crate::id::define_id_type;
use crate::site::SiteID;
use crate::table::{Cell, IndexKey};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;
use std::collections::HashMap;

define_id_type! {CommodityID}

/// A map of [`Commodity`] parameters, keyed by year, site and commodity
pub type CommodityMap = IndexMap<CommodityKey, Commodity>;

/// Identifies a commodity at a given site and support timeframe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommodityKey {
    /// Support timeframe
    pub year: u32,
    /// Site at which the commodity is defined
    pub site: SiteID,
    /// The commodity
    pub commodity: CommodityID,
}

impl CommodityKey {
    /// Create a new [`CommodityKey`]
    pub fn new(year: u32, site: &SiteID, commodity: &CommodityID) -> Self {
        Self {
            year,
            site: site.clone(),
            commodity: commodity.clone(),
        }
    }
}

impl IndexKey for CommodityKey {
    fn index_names() -> Vec<&'static str> {
        vec!["stf", "sit", "com"]
    }

    fn index_cells(&self) -> Vec<Cell> {
        vec![
            self.year.into(),
            Cell::text(&self.site),
            Cell::text(&self.commodity),
        ]
    }
}

/// The role a commodity plays in the commodity balance
#[derive(PartialEq, Eq, Clone, Copy, Debug, DeserializeLabeledStringEnum)]
pub enum CommodityType {
    /// Intermittent supply (e.g. solar irradiation), bounded by a time series
    #[string = "SupIm"]
    SupIm,
    /// Must be supplied to satisfy a demand time series
    #[string = "Demand"]
    Demand,
    /// Can be bought from outside the system at a price
    #[string = "Stock"]
    Stock,
    /// Environmental emission (e.g. CO2), may be capped
    #[string = "Env"]
    Env,
}

/// Parameters of a commodity at a given site and year
#[derive(Debug, Clone, PartialEq)]
pub struct Commodity {
    /// The commodity type
    pub kind: CommodityType,
    /// Purchase price per unit (stock commodities)
    pub price: f64,
    /// Maximum total amount per year (infinite if unbounded)
    pub max: f64,
    /// Maximum amount per hour (infinite if unbounded)
    pub max_per_hour: f64,
    /// Minimum share of demand which has to be generated at the site
    pub min_ratio: Option<f64>,
}

/// Time series values (demand or intermittent supply) keyed by site and commodity
#[derive(Debug, Clone, PartialEq, Default)]
pub struct TimeSeries(HashMap<(SiteID, CommodityID), HashMap<(u32, u32), f64>>);

impl TimeSeries {
    /// Add a value to the series for the given site and commodity
    pub fn insert(
        &mut self,
        site: SiteID,
        commodity: CommodityID,
        year: u32,
        timestep: u32,
        value: f64,
    ) -> Option<f64> {
        self.0
            .entry((site, commodity))
            .or_default()
            .insert((year, timestep), value)
    }

    /// Whether any values are defined for the given site and commodity
    pub fn contains(&self, site: &SiteID, commodity: &CommodityID) -> bool {
        self.0.contains_key(&(site.clone(), commodity.clone()))
    }

    /// Remove the whole series for a site and commodity
    pub fn remove(&mut self, site: &SiteID, commodity: &CommodityID) {
        self.0.remove(&(site.clone(), commodity.clone()));
    }

    /// The value at a particular year and timestep, zero if absent
    pub fn get(&self, site: &SiteID, commodity: &CommodityID, year: u32, timestep: u32) -> f64 {
        self.0
            .get(&(site.clone(), commodity.clone()))
            .and_then(|series| series.get(&(year, timestep)))
            .copied()
            .unwrap_or(0.0)
    }

    /// Sum of the values over the given timesteps
    pub fn total<I>(&self, site: &SiteID, commodity: &CommodityID, year: u32, timesteps: I) -> f64
    where
        I: IntoIterator<Item = u32>,
    {
        timesteps
            .into_iter()
            .map(|t| self.get(site, commodity, year, t))
            .sum()
    }

    /// Whether the series is empty
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_series() {
        let mut series = TimeSeries::default();
        let site: SiteID = "North".into();
        let com: CommodityID = "Elec".into();
        assert!(series.insert(site.clone(), com.clone(), 2030, 1, 10.0).is_none());
        series.insert(site.clone(), com.clone(), 2030, 2, 20.0);

        assert!(series.contains(&site, &com));
        assert!(!series.contains(&"South".into(), &com));
        assert_eq!(series.get(&site, &com, 2030, 2), 20.0);
        assert_eq!(series.get(&site, &com, 2035, 2), 0.0);
        assert_eq!(series.total(&site, &com, 2030, 1..=3), 30.0);
    }
}
