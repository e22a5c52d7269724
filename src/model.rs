//! The static data describing an energy system model.
use crate::commodity::{CommodityID, CommodityKey, CommodityMap, CommodityType, TimeSeries};
use crate::finance::CostFactors;
use crate::process::{FlowDirection, ProcessFlows, ProcessKey, ProcessMap};
use crate::site::{SiteID, SiteTupleSet};
use crate::storage::StorageMap;
use crate::techgroup::{TechGroupBoundsMap, TechGroupMap};
use crate::transmission::TransmissionMap;
use indexmap::{IndexMap, IndexSet};
use std::ops::RangeInclusive;
use std::path::PathBuf;

pub mod parameters;
pub use parameters::{CustomConstraintParameters, ModelParameters};

/// Number of hours in a year
pub const HOURS_PER_YEAR: f64 = 8760.0;

/// Model-wide properties from the global properties table
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalProperties {
    /// Discount rate used to discount costs to the first support timeframe
    pub discount_rate: f64,
    /// Number of years represented by the last support timeframe
    pub last_year_weight: u32,
    /// Limit on total CO2 emissions across all sites, per support timeframe
    pub co2_limits: IndexMap<u32, f64>,
}

/// Model definition
pub struct Model {
    /// Path to the model folder
    pub model_path: PathBuf,
    /// Parameters from the model file
    pub parameters: ModelParameters,
    /// Model-wide properties
    pub global: GlobalProperties,
    /// Discounting and annuity factors per support timeframe
    pub cost_factors: CostFactors,
    /// Support timeframes, sorted
    pub years: Vec<u32>,
    /// All sites
    pub sites: IndexSet<SiteID>,
    /// The sites defined in each support timeframe
    pub site_tuples: SiteTupleSet,
    /// Commodities
    pub commodities: CommodityMap,
    /// Processes
    pub processes: ProcessMap,
    /// Process input and output ratios
    pub flows: ProcessFlows,
    /// Demand time series
    pub demand: TimeSeries,
    /// Intermittent supply time series
    pub supim: TimeSeries,
    /// Transmission lines (empty if none)
    pub transmissions: TransmissionMap,
    /// Storage technologies (empty if none)
    pub storages: StorageMap,
    /// Technology group membership (empty if none)
    pub tech_groups: TechGroupMap,
    /// Technology group capacity bounds
    pub tech_group_bounds: TechGroupBoundsMap,
}

impl Model {
    /// The modelled timesteps, excluding the initial timestep
    pub fn timesteps(&self) -> RangeInclusive<u32> {
        self.parameters.timesteps()
    }

    /// The initial timestep, which only carries storage state
    pub fn initial_timestep(&self) -> u32 {
        self.parameters.start_timestep
    }

    /// Length of a timestep in hours
    pub fn dt(&self) -> f64 {
        self.parameters.dt
    }

    /// Factor scaling the modelled hours to a full year
    pub fn weight(&self) -> f64 {
        let hours = f64::from(self.timesteps().count() as u32) * self.dt();
        HOURS_PER_YEAR / hours
    }

    /// Whether more than one support timeframe is modelled
    pub fn is_intertemporal(&self) -> bool {
        self.cost_factors.is_intertemporal()
    }

    /// Whether any transmission lines are defined
    pub fn has_transmission(&self) -> bool {
        !self.transmissions.is_empty()
    }

    /// Whether any storage technologies are defined
    pub fn has_storage(&self) -> bool {
        !self.storages.is_empty()
    }

    /// The IDs of all commodities of the given type, in input order
    pub fn commodity_ids_of_type(&self, kind: CommodityType) -> IndexSet<CommodityID> {
        self.commodities
            .iter()
            .filter(|(_, commodity)| commodity.kind == kind)
            .map(|(key, _)| key.commodity.clone())
            .collect()
    }

    /// The type of a commodity at a given site and year
    pub fn commodity_type(&self, key: &CommodityKey) -> Option<CommodityType> {
        self.commodities.get(key).map(|commodity| commodity.kind)
    }

    /// Iterate over every commodity flow of every process tuple in the given direction
    pub fn iter_process_flows(
        &self,
        direction: FlowDirection,
    ) -> impl Iterator<Item = (&ProcessKey, &CommodityID, f64)> {
        self.processes.keys().flat_map(move |key| {
            self.flows
                .iter_commodities(direction, key.year, &key.process)
                .map(move |(commodity, ratio)| (key, commodity, ratio))
        })
    }
}
