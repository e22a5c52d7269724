//! Processes convert input commodities into output commodities (e.g. power plants).
use crate::commodity::CommodityID;
use crate::id::define_id_type;
use crate::site::SiteID;
use crate::table::{Cell, IndexKey};
use indexmap::IndexMap;
use serde_string_enum::DeserializeLabeledStringEnum;

define_id_type! {ProcessID}

/// A map of [`Process`] parameters, keyed by year, site and process
pub type ProcessMap = IndexMap<ProcessKey, Process>;

/// Conversion ratios keyed by year, process and commodity
pub type ProcessRatioMap = IndexMap<(u32, ProcessID, CommodityID), f64>;

/// Identifies a process at a given site and support timeframe
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessKey {
    /// Support timeframe
    pub year: u32,
    /// Site where the process is located
    pub site: SiteID,
    /// The process
    pub process: ProcessID,
}

impl ProcessKey {
    /// Create a new [`ProcessKey`]
    pub fn new(year: u32, site: &SiteID, process: &ProcessID) -> Self {
        Self {
            year,
            site: site.clone(),
            process: process.clone(),
        }
    }

    /// The key of one of this process's commodity flows
    pub fn with_commodity(&self, commodity: &CommodityID) -> ProcessCommodityKey {
        ProcessCommodityKey {
            year: self.year,
            site: self.site.clone(),
            process: self.process.clone(),
            commodity: commodity.clone(),
        }
    }
}

impl IndexKey for ProcessKey {
    fn index_names() -> Vec<&'static str> {
        vec!["stf", "sit", "pro"]
    }

    fn index_cells(&self) -> Vec<Cell> {
        vec![
            self.year.into(),
            Cell::text(&self.site),
            Cell::text(&self.process),
        ]
    }
}

/// Identifies a commodity flow into or out of a process
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessCommodityKey {
    /// Support timeframe
    pub year: u32,
    /// Site where the process is located
    pub site: SiteID,
    /// The process
    pub process: ProcessID,
    /// The commodity flowing in or out
    pub commodity: CommodityID,
}

impl ProcessCommodityKey {
    /// The key of the process itself
    pub fn process_key(&self) -> ProcessKey {
        ProcessKey::new(self.year, &self.site, &self.process)
    }
}

impl IndexKey for ProcessCommodityKey {
    fn index_names() -> Vec<&'static str> {
        vec!["stf", "sit", "pro", "com"]
    }

    fn index_cells(&self) -> Vec<Cell> {
        vec![
            self.year.into(),
            Cell::text(&self.site),
            Cell::text(&self.process),
            Cell::text(&self.commodity),
        ]
    }
}

/// Parameters of a process at a given site and year
#[derive(Debug, Clone, PartialEq)]
pub struct Process {
    /// Capacity installed before the first support timeframe
    pub inst_cap: f64,
    /// Lower bound on total capacity
    pub cap_lo: f64,
    /// Upper bound on total capacity (infinite if unbounded)
    pub cap_up: f64,
    /// Investment cost per unit of new capacity
    pub inv_cost: f64,
    /// Fixed cost per unit of capacity per year
    pub fix_cost: f64,
    /// Variable cost per unit of throughput
    pub var_cost: f64,
    /// Weighted average cost of capital
    pub wacc: f64,
    /// Economic lifetime in years
    pub depreciation: u32,
    /// Maximum fraction of the year the process can run at full capacity
    pub cap_factor: f64,
}

/// Whether a commodity flows into or out of a process
#[derive(PartialEq, Eq, Clone, Copy, Debug, DeserializeLabeledStringEnum)]
pub enum FlowDirection {
    /// Consumed by the process
    #[string = "In"]
    In,
    /// Produced by the process
    #[string = "Out"]
    Out,
}

/// The input and output ratios of all processes
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ProcessFlows {
    /// Input commodity per unit of throughput
    pub r_in: ProcessRatioMap,
    /// Output commodity per unit of throughput
    pub r_out: ProcessRatioMap,
}

impl ProcessFlows {
    /// The ratios in the given direction
    pub fn ratios(&self, direction: FlowDirection) -> &ProcessRatioMap {
        match direction {
            FlowDirection::In => &self.r_in,
            FlowDirection::Out => &self.r_out,
        }
    }

    /// Iterate over the commodities flowing in the given direction for a process in a given year
    pub fn iter_commodities<'a>(
        &'a self,
        direction: FlowDirection,
        year: u32,
        process: &'a ProcessID,
    ) -> impl Iterator<Item = (&'a CommodityID, f64)> + 'a {
        self.ratios(direction)
            .iter()
            .filter(move |((y, p, _), _)| *y == year && p == process)
            .map(|((_, _, com), ratio)| (com, *ratio))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indexmap::indexmap;

    #[test]
    fn test_iter_commodities() {
        let flows = ProcessFlows {
            r_in: indexmap! {
                (2030, "Gas".into(), "NatGas".into()) => 2.0,
                (2035, "Gas".into(), "NatGas".into()) => 1.8,
            },
            r_out: indexmap! {
                (2030, "Gas".into(), "Elec".into()) => 1.0,
                (2030, "Gas".into(), "CO2".into()) => 0.4,
                (2030, "Coal".into(), "Elec".into()) => 1.0,
            },
        };

        let gas = ProcessID::new("Gas");
        let inputs: Vec<_> = flows
            .iter_commodities(FlowDirection::In, 2035, &gas)
            .collect();
        assert_eq!(inputs, [(&CommodityID::new("NatGas"), 1.8)]);

        let outputs: Vec<_> = flows
            .iter_commodities(FlowDirection::Out, 2030, &gas)
            .map(|(com, _)| com.to_string())
            .collect();
        assert_eq!(outputs, ["Elec", "CO2"]);
    }
}
