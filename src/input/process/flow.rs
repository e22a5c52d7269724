//! Code for reading the process commodity flows file
use super::super::*;
use crate::commodity::{CommodityID, CommodityKey, CommodityMap};
use crate::id::IDCollection;
use crate::process::{FlowDirection, ProcessFlows, ProcessID, ProcessMap};
use serde::Deserialize;
use std::collections::HashSet;

/// Name of the process commodity flows file
pub const PROCESS_COMMODITY_FILE_NAME: &str = "process_commodity.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ProcessCommodityRaw {
    support_timeframe: u32,
    process: String,
    commodity: String,
    direction: FlowDirection,
    ratio: f64,
}

/// Read process input and output ratios.
///
/// Every flow commodity must be defined at each site where the process is located.
pub fn read_process_flows(
    model_dir: &Path,
    processes: &ProcessMap,
    commodities: &CommodityMap,
) -> Result<ProcessFlows> {
    let file_path = model_dir.join(PROCESS_COMMODITY_FILE_NAME);
    let flows_csv = read_csv(&file_path)?;
    read_process_flows_from_iter(flows_csv, processes, commodities)
        .with_context(|| input_err_msg(&file_path))
}

fn read_process_flows_from_iter<I>(
    iter: I,
    processes: &ProcessMap,
    commodities: &CommodityMap,
) -> Result<ProcessFlows>
where
    I: Iterator<Item = ProcessCommodityRaw>,
{
    let process_ids: HashSet<ProcessID> =
        processes.keys().map(|key| key.process.clone()).collect();
    let commodity_ids: HashSet<CommodityID> = commodities
        .keys()
        .map(|key| key.commodity.clone())
        .collect();

    let mut flows = ProcessFlows::default();
    for raw in iter {
        let process = process_ids.get_id_by_str(&raw.process)?;
        let commodity = commodity_ids.get_id_by_str(&raw.commodity)?;
        ensure!(
            raw.ratio.is_finite() && raw.ratio > 0.0,
            "Invalid ratio ({}) for process {process} and commodity {commodity}",
            raw.ratio
        );

        let ratios = match raw.direction {
            FlowDirection::In => &mut flows.r_in,
            FlowDirection::Out => &mut flows.r_out,
        };
        ensure!(
            ratios
                .insert(
                    (raw.support_timeframe, process.clone(), commodity.clone()),
                    raw.ratio
                )
                .is_none(),
            "Flow of {commodity} for process {process} in {} is defined more than once",
            raw.support_timeframe
        );
    }

    check_flow_commodities_defined(&flows, processes, commodities)?;

    Ok(flows)
}

/// Check that each process has flows and that its flow commodities exist at its site
fn check_flow_commodities_defined(
    flows: &ProcessFlows,
    processes: &ProcessMap,
    commodities: &CommodityMap,
) -> Result<()> {
    for key in processes.keys() {
        let mut has_flows = false;
        for direction in [FlowDirection::In, FlowDirection::Out] {
            for (commodity, _) in flows.iter_commodities(direction, key.year, &key.process) {
                has_flows = true;
                ensure!(
                    commodities.contains_key(&CommodityKey::new(key.year, &key.site, commodity)),
                    "Commodity {commodity} of process {} is not defined for site {} in {}",
                    key.process,
                    key.site,
                    key.year
                );
            }
        }
        ensure!(
            has_flows,
            "No commodity flows defined for process {} in {}",
            key.process,
            key.year
        );
    }

    Ok(())
}
