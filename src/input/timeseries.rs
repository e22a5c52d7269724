//! Code for reading demand and intermittent supply time series.
use super::*;
use crate::commodity::{CommodityKey, CommodityMap, CommodityType, TimeSeries};
use serde::Deserialize;
use std::ops::RangeInclusive;

/// Name of the demand file
pub const DEMAND_FILE_NAME: &str = "demand.csv";

/// Name of the intermittent supply file
pub const SUPIM_FILE_NAME: &str = "supim.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TimeSeriesRaw {
    support_timeframe: u32,
    t: u32,
    site: String,
    commodity: String,
    value: f64,
}

/// Read the demand time series.
///
/// Values for timesteps outside the modelled range are ignored.
pub fn read_demand(
    model_dir: &Path,
    commodities: &CommodityMap,
    timesteps: &RangeInclusive<u32>,
) -> Result<TimeSeries> {
    let file_path = model_dir.join(DEMAND_FILE_NAME);
    let demand_csv = read_csv(&file_path)?;
    read_time_series_from_iter(demand_csv, commodities, CommodityType::Demand, timesteps)
        .with_context(|| input_err_msg(&file_path))
}

/// Read the intermittent supply time series.
///
/// Values are availabilities per unit of capacity and must be between 0 and 1.
pub fn read_supim(
    model_dir: &Path,
    commodities: &CommodityMap,
    timesteps: &RangeInclusive<u32>,
) -> Result<TimeSeries> {
    let file_path = model_dir.join(SUPIM_FILE_NAME);
    let supim_csv = read_csv_optional(&file_path)?;
    read_time_series_from_iter(supim_csv, commodities, CommodityType::SupIm, timesteps)
        .with_context(|| input_err_msg(&file_path))
}

fn read_time_series_from_iter<I>(
    iter: I,
    commodities: &CommodityMap,
    kind: CommodityType,
    timesteps: &RangeInclusive<u32>,
) -> Result<TimeSeries>
where
    I: Iterator<Item = TimeSeriesRaw>,
{
    let mut series = TimeSeries::default();
    for raw in iter {
        let (key, commodity) = commodities
            .get_key_value(&CommodityKey::new(
                raw.support_timeframe,
                &raw.site.as_str().into(),
                &raw.commodity.as_str().into(),
            ))
            .with_context(|| {
                format!(
                    "Commodity {} is not defined for site {} in {}",
                    raw.commodity, raw.site, raw.support_timeframe
                )
            })?;
        ensure!(
            commodity.kind == kind,
            "Commodity {} must be of type {kind:?}",
            key.commodity
        );
        ensure!(
            raw.value.is_finite() && raw.value >= 0.0,
            "Invalid value ({}) for commodity {}",
            raw.value,
            key.commodity
        );
        if kind == CommodityType::SupIm {
            ensure!(
                raw.value <= 1.0,
                "Intermittent supply for {} must be between 0 and 1",
                key.commodity
            );
        }

        if !timesteps.contains(&raw.t) {
            continue;
        }

        ensure!(
            series
                .insert(
                    key.site.clone(),
                    key.commodity.clone(),
                    key.year,
                    raw.t,
                    raw.value
                )
                .is_none(),
            "Value for commodity {} at site {} is defined more than once for timestep {} in {}",
            key.commodity,
            key.site,
            raw.t,
            key.year
        );
    }

    Ok(series)
}
