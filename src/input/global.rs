//! Code for reading the global properties file.
use super::*;
use crate::model::GlobalProperties;
use log::{info, warn};
use serde::Deserialize;
use std::collections::HashSet;

/// Name of the global properties file
pub const GLOBAL_FILE_NAME: &str = "global.csv";

/// Weight given to the last support timeframe if none is specified
const DEFAULT_LAST_YEAR_WEIGHT: u32 = 5;

#[derive(PartialEq, Debug, Deserialize)]
struct GlobalPropertyRaw {
    support_timeframe: u32,
    property: String,
    value: f64,
}

/// Read the global properties file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `years` - Support timeframes of the model, sorted
pub fn read_global_properties(model_dir: &Path, years: &[u32]) -> Result<GlobalProperties> {
    let file_path = model_dir.join(GLOBAL_FILE_NAME);
    let global_csv = read_csv(&file_path)?;
    read_global_properties_from_iter(global_csv, years).with_context(|| input_err_msg(&file_path))
}

fn read_global_properties_from_iter<I>(iter: I, years: &[u32]) -> Result<GlobalProperties>
where
    I: Iterator<Item = GlobalPropertyRaw>,
{
    let (Some(&first_year), Some(&last_year)) = (years.first(), years.last()) else {
        bail!("No support timeframes defined");
    };

    let mut seen = HashSet::new();
    let mut discount_rate = None;
    let mut last_year_weight = None;
    let mut co2_limits = IndexMap::new();
    for property in iter {
        let year = property.support_timeframe;
        ensure!(
            years.contains(&year),
            "Unknown support timeframe {year} for property '{}'",
            property.property
        );
        ensure!(
            seen.insert((year, property.property.clone())),
            "Property '{}' is defined more than once for {year}",
            property.property
        );

        match property.property.as_str() {
            "Discount rate" if year == first_year => {
                ensure!(
                    (0.0..1.0).contains(&property.value),
                    "Discount rate must be in the range [0, 1)"
                );
                discount_rate = Some(property.value);
            }
            "Weight" if year == last_year => {
                ensure!(
                    property.value >= 1.0 && property.value.fract() == 0.0,
                    "Weight must be a positive whole number of years"
                );
                last_year_weight = Some(property.value as u32);
            }
            "CO2 limit" => {
                ensure!(property.value >= 0.0, "CO2 limit cannot be negative");
                if property.value.is_finite() {
                    co2_limits.insert(year, property.value);
                }
            }
            "Discount rate" | "Weight" => {}
            other => warn!("Ignoring unknown global property '{other}'"),
        }
    }

    let discount_rate = discount_rate.with_context(|| {
        format!("No discount rate defined for first support timeframe ({first_year})")
    })?;
    let last_year_weight = last_year_weight.unwrap_or_else(|| {
        info!(
            "No weight defined for last support timeframe ({last_year}); \
            using {DEFAULT_LAST_YEAR_WEIGHT} years"
        );
        DEFAULT_LAST_YEAR_WEIGHT
    });

    Ok(GlobalProperties {
        discount_rate,
        last_year_weight,
        co2_limits,
    })
}
