//! Code for reading the commodities file.
use super::*;
use crate::commodity::{Commodity, CommodityKey, CommodityMap, CommodityType};
use serde::Deserialize;

/// Name of the commodities file
pub const COMMODITY_FILE_NAME: &str = "commodity.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct CommodityRaw {
    support_timeframe: u32,
    site: String,
    commodity: String,
    #[serde(rename = "type")]
    kind: CommodityType,
    #[serde(default)]
    price: Option<f64>,
    #[serde(default)]
    max: Option<f64>,
    #[serde(default)]
    maxperhour: Option<f64>,
    #[serde(default)]
    min_ratio: Option<f64>,
}

impl CommodityRaw {
    fn validate(&self) -> Result<()> {
        if let Some(price) = self.price {
            ensure!(price.is_finite(), "Invalid price ({price})");
        }
        for (name, value) in [("max", self.max), ("maxperhour", self.maxperhour)] {
            if let Some(value) = value {
                ensure!(value >= 0.0, "{name} cannot be negative");
            }
        }
        if let Some(min_ratio) = self.min_ratio {
            ensure!(
                (0.0..=1.0).contains(&min_ratio),
                "min_ratio must be between 0 and 1"
            );
            ensure!(
                self.kind == CommodityType::Demand,
                "min_ratio can only be given for demand commodities"
            );
        }

        Ok(())
    }
}

/// Read commodities from the commodities file.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `site_tuples` - The sites defined for each support timeframe
pub fn read_commodities(model_dir: &Path, site_tuples: &SiteTupleSet) -> Result<CommodityMap> {
    let file_path = model_dir.join(COMMODITY_FILE_NAME);
    let commodities_csv = read_csv(&file_path)?;
    read_commodities_from_iter(commodities_csv, site_tuples)
        .with_context(|| input_err_msg(&file_path))
}

fn read_commodities_from_iter<I>(iter: I, site_tuples: &SiteTupleSet) -> Result<CommodityMap>
where
    I: Iterator<Item = CommodityRaw>,
{
    let mut commodities = CommodityMap::new();
    for raw in iter {
        raw.validate()
            .with_context(|| format!("Invalid entry for commodity {}", raw.commodity))?;
        let site = get_site(site_tuples, raw.support_timeframe, &raw.site)
            .with_context(|| format!("Invalid entry for commodity {}", raw.commodity))?;
        let key = CommodityKey {
            year: raw.support_timeframe,
            site,
            commodity: raw.commodity.into(),
        };
        let commodity = Commodity {
            kind: raw.kind,
            price: raw.price.unwrap_or(0.0),
            max: raw.max.unwrap_or(f64::INFINITY),
            max_per_hour: raw.maxperhour.unwrap_or(f64::INFINITY),
            min_ratio: raw.min_ratio,
        };
        ensure!(
            commodities.insert(key.clone(), commodity).is_none(),
            "Commodity {} is defined more than once for site {} in {}",
            key.commodity,
            key.site,
            key.year
        );
    }

    Ok(commodities)
}
