//! Code for reading the storage file.
use super::*;
use crate::commodity::{CommodityKey, CommodityMap};
use crate::storage::{Storage, StorageKey, StorageMap};
use serde::Deserialize;

/// Name of the storage file
pub const STORAGE_FILE_NAME: &str = "storage.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct StorageRaw {
    support_timeframe: u32,
    site: String,
    storage: String,
    commodity: String,
    inst_cap_c: f64,
    cap_lo_c: f64,
    cap_up_c: f64,
    inst_cap_p: f64,
    cap_lo_p: f64,
    cap_up_p: f64,
    eff_in: f64,
    eff_out: f64,
    inv_cost_c: f64,
    inv_cost_p: f64,
    fix_cost_c: f64,
    fix_cost_p: f64,
    var_cost_c: f64,
    var_cost_p: f64,
    wacc: f64,
    depreciation: u32,
    #[serde(default)]
    init: Option<f64>,
}

impl StorageRaw {
    fn validate(&self) -> Result<()> {
        check_capacity_bounds(self.inst_cap_c, self.cap_lo_c, self.cap_up_c)
            .context("Invalid storage capacity")?;
        check_capacity_bounds(self.inst_cap_p, self.cap_lo_p, self.cap_up_p)
            .context("Invalid storage power")?;
        for (name, eff) in [("eff_in", self.eff_in), ("eff_out", self.eff_out)] {
            ensure!(eff > 0.0 && eff <= 1.0, "{name} must be in the range (0, 1]");
        }
        for (name, cost) in [
            ("inv_cost_c", self.inv_cost_c),
            ("inv_cost_p", self.inv_cost_p),
            ("fix_cost_c", self.fix_cost_c),
            ("fix_cost_p", self.fix_cost_p),
            ("var_cost_c", self.var_cost_c),
            ("var_cost_p", self.var_cost_p),
        ] {
            check_cost(name, cost)?;
        }
        if let Some(init) = self.init {
            ensure!((0.0..=1.0).contains(&init), "init must be between 0 and 1");
        }

        check_annuity(self.wacc, self.depreciation)
    }
}

/// Read storage technologies.
///
/// The file is optional; if it is absent, the model has no storage.
pub fn read_storages(
    model_dir: &Path,
    site_tuples: &SiteTupleSet,
    commodities: &CommodityMap,
) -> Result<StorageMap> {
    let file_path = model_dir.join(STORAGE_FILE_NAME);
    let storages_csv = read_csv_optional(&file_path)?;
    read_storages_from_iter(storages_csv, site_tuples, commodities)
        .with_context(|| input_err_msg(&file_path))
}

fn read_storages_from_iter<I>(
    iter: I,
    site_tuples: &SiteTupleSet,
    commodities: &CommodityMap,
) -> Result<StorageMap>
where
    I: Iterator<Item = StorageRaw>,
{
    let mut storages = StorageMap::new();
    for raw in iter {
        let context = || format!("Invalid entry for storage {} at {}", raw.storage, raw.site);
        raw.validate().with_context(context)?;
        let site = get_site(site_tuples, raw.support_timeframe, &raw.site).with_context(context)?;
        let key = StorageKey {
            year: raw.support_timeframe,
            site,
            storage: raw.storage.as_str().into(),
            commodity: raw.commodity.as_str().into(),
        };
        ensure!(
            commodities.contains_key(&CommodityKey::new(key.year, &key.site, &key.commodity)),
            "Commodity {} is not defined for site {} in {}",
            key.commodity,
            key.site,
            key.year
        );

        let storage = Storage {
            inst_cap_c: raw.inst_cap_c,
            cap_lo_c: raw.cap_lo_c,
            cap_up_c: raw.cap_up_c,
            inst_cap_p: raw.inst_cap_p,
            cap_lo_p: raw.cap_lo_p,
            cap_up_p: raw.cap_up_p,
            eff_in: raw.eff_in,
            eff_out: raw.eff_out,
            inv_cost_c: raw.inv_cost_c,
            inv_cost_p: raw.inv_cost_p,
            fix_cost_c: raw.fix_cost_c,
            fix_cost_p: raw.fix_cost_p,
            var_cost_c: raw.var_cost_c,
            var_cost_p: raw.var_cost_p,
            wacc: raw.wacc,
            depreciation: raw.depreciation,
            init: raw.init,
        };
        ensure!(
            storages.insert(key.clone(), storage).is_none(),
            "Storage {} for {} at site {} is defined more than once for {}",
            key.storage,
            key.commodity,
            key.site,
            key.year
        );
    }

    Ok(storages)
}
