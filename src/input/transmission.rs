//! Code for reading the transmission file.
use super::*;
use crate::commodity::{CommodityKey, CommodityMap};
use crate::transmission::{Transmission, TransmissionKey, TransmissionMap};
use serde::Deserialize;

/// Name of the transmission file
pub const TRANSMISSION_FILE_NAME: &str = "transmission.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TransmissionRaw {
    support_timeframe: u32,
    site_in: String,
    site_out: String,
    transmission: String,
    commodity: String,
    eff: f64,
    inv_cost: f64,
    fix_cost: f64,
    var_cost: f64,
    inst_cap: f64,
    cap_lo: f64,
    cap_up: f64,
    wacc: f64,
    depreciation: u32,
}

impl TransmissionRaw {
    fn validate(&self) -> Result<()> {
        ensure!(
            self.site_in != self.site_out,
            "site_in and site_out must be different"
        );
        ensure!(
            self.eff > 0.0 && self.eff <= 1.0,
            "eff must be in the range (0, 1]"
        );
        check_capacity_bounds(self.inst_cap, self.cap_lo, self.cap_up)?;
        check_cost("inv_cost", self.inv_cost)?;
        check_cost("fix_cost", self.fix_cost)?;
        check_cost("var_cost", self.var_cost)?;
        check_annuity(self.wacc, self.depreciation)
    }
}

/// Read transmission lines.
///
/// The file is optional; if it is absent, the model has no transmission.
pub fn read_transmissions(
    model_dir: &Path,
    site_tuples: &SiteTupleSet,
    commodities: &CommodityMap,
) -> Result<TransmissionMap> {
    let file_path = model_dir.join(TRANSMISSION_FILE_NAME);
    let transmissions_csv = read_csv_optional(&file_path)?;
    read_transmissions_from_iter(transmissions_csv, site_tuples, commodities)
        .with_context(|| input_err_msg(&file_path))
}

fn read_transmissions_from_iter<I>(
    iter: I,
    site_tuples: &SiteTupleSet,
    commodities: &CommodityMap,
) -> Result<TransmissionMap>
where
    I: Iterator<Item = TransmissionRaw>,
{
    let mut transmissions = TransmissionMap::new();
    for raw in iter {
        let context = || {
            format!(
                "Invalid entry for transmission {} from {} to {}",
                raw.transmission, raw.site_in, raw.site_out
            )
        };
        raw.validate().with_context(context)?;
        let site_in = get_site(site_tuples, raw.support_timeframe, &raw.site_in)
            .with_context(context)?;
        let site_out = get_site(site_tuples, raw.support_timeframe, &raw.site_out)
            .with_context(context)?;

        let key = TransmissionKey {
            year: raw.support_timeframe,
            site_in,
            site_out,
            transmission: raw.transmission.as_str().into(),
            commodity: raw.commodity.as_str().into(),
        };
        for site in [&key.site_in, &key.site_out] {
            ensure!(
                commodities.contains_key(&CommodityKey::new(key.year, site, &key.commodity)),
                "Commodity {} is not defined for site {site} in {}",
                key.commodity,
                key.year
            );
        }

        let transmission = Transmission {
            eff: raw.eff,
            inv_cost: raw.inv_cost,
            fix_cost: raw.fix_cost,
            var_cost: raw.var_cost,
            inst_cap: raw.inst_cap,
            cap_lo: raw.cap_lo,
            cap_up: raw.cap_up,
            wacc: raw.wacc,
            depreciation: raw.depreciation,
        };
        ensure!(
            transmissions.insert(key.clone(), transmission).is_none(),
            "Transmission {} from {} to {} is defined more than once for {}",
            key.transmission,
            key.site_in,
            key.site_out,
            key.year
        );
    }

    Ok(transmissions)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commodity::{Commodity, CommodityType};
    use crate::fixture::assert_error;
    use crate::site::SiteID;
    use crate::transmission::direction_share;
    use indexmap::indexmap;
    use rstest::{fixture, rstest};

    #[fixture]
    fn site_tuples() -> SiteTupleSet {
        [(2030, SiteID::new("North")), (2030, SiteID::new("South"))]
            .into_iter()
            .collect()
    }

    #[fixture]
    fn commodities() -> CommodityMap {
        let elec = Commodity {
            kind: CommodityType::Demand,
            price: 0.0,
            max: f64::INFINITY,
            max_per_hour: f64::INFINITY,
            min_ratio: None,
        };
        indexmap! {
            CommodityKey::new(2030, &"North".into(), &"Elec".into()) => elec.clone(),
            CommodityKey::new(2030, &"South".into(), &"Elec".into()) => elec,
        }
    }

    fn line(site_in: &str, site_out: &str) -> TransmissionRaw {
        TransmissionRaw {
            support_timeframe: 2030,
            site_in: site_in.into(),
            site_out: site_out.into(),
            transmission: "HVAC".into(),
            commodity: "Elec".into(),
            eff: 0.95,
            inv_cost: 1000.0,
            fix_cost: 10.0,
            var_cost: 0.0,
            inst_cap: 0.0,
            cap_lo: 0.0,
            cap_up: f64::INFINITY,
            wacc: 0.07,
            depreciation: 40,
        }
    }

    #[rstest]
    fn test_read_transmissions_from_iter(site_tuples: SiteTupleSet, commodities: CommodityMap) {
        let transmissions = read_transmissions_from_iter(
            [line("North", "South"), line("South", "North")].into_iter(),
            &site_tuples,
            &commodities,
        )
        .unwrap();
        assert_eq!(transmissions.len(), 2);

        let (key, _) = transmissions.first().unwrap();
        assert_eq!(direction_share(&transmissions, key), 0.5);
        assert_eq!(&transmissions.get_index(1).unwrap().0.reverse(), key);
    }

    #[rstest]
    fn test_read_transmissions_errors(site_tuples: SiteTupleSet, commodities: CommodityMap) {
        assert_error!(
            read_transmissions_from_iter(
                [line("North", "North")].into_iter(),
                &site_tuples,
                &commodities
            ),
            "site_in and site_out must be different"
        );
        assert_error!(
            read_transmissions_from_iter(
                [line("North", "East")].into_iter(),
                &site_tuples,
                &commodities
            ),
            "Unknown site East for 2030"
        );

        let mut raw = line("North", "South");
        raw.commodity = "Heat".into();
        assert_error!(
            read_transmissions_from_iter([raw].into_iter(), &site_tuples, &commodities),
            "Commodity Heat is not defined for site North in 2030"
        );
    }
}
