//! Net trade and flows between sites for a single commodity.
use crate::commodity::CommodityID;
use crate::model::{HOURS_PER_YEAR, Model};
use crate::optimisation::Solution;
use crate::site::SiteID;
use crate::table::{Cell, Table};
use std::collections::BTreeMap;

/// Get net imports and exports and the list of flows between sites for a commodity.
///
/// # Returns
///
/// * Net trade per (Year, Region, Tech), with exports negative
/// * Annual flow and utilisation per (Year, From, To), where flows from a site to itself are the
///   part of its production which is not exported
///
/// Both tables are empty if there are no transmission results for the commodity.
pub fn get_transmissions(
    model: &Model,
    solution: &Solution,
    commodity: &CommodityID,
) -> (Table, Table) {
    let vars = &solution.variables;
    let mut exports: BTreeMap<(u32, SiteID, SiteID), f64> = BTreeMap::new();
    let mut imports: BTreeMap<(u32, SiteID), f64> = BTreeMap::new();
    for (key, exported) in solution.iter_values(&vars.e_tra_in) {
        if key.key.commodity != *commodity {
            continue;
        }

        let line = &key.key;
        *exports
            .entry((line.year, line.site_in.clone(), line.site_out.clone()))
            .or_default() += exported;
        *imports
            .entry((line.year, line.site_out.clone()))
            .or_default() += solution.value(&vars.e_tra_out, key);
    }
    if exports.is_empty() {
        return (Table::default(), Table::default());
    }

    let mut capacity: BTreeMap<(u32, SiteID, SiteID), f64> = BTreeMap::new();
    for (key, cap) in solution.iter_values(&vars.cap_tra) {
        if key.commodity == *commodity {
            *capacity
                .entry((key.year, key.site_in.clone(), key.site_out.clone()))
                .or_default() += cap;
        }
    }

    let mut total_exports: BTreeMap<(u32, SiteID), f64> = BTreeMap::new();
    for ((year, from, _), exported) in &exports {
        *total_exports.entry((*year, from.clone())).or_default() += exported;
    }

    let mut net: BTreeMap<(u32, SiteID, &str), f64> = BTreeMap::new();
    for ((year, site), exported) in &total_exports {
        net.insert((*year, site.clone(), "Export"), -exported);
    }
    for ((year, site), imported) in imports {
        net.insert((year, site, "Import"), imported);
    }
    let mut net_table = Table::new([
        "Year".to_string(),
        "Region".into(),
        "Tech".into(),
        commodity.to_string(),
    ]);
    for ((year, site, tech), value) in net {
        net_table.push_row(vec![year.into(), Cell::text(site), tech.into(), value.into()]);
    }

    // Production kept within each site appears as a flow from the site to itself
    let mut flows: BTreeMap<(u32, SiteID, SiteID), (f64, Option<f64>)> = exports
        .iter()
        .map(|(key, exported)| {
            let utilization = capacity
                .get(key)
                .filter(|cap| **cap > 0.0)
                .map(|cap| exported / cap * model.weight() / HOURS_PER_YEAR);
            (key.clone(), (*exported, utilization))
        })
        .collect();
    let mut production: BTreeMap<(u32, SiteID), f64> = BTreeMap::new();
    for (key, value) in solution.iter_values(&vars.e_pro_out) {
        if key.key.commodity == *commodity {
            *production
                .entry((key.key.year, key.key.site.clone()))
                .or_default() += value;
        }
    }
    for ((year, site), produced) in production {
        let exported = total_exports
            .get(&(year, site.clone()))
            .copied()
            .unwrap_or_default();
        flows.insert((year, site.clone(), site), (produced - exported, None));
    }

    let mut list_table = Table::new([
        "Year".to_string(),
        "From".into(),
        "To".into(),
        format!("{commodity}(MWh)"),
        "Utilization".into(),
    ]);
    for ((year, from, to), (flow, utilization)) in flows {
        list_table.push_row(vec![
            year.into(),
            Cell::text(from),
            Cell::text(to),
            flow.into(),
            utilization.into(),
        ]);
    }

    (net_table, list_table)
}
