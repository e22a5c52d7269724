//! Code for reading technology group membership and bounds.
use super::*;
use crate::id::IDCollection;
use crate::process::{ProcessID, ProcessKey, ProcessMap};
use crate::techgroup::{
    TechGroupBounds, TechGroupBoundsMap, TechGroupID, TechGroupKey, TechGroupMap,
};
use indexmap::IndexSet;
use serde::Deserialize;
use std::collections::HashSet;

/// Name of the technology group membership file
pub const TECHGROUP_FILE_NAME: &str = "techgroup.csv";

/// Name of the technology group bounds file
pub const TECHGROUP_BOUNDS_FILE_NAME: &str = "techgroup_process.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct TechGroupMemberRaw {
    techgroup: String,
    process: String,
}

#[derive(PartialEq, Debug, Deserialize)]
struct TechGroupBoundsRaw {
    support_timeframe: u32,
    site: String,
    techgroup: String,
    cap_lo: f64,
    cap_up: f64,
}

/// Read technology groups and their capacity bounds.
///
/// Both files are optional. Members must be processes defined in the processes file, and every
/// member of a bounded group must have a process at the site and support timeframe of the bound.
pub fn read_tech_groups(
    model_dir: &Path,
    site_tuples: &SiteTupleSet,
    processes: &ProcessMap,
) -> Result<(TechGroupMap, TechGroupBoundsMap)> {
    let file_path = model_dir.join(TECHGROUP_FILE_NAME);
    let members_csv = read_csv_optional(&file_path)?;
    let groups = read_tech_group_members_from_iter(members_csv, processes)
        .with_context(|| input_err_msg(&file_path))?;

    let file_path = model_dir.join(TECHGROUP_BOUNDS_FILE_NAME);
    let bounds_csv = read_csv_optional(&file_path)?;
    let bounds = read_tech_group_bounds_from_iter(bounds_csv, site_tuples, &groups, processes)
        .with_context(|| input_err_msg(&file_path))?;

    Ok((groups, bounds))
}

fn read_tech_group_members_from_iter<I>(iter: I, processes: &ProcessMap) -> Result<TechGroupMap>
where
    I: Iterator<Item = TechGroupMemberRaw>,
{
    let process_ids: HashSet<ProcessID> =
        processes.keys().map(|key| key.process.clone()).collect();

    let mut groups = TechGroupMap::new();
    for raw in iter {
        let process = process_ids.get_id_by_str(&raw.process).with_context(|| {
            format!(
                "Tech group {} references unknown process {}",
                raw.techgroup, raw.process
            )
        })?;
        let members = groups
            .entry(TechGroupID::from(raw.techgroup.as_str()))
            .or_insert_with(IndexSet::new);
        ensure!(
            members.insert(process),
            "Process {} is listed more than once in tech group {}",
            raw.process,
            raw.techgroup
        );
    }

    Ok(groups)
}

fn read_tech_group_bounds_from_iter<I>(
    iter: I,
    site_tuples: &SiteTupleSet,
    groups: &TechGroupMap,
    processes: &ProcessMap,
) -> Result<TechGroupBoundsMap>
where
    I: Iterator<Item = TechGroupBoundsRaw>,
{
    let group_ids: IndexSet<TechGroupID> = groups.keys().cloned().collect();

    let mut bounds = TechGroupBoundsMap::new();
    for raw in iter {
        let techgroup = group_ids.get_id_by_str(&raw.techgroup)?;
        check_capacity_bounds(0.0, raw.cap_lo, raw.cap_up)
            .with_context(|| format!("Invalid bounds for tech group {techgroup}"))?;
        let site = get_site(site_tuples, raw.support_timeframe, &raw.site)?;
        for process in &groups[&techgroup] {
            ensure!(
                processes.contains_key(&ProcessKey::new(raw.support_timeframe, &site, process)),
                "Process {process} of tech group {techgroup} is not defined at site {site} for {}",
                raw.support_timeframe
            );
        }
        let key = TechGroupKey {
            year: raw.support_timeframe,
            site,
            techgroup,
        };
        let value = TechGroupBounds {
            cap_lo: raw.cap_lo,
            cap_up: raw.cap_up,
        };
        ensure!(
            bounds.insert(key.clone(), value).is_none(),
            "Bounds for tech group {} at site {} are defined more than once for {}",
            key.techgroup,
            key.site,
            key.year
        );
    }

    Ok(bounds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::process::Process;
    use crate::site::SiteID;
    use indexmap::indexmap;
    use rstest::{fixture, rstest};

    #[fixture]
    fn processes() -> ProcessMap {
        let process = Process {
            inst_cap: 0.0,
            cap_lo: 0.0,
            cap_up: f64::INFINITY,
            inv_cost: 0.0,
            fix_cost: 0.0,
            var_cost: 0.0,
            wacc: 0.07,
            depreciation: 20,
            cap_factor: 1.0,
        };
        ["Solar", "Wind", "Coal"]
            .into_iter()
            .map(|name| {
                (
                    ProcessKey::new(2030, &"North".into(), &name.into()),
                    process.clone(),
                )
            })
            .collect()
    }

    fn member(techgroup: &str, process: &str) -> TechGroupMemberRaw {
        TechGroupMemberRaw {
            techgroup: techgroup.into(),
            process: process.into(),
        }
    }

    fn bounds(techgroup: &str, cap_lo: f64, cap_up: f64) -> TechGroupBoundsRaw {
        TechGroupBoundsRaw {
            support_timeframe: 2030,
            site: "North".into(),
            techgroup: techgroup.into(),
            cap_lo,
            cap_up,
        }
    }

    #[rstest]
    fn test_read_tech_groups(processes: ProcessMap) {
        let groups = read_tech_group_members_from_iter(
            [member("Renewable", "Solar"), member("Renewable", "Wind")].into_iter(),
            &processes,
        )
        .unwrap();
        let renewable = &groups[&TechGroupID::new("Renewable")];
        assert_eq!(renewable.len(), 2);
        assert!(renewable.contains("Wind"));

        let site_tuples: SiteTupleSet = [(2030, SiteID::new("North"))].into_iter().collect();
        let bounds = read_tech_group_bounds_from_iter(
            [bounds("Renewable", 10.0, 100.0)].into_iter(),
            &site_tuples,
            &groups,
            &processes,
        )
        .unwrap();
        assert_eq!(
            bounds,
            indexmap! {
                TechGroupKey {
                    year: 2030,
                    site: "North".into(),
                    techgroup: "Renewable".into()
                } => TechGroupBounds { cap_lo: 10.0, cap_up: 100.0 }
            }
        );
    }

    #[rstest]
    fn test_read_tech_groups_unknown_process(processes: ProcessMap) {
        assert_error!(
            read_tech_group_members_from_iter([member("Fossil", "Gas")].into_iter(), &processes),
            "Unknown ID Gas found"
        );
    }

    #[rstest]
    fn test_read_tech_group_bounds_invalid(processes: ProcessMap) {
        let groups =
            read_tech_group_members_from_iter([member("Fossil", "Coal")].into_iter(), &processes)
                .unwrap();
        let site_tuples: SiteTupleSet = [(2030, SiteID::new("North"))].into_iter().collect();
        assert_error!(
            read_tech_group_bounds_from_iter(
                [bounds("Fossil", -1.0, 10.0)].into_iter(),
                &site_tuples,
                &groups,
                &processes
            ),
            "cap_lo must be a finite, non-negative number"
        );
        assert_error!(
            read_tech_group_bounds_from_iter(
                [bounds("Nuclear", 0.0, 10.0)].into_iter(),
                &site_tuples,
                &groups,
                &processes
            ),
            "Unknown ID Nuclear found"
        );
    }

    #[rstest]
    fn test_read_tech_group_bounds_missing_member(mut processes: ProcessMap) {
        let groups = read_tech_group_members_from_iter(
            [member("Fossil", "Coal"), member("Renewable", "Solar")].into_iter(),
            &processes,
        )
        .unwrap();

        // Coal is only defined at North for another year
        let coal = processes
            .shift_remove(&ProcessKey::new(2030, &"North".into(), &"Coal".into()))
            .unwrap();
        processes.insert(ProcessKey::new(2035, &"North".into(), &"Coal".into()), coal);
        let site_tuples: SiteTupleSet = [(2030, SiteID::new("North"))].into_iter().collect();

        // Groups whose members are all present are fine
        assert!(
            read_tech_group_bounds_from_iter(
                [bounds("Renewable", 5.0, 10.0)].into_iter(),
                &site_tuples,
                &groups,
                &processes
            )
            .is_ok()
        );
        assert_error!(
            read_tech_group_bounds_from_iter(
                [bounds("Fossil", 5.0, 10.0)].into_iter(),
                &site_tuples,
                &groups,
                &processes
            ),
            "Process Coal of tech group Fossil is not defined at site North for 2030"
        );
    }
}
