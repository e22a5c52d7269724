//! Code for reading process-related information from CSV files.
use super::*;
use crate::commodity::CommodityMap;
use crate::process::{Process, ProcessFlows, ProcessKey, ProcessMap};
use log::info;
use serde::Deserialize;
pub mod flow;
use flow::read_process_flows;

/// Name of the processes file
pub const PROCESS_FILE_NAME: &str = "process.csv";

#[derive(PartialEq, Debug, Deserialize)]
struct ProcessRaw {
    support_timeframe: u32,
    site: String,
    process: String,
    inst_cap: f64,
    cap_lo: f64,
    cap_up: f64,
    inv_cost: f64,
    fix_cost: f64,
    var_cost: f64,
    wacc: f64,
    depreciation: u32,
    #[serde(default, alias = "time_frac")]
    cap_factor: Option<f64>,
}

impl ProcessRaw {
    fn validate(&self) -> Result<()> {
        check_capacity_bounds(self.inst_cap, self.cap_lo, self.cap_up)?;
        check_cost("inv_cost", self.inv_cost)?;
        check_cost("fix_cost", self.fix_cost)?;
        check_cost("var_cost", self.var_cost)?;
        check_annuity(self.wacc, self.depreciation)?;
        if let Some(cap_factor) = self.cap_factor {
            ensure!(
                cap_factor >= 0.0,
                "cap_factor cannot be negative ({cap_factor})"
            );
        }

        Ok(())
    }
}

/// Counts of capacity factors which were filled in while reading
#[derive(Debug, Default, PartialEq)]
struct CapFactorFixes {
    defaulted: usize,
    clamped: usize,
}

/// Read processes and their commodity flows.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
/// * `site_tuples` - The sites defined for each support timeframe
/// * `commodities` - The commodities of the model
pub fn read_processes(
    model_dir: &Path,
    site_tuples: &SiteTupleSet,
    commodities: &CommodityMap,
) -> Result<(ProcessMap, ProcessFlows)> {
    let file_path = model_dir.join(PROCESS_FILE_NAME);
    let processes_csv = read_csv(&file_path)?;
    let (processes, fixes) = read_processes_from_iter(processes_csv, site_tuples)
        .with_context(|| input_err_msg(&file_path))?;
    if fixes.defaulted > 0 {
        info!(
            "No cap_factor given for {} process(es); defaulting to 1",
            fixes.defaulted
        );
    }
    if fixes.clamped > 0 {
        info!(
            "cap_factor greater than 1 for {} process(es); setting to 1",
            fixes.clamped
        );
    }

    let flows = read_process_flows(model_dir, &processes, commodities)?;

    Ok((processes, flows))
}

fn read_processes_from_iter<I>(
    iter: I,
    site_tuples: &SiteTupleSet,
) -> Result<(ProcessMap, CapFactorFixes)>
where
    I: Iterator<Item = ProcessRaw>,
{
    let mut processes = ProcessMap::new();
    let mut fixes = CapFactorFixes::default();
    for raw in iter {
        raw.validate()
            .with_context(|| format!("Invalid entry for process {}", raw.process))?;
        let site = get_site(site_tuples, raw.support_timeframe, &raw.site)
            .with_context(|| format!("Invalid entry for process {}", raw.process))?;

        let cap_factor = match raw.cap_factor {
            None => {
                fixes.defaulted += 1;
                1.0
            }
            Some(value) if value > 1.0 => {
                fixes.clamped += 1;
                1.0
            }
            Some(value) => value,
        };

        let key = ProcessKey {
            year: raw.support_timeframe,
            site,
            process: raw.process.into(),
        };
        let process = Process {
            inst_cap: raw.inst_cap,
            cap_lo: raw.cap_lo,
            cap_up: raw.cap_up,
            inv_cost: raw.inv_cost,
            fix_cost: raw.fix_cost,
            var_cost: raw.var_cost,
            wacc: raw.wacc,
            depreciation: raw.depreciation,
            cap_factor,
        };
        ensure!(
            processes.insert(key.clone(), process).is_none(),
            "Process {} is defined more than once for site {} in {}",
            key.process,
            key.site,
            key.year
        );
    }

    Ok((processes, fixes))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use crate::site::SiteID;
    use rstest::{fixture, rstest};

    #[fixture]
    fn site_tuples() -> SiteTupleSet {
        [(2030, SiteID::new("North"))].into_iter().collect()
    }

    fn process(name: &str, cap_factor: Option<f64>) -> ProcessRaw {
        ProcessRaw {
            support_timeframe: 2030,
            site: "North".into(),
            process: name.into(),
            inst_cap: 0.0,
            cap_lo: 0.0,
            cap_up: f64::INFINITY,
            inv_cost: 1000.0,
            fix_cost: 10.0,
            var_cost: 1.0,
            wacc: 0.07,
            depreciation: 25,
            cap_factor,
        }
    }

    #[rstest]
    fn test_read_processes_cap_factor(site_tuples: SiteTupleSet) {
        let (processes, fixes) = read_processes_from_iter(
            [
                process("Solar", None),
                process("Wind", Some(1.2)),
                process("Coal", Some(0.8)),
            ]
            .into_iter(),
            &site_tuples,
        )
        .unwrap();

        assert_eq!(
            fixes,
            CapFactorFixes {
                defaulted: 1,
                clamped: 1
            }
        );
        let cap_factors: Vec<_> = processes.values().map(|p| p.cap_factor).collect();
        assert_eq!(cap_factors, [1.0, 1.0, 0.8]);
    }

    #[rstest]
    fn test_read_processes_errors(site_tuples: SiteTupleSet) {
        let mut raw = process("Solar", None);
        raw.cap_lo = 10.0;
        raw.cap_up = 5.0;
        assert_error!(
            read_processes_from_iter([raw].into_iter(), &site_tuples),
            "cap_lo (10) cannot be greater than cap_up (5)"
        );

        let mut raw = process("Solar", None);
        raw.depreciation = 0;
        assert_error!(
            read_processes_from_iter([raw].into_iter(), &site_tuples),
            "depreciation cannot be zero"
        );

        assert_error!(
            read_processes_from_iter(
                [process("Solar", None), process("Solar", None)].into_iter(),
                &site_tuples
            ),
            "Process Solar is defined more than once for site North in 2030"
        );
    }

    #[test]
    fn test_time_frac_alias() {
        let dir = tempfile::tempdir().unwrap();
        let file_path = dir.path().join(PROCESS_FILE_NAME);
        std::fs::write(
            &file_path,
            "support_timeframe,site,process,inst_cap,cap_lo,cap_up,inv_cost,fix_cost,var_cost,wacc,depreciation,time_frac
2030,North,Coal,0,0,inf,1000,10,1,0.07,40,0.6
",
        )
        .unwrap();

        let records: Vec<ProcessRaw> = read_csv(&file_path).unwrap().collect();
        assert_eq!(records[0].cap_factor, Some(0.6));
        assert_eq!(records[0].cap_up, f64::INFINITY);
    }
}
