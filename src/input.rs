//! Common routines for handling input data.
use crate::finance::CostFactors;
use crate::model::{Model, ModelParameters};
use crate::site::{SiteID, SiteTupleSet};
use crate::table::Table;
use anyhow::{Context, Result, bail, ensure};
use indexmap::IndexMap;
use itertools::Itertools;
use log::info;
use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use std::fs;
use std::path::Path;

pub mod commodity;
use commodity::read_commodities;
pub mod global;
use global::{GLOBAL_FILE_NAME, read_global_properties};
pub mod process;
use process::{PROCESS_FILE_NAME, flow::PROCESS_COMMODITY_FILE_NAME, read_processes};
pub mod site;
use site::{SITE_FILE_NAME, read_sites};
pub mod storage;
use storage::{STORAGE_FILE_NAME, read_storages};
pub mod techgroup;
use techgroup::{TECHGROUP_BOUNDS_FILE_NAME, TECHGROUP_FILE_NAME, read_tech_groups};
pub mod timeseries;
use timeseries::{DEMAND_FILE_NAME, SUPIM_FILE_NAME, read_demand, read_supim};
pub mod transmission;
use transmission::{TRANSMISSION_FILE_NAME, read_transmissions};

use commodity::COMMODITY_FILE_NAME;

/// Input files along with the name of the table they are stored under in snapshots
pub const INPUT_TABLES: [(&str, &str); 11] = [
    (GLOBAL_FILE_NAME, "Global"),
    (SITE_FILE_NAME, "Site"),
    (COMMODITY_FILE_NAME, "Commodity"),
    (PROCESS_FILE_NAME, "Process"),
    (PROCESS_COMMODITY_FILE_NAME, "Process-Commodity"),
    (DEMAND_FILE_NAME, "Demand"),
    (SUPIM_FILE_NAME, "SupIm"),
    (TRANSMISSION_FILE_NAME, "Transmission"),
    (STORAGE_FILE_NAME, "Storage"),
    (TECHGROUP_FILE_NAME, "TechGroup"),
    (TECHGROUP_BOUNDS_FILE_NAME, "TechGroup-Process"),
];

/// Read a series of type `T`s from a CSV file.
///
/// Will raise an error if the file is empty.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    let vec = read_csv_internal(file_path)?;
    if vec.is_empty() {
        bail!("CSV file {} cannot be empty", file_path.display());
    }
    Ok(vec.into_iter())
}

/// Read a series of type `T`s from a CSV file.
///
/// If the file does not exist, an empty iterator is returned.
///
/// # Arguments
///
/// * `file_path` - Path to the CSV file
pub fn read_csv_optional<'a, T: DeserializeOwned + 'a>(
    file_path: &'a Path,
) -> Result<impl Iterator<Item = T> + 'a> {
    if !file_path.exists() {
        return Ok(Vec::new().into_iter());
    }

    let vec = read_csv_internal(file_path)?;
    Ok(vec.into_iter())
}

fn read_csv_internal<'a, T: DeserializeOwned + 'a>(file_path: &'a Path) -> Result<Vec<T>> {
    let vec = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(file_path)
        .with_context(|| input_err_msg(file_path))?
        .into_deserialize()
        .process_results(|iter| iter.collect_vec())
        .with_context(|| input_err_msg(file_path))?;

    Ok(vec)
}

/// Parse a TOML file at the specified path.
///
/// # Arguments
///
/// * `file_path` - Path to the TOML file
///
/// # Returns
///
/// * The deserialised TOML data or an error if the file could not be read or parsed.
pub fn read_toml<T: DeserializeOwned>(file_path: &Path) -> Result<T> {
    let toml_str = fs::read_to_string(file_path).with_context(|| input_err_msg(file_path))?;
    let toml_data = toml::from_str(&toml_str).with_context(|| input_err_msg(file_path))?;
    Ok(toml_data)
}

/// Read an f64, checking that it is between 0 and 1
pub fn deserialise_proportion<'de, D>(deserialiser: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Deserialize::deserialize(deserialiser)?;
    if !(0.0..=1.0).contains(&value) {
        Err(serde::de::Error::custom("Value is not between 0 and 1"))?;
    }

    Ok(value)
}

/// Format an error message to include the file path
pub fn input_err_msg<P: AsRef<Path>>(file_path: P) -> String {
    format!("Error reading {}", file_path.as_ref().display())
}

/// Indicates whether the values are in ascending order with no duplicates
pub fn is_sorted_and_unique<T, I>(iter: I) -> bool
where
    T: PartialOrd + Clone,
    I: IntoIterator<Item = T>,
{
    iter.into_iter().tuple_windows().all(|(a, b)| a < b)
}

/// Look up a site, checking that it is defined for the given support timeframe
pub fn get_site(site_tuples: &SiteTupleSet, year: u32, site: &str) -> Result<SiteID> {
    site_tuples
        .get(&(year, SiteID::from(site)))
        .map(|(_, site)| site.clone())
        .with_context(|| format!("Unknown site {site} for {year}"))
}

/// Check that a pair of capacity bounds and an installed capacity are valid
pub fn check_capacity_bounds(inst_cap: f64, cap_lo: f64, cap_up: f64) -> Result<()> {
    ensure!(
        inst_cap.is_finite() && inst_cap >= 0.0,
        "inst_cap must be a finite, non-negative number"
    );
    ensure!(
        cap_lo.is_finite() && cap_lo >= 0.0,
        "cap_lo must be a finite, non-negative number"
    );
    ensure!(!cap_up.is_nan(), "cap_up cannot be NaN");
    ensure!(
        cap_lo <= cap_up,
        "cap_lo ({cap_lo}) cannot be greater than cap_up ({cap_up})"
    );
    ensure!(
        inst_cap <= cap_up,
        "inst_cap ({inst_cap}) cannot be greater than cap_up ({cap_up})"
    );

    Ok(())
}

/// Check that a cost coefficient is valid
pub fn check_cost(name: &str, value: f64) -> Result<()> {
    ensure!(
        value.is_finite() && value >= 0.0,
        "{name} must be a finite, non-negative number"
    );

    Ok(())
}

/// Check that the annuity parameters of an investment are valid
pub fn check_annuity(wacc: f64, depreciation: u32) -> Result<()> {
    ensure!((0.0..1.0).contains(&wacc), "wacc must be in the range [0, 1)");
    ensure!(depreciation > 0, "depreciation cannot be zero");

    Ok(())
}

/// Read a model from the specified directory.
///
/// # Arguments
///
/// * `model_dir` - Folder containing model configuration files
///
/// # Returns
///
/// The static model data ([`Model`]) or an error.
pub fn load_model<P: AsRef<Path>>(model_dir: P) -> Result<Model> {
    let model_dir = model_dir.as_ref();
    let parameters = ModelParameters::from_path(model_dir)?;

    let site_tuples = read_sites(model_dir)?;
    let years: Vec<u32> = site_tuples
        .iter()
        .map(|(year, _)| *year)
        .sorted()
        .dedup()
        .collect();
    let sites = site_tuples.iter().map(|(_, site)| site.clone()).collect();
    let global = read_global_properties(model_dir, &years)?;
    let commodities = read_commodities(model_dir, &site_tuples)?;
    let (processes, flows) = read_processes(model_dir, &site_tuples, &commodities)?;
    let timesteps = parameters.timesteps();
    let demand = read_demand(model_dir, &commodities, &timesteps)?;
    let supim = read_supim(model_dir, &commodities, &timesteps)?;
    let transmissions = read_transmissions(model_dir, &site_tuples, &commodities)?;
    let storages = read_storages(model_dir, &site_tuples, &commodities)?;
    let (tech_groups, tech_group_bounds) = read_tech_groups(model_dir, &site_tuples, &processes)?;

    let cost_factors = CostFactors::new(&years, global.discount_rate, global.last_year_weight);
    let model = Model {
        model_path: model_dir.to_path_buf(),
        parameters,
        global,
        cost_factors,
        years,
        sites,
        site_tuples,
        commodities,
        processes,
        flows,
        demand,
        supim,
        transmissions,
        storages,
        tech_groups,
        tech_group_bounds,
    };
    info!(
        "Loaded model with {} support timeframe(s), {} site(s) and {} process tuple(s)",
        model.years.len(),
        model.sites.len(),
        model.processes.len()
    );

    Ok(model)
}

/// Read every input CSV file present in the model directory as a [`Table`].
///
/// The keys of the returned map are the snapshot table names (see [`INPUT_TABLES`]).
pub fn read_input_tables(model_dir: &Path) -> Result<IndexMap<&'static str, Table>> {
    let mut tables = IndexMap::new();
    for (file_name, table_name) in INPUT_TABLES {
        let file_path = model_dir.join(file_name);
        if !file_path.is_file() {
            continue;
        }

        let table = Table::from_csv_path(&file_path).with_context(|| input_err_msg(&file_path))?;
        tables.insert(table_name, table);
    }

    Ok(tables)
}
