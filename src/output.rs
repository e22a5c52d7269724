//! The module responsible for writing output data to disk.
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

pub mod database;
pub mod metadata;
pub mod spreadsheet;

/// The root folder in which model-specific output folders will be created
const OUTPUT_DIRECTORY_ROOT: &str = "urbs_apg_results";

/// Get the default output folder for the model in the specified directory
pub fn get_output_dir(model_dir: &Path) -> Result<PathBuf> {
    // Canonicalise in case the user has specified "."
    let model_dir = model_dir
        .canonicalize()
        .context("Could not resolve path to model")?;

    let model_name = model_dir
        .file_name()
        .context("Model cannot be in root folder")?
        .to_str()
        .context("Invalid chars in model dir name")?;

    Ok([OUTPUT_DIRECTORY_ROOT, model_name].iter().collect())
}

/// Create the output directory, with parents.
///
/// An existing directory is kept as it is, so that the results of several scenarios accumulate in
/// the same databases, unless `overwrite` is set, in which case its contents are deleted first.
///
/// # Returns
///
/// Whether an existing directory was cleared.
pub fn create_output_directory(output_dir: &Path, overwrite: bool) -> Result<bool> {
    if output_dir.is_dir() {
        if !overwrite {
            return Ok(false);
        }

        fs::remove_dir_all(output_dir)?;
        fs::create_dir_all(output_dir)?;
        return Ok(true);
    }

    fs::create_dir_all(output_dir)?;

    Ok(false)
}
