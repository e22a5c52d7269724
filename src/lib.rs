//! Common functionality for urbs-apg, an urbs-style energy system model for regional power grids.
#![warn(missing_docs)]
use std::path::PathBuf;

pub mod cli;
pub mod commodity;
pub mod feature;
pub mod finance;
pub mod id;
pub mod input;
pub mod log;
pub mod model;
pub mod optimisation;
pub mod output;
pub mod process;
pub mod report;
pub mod scenario;
pub mod settings;
pub mod site;
pub mod storage;
pub mod table;
pub mod techgroup;
pub mod transmission;

#[cfg(test)]
mod fixture;

/// Get config dir for program.
///
/// If it cannot be determined (e.g. because the user's home folder is unknown), the current
/// directory is used instead.
pub fn get_urbs_apg_config_dir() -> PathBuf {
    let Some(mut config_dir) = dirs::config_dir() else {
        return PathBuf::default();
    };

    config_dir.push("urbs-apg");
    config_dir
}
