//! Defines the `ModelParameters` struct, which represents the contents of `model.toml`.
use crate::input::{deserialise_proportion, input_err_msg, read_toml};
use crate::process::ProcessID;
use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use std::ops::RangeInclusive;
use std::path::Path;

const MODEL_PARAMETERS_FILE_NAME: &str = "model.toml";

macro_rules! define_param_default {
    ($name:ident, $type: ty, $value: expr) => {
        fn $name() -> $type {
            $value
        }
    };
}

define_param_default!(default_dt, f64, 1.0);
define_param_default!(default_no_new_capacity_process, ProcessID, "Solar".into());
define_param_default!(default_no_new_capacity_after, u32, 2030);
define_param_default!(
    default_vre_processes,
    Vec<ProcessID>,
    vec!["Solar".into(), "Wind".into()]
);
define_param_default!(default_vre_share_limit, f64, 0.5);

/// Represents the contents of the entire model file.
#[derive(Debug, Deserialize, PartialEq)]
pub struct ModelParameters {
    /// The initial timestep. It is not modelled itself but carries the initial storage state.
    #[serde(default)]
    pub start_timestep: u32,
    /// The last modelled timestep
    pub end_timestep: u32,
    /// Length of each timestep in hours
    #[serde(default = "default_dt")]
    pub dt: f64,
    /// Parameters of the regional constraints
    #[serde(default)]
    pub constraints: CustomConstraintParameters,
}

/// Parameters of the regional constraints added on top of the core model
#[derive(Debug, Deserialize, PartialEq)]
pub struct CustomConstraintParameters {
    /// Process for which no new capacity can be built after `no_new_capacity_after`
    #[serde(default = "default_no_new_capacity_process")]
    pub no_new_capacity_process: ProcessID,
    /// Last support timeframe in which `no_new_capacity_process` can be expanded
    #[serde(default = "default_no_new_capacity_after")]
    pub no_new_capacity_after: u32,
    /// Processes counted as variable renewable energy
    #[serde(default = "default_vre_processes")]
    pub vre_processes: Vec<ProcessID>,
    /// Maximum share of total demand which can be met by variable renewable energy
    #[serde(default = "default_vre_share_limit")]
    #[serde(deserialize_with = "deserialise_proportion")]
    pub vre_share_limit: f64,
}

impl Default for CustomConstraintParameters {
    fn default() -> Self {
        Self {
            no_new_capacity_process: default_no_new_capacity_process(),
            no_new_capacity_after: default_no_new_capacity_after(),
            vre_processes: default_vre_processes(),
            vre_share_limit: default_vre_share_limit(),
        }
    }
}

impl ModelParameters {
    /// Read a model file from the specified directory.
    ///
    /// # Arguments
    ///
    /// * `model_dir` - Folder containing model configuration files
    ///
    /// # Returns
    ///
    /// The model file contents as a [`ModelParameters`] struct or an error if the file is invalid
    pub fn from_path<P: AsRef<Path>>(model_dir: P) -> Result<ModelParameters> {
        let file_path = model_dir.as_ref().join(MODEL_PARAMETERS_FILE_NAME);
        let model_params: ModelParameters = read_toml(&file_path)?;

        model_params
            .validate()
            .with_context(|| input_err_msg(file_path))?;

        Ok(model_params)
    }

    /// Validate parameters after reading in file
    fn validate(&self) -> Result<()> {
        ensure!(
            self.end_timestep > self.start_timestep,
            "end_timestep must be greater than start_timestep"
        );
        ensure!(
            self.dt.is_finite() && self.dt > 0.0,
            "dt must be a finite number greater than zero"
        );

        Ok(())
    }

    /// The modelled timesteps, excluding the initial timestep
    pub fn timesteps(&self) -> RangeInclusive<u32> {
        self.start_timestep + 1..=self.end_timestep
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::assert_error;
    use std::fs::File;
    use std::io::Write;
    use tempfile::tempdir;

    /// Write a model file with the given contents and read it back
    fn read_model_file(contents: &str) -> Result<ModelParameters> {
        let dir = tempdir().unwrap();
        {
            let mut file = File::create(dir.path().join(MODEL_PARAMETERS_FILE_NAME)).unwrap();
            writeln!(file, "{contents}").unwrap();
        }

        ModelParameters::from_path(dir.path())
    }

    #[test]
    fn test_model_params_from_path_defaults() {
        let params = read_model_file("end_timestep = 24").unwrap();
        assert_eq!(params.start_timestep, 0);
        assert_eq!(params.timesteps(), 1..=24);
        assert_eq!(params.dt, 1.0);
        assert_eq!(params.constraints, CustomConstraintParameters::default());
        assert_eq!(params.constraints.no_new_capacity_process.as_str(), "Solar");
        assert_eq!(params.constraints.no_new_capacity_after, 2030);
    }

    #[test]
    fn test_model_params_from_path_constraints() {
        let params = read_model_file(
            "start_timestep = 10
end_timestep = 20
dt = 2.0

[constraints]
no_new_capacity_after = 2040
vre_processes = [\"Wind\"]
vre_share_limit = 0.3",
        )
        .unwrap();
        assert_eq!(params.timesteps(), 11..=20);
        assert_eq!(params.constraints.no_new_capacity_after, 2040);
        assert_eq!(params.constraints.vre_processes, vec![ProcessID::new("Wind")]);
        assert_eq!(params.constraints.vre_share_limit, 0.3);
        assert_eq!(params.constraints.no_new_capacity_process.as_str(), "Solar");
    }

    #[test]
    fn test_model_params_invalid() {
        assert_error!(
            read_model_file("start_timestep = 5\nend_timestep = 5"),
            "end_timestep must be greater than start_timestep"
        );
        assert_error!(
            read_model_file("end_timestep = 5\ndt = 0.0"),
            "dt must be a finite number greater than zero"
        );
        assert!(read_model_file("end_timestep = 5\n[constraints]\nvre_share_limit = 1.5").is_err());
    }
}
