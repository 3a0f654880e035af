//! TOML configuration for jobs and sweeps.
//!
//! A job file carries a `[data]` table pointing at the CSV feed and a
//! `[job]` table that deserializes straight into [`JobSpec`]. A sweep file
//! adds `[axes]`, mapping parameter names to candidate value lists.

use crate::job::JobSpec;
use crate::sweep::SweepAxes;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("reading '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("parsing '{path}': {source}")]
    Parse {
        path: String,
        #[source]
        source: toml::de::Error,
    },
    #[error("axis '{axis}' holds a value that does not map to JSON: {reason}")]
    BadAxisValue { axis: String, reason: String },
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataConfig {
    /// CSV feed path, relative paths resolved against the config file.
    pub path: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct JobConfig {
    pub data: DataConfig,
    pub job: JobSpec,
}

#[derive(Debug, Deserialize)]
pub struct SweepConfig {
    pub data: DataConfig,
    pub job: JobSpec,
    #[serde(default)]
    axes: BTreeMap<String, Vec<toml::Value>>,
}

impl SweepConfig {
    /// Axes with values converted to the JSON model the params map uses.
    pub fn axes(&self) -> Result<SweepAxes, ConfigError> {
        let mut axes = SweepAxes::new();
        for (name, values) in &self.axes {
            let mut converted = Vec::with_capacity(values.len());
            for value in values {
                let json = serde_json::to_value(value).map_err(|e| ConfigError::BadAxisValue {
                    axis: name.clone(),
                    reason: e.to_string(),
                })?;
                converted.push(json);
            }
            axes.insert(name.clone(), converted);
        }
        Ok(axes)
    }
}

pub fn load_job_config(path: &Path) -> Result<JobConfig, ConfigError> {
    let text = read(path)?;
    let mut config: JobConfig = parse(path, &text)?;
    config.data.path = resolve(path, config.data.path);
    Ok(config)
}

pub fn load_sweep_config(path: &Path) -> Result<SweepConfig, ConfigError> {
    let text = read(path)?;
    let mut config: SweepConfig = parse(path, &text)?;
    config.data.path = resolve(path, config.data.path);
    Ok(config)
}

fn read(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })
}

fn parse<T: serde::de::DeserializeOwned>(path: &Path, text: &str) -> Result<T, ConfigError> {
    toml::from_str(text).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

fn resolve(config_path: &Path, data_path: PathBuf) -> PathBuf {
    if data_path.is_absolute() {
        data_path
    } else {
        config_path
            .parent()
            .map(|dir| dir.join(&data_path))
            .unwrap_or(data_path)
    }
}
