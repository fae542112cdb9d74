use std::{fs::File, path::Path};

use log::debug;
use osd_resize_core::ocm::{
    servicelog::{CONTROL_PLANE_RESIZED_TEMPLATE, INFRA_RESIZED_TEMPLATE},
    DEFAULT_OCM_URL,
};
use serde::Deserialize;
use thiserror::Error;

pub const OCM_TOKEN_ENV_VAR: &str = "OCM_TOKEN";
pub const DEFAULT_ELEVATION_USER: &str = "backplane-cluster-admin";

#[derive(Debug, Error)]
pub enum ResizeConfigError {
    #[error("Io error: {}", .0)]
    IoError(std::io::Error),
    #[error("Deserialization error: {}", .0)]
    DeserializationError(serde_yaml::Error),
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ResizeConfig {
    pub ocm_url: String,
    ocm_token: Option<String>,
    pub hive_context: Option<String>,
    pub elevation: ElevationConfig,
    pub service_logs: ServiceLogTemplates,
}

impl Default for ResizeConfig {
    fn default() -> Self {
        Self {
            ocm_url: DEFAULT_OCM_URL.to_owned(),
            ocm_token: None,
            hive_context: None,
            elevation: Default::default(),
            service_logs: Default::default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ElevationConfig {
    pub user: String,
}

impl Default for ElevationConfig {
    fn default() -> Self {
        Self {
            user: DEFAULT_ELEVATION_USER.to_owned(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ServiceLogTemplates {
    pub control_plane: String,
    pub infra: String,
}

impl Default for ServiceLogTemplates {
    fn default() -> Self {
        Self {
            control_plane: CONTROL_PLANE_RESIZED_TEMPLATE.to_owned(),
            infra: INFRA_RESIZED_TEMPLATE.to_owned(),
        }
    }
}

impl ResizeConfig {
    /// A missing file means defaults.
    pub fn load(path: &Path) -> Result<Self, ResizeConfigError> {
        debug!("Used config path: {path:?}");

        if !path.exists() {
            debug!("Config file doesn't exist, using defaults...");

            return Ok(Self::default());
        }

        let file = File::open(path).map_err(ResizeConfigError::IoError)?;

        Self::from_reader(file)
    }

    fn from_reader(reader: impl std::io::Read) -> Result<Self, ResizeConfigError> {
        serde_yaml::from_reader::<_, Option<Self>>(reader)
            .map(Option::unwrap_or_default)
            .map_err(ResizeConfigError::DeserializationError)
    }

    /// `OCM_TOKEN` takes precedence over the config file.
    pub fn ocm_token(&self) -> Option<String> {
        std::env::var(OCM_TOKEN_ENV_VAR)
            .ok()
            .filter(|t| !t.is_empty())
            .or_else(|| self.ocm_token.clone())
    }
}
