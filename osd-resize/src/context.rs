use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context};
use kube::config::Kubeconfig;
use osd_resize_core::{
    helpers::With,
    kubernetes::operations::Elevation,
    ocm::OcmConnection,
    resize::target::ClientPair,
};

use crate::config::ResizeConfig;

pub const DEFAULT_CONFIG_FILENAME: &str = "resize-config";
pub const KUBECONFIG_ENV_VAR: &str = "KUBECONFIG";

/// Everything a single invocation needs to reach OCM, the cluster and its Hive shard.
pub struct ConfigContext {
    kube_config: Kubeconfig,
    kube_context_name: String,
    hive_context_name: Option<String>,
    resize_config: ResizeConfig,
}

impl ConfigContext {
    pub fn new(
        kube_config_path: Option<&Path>,
        resize_config_path: Option<&Path>,
        kube_context: Option<&str>,
        hive_context: Option<&str>,
    ) -> anyhow::Result<Self> {
        let kube_config_path = resolve_kube_config_path(kube_config_path)?;
        let kube_config =
            Kubeconfig::read_from(&kube_config_path).context("Couldn't load kubeconfig!")?;

        let resize_config_path = match resize_config_path {
            Some(path) => {
                if path.file_name().is_none() {
                    return Err(anyhow!("Resize config path is invalid!"));
                }

                path.into()
            }
            None => kube_config_path
                .as_path()
                .parent()
                .unwrap_or(Path::new(""))
                .to_owned()
                .with(|d| d.push(DEFAULT_CONFIG_FILENAME)),
        };
        let resize_config = ResizeConfig::load(&resize_config_path)?;

        let kube_context_name = match kube_context {
            Some(name) => name.to_owned(),
            None => kube_config
                .current_context
                .as_ref()
                .ok_or(anyhow!(
                    "Current context isn't set! Desired context must be specified manually!"
                ))?
                .to_owned(),
        };
        let hive_context_name = hive_context
            .map(str::to_owned)
            .or_else(|| resize_config.hive_context.clone());

        Ok(Self {
            kube_config,
            kube_context_name,
            hive_context_name,
            resize_config,
        })
    }

    pub fn resize_config(&self) -> &ResizeConfig {
        &self.resize_config
    }

    pub fn elevation(&self, reason: &str) -> Elevation {
        Elevation {
            user: self.resize_config.elevation.user.clone(),
            reason: reason.to_owned(),
        }
    }

    pub fn create_ocm_connection(&self) -> anyhow::Result<OcmConnection> {
        let token = self.resize_config.ocm_token().unwrap_or_default();

        OcmConnection::new(&self.resize_config.ocm_url, &token)
    }

    pub async fn create_cluster_clients(&self, reason: &str) -> anyhow::Result<ClientPair> {
        ClientPair::connect(
            &self.kube_config,
            &self.kube_context_name,
            &self.elevation(reason),
        )
        .await
    }

    pub async fn create_hive_clients(&self, reason: &str) -> anyhow::Result<ClientPair> {
        let hive_context = self.hive_context_name.as_deref().ok_or(anyhow!(
            "Hive context isn't set! Pass --hive-context or add 'hiveContext' to the resize config!"
        ))?;

        ClientPair::connect(&self.kube_config, hive_context, &self.elevation(reason)).await
    }
}

fn resolve_kube_config_path(kube_config_path: Option<&Path>) -> anyhow::Result<PathBuf> {
    let path = match kube_config_path {
        Some(path) => path.to_owned(),
        None => std::env::var(KUBECONFIG_ENV_VAR)
            .map(|s| s.into())
            .or_else(|_| {
                home::home_dir()
                    .map(|d| d.with(|d| d.push(".kube")).with(|d| d.push("config")))
                    .ok_or(anyhow!("Missing home dir!"))
            })?,
    };

    Ok(path)
}
