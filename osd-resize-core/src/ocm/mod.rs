use anyhow::{anyhow, Context};
use async_trait::async_trait;
use log::debug;
use serde::Deserialize;
use serde_json::Value;

pub mod servicelog;

pub const DEFAULT_OCM_URL: &str = "https://api.openshift.com";

const CLUSTERS_ENDPOINT: &str = "/api/clusters_mgmt/v1/clusters";

/// Cluster identity as known by the cluster-management service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    pub id: String,
    pub external_id: String,
    pub name: String,
    pub cloud_provider: String,
    pub hosted_control_plane: bool,
}

#[async_trait]
pub trait ClusterManager: Send + Sync {
    /// Resolves an internal ID, external ID or name to exactly one cluster.
    async fn find_cluster(&self, identifier: &str) -> anyhow::Result<ClusterInfo>;
}

#[derive(Debug, Clone)]
pub struct OcmConnection {
    client: reqwest::Client,
    url: String,
    token: String,
}

impl OcmConnection {
    pub fn new(url: &str, token: &str) -> anyhow::Result<Self> {
        if token.is_empty() {
            return Err(anyhow!(
                "Missing OCM token! Set OCM_TOKEN or add 'ocmToken' to the configuration file."
            ));
        }

        Ok(Self {
            client: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    pub(crate) async fn get_json(&self, path: &str, query: &[(&str, &str)]) -> anyhow::Result<Value> {
        let response = self
            .client
            .get(format!("{}{path}", self.url))
            .query(query)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await?
            .error_for_status()
            .context(format!("OCM request to '{path}' failed!"))?;

        debug!("{response:#?}");

        Ok(response.json().await?)
    }

    pub(crate) async fn post_json(&self, path: &str, body: &Value) -> anyhow::Result<Value> {
        let response = self
            .client
            .post(format!("{}{path}", self.url))
            .bearer_auth(&self.token)
            .json(body)
            .send()
            .await?
            .error_for_status()
            .context(format!("OCM request to '{path}' failed!"))?;

        debug!("{response:#?}");

        Ok(response.json().await?)
    }
}

#[derive(Deserialize)]
struct ClusterList {
    #[serde(default)]
    items: Vec<OcmCluster>,
}

#[derive(Deserialize)]
struct OcmCluster {
    id: String,
    #[serde(default)]
    external_id: String,
    #[serde(default)]
    name: String,
    cloud_provider: Option<OcmReference>,
    hypershift: Option<OcmHypershift>,
}

#[derive(Deserialize)]
struct OcmReference {
    id: String,
}

#[derive(Deserialize)]
struct OcmHypershift {
    #[serde(default)]
    enabled: bool,
}

impl From<OcmCluster> for ClusterInfo {
    fn from(value: OcmCluster) -> Self {
        Self {
            id: value.id,
            external_id: value.external_id,
            name: value.name,
            cloud_provider: value.cloud_provider.map(|p| p.id).unwrap_or_default(),
            hosted_control_plane: value.hypershift.map(|h| h.enabled).unwrap_or(false),
        }
    }
}

fn build_cluster_search(identifier: &str) -> String {
    format!("id = '{identifier}' or external_id = '{identifier}' or name = '{identifier}'")
}

fn pick_single_cluster(identifier: &str, response: Value) -> anyhow::Result<ClusterInfo> {
    let mut list: ClusterList =
        serde_json::from_value(response).context("Invalid OCM cluster list response!")?;

    match list.items.len() {
        0 => Err(anyhow!("Couldn't find a cluster matching '{identifier}'!")),
        1 => Ok(list.items.remove(0).into()),
        count => Err(anyhow!(
            "Identifier '{identifier}' matches {count} clusters, use the internal cluster ID instead!"
        )),
    }
}

#[async_trait]
impl ClusterManager for OcmConnection {
    async fn find_cluster(&self, identifier: &str) -> anyhow::Result<ClusterInfo> {
        let search = build_cluster_search(identifier);
        let response = self
            .get_json(CLUSTERS_ENDPOINT, &[("search", search.as_str()), ("size", "2")])
            .await?;

        pick_single_cluster(identifier, response)
    }
}
