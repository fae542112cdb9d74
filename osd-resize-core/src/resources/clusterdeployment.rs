use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use super::ResourceDataError;

/// Only the parts of Hive's ClusterDeployment needed to recognize the cluster's machines.
#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "ClusterDeployment",
    namespaced,
    schema = "disabled",
    derive = "Default"
)]
pub struct ClusterDeploymentSpec {
    pub cluster_name: Option<String>,
    pub cluster_metadata: Option<ClusterMetadata>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug)]
pub struct ClusterMetadata {
    #[serde(rename = "infraID")]
    pub infra_id: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl ClusterDeployment {
    /// Prefix of every Machine name in the cluster.
    pub fn get_infra_id(&self) -> Result<&str, ResourceDataError> {
        self.spec
            .cluster_metadata
            .as_ref()
            .and_then(|m| m.infra_id.as_deref())
            .filter(|id| !id.is_empty())
            .ok_or(ResourceDataError::MissingData(
                "ClusterDeployment",
                "spec.clusterMetadata.infraID".into(),
            ))
    }
}
