use std::collections::BTreeMap;

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use super::{provider_spec::CloudProvider, ResourceDataError};
use crate::helpers::RequireMetadata;

#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "hive.openshift.io",
    version = "v1",
    kind = "MachinePool",
    namespaced,
    status = "MachinePoolStatus",
    schema = "disabled",
    derive = "Default"
)]
pub struct MachinePoolSpec {
    pub cluster_deployment_ref: ClusterDeploymentRef,
    /// name of the pool, the object itself is named `<cluster-deployment>-<name>`
    pub name: String,
    pub platform: MachinePoolPlatform,
    pub replicas: Option<i64>,
    pub autoscaling: Option<MachinePoolAutoscaling>,
    pub labels: Option<BTreeMap<String, String>>,
    /// taints, machine labels and any fields this tool doesn't interpret
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq)]
pub struct ClusterDeploymentRef {
    pub name: String,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolAutoscaling {
    pub min_replicas: i32,
    pub max_replicas: i32,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug)]
pub struct MachinePoolPlatform {
    pub aws: Option<PlatformMachineType>,
    pub gcp: Option<PlatformMachineType>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

/// Hive stores the instance type of both AWS and GCP pools under `type`.
#[derive(Deserialize, Serialize, Clone, Default, Debug)]
pub struct PlatformMachineType {
    #[serde(rename = "type")]
    pub instance_type: String,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct MachinePoolStatus {
    pub replicas: Option<i32>,
    pub conditions: Option<Vec<Value>>,
    pub machine_sets: Option<Vec<Value>>,
}

impl MachinePoolPlatform {
    pub fn get_provider(&self) -> Option<CloudProvider> {
        match (&self.aws, &self.gcp) {
            (Some(_), None) => Some(CloudProvider::Aws),
            (None, Some(_)) => Some(CloudProvider::Gcp),
            _ => None,
        }
    }

    fn get_machine_type_mut(&mut self) -> Option<&mut PlatformMachineType> {
        match (&mut self.aws, &mut self.gcp) {
            (Some(aws), None) => Some(aws),
            (None, Some(gcp)) => Some(gcp),
            _ => None,
        }
    }

    pub fn get_instance_type(&self) -> Option<&str> {
        match (&self.aws, &self.gcp) {
            (Some(aws), None) => Some(&aws.instance_type),
            (None, Some(gcp)) => Some(&gcp.instance_type),
            _ => None,
        }
    }

    pub fn set_instance_type(&mut self, instance_type: &str) -> Result<(), ResourceDataError> {
        let platform = self.get_machine_type_mut().ok_or(ResourceDataError::InvalidData(
            "MachinePool",
            "exactly one of spec.platform.aws or spec.platform.gcp must be set".into(),
        ))?;

        platform.instance_type = instance_type.to_owned();

        Ok(())
    }
}

/// Read-only view of a MachinePool captured before any mutation.
#[derive(Debug, Clone)]
pub struct MachinePoolSnapshot {
    pool: MachinePool,
    namespace: String,
    replicas: i64,
    instance_type: String,
    provider: CloudProvider,
}

impl MachinePoolSnapshot {
    pub fn capture(pool: &MachinePool) -> Result<Self, ResourceDataError> {
        let namespace = pool
            .require_namespace_or(ResourceDataError::MissingData(
                "MachinePool",
                "metadata.namespace".into(),
            ))?
            .to_owned();
        pool.require_name_or(ResourceDataError::MissingData(
            "MachinePool",
            "metadata.name".into(),
        ))?;

        if pool.spec.autoscaling.is_some() {
            return Err(ResourceDataError::InvalidData(
                "MachinePool",
                "autoscaling pools can't be resized".into(),
            ));
        }

        let replicas = pool.spec.replicas.ok_or(ResourceDataError::MissingData(
            "MachinePool",
            "spec.replicas".into(),
        ))?;
        let provider = pool
            .spec
            .platform
            .get_provider()
            .ok_or(ResourceDataError::InvalidData(
                "MachinePool",
                "exactly one of spec.platform.aws or spec.platform.gcp must be set".into(),
            ))?;
        let instance_type = pool
            .spec
            .platform
            .get_instance_type()
            .unwrap_or_default()
            .to_owned();

        Ok(Self {
            pool: pool.clone(),
            namespace,
            replicas,
            instance_type,
            provider,
        })
    }

    pub fn pool(&self) -> &MachinePool {
        &self.pool
    }

    pub fn name(&self) -> &str {
        self.pool.metadata.name.as_deref().unwrap_or_default()
    }

    pub fn pool_name(&self) -> &str {
        &self.pool.spec.name
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn replicas(&self) -> i64 {
        self.replicas
    }

    pub fn instance_type(&self) -> &str {
        &self.instance_type
    }

    pub fn provider(&self) -> CloudProvider {
        self.provider
    }
}
