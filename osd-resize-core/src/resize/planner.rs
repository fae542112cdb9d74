use serde_json::Value;
use thiserror::Error;

use crate::{
    kubernetes::{patch::create_merge_patch, AsTemplate},
    resources::{
        cpms::ControlPlaneMachineSet,
        machinepool::{MachinePool, MachinePoolSnapshot},
        provider_spec::{CloudProvider, ProviderSpec, ProviderSpecError},
        ResourceDataError,
    },
};

/// Next size up for infra nodes.
pub const EMBIGGEN: [(&str, &str); 8] = [
    ("m5.xlarge", "r5.xlarge"),
    ("m5.2xlarge", "r5.2xlarge"),
    ("r5.xlarge", "r5.2xlarge"),
    ("r5.2xlarge", "r5.4xlarge"),
    ("custom-4-32768-ext", "custom-8-65536-ext"),
    ("custom-8-65536-ext", "custom-16-131072-ext"),
    ("n2-highmem-4", "n2-highmem-8"),
    ("n2-highmem-8", "n2-highmem-16"),
];

const TEMPORARY_POOL_SUFFIX: &str = "2";

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("resizing instance type {} not supported", .0)]
    UnsupportedInstanceType(String),
    #[error("Nodes already use '{}' instance type, there's nothing to resize!", .0)]
    AlreadyAtTarget(String),
    #[error(transparent)]
    ProviderSpec(#[from] ProviderSpecError),
    #[error(transparent)]
    ResourceData(#[from] ResourceDataError),
    #[error("Couldn't serialize '{}' resource! Reason: {}", .0, .1)]
    Serialization(&'static str, serde_json::Error),
}

pub fn embiggen(instance_type: &str) -> Option<&'static str> {
    EMBIGGEN
        .iter()
        .find(|(current, _)| *current == instance_type)
        .map(|(_, next)| *next)
}

pub fn plan_infra_instance_type(
    current: &str,
    override_type: Option<&str>,
) -> Result<String, PlannerError> {
    let target = match override_type {
        Some(instance_type) => instance_type.to_owned(),
        None => embiggen(current)
            .ok_or_else(|| PlannerError::UnsupportedInstanceType(current.to_owned()))?
            .to_owned(),
    };

    if target == current {
        return Err(PlannerError::AlreadyAtTarget(target));
    }

    Ok(target)
}

/// Everything the infra driver needs, computed before the first mutation.
#[derive(Debug, Clone)]
pub struct InfraResizePlan {
    original: MachinePoolSnapshot,
    infra_id: String,
    target_instance_type: String,
    temporary_pool: MachinePool,
    permanent_pool: MachinePool,
}

impl InfraResizePlan {
    pub fn new(
        original: MachinePoolSnapshot,
        infra_id: &str,
        override_type: Option<&str>,
    ) -> Result<Self, PlannerError> {
        let target_instance_type =
            plan_infra_instance_type(original.instance_type(), override_type)?;

        let mut permanent_pool = original.pool().as_template();
        permanent_pool
            .spec
            .platform
            .set_instance_type(&target_instance_type)?;

        let mut temporary_pool = permanent_pool.clone();
        temporary_pool.metadata.name =
            Some(format!("{}{TEMPORARY_POOL_SUFFIX}", original.name()));
        temporary_pool.spec.name = format!("{}{TEMPORARY_POOL_SUFFIX}", original.pool_name());

        Ok(Self {
            original,
            infra_id: infra_id.to_owned(),
            target_instance_type,
            temporary_pool,
            permanent_pool,
        })
    }

    pub fn original(&self) -> &MachinePoolSnapshot {
        &self.original
    }

    /// Prefix of the cluster's Machine names, used to tell pools' nodes apart.
    pub fn infra_id(&self) -> &str {
        &self.infra_id
    }

    pub fn target_instance_type(&self) -> &str {
        &self.target_instance_type
    }

    pub fn temporary_pool(&self) -> &MachinePool {
        &self.temporary_pool
    }

    pub fn permanent_pool(&self) -> &MachinePool {
        &self.permanent_pool
    }

    pub fn temporary_pool_name(&self) -> &str {
        self.temporary_pool.metadata.name.as_deref().unwrap_or_default()
    }

    /// Node count while both the old and the new nodes are up.
    pub fn double_capacity(&self) -> usize {
        usize::try_from(self.original.replicas() * 2).unwrap_or_default()
    }

    pub fn normal_capacity(&self) -> usize {
        usize::try_from(self.original.replicas()).unwrap_or_default()
    }
}

#[derive(Debug, Clone)]
pub struct ControlPlanePatch {
    pub current_instance_type: String,
    pub target_instance_type: String,
    pub patch: Value,
}

/// Merge patch changing only the instance type inside the CPMS provider spec.
pub fn plan_control_plane_patch(
    cpms: &ControlPlaneMachineSet,
    provider: CloudProvider,
    machine_type: &str,
) -> Result<ControlPlanePatch, PlannerError> {
    let mut provider_spec = ProviderSpec::decode(provider, cpms.provider_spec_value()?)?;
    let current_instance_type = provider_spec.instance_type().to_owned();

    provider_spec.set_instance_type(machine_type);

    let mut modified = cpms.as_template();
    *modified.provider_spec_value_mut()? = provider_spec.encode()?;

    let original = serde_json::to_value(cpms.as_template())
        .map_err(|e| PlannerError::Serialization("ControlPlaneMachineSet", e))?;
    let modified = serde_json::to_value(&modified)
        .map_err(|e| PlannerError::Serialization("ControlPlaneMachineSet", e))?;

    Ok(ControlPlanePatch {
        current_instance_type,
        target_instance_type: machine_type.to_owned(),
        patch: create_merge_patch(&original, &modified),
    })
}
