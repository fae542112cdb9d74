use std::fmt::Display;

use kube::CustomResource;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use serde_with::skip_serializing_none;

use super::ResourceDataError;

pub const PROGRESSING_CONDITION: &str = "Progressing";

#[skip_serializing_none]
#[derive(CustomResource, Deserialize, Serialize, Clone, Default, Debug)]
#[serde(rename_all = "camelCase")]
#[kube(
    group = "machine.openshift.io",
    version = "v1",
    kind = "ControlPlaneMachineSet",
    namespaced,
    status = "ControlPlaneMachineSetStatus",
    schema = "disabled",
    derive = "Default"
)]
pub struct ControlPlaneMachineSetSpec {
    pub replicas: Option<i32>,
    pub state: Option<ControlPlaneMachineSetState>,
    pub template: ControlPlaneMachineSetTemplate,
    /// selector, strategy and any fields this tool doesn't interpret
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug)]
pub struct ControlPlaneMachineSetTemplate {
    #[serde(rename = "machineType")]
    pub machine_type: Option<String>,
    pub machines_v1beta1_machine_openshift_io: Option<OpenShiftMachineTemplate>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct OpenShiftMachineTemplate {
    pub spec: MachineSpec,
    /// failure domains and template metadata
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug)]
#[serde(rename_all = "camelCase")]
pub struct MachineSpec {
    pub provider_spec: ProviderSpecHolder,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Default, Debug)]
pub struct ProviderSpecHolder {
    pub value: Option<Value>,
}

#[derive(Deserialize, Serialize, Clone, Debug, PartialEq)]
pub enum ControlPlaneMachineSetState {
    Active,
    Inactive,
    #[serde(other)]
    Unknown,
}

impl Display for ControlPlaneMachineSetState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ControlPlaneMachineSetState::Active => f.write_str("Active"),
            ControlPlaneMachineSetState::Inactive => f.write_str("Inactive"),
            ControlPlaneMachineSetState::Unknown => f.write_str("Unknown"),
        }
    }
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default)]
#[serde(rename_all = "camelCase")]
pub struct ControlPlaneMachineSetStatus {
    pub conditions: Option<Vec<StatusCondition>>,
    pub observed_generation: Option<i64>,
    pub replicas: Option<i32>,
    pub ready_replicas: Option<i32>,
    pub updated_replicas: Option<i32>,
    pub unavailable_replicas: Option<i32>,
}

#[skip_serializing_none]
#[derive(Deserialize, Serialize, Clone, Debug, Default, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCondition {
    #[serde(rename = "type")]
    pub type_: String,
    pub status: String,
    pub reason: Option<String>,
    pub message: Option<String>,
    pub last_transition_time: Option<String>,
}

impl ControlPlaneMachineSet {
    pub fn is_active(&self) -> bool {
        matches!(self.spec.state, Some(ControlPlaneMachineSetState::Active))
    }

    pub fn get_condition(&self, condition_type: &str) -> Option<&StatusCondition> {
        self.status
            .as_ref()?
            .conditions
            .as_ref()?
            .iter()
            .find(|c| c.type_ == condition_type)
    }

    /// `None` when the controller hasn't reported the condition yet.
    pub fn is_progressing(&self) -> Option<bool> {
        self.get_condition(PROGRESSING_CONDITION)
            .map(|c| !c.status.eq_ignore_ascii_case("false"))
    }

    pub fn provider_spec_value(&self) -> Result<&Value, ResourceDataError> {
        self.spec
            .template
            .machines_v1beta1_machine_openshift_io
            .as_ref()
            .and_then(|t| t.spec.provider_spec.value.as_ref())
            .ok_or(ResourceDataError::MissingData(
                "ControlPlaneMachineSet",
                "spec.template.machines_v1beta1_machine_openshift_io.spec.providerSpec.value".into(),
            ))
    }

    pub fn provider_spec_value_mut(&mut self) -> Result<&mut Value, ResourceDataError> {
        self.spec
            .template
            .machines_v1beta1_machine_openshift_io
            .as_mut()
            .and_then(|t| t.spec.provider_spec.value.as_mut())
            .ok_or(ResourceDataError::MissingData(
                "ControlPlaneMachineSet",
                "spec.template.machines_v1beta1_machine_openshift_io.spec.providerSpec.value".into(),
            ))
    }
}
