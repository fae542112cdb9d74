use derive_builder::Builder;

pub mod control_plane;
pub mod infra;
pub mod notify;
pub mod planner;
pub mod prompt;
pub mod recovery;
pub mod target;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResizeScope {
    ControlPlane { machine_type: String },
    Infra { override_instance_type: Option<String> },
}

/// A single resize invocation. Built once and never modified afterwards.
#[derive(Debug, Clone, Builder)]
#[builder(build_fn(validate = "Self::validate"))]
pub struct ResizeRequest {
    #[builder(setter(into))]
    cluster_id: String,
    #[builder(setter(into))]
    reason: String,
    scope: ResizeScope,
}

impl ResizeRequestBuilder {
    fn validate(&self) -> Result<(), String> {
        if matches!(&self.cluster_id, Some(id) if id.trim().is_empty()) {
            return Err("Cluster ID can't be empty!".to_owned());
        }

        if matches!(&self.reason, Some(reason) if reason.trim().is_empty()) {
            return Err("A reason is required to resize cluster nodes!".to_owned());
        }

        match &self.scope {
            Some(ResizeScope::ControlPlane { machine_type }) if machine_type.trim().is_empty() => {
                Err("Machine type can't be empty!".to_owned())
            }
            Some(ResizeScope::Infra {
                override_instance_type: Some(instance_type),
            }) if instance_type.trim().is_empty() => {
                Err("Instance type override can't be empty!".to_owned())
            }
            _ => Ok(()),
        }
    }
}

impl ResizeRequest {
    pub fn cluster_id(&self) -> &str {
        &self.cluster_id
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }

    pub fn scope(&self) -> &ResizeScope {
        &self.scope
    }

    pub fn is_control_plane(&self) -> bool {
        matches!(self.scope, ResizeScope::ControlPlane { .. })
    }
}
