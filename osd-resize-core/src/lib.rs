pub mod helpers;
pub mod kubernetes;
pub mod ocm;
pub mod resize;
pub mod resources;

pub const FIELD_MANAGER: &str = "osd-resize";

pub const MACHINE_API_NAMESPACE: &str = "openshift-machine-api";
pub const CONTROL_PLANE_MACHINE_SET_NAME: &str = "cluster";
pub const INFRA_MACHINE_POOL_NAME: &str = "infra";
