use kube::api::ListParams;

pub const INFRA_NODE_ROLE_LABEL: &str = "node-role.kubernetes.io/infra";
pub const CLUSTER_ID_LABEL: &str = "api.openshift.com/id";
pub const MACHINE_ANNOTATION: &str = "machine.openshift.io/machine";
pub const INSTANCE_TYPE_LABEL: &str = "node.kubernetes.io/instance-type";

pub fn get_infra_node_listparams() -> ListParams {
    ListParams::default().labels(INFRA_NODE_ROLE_LABEL)
}

pub fn get_cluster_namespace_listparams(cluster_id: &str) -> ListParams {
    ListParams::default().labels(&format!("{CLUSTER_ID_LABEL}={cluster_id}"))
}

pub fn get_node_pods_listparams(node_name: &str) -> ListParams {
    ListParams::default().fields(&format!("spec.nodeName={node_name}"))
}
