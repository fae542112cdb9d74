use k8s_openapi::api::core::v1::Node;

use super::labels::{INSTANCE_TYPE_LABEL, MACHINE_ANNOTATION};

pub fn is_node_ready(node: &Node) -> bool {
    node.status
        .as_ref()
        .and_then(|s| s.conditions.as_ref())
        .map(|conditions| {
            conditions
                .iter()
                .any(|c| c.type_ == "Ready" && c.status == "True")
        })
        .unwrap_or(false)
}

pub fn is_node_cordoned(node: &Node) -> bool {
    node.spec
        .as_ref()
        .and_then(|s| s.unschedulable)
        .unwrap_or(false)
}

/// Ready and accepting new pods.
pub fn is_node_available(node: &Node) -> bool {
    is_node_ready(node) && !is_node_cordoned(node)
}

pub fn count_available_nodes(nodes: &[Node]) -> usize {
    nodes.iter().filter(|n| is_node_available(n)).count()
}

pub fn get_node_instance_type(node: &Node) -> Option<&str> {
    node.metadata
        .labels
        .as_ref()?
        .get(INSTANCE_TYPE_LABEL)
        .map(String::as_str)
}

/// Name of the Machine backing this node, without the namespace prefix.
pub fn get_node_machine_name(node: &Node) -> Option<&str> {
    let machine = node.metadata.annotations.as_ref()?.get(MACHINE_ANNOTATION)?;

    Some(machine.rsplit('/').next().unwrap_or(machine))
}

/// Machines created for a Hive MachinePool are named `<infra-id>-<pool>-<zone>-<suffix>`.
pub fn node_belongs_to_pool(node: &Node, infra_id: &str, pool_name: &str) -> bool {
    get_node_machine_name(node)
        .and_then(|machine| machine.strip_prefix(infra_id))
        .and_then(|rest| rest.strip_prefix('-'))
        .and_then(|rest| rest.strip_prefix(pool_name))
        .map(|rest| rest.starts_with('-'))
        .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::api::core::v1::{Node, NodeCondition, NodeSpec, NodeStatus};
    use kube::core::ObjectMeta;

    use super::{
        count_available_nodes, get_node_instance_type, get_node_machine_name, is_node_ready,
        node_belongs_to_pool,
    };

    fn node(machine: &str, ready: &str) -> Node {
        Node {
            metadata: ObjectMeta {
                name: Some(machine.to_owned()),
                annotations: Some(BTreeMap::from([(
                    "machine.openshift.io/machine".to_owned(),
                    format!("openshift-machine-api/{machine}"),
                )])),
                ..Default::default()
            },
            status: Some(NodeStatus {
                conditions: Some(vec![NodeCondition {
                    type_: "Ready".to_owned(),
                    status: ready.to_owned(),
                    ..Default::default()
                }]),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn counts_only_ready_nodes() {
        let nodes = vec![
            node("abc-infra-us-east-1a-1", "True"),
            node("abc-infra-us-east-1b-2", "False"),
            node("abc-infra-us-east-1c-3", "Unknown"),
            Node::default(),
        ];

        assert_eq!(nodes.iter().filter(|n| is_node_ready(n)).count(), 1);
    }

    #[test]
    fn pool_membership_distinguishes_temporary_pool() {
        let original = node("abc-infra-us-east-1a-x7k2p", "True");
        let temporary = node("abc-infra2-us-east-1a-q9d8s", "True");

        assert_eq!(
            get_node_machine_name(&original),
            Some("abc-infra-us-east-1a-x7k2p")
        );
        assert!(node_belongs_to_pool(&original, "abc", "infra"));
        assert!(!node_belongs_to_pool(&original, "abc", "infra2"));
        assert!(node_belongs_to_pool(&temporary, "abc", "infra2"));
        assert!(!node_belongs_to_pool(&temporary, "abc", "infra"));
        assert!(!node_belongs_to_pool(&Node::default(), "abc", "infra"));
    }

    #[test]
    fn pool_name_inside_infra_id_is_not_a_match() {
        let infra_id = "data-infra-prod-x7k2p";
        let original = node("data-infra-prod-x7k2p-infra-us-east-1a-x7k2p", "True");
        let temporary = node("data-infra-prod-x7k2p-infra2-us-east-1a-q9d8s", "True");

        assert!(!node_belongs_to_pool(&temporary, infra_id, "infra"));
        assert!(node_belongs_to_pool(&temporary, infra_id, "infra2"));
        assert!(node_belongs_to_pool(&original, infra_id, "infra"));
        assert!(!node_belongs_to_pool(&original, "other-cluster-a1b2c", "infra"));
    }

    #[test]
    fn cordoned_nodes_are_not_available() {
        let mut cordoned = node("abc-infra-us-east-1a-1", "True");
        cordoned.spec = Some(NodeSpec {
            unschedulable: Some(true),
            ..Default::default()
        });
        let nodes = vec![cordoned, node("abc-infra-us-east-1a-2", "True")];

        assert!(nodes.iter().all(is_node_ready));
        assert_eq!(count_available_nodes(&nodes), 1);
    }

    #[test]
    fn instance_type_comes_from_the_well_known_label() {
        let mut labeled = node("abc-infra-us-east-1a-1", "True");
        labeled.metadata.labels = Some(BTreeMap::from([(
            "node.kubernetes.io/instance-type".to_owned(),
            "r5.xlarge".to_owned(),
        )]));

        assert_eq!(get_node_instance_type(&labeled), Some("r5.xlarge"));
        assert_eq!(get_node_instance_type(&Node::default()), None);
    }
}
