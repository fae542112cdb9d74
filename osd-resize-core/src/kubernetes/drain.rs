use std::{collections::BTreeSet, fmt::Display, time::Duration};

use anyhow::Context;
use k8s_openapi::api::core::v1::{Node, Pod};
use kube::{
    api::{DeleteParams, EvictParams, Patch, PatchParams},
    Api, Client,
};
use log::{debug, info};
use serde_json::json;

use super::{
    operations::list_cluster_resources,
    wait::{await_condition, PollSettings},
};
use crate::{resources::labels::get_node_pods_listparams, FIELD_MANAGER};

pub const DRAIN_POLL_SETTINGS: PollSettings =
    PollSettings::new(Duration::from_secs(5), Duration::from_secs(300));

const MIRROR_POD_ANNOTATION: &str = "kubernetes.io/config.mirror";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainMode {
    /// evict pods through the eviction API, honoring PodDisruptionBudgets
    Evict,
    /// delete pods immediately, bypassing PodDisruptionBudgets
    Force,
}

impl Display for DrainMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrainMode::Evict => f.write_str("drain"),
            DrainMode::Force => f.write_str("force drain"),
        }
    }
}

pub async fn cordon_node(client: &Client, node_name: &str) -> anyhow::Result<()> {
    let node_api: Api<Node> = Api::all(client.clone());
    let patch = json!({ "spec": { "unschedulable": true } });
    let patch_params = PatchParams {
        field_manager: Some(FIELD_MANAGER.to_owned()),
        ..Default::default()
    };

    node_api
        .patch(node_name, &patch_params, &Patch::Merge(&patch))
        .await
        .context(format!("Couldn't cordon '{node_name}' node!"))?;

    Ok(())
}

/// Mirror pods and DaemonSet pods would be recreated on the node right away.
pub fn is_drainable(pod: &Pod) -> bool {
    let is_mirror = pod
        .metadata
        .annotations
        .as_ref()
        .map(|a| a.contains_key(MIRROR_POD_ANNOTATION))
        .unwrap_or(false);
    let is_daemonset = pod
        .metadata
        .owner_references
        .as_ref()
        .map(|refs| refs.iter().any(|r| r.kind == "DaemonSet"))
        .unwrap_or(false);
    let is_finished = pod
        .status
        .as_ref()
        .and_then(|s| s.phase.as_deref())
        .map(|phase| phase == "Succeeded" || phase == "Failed")
        .unwrap_or(false);

    !is_mirror && !is_daemonset && !is_finished
}

pub async fn drain_node(
    client: &Client,
    node_name: &str,
    mode: DrainMode,
    settings: &PollSettings,
) -> anyhow::Result<()> {
    info!("Starting {mode} of '{node_name}' node...");

    cordon_node(client, node_name).await?;

    let pods = list_node_pods(client, node_name).await?;
    let pod_uids = pods
        .iter()
        .filter_map(|p| p.metadata.uid.clone())
        .collect::<BTreeSet<_>>();

    for pod in &pods {
        let (Some(name), Some(namespace)) = (&pod.metadata.name, &pod.metadata.namespace) else {
            continue;
        };
        let pod_api: Api<Pod> = Api::namespaced(client.clone(), namespace);

        debug!("Removing '{namespace}/{name}' pod ({mode})...");

        match mode {
            DrainMode::Evict => {
                pod_api
                    .evict(name, &EvictParams::default())
                    .await
                    .context(format!("Couldn't evict '{namespace}/{name}' pod!"))?;
            }
            DrainMode::Force => {
                let delete_params = DeleteParams {
                    grace_period_seconds: Some(0),
                    ..Default::default()
                };

                pod_api
                    .delete(name, &delete_params)
                    .await
                    .context(format!("Couldn't delete '{namespace}/{name}' pod!"))?;
            }
        }
    }

    await_condition(
        settings,
        &format!("pods to leave '{node_name}' node"),
        || async {
            let remaining = list_node_pods(client, node_name)
                .await?
                .iter()
                .filter(|p| {
                    p.metadata
                        .uid
                        .as_ref()
                        .map(|uid| pod_uids.contains(uid))
                        .unwrap_or(false)
                })
                .count();

            Ok(remaining == 0)
        },
    )
    .await?;

    info!("Node '{node_name}' drained!");

    Ok(())
}

async fn list_node_pods(client: &Client, node_name: &str) -> anyhow::Result<Vec<Pod>> {
    let pods =
        list_cluster_resources::<Pod>(client, &get_node_pods_listparams(node_name)).await?;

    Ok(pods.into_iter().filter(is_drainable).collect())
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use k8s_openapi::{
        api::core::v1::{Pod, PodStatus},
        apimachinery::pkg::apis::meta::v1::OwnerReference,
    };
    use kube::core::ObjectMeta;

    use super::is_drainable;

    fn pod(owner_kind: Option<&str>, phase: &str) -> Pod {
        Pod {
            metadata: ObjectMeta {
                name: Some("router-default-5d8f7".to_owned()),
                namespace: Some("openshift-ingress".to_owned()),
                owner_references: owner_kind.map(|kind| {
                    vec![OwnerReference {
                        kind: kind.to_owned(),
                        name: "owner".to_owned(),
                        ..Default::default()
                    }]
                }),
                ..Default::default()
            },
            status: Some(PodStatus {
                phase: Some(phase.to_owned()),
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    #[test]
    fn skips_daemonset_mirror_and_finished_pods() {
        let mut mirror = pod(None, "Running");
        mirror.metadata.annotations = Some(BTreeMap::from([(
            "kubernetes.io/config.mirror".to_owned(),
            "abc".to_owned(),
        )]));

        assert!(is_drainable(&pod(Some("ReplicaSet"), "Running")));
        assert!(is_drainable(&pod(None, "Pending")));
        assert!(!is_drainable(&pod(Some("DaemonSet"), "Running")));
        assert!(!is_drainable(&pod(Some("Job"), "Succeeded")));
        assert!(!is_drainable(&mirror));
    }
}
