use anyhow::{anyhow, Context};
use k8s_openapi::api::core::v1::Namespace;
use kube::{api::ListParams, config::Kubeconfig, Client};
use log::{debug, info};
use regex::Regex;

use super::ResizeRequest;
use crate::{
    helpers::RequireMetadata,
    kubernetes::operations::{
        create_client, create_elevated_client, list_cluster_resources, list_resources,
        try_get_resource, Elevation,
    },
    ocm::{ClusterInfo, ClusterManager},
    resources::{
        clusterdeployment::ClusterDeployment, labels::get_cluster_namespace_listparams,
        machinepool::MachinePool, provider_spec::CloudProvider,
    },
    INFRA_MACHINE_POOL_NAME,
};

pub const CLUSTER_ID_PATTERN: &str = r"^[a-zA-Z0-9][a-zA-Z0-9_-]*[a-zA-Z0-9]$";

/// Reads go through `standard`, every mutation through `elevated`.
#[derive(Clone)]
pub struct ClientPair {
    pub standard: Client,
    pub elevated: Client,
}

impl ClientPair {
    pub async fn connect(
        kube_config: &Kubeconfig,
        context: &str,
        elevation: &Elevation,
    ) -> anyhow::Result<Self> {
        let standard = create_client(kube_config, context)
            .await
            .context(format!("Couldn't create a client for '{context}' context!"))?;
        let elevated = create_elevated_client(kube_config, context, elevation)
            .await
            .context(format!(
                "Couldn't create an elevated client for '{context}' context!"
            ))?;

        Ok(Self { standard, elevated })
    }
}

#[derive(Debug, Clone)]
pub struct ResolvedCluster {
    pub info: ClusterInfo,
    pub provider: CloudProvider,
}

pub fn validate_cluster_identifier(identifier: &str) -> anyhow::Result<()> {
    let pattern = Regex::new(CLUSTER_ID_PATTERN)?;

    if !pattern.is_match(identifier) {
        return Err(anyhow!(
            "'{identifier}' isn't a valid cluster identifier! It may contain only alphanumerics, '-' and '_', and must start and end with an alphanumeric character."
        ));
    }

    Ok(())
}

pub async fn resolve_cluster(
    manager: &dyn ClusterManager,
    request: &ResizeRequest,
) -> anyhow::Result<ResolvedCluster> {
    validate_cluster_identifier(request.cluster_id())?;

    let info = manager
        .find_cluster(request.cluster_id())
        .await
        .context("Couldn't resolve the target cluster!")?;

    debug!("{info:#?}");

    if request.is_control_plane() && info.hosted_control_plane {
        return Err(anyhow!(
            "Cluster '{}' has a hosted control plane, its control plane nodes can't be resized this way!",
            info.name
        ));
    }

    let provider = info.cloud_provider.parse::<CloudProvider>()?;

    info!(
        "Resolved cluster '{}' ({}) on {provider}.",
        info.name, info.id
    );

    Ok(ResolvedCluster { info, provider })
}

pub fn select_cluster_namespace(
    cluster_id: &str,
    namespaces: &[Namespace],
) -> anyhow::Result<String> {
    match namespaces {
        [namespace] => Ok(namespace
            .require_name_or(anyhow!("Cluster namespace is missing a name!"))?
            .to_owned()),
        [] => Err(anyhow!(
            "Couldn't find a Hive namespace for cluster '{cluster_id}'!"
        )),
        _ => Err(anyhow!(
            "Found {} Hive namespaces labeled for cluster '{cluster_id}', expected exactly one!",
            namespaces.len()
        )),
    }
}

pub fn select_infra_pool(namespace: &str, pools: Vec<MachinePool>) -> anyhow::Result<MachinePool> {
    pools
        .into_iter()
        .find(|p| p.spec.name == INFRA_MACHINE_POOL_NAME)
        .ok_or_else(|| {
            anyhow!("Couldn't find '{INFRA_MACHINE_POOL_NAME}' MachinePool in '{namespace}' namespace!")
        })
}

/// Looks the cluster's infra MachinePool up on the Hive shard.
pub async fn find_infra_pool(hive: &Client, cluster_id: &str) -> anyhow::Result<MachinePool> {
    let namespaces = list_cluster_resources::<Namespace>(
        hive,
        &get_cluster_namespace_listparams(cluster_id),
    )
    .await?;
    let namespace = select_cluster_namespace(cluster_id, &namespaces)?;

    debug!("Cluster '{cluster_id}' lives in '{namespace}' Hive namespace.");

    let pools =
        list_resources::<MachinePool>(hive, &namespace, &ListParams::default()).await?;

    select_infra_pool(&namespace, pools)
}

/// Infra ID of the ClusterDeployment owning `pool`. Machine names start with it.
pub async fn find_infra_id(hive: &Client, pool: &MachinePool) -> anyhow::Result<String> {
    let namespace = pool.require_namespace_or(anyhow!("MachinePool is missing a namespace!"))?;
    let name = &pool.spec.cluster_deployment_ref.name;

    let deployment = try_get_resource::<ClusterDeployment>(hive, name, namespace)
        .await?
        .ok_or_else(|| anyhow!("Couldn't find '{name}' ClusterDeployment in '{namespace}' namespace!"))?;
    let infra_id = deployment.get_infra_id()?.to_owned();

    debug!("Cluster machines are prefixed with '{infra_id}'.");

    Ok(infra_id)
}
