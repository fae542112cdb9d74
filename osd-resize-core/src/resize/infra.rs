use std::{
    io::{BufRead, Write},
    time::Duration,
};

use anyhow::{anyhow, Context};
use async_trait::async_trait;
use k8s_openapi::api::core::v1::Node;
use kube::api::{DeleteParams, PostParams};
use log::{debug, info, warn};

use super::{
    planner::InfraResizePlan,
    prompt::Prompter,
    recovery::{run_with_recovery, RecoveryOptions, RecoveryOutcome},
    target::ClientPair,
};
use crate::{
    kubernetes::{
        drain::{drain_node, DrainMode, DRAIN_POLL_SETTINGS},
        operations::{create_resource, list_cluster_resources, try_get_resource, try_remove_resource},
        wait::{await_condition, PollSettings},
    },
    resources::{
        labels::get_infra_node_listparams,
        machinepool::MachinePool,
        node::{
            count_available_nodes, get_node_instance_type, is_node_available,
            node_belongs_to_pool,
        },
    },
    FIELD_MANAGER,
};

pub const INFRA_POLL_SETTINGS: PollSettings =
    PollSettings::new(Duration::from_secs(20), Duration::from_secs(20 * 60));

/// Steps of the infra resize. The order of variants is the order of execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum PhaseState {
    Planning,
    TempPoolCreating,
    WaitingDoubleCapacity,
    OriginalPoolDeleting,
    WaitingOriginalRemoved,
    PermanentPoolCreating,
    WaitingDoubleCapacity2,
    TempPoolDeleting,
    WaitingTempRemoved,
    WaitingNormalCapacity,
    Done,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfraOutcome {
    Done,
    Aborted,
}

/// MachinePools live on the Hive shard, nodes on the target cluster.
#[async_trait]
pub trait InfraApi: Send + Sync {
    async fn get_machine_pool(&self, namespace: &str, name: &str)
        -> anyhow::Result<Option<MachinePool>>;
    async fn create_machine_pool(&self, pool: &MachinePool) -> anyhow::Result<()>;
    async fn delete_machine_pool(&self, namespace: &str, name: &str) -> anyhow::Result<()>;
    async fn list_infra_nodes(&self) -> anyhow::Result<Vec<Node>>;
    async fn drain_node(&self, name: &str, mode: DrainMode) -> anyhow::Result<()>;
}

pub struct KubeInfra {
    hive: ClientPair,
    cluster: ClientPair,
    drain_settings: PollSettings,
}

impl KubeInfra {
    pub fn new(hive: ClientPair, cluster: ClientPair) -> Self {
        Self {
            hive,
            cluster,
            drain_settings: DRAIN_POLL_SETTINGS,
        }
    }
}

#[async_trait]
impl InfraApi for KubeInfra {
    async fn get_machine_pool(
        &self,
        namespace: &str,
        name: &str,
    ) -> anyhow::Result<Option<MachinePool>> {
        try_get_resource::<MachinePool>(&self.hive.standard, name, namespace).await
    }

    async fn create_machine_pool(&self, pool: &MachinePool) -> anyhow::Result<()> {
        let post_params = PostParams {
            field_manager: Some(FIELD_MANAGER.to_owned()),
            ..Default::default()
        };

        debug!("{pool:#?}");

        create_resource(&self.hive.elevated, pool, &post_params).await
    }

    async fn delete_machine_pool(&self, namespace: &str, name: &str) -> anyhow::Result<()> {
        let removed = try_remove_resource::<MachinePool>(
            &self.hive.elevated,
            name,
            namespace,
            &DeleteParams::default(),
        )
        .await?;

        if !removed {
            warn!("MachinePool '{namespace}/{name}' was already gone!");
        }

        Ok(())
    }

    async fn list_infra_nodes(&self) -> anyhow::Result<Vec<Node>> {
        list_cluster_resources::<Node>(&self.cluster.standard, &get_infra_node_listparams()).await
    }

    async fn drain_node(&self, name: &str, mode: DrainMode) -> anyhow::Result<()> {
        drain_node(&self.cluster.elevated, name, mode, &self.drain_settings).await
    }
}

/// Replaces the infra pool through a temporary pool, keeping at least the original capacity
/// available at every step.
pub struct InfraDriver<'a, A> {
    api: &'a A,
    plan: &'a InfraResizePlan,
    settings: PollSettings,
    phase: PhaseState,
}

impl<'a, A: InfraApi> InfraDriver<'a, A> {
    pub fn new(api: &'a A, plan: &'a InfraResizePlan) -> Self {
        Self {
            api,
            plan,
            settings: INFRA_POLL_SETTINGS,
            phase: PhaseState::Planning,
        }
    }

    pub fn with_poll_settings(mut self, settings: PollSettings) -> Self {
        self.settings = settings;

        self
    }

    pub fn phase(&self) -> PhaseState {
        self.phase
    }

    fn advance(&mut self, next: PhaseState) -> anyhow::Result<()> {
        if next <= self.phase {
            return Err(anyhow!(
                "Infra resize can't go back from {:?} to {next:?}!",
                self.phase
            ));
        }

        info!("Infra resize: {next:?}");
        self.phase = next;

        Ok(())
    }

    pub async fn run<R: BufRead, W: Write>(
        &mut self,
        prompter: &mut Prompter<R, W>,
    ) -> anyhow::Result<InfraOutcome> {
        let plan = self.plan;
        let original = plan.original();
        let namespace = original.namespace();

        let question = format!(
            "Replace {} '{}' infra nodes of '{}' pool with '{}' ones?",
            original.replicas(),
            original.instance_type(),
            original.name(),
            plan.target_instance_type()
        );

        if !prompter.confirm(&question)? {
            warn!("Infra resize aborted, nothing was changed.");

            return Ok(InfraOutcome::Aborted);
        }

        warn!("The infra resize can't be resumed once started! If it fails midway, the MachinePools have to be fixed by hand.");

        self.advance(PhaseState::TempPoolCreating)?;
        self.api.create_machine_pool(plan.temporary_pool()).await?;

        self.advance(PhaseState::WaitingDoubleCapacity)?;
        self.await_double_capacity(&plan.temporary_pool().spec.name)
            .await?;

        self.advance(PhaseState::OriginalPoolDeleting)?;
        self.drain_pool(prompter, original.pool_name()).await?;
        self.api
            .delete_machine_pool(namespace, original.name())
            .await?;

        self.advance(PhaseState::WaitingOriginalRemoved)?;
        self.await_pool_removed(original.name()).await?;

        self.advance(PhaseState::PermanentPoolCreating)?;
        self.api.create_machine_pool(plan.permanent_pool()).await?;

        self.advance(PhaseState::WaitingDoubleCapacity2)?;
        self.await_double_capacity(original.pool_name()).await?;

        self.advance(PhaseState::TempPoolDeleting)?;
        self.drain_pool(prompter, &plan.temporary_pool().spec.name)
            .await?;
        self.api
            .delete_machine_pool(namespace, plan.temporary_pool_name())
            .await?;

        self.advance(PhaseState::WaitingTempRemoved)?;
        self.await_pool_removed(plan.temporary_pool_name()).await?;

        self.advance(PhaseState::WaitingNormalCapacity)?;
        self.await_normal_capacity().await?;

        self.advance(PhaseState::Done)?;

        info!(
            "Infra nodes of '{}' now run on '{}' instances!",
            original.name(),
            plan.target_instance_type()
        );

        Ok(InfraOutcome::Done)
    }

    async fn drain_pool<R: BufRead, W: Write>(
        &self,
        prompter: &mut Prompter<R, W>,
        pool_name: &str,
    ) -> anyhow::Result<()> {
        let api = self.api;
        let infra_id = self.plan.infra_id();
        let nodes = api
            .list_infra_nodes()
            .await
            .context(format!("Couldn't list nodes of '{pool_name}' pool!"))?;
        let node_names = nodes
            .iter()
            .filter(|n| node_belongs_to_pool(n, infra_id, pool_name))
            .filter_map(|n| n.metadata.name.clone())
            .collect::<Vec<_>>();

        info!("Draining {} nodes of '{pool_name}' pool...", node_names.len());

        for name in &node_names {
            let outcome = run_with_recovery(
                prompter,
                &format!("Drain of '{name}' node"),
                RecoveryOptions::RetrySkipForceCancel,
                |escalation| api.drain_node(name, escalation.into()),
            )
            .await?;

            if outcome == RecoveryOutcome::Skipped {
                warn!("Node '{name}' wasn't drained, its pods will be evicted by the machine deletion.");
            }
        }

        Ok(())
    }

    /// Waits until `pool_name` alone provides the original node count on the new instance type
    /// and twice that many infra nodes accept pods. Cordoned nodes don't count.
    async fn await_double_capacity(&self, pool_name: &str) -> anyhow::Result<()> {
        let plan = self.plan;
        let api = self.api;
        let replacement_target = plan.normal_capacity();
        let total_target = plan.double_capacity();

        await_condition(
            &self.settings,
            &format!("{total_target} available infra nodes"),
            || async move {
                let nodes = api.list_infra_nodes().await?;
                let replacement = count_replacement_nodes(&nodes, plan, pool_name);
                let available = count_available_nodes(&nodes);
                info!(
                    "{replacement}/{replacement_target} '{pool_name}' nodes ready, {available}/{total_target} infra nodes available."
                );

                Ok(replacement >= replacement_target && available >= total_target)
            },
        )
        .await
        .context(self.stalled_message())
    }

    async fn await_pool_removed(&self, name: &str) -> anyhow::Result<()> {
        let api = self.api;
        let namespace = self.plan.original().namespace();

        await_condition(
            &self.settings,
            &format!("'{name}' MachinePool to be removed"),
            || async move { Ok(api.get_machine_pool(namespace, name).await?.is_none()) },
        )
        .await
        .context(self.stalled_message())
    }

    /// Waits until the only infra nodes left are the permanent pool's new ones.
    async fn await_normal_capacity(&self) -> anyhow::Result<()> {
        let plan = self.plan;
        let api = self.api;
        let pool_name = plan.original().pool_name();
        let target = plan.normal_capacity();

        await_condition(
            &self.settings,
            &format!("infra node count to settle at {target}"),
            || async move {
                let nodes = api.list_infra_nodes().await?;
                let permanent = count_replacement_nodes(&nodes, plan, pool_name);
                info!(
                    "{} infra nodes left, {permanent}/{target} of them from the resized pool.",
                    nodes.len()
                );

                Ok(nodes.len() == target && permanent == target)
            },
        )
        .await
        .context(self.stalled_message())
    }

    fn stalled_message(&self) -> String {
        format!(
            "Infra resize stopped at {:?}! Inspect the MachinePools in '{}' namespace and finish the resize by hand.",
            self.phase,
            self.plan.original().namespace()
        )
    }
}

/// Available nodes of `pool_name` already running the target instance type.
fn count_replacement_nodes(nodes: &[Node], plan: &InfraResizePlan, pool_name: &str) -> usize {
    nodes
        .iter()
        .filter(|n| is_node_available(n))
        .filter(|n| node_belongs_to_pool(n, plan.infra_id(), pool_name))
        .filter(|n| get_node_instance_type(n) == Some(plan.target_instance_type()))
        .count()
}
