use anyhow::anyhow;
use log::info;
use osd_resize_core::{
    resize::{
        infra::{InfraDriver, InfraOutcome, KubeInfra},
        notify::offer_service_log,
        planner::InfraResizePlan,
        prompt::Prompter,
        target::{find_infra_id, find_infra_pool, resolve_cluster},
        ResizeRequestBuilder, ResizeScope,
    },
    resources::machinepool::MachinePoolSnapshot,
};

use crate::{cli::ResizeInfraArgs, context::ConfigContext};

pub async fn resize_infra(context: &ConfigContext, args: &ResizeInfraArgs) -> anyhow::Result<()> {
    let mut prompter = Prompter::stdio();

    let reason = match &args.reason {
        Some(reason) => reason.clone(),
        None => prompter.read_non_empty("Reason for resizing infra nodes (e.g. ticket link): ")?,
    };

    let request = ResizeRequestBuilder::default()
        .cluster_id(&args.cluster_id)
        .reason(reason)
        .scope(ResizeScope::Infra {
            override_instance_type: args.instance_type.clone(),
        })
        .build()?;

    let ocm = context.create_ocm_connection()?;
    let cluster = resolve_cluster(&ocm, &request).await?;

    let hive = context.create_hive_clients(request.reason()).await?;
    let pool = find_infra_pool(&hive.standard, &cluster.info.id).await?;
    let snapshot = MachinePoolSnapshot::capture(&pool)?;

    if snapshot.provider() != cluster.provider {
        return Err(anyhow!(
            "MachinePool '{}' is configured for {}, but the cluster runs on {}!",
            snapshot.name(),
            snapshot.provider(),
            cluster.provider
        ));
    }

    let infra_id = find_infra_id(&hive.standard, &pool).await?;
    let plan = InfraResizePlan::new(snapshot, &infra_id, args.instance_type.as_deref())?;

    info!(
        "Resizing infra nodes of '{}' from '{}' to '{}'...",
        cluster.info.name,
        plan.original().instance_type(),
        plan.target_instance_type()
    );

    let clients = context.create_cluster_clients(request.reason()).await?;
    let api = KubeInfra::new(hive, clients);

    let outcome = InfraDriver::new(&api, &plan).run(&mut prompter).await?;

    if outcome == InfraOutcome::Done {
        offer_service_log(
            &mut prompter,
            &ocm,
            &cluster.info.id,
            &context.resize_config().service_logs.infra,
            plan.target_instance_type(),
        )
        .await?;
    }

    Ok(())
}
