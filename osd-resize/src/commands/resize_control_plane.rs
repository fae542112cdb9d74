use log::info;
use osd_resize_core::resize::{
    control_plane::{ControlPlaneDriver, ControlPlanePhase, KubeControlPlane},
    notify::offer_service_log,
    prompt::Prompter,
    target::resolve_cluster,
    ResizeRequestBuilder, ResizeScope,
};

use crate::{cli::ResizeControlPlaneArgs, context::ConfigContext};

pub async fn resize_control_plane(
    context: &ConfigContext,
    args: &ResizeControlPlaneArgs,
) -> anyhow::Result<()> {
    let request = ResizeRequestBuilder::default()
        .cluster_id(&args.cluster_id)
        .reason(&args.reason)
        .scope(ResizeScope::ControlPlane {
            machine_type: args.machine_type.clone(),
        })
        .build()?;

    let ocm = context.create_ocm_connection()?;
    let cluster = resolve_cluster(&ocm, &request).await?;
    let clients = context.create_cluster_clients(request.reason()).await?;
    let api = KubeControlPlane::new(clients);
    let mut prompter = Prompter::stdio();

    info!(
        "Resizing control plane nodes of '{}' to '{}'...",
        cluster.info.name, args.machine_type
    );

    let phase = ControlPlaneDriver::new(&api, cluster.provider, &args.machine_type)
        .run(&mut prompter)
        .await?;

    if phase == ControlPlanePhase::Quiesced {
        info!("Control plane nodes were resized successfully!");

        offer_service_log(
            &mut prompter,
            &ocm,
            &cluster.info.id,
            &context.resize_config().service_logs.control_plane,
            &args.machine_type,
        )
        .await?;
    }

    Ok(())
}
