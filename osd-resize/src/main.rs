use clap::Parser;
use cli::{ClusterCommands, Commands, GlobalArgs, LogLevel, ResizeCommands};
use commands::{resize_control_plane::resize_control_plane, resize_infra::resize_infra};
use context::ConfigContext;
use env_logger::Target;
use log::LevelFilter;

use crate::cli::Cli;

mod cli;
mod commands;
mod config;
mod context;

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    configure_logging(&cli.global_args);

    let context = ConfigContext::new(
        cli.global_args.kube_config.as_deref(),
        cli.global_args.config.as_deref(),
        cli.global_args.kube_context.as_deref(),
        cli.global_args.hive_context.as_deref(),
    )?;

    match cli.command {
        Commands::Cluster(ClusterCommands::Resize(command)) => match command {
            ResizeCommands::ControlPlane(args) => resize_control_plane(&context, &args).await?,
            ResizeCommands::Infra(args) => resize_infra(&context, &args).await?,
        },
    }

    Ok(())
}

fn configure_logging(global_args: &GlobalArgs) {
    let log_level = global_args.get_log_level();
    let mut logger = env_logger::builder();

    logger
        .format_timestamp(None)
        .format_module_path(matches!(log_level, LogLevel::Trace))
        .format_target(false)
        .format_level(false)
        .target(Target::Stderr);

    if let LogLevel::Normal = log_level {
        logger.filter(Some("osd_resize"), LevelFilter::Info);
    }

    if let LogLevel::Verbose = log_level {
        logger.filter(Some("osd_resize"), LevelFilter::Debug);
    }

    if let LogLevel::Trace = log_level {
        logger.filter(None, LevelFilter::Debug);
    }

    logger.init();
}
