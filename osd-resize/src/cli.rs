use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(version, about)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
    #[command(flatten)]
    pub global_args: GlobalArgs,
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// override default kubeconfig
    #[arg(long, global = true)]
    pub kube_config: Option<PathBuf>,
    /// kubeconfig context of the target cluster (current context if unset)
    #[arg(long, global = true)]
    pub kube_context: Option<String>,
    /// kubeconfig context of the Hive shard managing the cluster (required for infra resizes)
    #[arg(long, global = true)]
    pub hive_context: Option<String>,
    /// override default resize-config location (next to the kubeconfig)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
    /// enable verbose output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose_logging: bool,
    /// enable trace output (more detailed than verbose, overrides it if present)
    #[arg(long = "trace", global = true)]
    pub trace_logging: bool,
}

impl GlobalArgs {
    pub fn get_log_level(&self) -> LogLevel {
        if self.trace_logging {
            return LogLevel::Trace;
        }

        if self.verbose_logging {
            return LogLevel::Verbose;
        }

        LogLevel::Normal
    }
}

pub enum LogLevel {
    Normal,
    Verbose,
    Trace,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// manage OpenShift Dedicated clusters
    #[command(subcommand)]
    Cluster(ClusterCommands),
}

#[derive(Debug, Subcommand)]
pub enum ClusterCommands {
    /// resize cluster nodes
    #[command(subcommand)]
    Resize(ResizeCommands),
}

#[derive(Debug, Subcommand)]
pub enum ResizeCommands {
    /// resize control plane nodes through the ControlPlaneMachineSet
    #[command(alias = "cp")]
    ControlPlane(ResizeControlPlaneArgs),
    /// resize infra nodes by swapping the infra MachinePool
    Infra(ResizeInfraArgs),
}

#[derive(Debug, Args)]
pub struct ResizeControlPlaneArgs {
    /// internal ID, external ID or name of the cluster
    #[arg(short = 'C', long)]
    pub cluster_id: String,
    /// instance type the control plane nodes should run on
    #[arg(long)]
    pub machine_type: String,
    /// justification recorded with every elevated action (e.g. a ticket link)
    #[arg(long)]
    pub reason: String,
}

#[derive(Debug, Args)]
pub struct ResizeInfraArgs {
    /// internal ID, external ID or name of the cluster
    #[arg(short = 'C', long)]
    pub cluster_id: String,
    /// instance type to use instead of the next size up
    #[arg(long)]
    pub instance_type: Option<String>,
    /// justification recorded with every elevated action, prompted for if unset
    #[arg(long)]
    pub reason: Option<String>,
}
