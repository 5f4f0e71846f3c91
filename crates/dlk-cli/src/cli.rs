use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "dlk",
    about = "DataLab kernel: workspace inspection, migration and peer hosting",
    version,
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Discover the workspace backend and show its status
    Status(StatusArgs),
    /// List the entries of a workspace file
    Inspect(InspectArgs),
    /// Load a workspace file and migrate it to a running peer
    Push(PushArgs),
    /// Copy every entry of the discovered workspace into a file
    Export(ExportArgs),
    /// Run the peer host (web API and RPC channel)
    Serve(ServeArgs),
}

/// Kernel configuration file; environment variables override it.
#[derive(Args, Default)]
pub struct KernelArgs {
    #[arg(long = "kernel-config")]
    pub kernel_config: Option<PathBuf>,
}

#[derive(Args)]
pub struct StatusArgs {
    #[command(flatten)]
    pub kernel: KernelArgs,
}

#[derive(Args)]
pub struct InspectArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct PushArgs {
    pub file: PathBuf,
    /// Web API base URL; without it the RPC peer is used
    #[arg(long)]
    pub url: Option<String>,
    #[arg(long)]
    pub token: Option<String>,
    #[command(flatten)]
    pub kernel: KernelArgs,
}

#[derive(Args)]
pub struct ExportArgs {
    pub file: PathBuf,
    #[command(flatten)]
    pub kernel: KernelArgs,
}

#[derive(Args)]
pub struct ServeArgs {
    #[arg(long)]
    pub http: Option<SocketAddr>,
    #[arg(long)]
    pub rpc: Option<SocketAddr>,
    #[arg(long)]
    pub token: Option<String>,
    /// Server configuration file (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,
}
