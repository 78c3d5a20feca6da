use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "fnapi", about = "fnapi control-plane API server", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// TOML config file; defaults apply when omitted
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP API on an in-memory backend
    Serve(ServeArgs),
    /// Print the effective configuration as TOML
    Config,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Override the configured bind address
    #[arg(short, long)]
    pub bind: Option<SocketAddr>,
}
