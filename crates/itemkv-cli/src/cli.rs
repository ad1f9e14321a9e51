use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(name = "itemkv", about = "itemkv: generic item store over HTTP", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Command {
    /// Start the HTTP server
    Serve(ServeArgs),
    /// Print the effective configuration
    Config(ConfigArgs),
}

#[derive(Args)]
pub struct ServeArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Listen address, overrides the configuration
    #[arg(long)]
    pub bind: Option<SocketAddr>,
    /// Accepted API key (repeatable), replaces the configured list
    #[arg(long = "api-key")]
    pub api_keys: Vec<String>,
    /// Store key namespace, overrides the configuration
    #[arg(long)]
    pub key_prefix: Option<String>,
    /// Redis address (`host:port` or `redis://` URL); in-memory store when unset
    #[arg(long)]
    pub redis_addr: Option<String>,
}

#[derive(Args)]
pub struct ConfigArgs {
    /// TOML configuration file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
