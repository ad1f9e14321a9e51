use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use colored::Colorize;
use itemkv_repo::{ItemRepository, KeySpace};
use itemkv_server::{ItemServer, ServerConfig};
use itemkv_store::{InMemoryKvStore, KvStore, RedisKvStore};

use crate::cli::{Cli, Command, ConfigArgs, ServeArgs};

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(args) => cmd_serve(args).await,
        Command::Config(args) => cmd_config(args),
    }
}

/// Layer file, environment (via `lookup`) and flags, then validate the result once.
fn resolve_config<F>(path: Option<&Path>, args: &ServeArgs, lookup: F) -> anyhow::Result<ServerConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = ServerConfig::load_with_env(path, lookup).context("loading configuration")?;
    if let Some(bind) = args.bind {
        config.bind_addr = bind;
    }
    if !args.api_keys.is_empty() {
        config.api_keys = args.api_keys.clone();
    }
    if let Some(prefix) = &args.key_prefix {
        config.key_prefix = prefix.clone();
    }
    if let Some(addr) = &args.redis_addr {
        config.redis_addr = Some(addr.clone());
    }
    config.validate()?;
    Ok(config)
}

async fn open_store(config: &ServerConfig) -> anyhow::Result<Arc<dyn KvStore>> {
    match config.redis_url() {
        Some(url) => {
            let store = RedisKvStore::connect(&url)
                .await
                .context("connecting to redis")?;
            tracing::info!(backend = "redis", "store ready");
            Ok(Arc::new(store))
        }
        None => {
            tracing::info!(backend = "memory", "store ready");
            Ok(Arc::new(InMemoryKvStore::new()))
        }
    }
}

async fn cmd_serve(args: ServeArgs) -> anyhow::Result<()> {
    let config = resolve_config(args.config.as_deref(), &args, |name| std::env::var(name).ok())?;
    let store = open_store(&config).await?;
    let repo = ItemRepository::new(store, KeySpace::new(&config.key_prefix));
    tracing::info!(
        bind = %config.bind_addr,
        api_keys = config.api_keys.len(),
        key_prefix = %config.key_prefix,
        "starting itemkv"
    );
    ItemServer::new(config, repo).serve().await?;
    Ok(())
}

fn cmd_config(args: ConfigArgs) -> anyhow::Result<()> {
    let config = ServerConfig::load(args.config.as_deref()).context("loading configuration")?;
    println!("{} Configuration is valid.", "✓".green().bold());
    print!("{}", config.to_redacted_toml()?);
    Ok(())
}
