use anyhow::Context as _;
use colored::Colorize;

use fnapi_hooks::HookRegistry;
use fnapi_server::{FnServer, ServerConfig};

use crate::cli::{Cli, Command, ServeArgs};

/// Resolve the configuration the command will run with: the file named by
/// `--config` (or defaults), then command-line overrides.
pub fn effective_config(cli: &Cli) -> anyhow::Result<ServerConfig> {
    let mut config = match &cli.config {
        Some(path) => ServerConfig::load(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ServerConfig::default(),
    };
    if let Command::Serve(ServeArgs { bind: Some(bind) }) = &cli.command {
        config.bind_addr = *bind;
    }
    config.check()?;
    Ok(config)
}

pub async fn run_command(cli: Cli, config: ServerConfig) -> anyhow::Result<()> {
    match cli.command {
        Command::Serve(_) => serve(config).await,
        Command::Config => {
            print!("{}", config.to_toml()?);
            Ok(())
        }
    }
}

async fn serve(config: ServerConfig) -> anyhow::Result<()> {
    tracing::info!(
        bind = %config.bind_addr,
        timeout_secs = config.request_timeout_secs,
        validate = config.validate,
        trace = config.trace,
        "starting fnapi"
    );
    println!(
        "{} fnapi listening on {} (validate: {}, trace: {})",
        "✓".green().bold(),
        config.bind_addr.to_string().bold(),
        flag(config.validate),
        flag(config.trace),
    );
    FnServer::in_memory(config, HookRegistry::new())
        .serve()
        .await
        .context("server stopped")
}

fn flag(on: bool) -> colored::ColoredString {
    if on {
        "on".green()
    } else {
        "off".yellow()
    }
}
