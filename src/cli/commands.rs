use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use crate::demo::{build_server, DemoConfig};
use crate::otel::{init_logging, LogConfig};
use crate::runtime_config::RuntimeConfig;
use crate::server::{AppService, HttpServer};
use crate::static_files::StaticFiles;

/// Command-line interface for the demo server
#[derive(Debug, Parser)]
#[command(name = "sprig")]
#[command(about = "Prefix-tree router demo server", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the demo tracks API
    Serve(ServeArgs),
    /// Print the demo's registered routes
    Routes,
}

#[derive(Debug, Args)]
pub struct ServeArgs {
    /// YAML runtime configuration file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[arg(long)]
    pub host: Option<String>,

    #[arg(short, long)]
    pub port: Option<u16>,

    /// Directory served for `/assets/*` and unmatched GET requests
    #[arg(long)]
    pub static_dir: Option<PathBuf>,

    /// Serve index.html for unknown static paths
    #[arg(long, default_value_t = false)]
    pub spa: bool,

    /// Bearer token granting the member role
    #[arg(long, env = "SPRIG_API_TOKEN", default_value = "")]
    pub token: String,
}

impl ServeArgs {
    /// Layer file, environment and flags into one runtime configuration
    ///
    /// # Errors
    ///
    /// When the configuration file cannot be loaded.
    pub fn runtime_config(&self) -> Result<RuntimeConfig> {
        let mut config = match &self.config {
            Some(path) => RuntimeConfig::from_yaml_file(path)?,
            None => RuntimeConfig::default(),
        };
        config.apply_env();
        if let Some(host) = &self.host {
            config.host.clone_from(host);
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(dir) = &self.static_dir {
            config.static_dir = Some(dir.clone());
        }
        config.spa |= self.spa;
        Ok(config)
    }
}

/// Parse arguments and run the selected command
///
/// # Errors
///
/// Configuration, logging, build and bind failures.
pub fn run_cli() -> Result<()> {
    let cli = Cli::parse();
    match cli.command {
        Commands::Serve(args) => serve(&args),
        Commands::Routes => {
            let server = build_server(DemoConfig::default())?;
            for (method, path) in server.routes() {
                println!("{method:<7} /{}", path.trim_start_matches('/'));
            }
            Ok(())
        }
    }
}

fn serve(args: &ServeArgs) -> Result<()> {
    let _log_guard = init_logging(&LogConfig::from_env())?;
    let runtime = args.runtime_config()?;
    may::config().set_stack_size(runtime.stack_size);

    let server = build_server(DemoConfig {
        api_token: args.token.clone(),
        static_dir: runtime.static_dir.clone(),
    })?;
    info!(routes = server.routes().len(), stack_size = runtime.stack_size, "Server built");

    let mut service = AppService::new(Arc::new(server));
    if let Some(dir) = &runtime.static_dir {
        service = service.with_static_files(StaticFiles::new(dir).spa(runtime.spa));
    }

    let handle = HttpServer(service)
        .start(runtime.addr())
        .with_context(|| format!("Failed to bind {}", runtime.addr()))?;

    wait_for_shutdown(handle)
}

#[cfg(unix)]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> Result<()> {
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook::iterator::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).context("Failed to install signal handlers")?;
    if let Some(signal) = signals.forever().next() {
        info!(signal, "Shutting down");
    }
    handle.stop();
    Ok(())
}

#[cfg(not(unix))]
fn wait_for_shutdown(handle: crate::server::ServerHandle) -> Result<()> {
    handle
        .join()
        .map_err(|e| anyhow::anyhow!("server coroutine panicked: {e:?}"))
}
