//! `vortex`: serve a SQLite file to MySQL clients
//!
//! ```bash
//! # first run writes ~/.config/vortex/config.toml and serves on localhost:3307
//! vortex
//!
//! vortex --config custom.toml --verbose
//! vortex --host 127.0.0.1 --port 3308 --create-config
//! ```

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use color_eyre::eyre::WrapErr;
use tracing_subscriber::EnvFilter;

use vortex::Opts;
use vortex::backend::SqliteBackend;
use vortex::config::{self, ConfigOverrides};
use vortex::tokio::Server;

/// MySQL-compatible server backed by SQLite
#[derive(Parser, Debug)]
#[command(name = "vortex", version, about)]
struct Args {
    /// Path to the TOML config file [default: <config dir>/vortex/config.toml]
    #[arg(long, value_name = "PATH", env = "VORTEX_CONFIG")]
    config: Option<PathBuf>,

    /// Create a default config file if it doesn't exist
    #[arg(long)]
    create_config: bool,

    /// Host to bind (overrides config)
    #[arg(long)]
    host: Option<String>,

    /// Port to listen on (overrides config)
    #[arg(long)]
    port: Option<u16>,

    /// Accepted username (overrides config)
    #[arg(long)]
    username: Option<String>,

    /// Accepted password (overrides config)
    #[arg(long, env = "VORTEX_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// SQLite database file (overrides config)
    #[arg(long, value_name = "PATH")]
    data_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,

    /// Log level (error, warn, info, debug, trace)
    #[arg(long, default_value = "info", env = "VORTEX_LOG_LEVEL")]
    log_level: String,
}

impl Args {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            host: self.host.clone(),
            port: self.port,
            username: self.username.clone(),
            password: self.password.clone(),
            data_file: self.data_file.clone(),
        }
    }
}

fn main() -> color_eyre::Result<ExitCode> {
    color_eyre::install()?;
    let args = Args::parse();
    init_logging(&args);

    let opts = match load_opts(&args) {
        Ok(opts) => opts,
        Err(err) => {
            tracing::error!("configuration error: {err}");
            return Ok(ExitCode::FAILURE);
        }
    };
    tracing::debug!(?opts, "using configuration");

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .wrap_err("failed to start the async runtime")?;
    runtime.block_on(serve(opts))?;
    Ok(ExitCode::SUCCESS)
}

fn init_logging(args: &Args) {
    let level = if args.verbose { "debug" } else { args.log_level.as_str() };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(format!("vortex={level}")))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// Create the default file if needed, then load, override and validate
fn load_opts(args: &Args) -> vortex::error::Result<Opts> {
    let path = args.config.clone().unwrap_or_else(config::default_config_path);
    if args.create_config || !path.exists() {
        config::create_default_config(&path)?;
    }

    let mut section = config::load_config(&path)?;
    section.apply(&args.overrides());
    section.into_opts()
}

async fn serve(opts: Opts) -> color_eyre::Result<()> {
    let backend = SqliteBackend::new(opts.data_file.clone());
    tracing::info!(data_file = %backend.path().display(), "initializing vortex server");

    let server = Server::bind(opts, backend)
        .await
        .wrap_err("failed to bind listener")?;
    tracing::info!(addr = %server.local_addr()?, "server started, press Ctrl+C to stop");

    server.run_until(shutdown_signal()).await?;
    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {}
        () = terminate => {}
    }
    tracing::info!("received shutdown signal");
}
