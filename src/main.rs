//! magiclb binary.
//!
//! ```text
//! magiclb [--config PATH] run [--port N] [--algorithm A] [--bind HOST]
//! magiclb [--config PATH] check
//! magiclb [--config PATH] init --port N [--force]
//! ```
//!
//! `run` is the default when no subcommand is given.

use std::error::Error;
use std::io::ErrorKind;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::{Args, Parser, Subcommand};

use magiclb::config::{
    duplicate_ids, read_config, save_config, validate_config, ConfigError, ProxyConfig,
};
use magiclb::lifecycle::signals;
use magiclb::net;
use magiclb::observability::{logging, metrics};
use magiclb::{Algorithm, ProxyServer, SharedStrategy, Strategy};

/// Connect timeout for each backend tried by `check`.
const REACH_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Parser)]
#[command(name = "magiclb")]
#[command(version, about = "Transparent TCP load balancer", long_about = None)]
struct Cli {
    /// Configuration file (JSON, or TOML when the extension is .toml).
    #[arg(short, long, default_value = "config.json", global = true)]
    config: PathBuf,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the load balancer until interrupted
    Run(RunArgs),
    /// Validate the configuration and report whether each backend is reachable
    Check,
    /// Write a starter configuration file
    Init {
        /// Listening port to record.
        #[arg(short, long)]
        port: u16,

        /// Overwrite an existing file.
        #[arg(long)]
        force: bool,
    },
}

#[derive(Args, Default)]
struct RunArgs {
    /// Override the listening port.
    #[arg(short, long)]
    port: Option<u16>,

    /// Override the selection algorithm (round-robin, weighted-round-robin).
    #[arg(short, long)]
    algorithm: Option<Algorithm>,

    /// Override the bind host.
    #[arg(short, long)]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    match cli.command.unwrap_or(Commands::Run(RunArgs::default())) {
        Commands::Run(args) => run(&cli.config, args).await,
        Commands::Check => check(&cli.config).await,
        Commands::Init { port, force } => init(&cli.config, port, force),
    }
}

/// Read the config file, treating a missing file as an empty configuration.
fn read_or_default(path: &Path) -> Result<(ProxyConfig, bool), ConfigError> {
    match read_config(path) {
        Ok(config) => Ok((config, true)),
        Err(ConfigError::Io(e)) if e.kind() == ErrorKind::NotFound => {
            Ok((ProxyConfig::default(), false))
        }
        Err(e) => Err(e),
    }
}

async fn run(path: &Path, args: RunArgs) -> Result<(), Box<dyn Error>> {
    let (mut config, found) = read_or_default(path)?;
    if let Some(port) = args.port {
        config.listening_port = Some(port);
    }
    if let Some(algorithm) = args.algorithm {
        config.algorithm = algorithm;
    }
    if let Some(bind) = args.bind {
        config.bind_host = bind;
    }
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "magiclb starting");

    if found {
        tracing::info!(path = %path.display(), "Configuration loaded");
    } else {
        tracing::warn!(path = %path.display(), "No configuration file found, using defaults");
    }
    let duplicates = duplicate_ids(&config);
    if !duplicates.is_empty() {
        tracing::warn!(ids = ?duplicates, "Backend ids are not unique");
    }

    if config.observability.metrics_enabled {
        let addr: SocketAddr = config.observability.metrics_address.parse()?;
        metrics::init_metrics(addr)?;
    }

    let strategy = SharedStrategy::new(Strategy::with_servers(
        config.algorithm,
        config.backend_servers.iter().cloned(),
    ));
    for server in strategy.servers() {
        tracing::info!(server = %server, "Backend registered");
    }
    if strategy.is_empty() {
        tracing::warn!("No backend servers configured; clients will receive 503 responses");
    }

    let server = Arc::new(ProxyServer::from_config(&config, strategy));
    let mut handle = server.spawn();

    tokio::select! {
        res = &mut handle => {
            res??;
            return Ok(());
        }
        res = signals::wait_for_termination() => res?,
    }

    server.stop();
    handle.await??;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn check(path: &Path) -> Result<(), Box<dyn Error>> {
    let config = read_config(path)?;
    validate_config(&config).map_err(ConfigError::Validation)?;

    println!("Configuration OK: {}", path.display());
    if let Some(port) = config.listening_port {
        println!("Listening: {}:{}", config.bind_host, port);
    }
    println!("Algorithm: {}", config.algorithm);

    if config.backend_servers.is_empty() {
        println!("No backend servers configured.");
    } else {
        println!("Backend servers:");
        for server in &config.backend_servers {
            let status = net::check_reachable(&server.host, server.port, REACH_TIMEOUT).await;
            println!("  {} - {}", server, status);
        }
    }

    let duplicates = duplicate_ids(&config);
    if !duplicates.is_empty() {
        println!("Warning: duplicate backend ids {:?}", duplicates);
    }
    Ok(())
}

fn init(path: &Path, port: u16, force: bool) -> Result<(), Box<dyn Error>> {
    if path.exists() && !force {
        let message = format!("{} already exists (use --force to overwrite)", path.display());
        return Err(message.into());
    }

    let config = ProxyConfig {
        listening_port: Some(port),
        ..Default::default()
    };
    validate_config(&config).map_err(ConfigError::Validation)?;
    save_config(path, &config)?;

    println!("Wrote {}", path.display());
    Ok(())
}
