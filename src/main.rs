//! rpc-balancer CLI - chain-keyed JSON-RPC load balancer

use clap::Parser;
use rpc_balancer::config::parse_listen_addr;
use rpc_balancer::{AppState, ConfigFile, Forwarder, Registry, Strategy};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

const DEFAULT_CONFIG: &str = "balancer.toml";

#[derive(Parser)]
#[command(name = "rpc-balancer")]
#[command(
    version,
    about = "Chain-keyed JSON-RPC load balancer with latency-aware endpoint selection"
)]
#[command(after_help = r#"EXAMPLES:
    # Run with the default config file (balancer.toml, if present)
    rpc-balancer

    # Explicit config and listen address
    rpc-balancer -c /etc/rpc-balancer/balancer.toml --address 0.0.0.0:3003

    # Spread load instead of chasing the freshest endpoint
    rpc-balancer --strategy round_robin

    # Register an endpoint at runtime
    curl -X POST http://127.0.0.1:3003/10 -d '{
        "url": "https://mainnet.optimism.io",
        "ws_url": "wss://mainnet.optimism.io/ws",
        "chain_id": 10,
        "rpc_location": "External"
    }'

CONFIG FILE:
    Default: ./balancer.toml (missing default file starts an empty registry)
"#)]
struct Cli {
    /// TOML config file
    #[arg(short, long, default_value = DEFAULT_CONFIG)]
    config: PathBuf,

    /// Listen address override (host or host:port)
    #[arg(long)]
    address: Option<String>,

    /// Ranking strategy override (min_latency or round_robin)
    #[arg(long)]
    strategy: Option<String>,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let filter = if cli.quiet {
        "warn"
    } else {
        match cli.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    // An explicitly passed config path must exist; the default path may not
    let config = if cli.config == std::path::Path::new(DEFAULT_CONFIG) {
        ConfigFile::load_or_default(&cli.config)?
    } else {
        ConfigFile::load(&cli.config)?
    };

    let addr = match &cli.address {
        Some(address) => parse_listen_addr(address)?,
        None => config.listen_addr()?,
    };

    let strategy = match &cli.strategy {
        Some(s) => s.parse::<Strategy>()?,
        None => config.balancer.strategy,
    };

    let registry = Arc::new(Registry::new(config.balancer.stats_window));
    let forwarder = Arc::new(Forwarder::new(
        registry.clone(),
        strategy,
        Duration::from_secs(config.balancer.timeout_seconds),
    )?);

    // Seed endpoints from the config file; each gets its own head watcher
    for endpoint in config.endpoints {
        rpc_balancer::register_endpoint(&registry, endpoint);
    }

    tracing::info!(
        strategy = %String::from(strategy),
        seeded = registry.len(),
        "starting balancer"
    );

    let state = Arc::new(AppState {
        registry,
        forwarder,
    });

    rpc_balancer::serve(addr, state).await?;
    Ok(())
}
