//! Magic Client
//!
//! Keeps the device on magic hotspots using its local identity.

use anyhow::Result;
use clap::{Parser, Subcommand};
use magic_crypto::{
    FileIdentityStore, Identity, IdentityStore, load_or_generate, persist_on_shutdown,
};
use magic_protocol::NetworkRecord;
use std::sync::Arc;
use tabled::Tabled;
use tracing::{info, Level};
use tracing_subscriber::FmtSubscriber;

use magic_client::config::MagicConfig;
use magic_client::{ConnectionManager, MagicContext, NetworkDirectory, StatusBus, agent, events};

/// Magic Client - identity-based hotspot access
#[derive(Parser, Debug)]
#[command(name = "magic")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "magic.toml")]
    config: String,

    /// Run in verbose mode
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the agent until interrupted (default)
    Run {
        /// Join this SSID after startup
        #[arg(long)]
        connect: Option<String>,
    },
    /// Print the identity address
    Address,
    /// Replace the identity with an existing private key
    ImportKey {
        /// Hex private key, optionally 0x-prefixed
        key: String,
    },
    /// Scan once and list magic networks
    Networks,
}

#[derive(Tabled)]
struct NetworkRow {
    ssid: String,
    rssi: i32,
    quality: u8,
    channel: String,
}

impl From<&NetworkRecord> for NetworkRow {
    fn from(record: &NetworkRecord) -> Self {
        Self {
            ssid: record.ssid.clone(),
            rssi: record.rssi,
            quality: record.quality(),
            channel: record
                .channel
                .map(|channel| channel.to_string())
                .unwrap_or_else(|| "-".to_string()),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    info!("Magic Client v{}", env!("CARGO_PKG_VERSION"));

    let config = MagicConfig::load_or_default(&args.config).await?;
    info!("Loaded configuration from {}", args.config);

    let store = FileIdentityStore::new(config.identity.path.clone());

    match args.command.unwrap_or(Commands::Run { connect: None }) {
        Commands::Run { connect } => run(&config, &store, connect).await?,
        Commands::Address => {
            let identity = load_or_generate(&store).await?;
            persist_on_shutdown(&store, &identity).await;
            println!("{}", identity.address());
        }
        Commands::ImportKey { key } => {
            let identity = Identity::from_private_key_hex(&key)?;
            store.persist(&identity).await?;
            println!("{}", identity.address());
        }
        Commands::Networks => {
            let platform = Arc::new(config.simulation.build_platform());
            let directory = NetworkDirectory::new(platform, config.network.filter());
            let records = directory.scan().await?;
            let rows: Vec<NetworkRow> = records.iter().map(NetworkRow::from).collect();
            println!("{}", tabled::Table::new(rows));
        }
    }

    Ok(())
}

async fn run(
    config: &MagicConfig,
    store: &FileIdentityStore,
    connect: Option<String>,
) -> Result<()> {
    let identity = Arc::new(load_or_generate(store).await?);
    info!("Identity {}", identity.address());

    let anchor = config.trust.load_anchor().await?;
    info!("Trust anchor {} ({})", anchor.label(), anchor.fingerprint());

    let platform = Arc::new(config.simulation.build_platform());
    let bus = Arc::new(StatusBus::default());
    let logger = events::spawn_status_logger(&bus);

    let ctx = MagicContext::new(platform, identity.clone(), anchor, bus).configured(config);
    let manager = Arc::new(ConnectionManager::new(ctx));

    let event_loop = manager.spawn_event_loop();
    manager.initialize().await;

    let scanner = config
        .network
        .scan_period()
        .map(|period| agent::start_scanner(manager.clone(), period, config.network.auto_join));

    if let Some(ssid) = connect {
        // Result arrives on the status bus
        drop(manager.spawn_connect(ssid));
    }

    tokio::signal::ctrl_c().await?;
    info!("Shutting down");

    if let Some(scanner) = scanner {
        scanner.abort();
    }
    event_loop.abort();
    logger.abort();

    persist_on_shutdown(store, &identity).await;
    Ok(())
}
