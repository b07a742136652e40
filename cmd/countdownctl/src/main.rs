use clap::{Parser, Subcommand};
use pkg_constants::api::{DEFAULT_CONFIG_PATH, DEFAULT_SERVER, TOKEN_ENV};
use pkg_countdown::{CountdownEngine, EngineState};
use pkg_countdown::source::HttpLeaseSource;
use pkg_types::config::{CtlConfigFile, EngineConfig, load_config_file};
use pkg_types::countdown::CountdownRecord;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "countdownctl", about = "Live lease countdowns from the storage API")]
struct Cli {
    /// Path to YAML config file
    #[arg(long, short, default_value = DEFAULT_CONFIG_PATH)]
    config: String,

    /// Authoritative server endpoint
    #[arg(long)]
    server: Option<String>,

    /// Bearer token for the API (falls back to $COUNTDOWN_API_TOKEN)
    #[arg(long)]
    token: Option<String>,

    /// Per-request timeout in milliseconds
    #[arg(long)]
    timeout_ms: Option<u64>,

    #[arg(long)]
    sync_interval_ms: Option<u64>,

    #[arg(long)]
    tick_interval_ms: Option<u64>,

    #[arg(long)]
    batch_size: Option<usize>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Track leases and print countdowns on every change until Ctrl-C
    Watch {
        #[arg(required = true)]
        lease_ids: Vec<String>,
    },
    /// Sync once and print the countdowns
    Once {
        #[arg(required = true)]
        lease_ids: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let cli = Cli::parse();

    // Load config file (returns defaults if file not found)
    let file_cfg: CtlConfigFile = load_config_file(&cli.config)?;
    info!("Config file: {}", cli.config);

    // Merge: CLI args > config file > defaults
    let server = cli
        .server
        .or(file_cfg.server)
        .unwrap_or_else(|| DEFAULT_SERVER.to_string());
    let token = cli
        .token
        .or_else(|| std::env::var(TOKEN_ENV).ok())
        .or(file_cfg.token);
    let timeout = cli.timeout_ms.or(file_cfg.timeout_ms).map(Duration::from_millis);

    let base = file_cfg.engine.unwrap_or_default();
    let config = EngineConfig {
        sync_interval_ms: cli.sync_interval_ms.unwrap_or(base.sync_interval_ms),
        tick_interval_ms: cli.tick_interval_ms.unwrap_or(base.tick_interval_ms),
        batch_size: cli.batch_size.unwrap_or(base.batch_size),
    };
    config.validate()?;

    info!("Starting countdownctl");
    info!("  Server:        {}", server);
    info!("  Sync interval: {}ms", config.sync_interval_ms);
    info!("  Tick interval: {}ms", config.tick_interval_ms);
    info!("  Batch size:    {}", config.batch_size);

    let source = HttpLeaseSource::with_timeout(&server, token, timeout)?;
    let engine = CountdownEngine::new(config, Arc::new(source))?;

    match cli.command {
        Commands::Once { lease_ids } => run_once(&engine, lease_ids).await,
        Commands::Watch { lease_ids } => run_watch(&engine, lease_ids).await,
    }
}

async fn run_once(engine: &CountdownEngine, lease_ids: Vec<String>) -> anyhow::Result<()> {
    let mut revisions = engine.subscribe();
    engine.set_tracked(lease_ids).await;
    if engine.state().await != EngineState::Active {
        anyhow::bail!("no valid lease ids given");
    }

    // The first scheduled sync fires immediately; wait for it to land.
    loop {
        if engine.last_sync_time().await.is_some() || engine.last_sync_error().await.is_some() {
            break;
        }
        if revisions.changed().await.is_err() {
            break;
        }
    }

    let records = engine.get_all().await;
    print_table(&records);
    let error = engine.last_sync_error().await;
    engine.dispose().await;

    if let Some(err) = error {
        if records.is_empty() {
            return Err(anyhow::anyhow!("Sync failed: {}", err));
        }
        warn!("Sync partially failed: {}", err);
    }
    Ok(())
}

async fn run_watch(engine: &CountdownEngine, lease_ids: Vec<String>) -> anyhow::Result<()> {
    let mut revisions = engine.subscribe();
    engine.set_tracked(lease_ids).await;
    if engine.state().await != EngineState::Active {
        anyhow::bail!("no valid lease ids given");
    }

    info!("Watching countdowns. Press Ctrl-C to stop.");
    let shutdown = tokio::signal::ctrl_c();
    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            changed = revisions.changed() => {
                if changed.is_err() {
                    break;
                }
                print!("\x1b[2J\x1b[H");
                print_table(&engine.get_all().await);
                match (engine.last_sync_time().await, engine.last_sync_error().await) {
                    (_, Some(err)) => println!("\nlast sync error: {}", err),
                    (Some(at), None) => println!("\nlast sync: {}", at.format("%Y-%m-%d %H:%M:%S")),
                    (None, None) => println!("\nwaiting for first sync..."),
                }
            }
            _ = &mut shutdown => {
                info!("Shutting down");
                break;
            }
        }
    }
    engine.dispose().await;
    Ok(())
}

fn print_table(records: &[CountdownRecord]) {
    println!(
        "{:<24} {:<20} {:<20} {:>7} {}",
        "LEASE", "START", "END", "DONE", "REMAINING"
    );
    for r in records {
        println!(
            "{:<24} {:<20} {:<20} {:>6.1}% {}",
            r.lease_id,
            r.start_time.format("%Y-%m-%d %H:%M"),
            r.authoritative_end_time.format("%Y-%m-%d %H:%M"),
            r.percent_complete,
            r.formatted_remaining
        );
    }
    if records.is_empty() {
        println!("(no countdowns yet)");
    }
}
