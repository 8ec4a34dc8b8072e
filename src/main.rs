//! Gas Sentinel - serial gas sensor monitor binary
//!
//! Connects to the sensor board, classifies its readings and serves live
//! status over HTTP and WebSocket.

use clap::{Args, Parser, Subcommand};
use gas_sentinel::{
    start_web_server, AppState, Collaborators, DirectoryArchive, IngestPipeline, JsonLinesStore,
    LogMessenger, Monitor, PipelineConfig, PortManager, RuntimeSettings, SerialConfig,
    SystemSerialTransport, Thresholds, WebConfig, DEFAULT_BAUD_RATE, DEFAULT_CAUTION_THRESHOLD,
    DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_DANGER_THRESHOLD, DEFAULT_RETRY_INTERVAL_SECS,
    DEFAULT_UPLOAD_INTERVAL_SECS, DEFAULT_WEB_PORT,
};
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{error, info, Level};
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{EnvFilter, FmtSubscriber};

#[derive(Parser)]
#[command(name = "gas_sentinel")]
#[command(about = "🔥 Gas Sentinel - serial gas sensor monitor")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(long_about = "Reads a gas sensor board over serial, classifies readings and pushes live alerts")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Web server bind address
    #[arg(long, default_value = "0.0.0.0")]
    host: String,

    /// Web server port
    #[arg(short, long, env = "PORT", default_value_t = DEFAULT_WEB_PORT)]
    port: u16,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Enable debug logging
    #[arg(short, long)]
    debug: bool,

    #[command(flatten)]
    serve: ServeArgs,
}

#[derive(Subcommand)]
enum Commands {
    /// Connect to the sensor and start the web server (default)
    Serve,

    /// List serial devices in the order they would be probed
    Ports,
}

#[derive(Args)]
struct ServeArgs {
    /// Serial device to use instead of auto-detection
    #[arg(long, env = "SERIAL_DEVICE")]
    device: Option<String>,

    /// Serial baud rate
    #[arg(short, long, env = "BAUDRATE", default_value_t = DEFAULT_BAUD_RATE)]
    baud: u32,

    /// Difference above baseline that raises a caution alert
    #[arg(long, env = "CAUTION_THRESHOLD", default_value_t = DEFAULT_CAUTION_THRESHOLD)]
    caution: u32,

    /// Difference above baseline that raises a danger alert
    #[arg(long, env = "DANGER_THRESHOLD", default_value_t = DEFAULT_DANGER_THRESHOLD)]
    danger: u32,

    /// Seconds between archive uploads
    #[arg(long, env = "UPLOAD_INTERVAL", default_value_t = DEFAULT_UPLOAD_INTERVAL_SECS)]
    upload_interval: u64,

    /// Seconds allowed for a port to open
    #[arg(long, default_value_t = DEFAULT_CONNECT_TIMEOUT_SECS)]
    connect_timeout: u64,

    /// Seconds between reconnection attempts
    #[arg(long, default_value_t = DEFAULT_RETRY_INTERVAL_SECS)]
    retry_interval: u64,

    /// Milliseconds the serial reader blocks per poll
    #[arg(long, default_value_t = 500)]
    read_timeout_ms: u64,

    /// Readings store file (JSON lines)
    #[arg(long, default_value = "data/readings.jsonl")]
    store: String,

    /// Directory for archived line batches
    #[arg(long, default_value = "data/archive")]
    archive_dir: String,

    /// Do not store unrecognised lines as audit records
    #[arg(long)]
    no_audit: bool,

    /// Static dashboard directory (optional)
    #[arg(long)]
    static_dir: Option<String>,

    /// Disable CORS headers
    #[arg(long)]
    no_cors: bool,

    /// Maximum WebSocket connections
    #[arg(long, default_value_t = 100)]
    max_connections: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize tracing/logging
    init_logging(&cli)?;

    print_banner();

    match &cli.command {
        Some(Commands::Serve) | None => serve_command(&cli).await?,
        Some(Commands::Ports) => ports_command(&cli),
    }

    Ok(())
}

fn log_level(cli: &Cli) -> Level {
    if cli.debug {
        Level::DEBUG
    } else if cli.verbose {
        Level::INFO
    } else {
        Level::WARN
    }
}

/// `RUST_LOG` wins when set and valid; otherwise the flag-derived level.
fn log_filter(level: Level, rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| {
            EnvFilter::builder()
                .with_default_directive(LevelFilter::from_level(level).into())
                .parse_lossy("")
        })
}

fn init_logging(cli: &Cli) -> anyhow::Result<()> {
    let rust_log = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(log_filter(log_level(cli), rust_log.as_deref()))
        .with_target(false)
        .compact()
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;

    Ok(())
}

fn print_banner() {
    println!("🔥 Gas Sentinel - serial gas sensor monitor");
    println!("   Version: {}", env!("CARGO_PKG_VERSION"));
    println!();
}

fn serial_config(args: &ServeArgs) -> SerialConfig {
    SerialConfig::default()
        .with_baud_rate(args.baud)
        .with_connect_timeout(Duration::from_secs(args.connect_timeout))
        .with_retry_interval(Duration::from_secs(args.retry_interval))
        .with_device(args.device.clone())
}

async fn serve_command(cli: &Cli) -> anyhow::Result<()> {
    let args = &cli.serve;
    info!("Starting gas sentinel...");

    let settings = RuntimeSettings {
        thresholds: Thresholds::new(args.caution, args.danger)?,
        upload_interval: Duration::from_secs(args.upload_interval),
    };
    let state = AppState::shared(settings);

    let collaborators = Collaborators {
        store: Arc::new(JsonLinesStore::new(&args.store)),
        messenger: Arc::new(LogMessenger::new()),
        archive: Arc::new(DirectoryArchive::new(&args.archive_dir)),
        broadcaster: state.clone(),
    };

    let transport = SystemSerialTransport::new()
        .with_read_timeout(Duration::from_millis(args.read_timeout_ms));
    let ports = PortManager::new(Arc::new(transport), state.clone(), serial_config(args));
    let pipeline = IngestPipeline::new(
        state.clone(),
        collaborators,
        PipelineConfig::default().with_audit_unrecognized(!args.no_audit),
    );

    let web_config = WebConfig::new(&cli.host, cli.port)
        .with_static_path(args.static_dir.clone())
        .with_cors(!args.no_cors)
        .with_max_websocket_connections(args.max_connections);

    info!("Configuration:");
    info!("  - Device: {}", args.device.as_deref().unwrap_or("auto-detect"));
    info!("  - Baud rate: {}", args.baud);
    info!("  - Thresholds: caution {} / danger {}", args.caution, args.danger);
    info!("  - Upload interval: {}s", args.upload_interval);
    info!("  - Store: {}", args.store);
    info!("  - Archive dir: {}", args.archive_dir);
    info!("  - Bind address: {}", web_config.bind_address());

    let mut web = tokio::spawn(start_web_server(web_config, state));

    // Either exit path goes through Monitor::run's shutdown, which drains
    Monitor::new(ports, pipeline)
        .run(until_shutdown(&mut web, shutdown_signal()))
        .await;
    web.abort();

    Ok(())
}

/// Resolve on `signal` or when the web server task ends, whichever is first.
async fn until_shutdown<F>(web: &mut JoinHandle<gas_sentinel::Result<()>>, signal: F)
where
    F: Future<Output = ()>,
{
    tokio::select! {
        _ = signal => {}
        result = web => match result {
            Ok(Ok(())) => info!("Web server stopped"),
            Ok(Err(e)) => error!("Web server failed: {}", e),
            Err(e) => error!("Web server task panicked: {}", e),
        },
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down..."),
        Err(e) => {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}

fn ports_command(cli: &Cli) {
    let ports = PortManager::new(
        Arc::new(SystemSerialTransport::new()),
        AppState::shared(RuntimeSettings::default()),
        serial_config(&cli.serve),
    );

    let candidates = ports.discover_candidates();
    if candidates.is_empty() {
        println!("No serial devices found");
        return;
    }

    println!("Serial devices (probe order):");
    for (i, candidate) in ports.rank_candidates(candidates).iter().enumerate() {
        let marker = if ports.is_known_device(candidate) { " 🎯" } else { "" };
        println!(
            "  {}. {} - {}{}",
            i + 1,
            candidate.id,
            candidate.manufacturer.as_deref().unwrap_or("Unknown"),
            marker
        );
        if let (Some(vid), Some(pid)) = (&candidate.vendor_id, &candidate.product_id) {
            println!("      VID: {}, PID: {}", vid, pid);
        }
        if let Some(product) = &candidate.product {
            println!("      Product: {}", product);
        }
    }
}
