use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use rackscan::cache::ScanCache;
use rackscan::config::AppConfig;
use rackscan::format::{self, OutputFormat};
use rackscan::scanner::{ScanOptions, Scanner};
use rackscan::vendor::VendorKind;
use rackscan::zone::{ZoneFilter, DEFAULT_PATTERN};

/// Version injected at compile time via RACKSCAN_VERSION env var (set by
/// CI/CD), or the crate version for local builds.
pub const VERSION: &str = match option_env!("RACKSCAN_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};

const EXIT_FAILURE: i32 = 1;
const EXIT_INTERRUPTED: i32 = 130;

/// Scan bare-metal server inventory across vendor management consoles
#[derive(Parser, Debug)]
#[command(name = "rackscan", version = VERSION, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,

    /// Server name pattern (anchored at the start, case-insensitive)
    #[arg(short, long, default_value = DEFAULT_PATTERN)]
    pattern: String,

    /// Comma-separated zone allow-list (unknown zones always shown)
    #[arg(long)]
    zones: Option<String>,

    /// Restrict the scan to a vendor; repeatable
    #[arg(short = 'v', long = "vendor", value_enum)]
    vendors: Vec<VendorKind>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "list")]
    format: OutputFormat,

    /// Include servers already installed in a cluster
    #[arg(long)]
    show_all: bool,

    /// Load environment from this file instead of ./.env
    #[arg(short, long)]
    env_file: Option<PathBuf>,

    /// Debug-level logging
    #[arg(long)]
    verbose: bool,

    /// Also write logs to this file
    #[arg(long)]
    log_file: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the dashboard API server with the scan cache
    Serve {
        /// Bind address (default from HOST, else 0.0.0.0)
        #[arg(long)]
        host: Option<String>,

        /// Bind port (default from PORT, else 8000)
        #[arg(long)]
        port: Option<u16>,
    },
}

fn setup_logging(
    verbose: bool,
    log_file: Option<&PathBuf>,
) -> Option<tracing_appender::non_blocking::WorkerGuard> {
    // RUST_LOG wins when set; --verbose picks the fallback level.
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));

    match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                let _ = std::fs::create_dir_all(parent);
            }
            let file = match std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
            {
                Ok(file) => file,
                Err(e) => {
                    eprintln!("could not open log file {}: {}", path.display(), e);
                    std::process::exit(EXIT_FAILURE);
                }
            };
            let (non_blocking, guard) = tracing_appender::non_blocking(file);

            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .init();
            tracing::info!("log file: {}", path.display());
            Some(guard)
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .with_target(true)
                .init();
            None
        }
    }
}

#[tokio::main]
async fn main() {
    let args = Args::parse();
    let _log_guard = setup_logging(args.verbose, args.log_file.as_ref());

    AppConfig::load_env(args.env_file.as_deref());
    let config = AppConfig::from_env();

    let code = match run(args, config).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!("{:#}", e);
            eprintln!("Error: {e:#}");
            EXIT_FAILURE
        }
    };
    std::process::exit(code);
}

async fn run(args: Args, config: AppConfig) -> Result<i32> {
    config.validate().context("configuration invalid")?;

    let scanner = Arc::new(Scanner::from_config(&config).context("scanner initialization")?);

    match args.command {
        Some(Command::Serve { host, port }) => {
            let host = host.unwrap_or_else(|| config.host.clone());
            let port = port.unwrap_or(config.port);
            serve(scanner, &config, &host, port).await
        }
        None => scan_once(scanner, &config, &args).await,
    }
}

/// One-shot scan printed to stdout.
async fn scan_once(scanner: Arc<Scanner>, config: &AppConfig, args: &Args) -> Result<i32> {
    // CLI zones override the environment allow-list.
    let zones = args.zones.as_deref().or(config.zones.as_deref());
    let opts = ScanOptions {
        pattern: args.pattern.clone(),
        vendors: (!args.vendors.is_empty()).then(|| args.vendors.clone()),
        zone_filter: ZoneFilter::from_str(zones),
        filter_installed: !args.show_all,
    };

    tracing::info!("scanning with pattern '{}'", opts.pattern);
    let results = tokio::select! {
        results = scanner.scan(&opts) => results,
        _ = tokio::signal::ctrl_c() => {
            tracing::warn!("interrupted, releasing sessions");
            scanner.release_all().await;
            return Ok(EXIT_INTERRUPTED);
        }
    };

    println!("{}", format::render(&results, args.format));
    Ok(0)
}

/// Dashboard server with the TTL cache and background refresher.
async fn serve(scanner: Arc<Scanner>, config: &AppConfig, host: &str, port: u16) -> Result<i32> {
    let cache = Arc::new(ScanCache::new(scanner, config.cache_ttl));

    // Initial scan so the first dashboard request is a cache hit.
    tracing::info!("running initial scan before serving");
    if let Err(e) = cache.force_refresh(None).await {
        tracing::warn!("initial scan skipped: {}", e);
    }

    let refresher = cache.spawn_refresher(config.refresh_interval);

    let outcome = tokio::select! {
        served = rackscan::web::serve(Arc::clone(&cache), host, port) => served.map(|()| 0),
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
            Ok(EXIT_INTERRUPTED)
        }
    };

    refresher.abort();
    cache.scanner().release_all().await;
    outcome
}
