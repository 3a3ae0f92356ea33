use chrono::Local;
use clap::Parser;
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::error::Error;
use tracing::{error, info};
use tracing_appender::rolling;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

use netmon_updater::telemetry::config::UpdaterConfig;
use netmon_updater::telemetry::rest_client::PostgrestClient;
use netmon_updater::telemetry::runner::{Mode, RunOptions, Runner};
use netmon_updater::telemetry::store::TelemetryStore;
use netmon_updater::version::VERSION;

/// Update asset and device load statistics in the monitoring database.
#[derive(Parser, Debug)]
#[command(author, version = VERSION, about, long_about = None)]
struct Args {
    /// What to update
    #[arg(long, value_enum, default_value_t = Mode::Both)]
    mode: Mode,

    /// Limit the number of records to update per collection
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    limit: Option<u64>,

    /// Enable detailed debug output
    #[arg(long)]
    debug: bool,

    /// Path to an optional TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Seed for the random source, for reproducible runs
    #[arg(long)]
    seed: Option<u64>,
}

fn init_logging(debug: bool) {
    // Log to a file: JSON format, daily rotation
    let file_appender = rolling::daily("logs", "netmon-updater.log");
    let file_layer = fmt::layer()
        .with_writer(file_appender)
        .with_ansi(false)
        .json();

    let stdout_layer = fmt::layer().with_writer(std::io::stdout);

    // --debug wins over RUST_LOG for this crate.
    let env_filter = if debug {
        EnvFilter::new("info,netmon_updater=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    let args = Args::parse();
    init_logging(args.debug);

    let config = match UpdaterConfig::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "Failed to load configuration.");
            return Err(e.into());
        }
    };

    info!(
        version = VERSION,
        supabase_url = %config.supabase_url,
        mode = %args.mode,
        current_time = %Local::now().format("%Y-%m-%d %H:%M:%S"),
        "Network monitoring update script starting."
    );

    let rng = match args.seed {
        Some(seed) => {
            info!(seed, "Using seeded random source.");
            StdRng::seed_from_u64(seed)
        }
        None => StdRng::from_os_rng(),
    };

    let store = TelemetryStore::new(PostgrestClient::new(&config));
    let mut runner = Runner::new(store, rng);
    let options = RunOptions {
        mode: args.mode,
        limit: args.limit.map(|n| n as usize),
    };

    match runner.run(options).await {
        Ok(report) => {
            info!(report = ?report, "Script completed successfully!");
            Ok(())
        }
        Err(e) => {
            error!(error = %e, "An error occurred.");
            Err(e.into())
        }
    }
}
