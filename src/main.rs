//! export-courier server binary.

use clap::Parser;
use export_courier::{Config, pipeline};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// export-courier - export generation and one-time download server
#[derive(Parser, Debug)]
#[command(name = "export-courier")]
#[command(version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(
        short,
        long,
        env = "EXPORT_COURIER_CONFIG",
        default_value = "config/export-courier.toml"
    )]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> export_courier::Result<()> {
    // .env is optional
    let _ = dotenvy::dotenv();

    let args = Args::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("export-courier v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::load(Some(&args.config))?;
    let pipeline = pipeline::from_config(&config.pipeline);

    let running = export_courier::start(config, pipeline).await?;
    export_courier::run_until_shutdown(running).await
}
