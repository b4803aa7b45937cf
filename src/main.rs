use anyhow::Result;
use mql2promql::{config, server};
use tracing::info;
use tracing_subscriber::{EnvFilter, filter::LevelFilter};

/// Validates that a log level string is valid
fn validate_log_level(level: &str) -> Result<LevelFilter> {
    level.parse::<LevelFilter>().map_err(|_| {
        anyhow::anyhow!(
            "Invalid log level: '{}'. Valid levels: error, warn, info, debug, trace",
            level
        )
    })
}

#[tokio::main]
async fn main() -> Result<()> {
    // A local .env is a development convenience; Cloud Run injects real env vars.
    dotenvy::dotenv().ok();

    // Load configuration first (before logging setup)
    let config = match config::load().await {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // RUST_LOG may carry full directives; otherwise use the configured level
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => match validate_log_level(&config.server.logs.level) {
            Ok(level) => EnvFilter::default().add_directive(level.into()),
            Err(e) => {
                eprintln!("{}", e);
                std::process::exit(1);
            }
        },
    };

    tracing_subscriber::fmt().with_env_filter(filter).json().init();

    info!(
        provider = %config.llm.provider,
        model = %config.llm.model,
        "Starting mql2promql server"
    );

    server::run(config).await?;

    Ok(())
}
