pub mod handlers;
pub mod types;

pub use handlers::AppState;

use crate::{
    Error, Result,
    config::Config,
    convert::{Converter, ConverterSettings},
    llm,
};
use axum::{
    Router,
    routing::{get, post},
};
use std::net::SocketAddr;
use tokio::signal;
use tower_http::{services::ServeFile, trace::TraceLayer};
use tracing::{error, info, warn};

/// Builds the application router around an already constructed state.
pub fn build_router(state: AppState) -> Router {
    let favicon = ServeFile::new(&state.favicon_path);

    Router::new()
        .route("/", get(handlers::index))
        .route("/about", get(handlers::about))
        .route("/health", get(handlers::health))
        .route(
            "/convert",
            post(handlers::convert).get(handlers::convert_query),
        )
        .route_service("/favicon.ico", favicon)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

pub async fn run(config: Config) -> Result<()> {
    // Initialize the model client
    let client = llm::create_llm_client(&config.llm)?;

    if config.llm.validate_on_startup {
        client.health_check().await.map_err(|e| {
            error!("Failed to validate {} API key: {}", config.llm.provider, e);
            Error::config(format!("Invalid {} API key", config.llm.provider))
        })?;
        info!("API key validation successful");
    }

    let converter = Converter::new(
        client,
        ConverterSettings::from_config(&config.llm, &config.conversion),
    );
    let app_state = AppState::new(converter, &config.server.favicon_path);

    let app = build_router(app_state);

    // Start server
    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);

    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received SIGINT, starting graceful shutdown"),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }
}
