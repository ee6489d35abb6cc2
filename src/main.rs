use std::sync::Arc;

use tracing::{error, info};
use youtube_mcp_server::{
    build_app,
    config::{Config, TransportMode},
    domain::resources::HttpDocumentSource,
    logging,
    mcp::stdio,
    youtube_client::YoutubeApiClient,
    AppState, Services,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    logging::init_logging();

    if let Err(err) = run().await {
        error!(error = %err, "fatal error");
        return Err(err);
    }
    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;

    let services = Services {
        video_platform: Arc::new(YoutubeApiClient::new(
            config.youtube_api_key.clone(),
            config.youtube_api_base_url.clone(),
        )?),
        documents: Arc::new(HttpDocumentSource::new()?),
    };

    match config.transport {
        TransportMode::Stdio => {
            stdio::run(services).await?;
        }
        TransportMode::Http => {
            let bind_socket = config.bind_socket()?;
            let state = AppState::new(config.api_token.clone(), config.issuer.clone(), services);
            let app = build_app(state.clone());
            let listener = tokio::net::TcpListener::bind(bind_socket).await?;

            info!(
                bind_addr = %config.bind_addr,
                port = config.port,
                issuer = %config.issuer,
                token_check = config.api_token.is_some(),
                "server starting"
            );

            // Open event streams only end once their sessions close.
            let shutdown_state = state.clone();
            axum::serve(listener, app.into_make_service())
                .with_graceful_shutdown(async move {
                    shutdown_signal().await;
                    shutdown_state.close_all_sessions().await;
                })
                .await?;

            info!("server stopped");
        }
    }

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
