use anyhow::Context;
use dotenvy::dotenv;
use tracing::info;
use tracing_subscriber::EnvFilter;
use transcript_relay::{app, config::settings::AppConfig, state::AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,tower_http=debug")),
        )
        .init();

    info!("Starting server...");

    let config = AppConfig::new().context("Invalid configuration")?;
    let port = config.server_port;
    info!(
        "Public base URL {}, webhook {}, artifact format {:?}, source delivery {:?}",
        config.public_base_url,
        if config.webhook_enabled { "enabled" } else { "disabled" },
        config.artifact_format,
        config.source_delivery
    );

    let state = AppState::from_config(config).await?;
    let app = app::create_app(state);

    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("Failed to bind port {}", port))?;
    info!("Server running on http://0.0.0.0:{}", port);

    axum::serve(listener, app).await.context("Server error")?;
    Ok(())
}
