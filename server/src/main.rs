use clap::Parser;
use exifrelay_server::{config::ServerConfig, state::AppState};
use std::sync::Arc;
use tokio::sync::Notify;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "exifrelay_server=debug,exifrelay_jobs=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServerConfig::parse();
    tracing::info!(
        addr = %config.addr(),
        tool = %config.tool,
        upload_dir = %config.upload_dir.display(),
        "loaded configuration"
    );
    serve(config).await
}

async fn serve(config: ServerConfig) -> Result<(), Box<dyn std::error::Error>> {
    tokio::fs::create_dir_all(&config.upload_dir).await?;
    let addr = config.addr();

    let state = AppState::new(config);
    let shutdown = Arc::clone(&state.shutdown);
    let app = exifrelay_server::app(state);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or when `POST /shutdown` fires.
async fn shutdown_signal(requested: Arc<Notify>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            tracing::error!(%err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = requested.notified() => {}
    }
    tracing::info!("shutting down");
}
