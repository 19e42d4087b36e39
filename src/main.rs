use std::sync::Arc;

use anyhow::Result;
use axum::extract::DefaultBodyLimit;
use axum::routing::post;
use rmcp::transport::streamable_http_server::{
    StreamableHttpService, session::local::LocalSessionManager,
};
use tower_http::services::ServeDir;
use tracing_subscriber::EnvFilter;

use image_gen_rmcp::{
    cache::LocalFileStorage,
    config::{ServerSettings, StabilityConfig},
    mcp_server::ImageStudioServer,
    stability::StabilityClient,
    web_pages,
};

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let settings = ServerSettings::from_env();
    let client = StabilityClient::new(StabilityConfig::from_env())?;
    if !client.has_api_key() {
        tracing::warn!("STABILITY_API_KEY is not set; every generation tool will fail");
    }

    let storage = Arc::new(LocalFileStorage::new(
        settings.cache_dir.clone(),
        settings.cache_base_url.clone(),
    ));
    let storage_for_service = storage.clone();
    let service = StreamableHttpService::new(
        move || Ok(ImageStudioServer::new(client.clone(), storage_for_service.clone())),
        LocalSessionManager::default().into(),
        Default::default(),
    );

    let mcp_path = settings.mcp_path();
    let router = axum::Router::new()
        .route(
            &settings.upload_path(),
            post(web_pages::handle_image_upload).layer(DefaultBodyLimit::max(50 * 1024 * 1024)),
        )
        .nest_service(&mcp_path, service)
        .nest_service("/cache", ServeDir::new(storage.base_dir()))
        .with_state(storage.clone());
    let tcp_listener = tokio::net::TcpListener::bind(&settings.bind_address).await?;

    tracing::info!(
        "image generation MCP server listening at http://{}{}",
        settings.bind_address,
        mcp_path
    );

    axum::serve(tcp_listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await?;
    Ok(())
}
