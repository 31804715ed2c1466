use axum::{response::Json, routing::get, Router};
use serde::Serialize;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::cors::{Any, CorsLayer};
use tracing::{info, level_filters::LevelFilter};

mod api;
mod error;
mod events;
mod llm;
mod media;
mod pipeline;
mod songsource;
mod stitch;
mod store;

#[derive(Serialize)]
struct HealthResponse {
    ok: bool,
    version: &'static str,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        ok: true,
        version: env!("CARGO_PKG_VERSION"),
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_max_level(LevelFilter::INFO)
        .init();

    let project_dir = PathBuf::from(
        std::env::var("PROJECT_DIR").unwrap_or_else(|_| "project".to_string()),
    );

    let channel = events::EventChannel::new(256);
    let store = Arc::new(store::ProjectStore::new(&project_dir, channel.clone())?);
    info!("project store initialized at {:?}", project_dir);

    let runner = pipeline::runner::StageRunner::new(store.clone(), channel.clone());

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let state = api::AppState {
        store,
        events: channel,
        runner,
    };
    let app = Router::new()
        .route("/health", get(health))
        .nest("/api", api::router(state))
        .layer(cors);

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(7766);
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    info!("starting daemon server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
