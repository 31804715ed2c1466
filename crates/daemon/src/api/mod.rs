use axum::Router;
use std::sync::Arc;

use crate::events::EventChannel;
use crate::pipeline::runner::StageRunner;
use crate::store::ProjectStore;

pub mod docs;
pub mod events;
pub mod generate;
pub mod pipeline;
pub mod song;
pub mod stitch;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<ProjectStore>,
    pub events: EventChannel,
    pub runner: Arc<StageRunner>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .merge(docs::router(state.clone()))
        .merge(pipeline::router(state.clone()))
        .merge(events::router(state.clone()))
        .merge(stitch::router(state.clone()))
        .merge(generate::router(state.clone()))
        .merge(song::router(state))
}
