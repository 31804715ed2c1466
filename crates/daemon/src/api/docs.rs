//! Thin read/write access to the store's documents. PUT replaces a
//! document wholesale; viewers hear about it via the event channel.

use axum::{
    extract::State,
    http::StatusCode,
    response::Json,
    routing::get,
    Router,
};
use engine::timeline::{Project, Scene, TimelineWord};
use serde_json::Value;

use super::AppState;
use crate::error::PipelineError;
use crate::store::Doc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/project", get(get_project).put(put_project))
        .route("/timeline", get(get_timeline).put(put_timeline))
        .route("/scenes", get(get_scenes).put(put_scenes))
        .route("/annotations", get(get_annotations).put(put_annotations))
        .route(
            "/keyframe-prompts",
            get(get_keyframe_prompts).put(put_keyframe_prompts),
        )
        .with_state(state)
}

async fn get_project(State(state): State<AppState>) -> Result<Json<Project>, PipelineError> {
    Ok(Json(state.store.project()?))
}

async fn put_project(
    State(state): State<AppState>,
    Json(project): Json<Project>,
) -> Result<StatusCode, PipelineError> {
    state.store.set_project(&project)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_timeline(
    State(state): State<AppState>,
) -> Result<Json<Vec<TimelineWord>>, PipelineError> {
    Ok(Json(state.store.timeline()?))
}

async fn put_timeline(
    State(state): State<AppState>,
    Json(words): Json<Vec<TimelineWord>>,
) -> Result<StatusCode, PipelineError> {
    state.store.write(Doc::Timeline, &words)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_scenes(State(state): State<AppState>) -> Result<Json<Vec<Scene>>, PipelineError> {
    Ok(Json(state.store.scenes()?))
}

async fn put_scenes(
    State(state): State<AppState>,
    Json(mut scenes): Json<Vec<Scene>>,
) -> Result<StatusCode, PipelineError> {
    // Stored invariant: non-decreasing start order. Gaps and overlaps
    // are human-edited data and pass through untouched.
    scenes.sort_by(|a, b| a.start.total_cmp(&b.start));
    state.store.write(Doc::Scenes, &scenes)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_annotations(State(state): State<AppState>) -> Result<Json<Value>, PipelineError> {
    Ok(Json(state.store.annotations()?))
}

async fn put_annotations(
    State(state): State<AppState>,
    Json(annotations): Json<Value>,
) -> Result<StatusCode, PipelineError> {
    state.store.write(Doc::Annotations, &annotations)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn get_keyframe_prompts(
    State(state): State<AppState>,
) -> Result<Json<Value>, PipelineError> {
    Ok(Json(state.store.keyframe_prompts()?))
}

async fn put_keyframe_prompts(
    State(state): State<AppState>,
    Json(prompts): Json<Value>,
) -> Result<StatusCode, PipelineError> {
    state.store.write(Doc::KeyframePrompts, &prompts)?;
    Ok(StatusCode::NO_CONTENT)
}
