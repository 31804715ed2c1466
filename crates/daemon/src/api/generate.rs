use axum::{extract::State, response::Json, routing::post, Router};
use engine::timeline::Stage;
use serde_json::Value;

use super::AppState;
use crate::error::PipelineError;
use crate::llm;
use crate::store::Doc;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/generate/prompts", post(generate_prompts))
        .with_state(state)
}

/// In-daemon keyframe prompt generation, for when the scripted prompts
/// stage is not wanted: one call to the generation service, the first
/// JSON array in its reply becomes the keyframe-prompts document.
async fn generate_prompts(State(state): State<AppState>) -> Result<Json<Value>, PipelineError> {
    let scenes = state.store.scenes()?;
    let prompts = llm::generate_keyframe_prompts(&scenes).await?;
    state.store.write(Doc::KeyframePrompts, &prompts)?;
    state.store.commit_stage_result(Stage::Prompted, &[])?;
    Ok(Json(prompts))
}
