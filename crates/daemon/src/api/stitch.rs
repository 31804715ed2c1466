use axum::{extract::State, response::Json, routing::post, Router};

use super::AppState;
use crate::error::PipelineError;
use crate::stitch::{self, StitchOutcome};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/stitch", post(run_stitch))
        .with_state(state)
}

/// Assemble the rendered clips into the final video. Synchronous from
/// the requester's point of view: the response carries the outcome.
async fn run_stitch(State(state): State<AppState>) -> Result<Json<StitchOutcome>, PipelineError> {
    let outcome = stitch::run(&state.store, &state.events).await?;
    Ok(Json(outcome))
}
