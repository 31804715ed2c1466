use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use serde::Serialize;
use serde_json::json;

use super::AppState;
use crate::pipeline::PipelineStage;

#[derive(Serialize)]
struct StageInfo {
    stage: &'static str,
    target: &'static str,
    running: bool,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/pipeline/stages", get(list_stages))
        .route("/pipeline/:stage/run", post(run_stage))
        .route("/pipeline/:stage/cancel", post(cancel_stage))
        .with_state(state)
}

async fn list_stages(State(state): State<AppState>) -> Json<Vec<StageInfo>> {
    Json(
        PipelineStage::ALL
            .into_iter()
            .map(|stage| StageInfo {
                stage: stage.as_str(),
                target: stage.target().as_str(),
                running: state.runner.is_running(stage),
            })
            .collect(),
    )
}

fn unknown_stage(name: &str) -> Response {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": format!("unknown stage: {}", name) })),
    )
        .into_response()
}

async fn run_stage(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let Ok(stage) = name.parse::<PipelineStage>() else {
        return unknown_stage(&name);
    };
    match state.runner.request(stage) {
        Ok(()) => (
            StatusCode::ACCEPTED,
            Json(json!({ "stage": stage.as_str(), "status": "running" })),
        )
            .into_response(),
        Err(e) => e.into_response(),
    }
}

async fn cancel_stage(State(state): State<AppState>, Path(name): Path<String>) -> Response {
    let Ok(stage) = name.parse::<PipelineStage>() else {
        return unknown_stage(&name);
    };
    if state.runner.cancel(stage) {
        (
            StatusCode::ACCEPTED,
            Json(json!({ "stage": stage.as_str(), "status": "cancelling" })),
        )
            .into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            Json(json!({ "error": format!("stage {} is not running", stage.as_str()) })),
        )
            .into_response()
    }
}
