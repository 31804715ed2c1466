use axum::{
    extract::{Path, State},
    response::Json,
    routing::{get, post},
    Router,
};
use engine::timeline::Project;
use tracing::info;

use super::AppState;
use crate::error::PipelineError;
use crate::songsource::{self, SongInfo};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/song/:id", get(get_song))
        .route("/song/:id/import", post(import_song))
        .with_state(state)
}

async fn get_song(Path(id): Path<String>) -> Result<Json<SongInfo>, PipelineError> {
    Ok(Json(songsource::fetch_song(&id).await?))
}

/// Pull a song into the project: download its audio to audio.mp3 and
/// fill in the project metadata.
async fn import_song(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Project>, PipelineError> {
    let info = songsource::fetch_song(&id).await?;
    let dest = state.store.root().join("audio.mp3");
    songsource::download_audio(&info, &dest).await?;
    info!("imported song {} ({})", info.id, info.title);

    let mut project = state.store.project()?;
    project.title = info.title.clone();
    project.audio_file = Some("audio.mp3".to_string());
    project.duration = info.duration;
    state.store.set_project(&project)?;
    Ok(Json(project))
}
