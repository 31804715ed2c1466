use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use engine::stitch::StitchError;
use serde_json::json;
use thiserror::Error;

/// Everything that can go wrong while driving the pipeline. A failing
/// stage or request maps to one of these; none of them take the daemon
/// down, and every one surfaces to the requester.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required upstream document or file is absent. The stage is
    /// not started.
    #[error("missing input: {0}")]
    InputMissing(String),

    /// A stage was requested while a previous request for it is still
    /// running.
    #[error("stage {0} is already running")]
    StageBusy(&'static str),

    /// An external process exited non-zero, timed out, or could not be
    /// spawned. `detail` carries its diagnostics verbatim.
    #[error("{stage} process failed ({code}): {detail}")]
    ExternalProcess {
        stage: String,
        code: String,
        detail: String,
    },

    /// The generation service replied, but no well-formed JSON array
    /// could be located anywhere in its output.
    #[error("generation service response contained no parseable JSON array")]
    MalformedResponse,

    /// The song source returned 401: the stored cookie credential has
    /// expired and the operator must re-authenticate.
    #[error("song source credential expired; log in again and update SONG_SOURCE_COOKIE")]
    CredentialExpired,

    /// Any other non-2xx from the song source.
    #[error("song source request failed ({status}): {body}")]
    SongSource { status: u16, body: String },

    #[error(transparent)]
    Stitch(#[from] StitchError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),
}

impl PipelineError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            PipelineError::InputMissing(_) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::StageBusy(_) => StatusCode::CONFLICT,
            PipelineError::ExternalProcess { .. } => StatusCode::BAD_GATEWAY,
            PipelineError::MalformedResponse => StatusCode::BAD_GATEWAY,
            PipelineError::CredentialExpired => StatusCode::UNAUTHORIZED,
            PipelineError::SongSource { .. } => StatusCode::BAD_GATEWAY,
            PipelineError::Stitch(StitchError::NoClips) => StatusCode::UNPROCESSABLE_ENTITY,
            PipelineError::Io(_) | PipelineError::Json(_) | PipelineError::Http(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for PipelineError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}
