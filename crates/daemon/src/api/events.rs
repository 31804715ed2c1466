use axum::{
    extract::State,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use futures::stream::Stream;
use std::convert::Infallible;
use std::time::Duration;

use super::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/events", get(events))
        .with_state(state)
}

/// One SSE connection per viewer; every pipeline event and document
/// update notice flows through here as JSON.
async fn events(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    Sse::new(state.events.subscribe_stream()).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("keep-alive"),
    )
}
