//! Fan-out broadcast of pipeline events to connected viewers.

use axum::response::sse::Event;
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use tokio::sync::broadcast;
use tokio_stream::wrappers::BroadcastStream;
use tracing::warn;

/// Terminal and non-terminal stage statuses pushed to viewers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Running,
    Done,
    Error,
    Cancelled,
}

/// One message on the viewer channel. The `*-updated` variants are
/// state-changed notices with no payload: viewers re-fetch the named
/// document. Never persisted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum PipelineEvent {
    ProjectUpdated,
    TimelineUpdated,
    ScenesUpdated,
    AnnotationsUpdated,
    KeyframePromptsUpdated,
    PipelineStatus {
        stage: String,
        status: StageStatus,
        message: String,
    },
    PipelineLog {
        stage: String,
        message: String,
    },
}

/// The subscription registry. Subscribing hands back a receiver whose
/// drop detaches the viewer; there is no per-viewer state. Publishing
/// is lossy: a lagging or disconnected viewer misses events rather
/// than applying backpressure.
#[derive(Clone)]
pub struct EventChannel {
    tx: broadcast::Sender<PipelineEvent>,
}

impl EventChannel {
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        EventChannel { tx }
    }

    pub fn publish(&self, event: PipelineEvent) {
        // SendError just means nobody is watching right now.
        let _ = self.tx.send(event);
    }

    pub fn status(&self, stage: &str, status: StageStatus, message: impl Into<String>) {
        self.publish(PipelineEvent::PipelineStatus {
            stage: stage.to_string(),
            status,
            message: message.into(),
        });
    }

    pub fn log(&self, stage: &str, line: impl Into<String>) {
        self.publish(PipelineEvent::PipelineLog {
            stage: stage.to_string(),
            message: line.into(),
        });
    }

    pub fn subscribe(&self) -> broadcast::Receiver<PipelineEvent> {
        self.tx.subscribe()
    }

    pub fn viewer_count(&self) -> usize {
        self.tx.receiver_count()
    }

    /// SSE stream for one viewer connection.
    pub fn subscribe_stream(&self) -> impl Stream<Item = Result<Event, Infallible>> {
        let rx = self.tx.subscribe();
        BroadcastStream::new(rx).filter_map(|result| async move {
            match result {
                Ok(event) => Event::default().json_data(&event).ok().map(Ok),
                Err(e) => {
                    // Viewer lagged behind the buffer; drop the missed
                    // events and keep streaming.
                    warn!("sse viewer lagged: {:?}", e);
                    None
                }
            }
        })
    }
}
