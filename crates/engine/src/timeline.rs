use serde::{Deserialize, Serialize};

/// Pipeline progress marker stored on the project document. Ordered:
/// the marker only ever moves forward, and only when the stage that
/// targets the next value completes successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    #[default]
    Init,
    Setup,
    Transcribed,
    Annotated,
    Storyboarded,
    Prompted,
    Clipped,
    Done,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Setup => "setup",
            Stage::Transcribed => "transcribed",
            Stage::Annotated => "annotated",
            Stage::Storyboarded => "storyboarded",
            Stage::Prompted => "prompted",
            Stage::Clipped => "clipped",
            Stage::Done => "done",
        }
    }
}

/// One song project. A running instance works on exactly one of these.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Project {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub artist: String,
    #[serde(default)]
    pub style: String,
    #[serde(default)]
    pub lyrics: String,
    #[serde(default)]
    pub audio_file: Option<String>,
    #[serde(default)]
    pub duration: Option<f64>,
    #[serde(default)]
    pub stage: Stage,
}

/// One transcribed word with its timestamps, in seconds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TimelineWord {
    pub word: String,
    pub start: f64,
    pub end: f64,
}

/// How a scene is joined to the one before it. The first scene's
/// transition is meaningless and ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Transition {
    #[default]
    Cut,
    Fade,
}

/// A time-boxed narrative segment of the storyboard. Scenes are stored
/// in non-decreasing start order; gaps and overlaps are tolerated as
/// human-edited data, not rejected. `status` is an open tag advanced by
/// human review (pending/prompted/approved), never validated here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Scene {
    pub label: String,
    pub description: String,
    pub start: f64,
    pub end: f64,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub annotation: Option<String>,
    #[serde(default)]
    pub transition: Transition,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_ordering_follows_pipeline() {
        assert!(Stage::Init < Stage::Setup);
        assert!(Stage::Transcribed < Stage::Annotated);
        assert!(Stage::Clipped < Stage::Done);
    }

    #[test]
    fn stage_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&Stage::Storyboarded).unwrap(),
            "\"storyboarded\""
        );
        let parsed: Stage = serde_json::from_str("\"clipped\"").unwrap();
        assert_eq!(parsed, Stage::Clipped);
    }

    #[test]
    fn scene_defaults_tolerate_sparse_json() {
        let scene: Scene = serde_json::from_str(
            r#"{"label":"verse 1","description":"neon alley","start":0.0,"end":12.4}"#,
        )
        .unwrap();
        assert_eq!(scene.transition, Transition::Cut);
        assert_eq!(scene.status, "");
        assert!(scene.prompt.is_none());
    }
}
