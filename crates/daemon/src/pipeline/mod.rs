//! The content-pipeline stages and the runner that supervises them.

use engine::timeline::Stage;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use crate::error::PipelineError;
use crate::store::{Doc, ProjectStore};

pub mod runner;

// Media-bound stages (whisper, clip rendering) get a long leash;
// text-generation stages should answer in minutes.
const MEDIA_TIMEOUT: Duration = Duration::from_secs(1800);
const TEXT_TIMEOUT: Duration = Duration::from_secs(300);

/// One runnable pipeline stage. Each stage is driven by exactly one
/// external process and, on success, advances the project's stage
/// marker to its target value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PipelineStage {
    Setup,
    Transcribe,
    Annotate,
    Storyboard,
    Prompts,
    Clips,
}

impl PipelineStage {
    pub const ALL: [PipelineStage; 6] = [
        PipelineStage::Setup,
        PipelineStage::Transcribe,
        PipelineStage::Annotate,
        PipelineStage::Storyboard,
        PipelineStage::Prompts,
        PipelineStage::Clips,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            PipelineStage::Setup => "setup",
            PipelineStage::Transcribe => "transcribe",
            PipelineStage::Annotate => "annotate",
            PipelineStage::Storyboard => "storyboard",
            PipelineStage::Prompts => "prompts",
            PipelineStage::Clips => "clips",
        }
    }

    /// Program + arguments of the external process bound to the stage.
    pub fn command(&self) -> (&'static str, &'static [&'static str]) {
        match self {
            PipelineStage::Setup => ("python3", &["pipeline/setup.py"]),
            PipelineStage::Transcribe => ("python3", &["pipeline/transcribe.py"]),
            PipelineStage::Annotate => ("node", &["pipeline/clean-timeline.js"]),
            PipelineStage::Storyboard => ("node", &["pipeline/storyboard.js"]),
            PipelineStage::Prompts => ("node", &["pipeline/keyframe-prompts.js"]),
            PipelineStage::Clips => ("python3", &["pipeline/render-clips.py"]),
        }
    }

    /// Wall-clock bound after which the process is killed and the
    /// stage treated as failed.
    pub fn timeout(&self) -> Duration {
        match self {
            PipelineStage::Setup => MEDIA_TIMEOUT,
            PipelineStage::Transcribe => MEDIA_TIMEOUT,
            PipelineStage::Clips => MEDIA_TIMEOUT,
            PipelineStage::Annotate | PipelineStage::Storyboard | PipelineStage::Prompts => {
                TEXT_TIMEOUT
            }
        }
    }

    /// The stage-marker value a successful run advances the project to.
    pub fn target(&self) -> Stage {
        match self {
            PipelineStage::Setup => Stage::Setup,
            PipelineStage::Transcribe => Stage::Transcribed,
            PipelineStage::Annotate => Stage::Annotated,
            PipelineStage::Storyboard => Stage::Storyboarded,
            PipelineStage::Prompts => Stage::Prompted,
            PipelineStage::Clips => Stage::Clipped,
        }
    }

    /// Documents the process is expected to have replaced on success;
    /// viewers get an updated notice for each.
    pub fn produced(&self) -> &'static [Doc] {
        match self {
            PipelineStage::Setup => &[],
            PipelineStage::Transcribe => &[Doc::Timeline],
            PipelineStage::Annotate => &[Doc::Timeline, Doc::Annotations],
            PipelineStage::Storyboard => &[Doc::Scenes],
            PipelineStage::Prompts => &[Doc::KeyframePrompts],
            PipelineStage::Clips => &[],
        }
    }
}

impl FromStr for PipelineStage {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PipelineStage::ALL
            .into_iter()
            .find(|stage| stage.as_str() == s)
            .ok_or(())
    }
}

/// Required upstream state, checked before anything is spawned. A
/// failed check reports `InputMissing` to the requester and the stage
/// never starts.
pub fn check_preconditions(
    store: &ProjectStore,
    stage: PipelineStage,
) -> Result<(), PipelineError> {
    match stage {
        PipelineStage::Setup => Ok(()),
        PipelineStage::Transcribe => match store.audio_path() {
            Some(_) => Ok(()),
            None => Err(PipelineError::InputMissing(
                "no audio file found (upload audio.mp3 or audio.wav first)".to_string(),
            )),
        },
        PipelineStage::Annotate | PipelineStage::Storyboard => {
            if store.timeline()?.is_empty() {
                Err(PipelineError::InputMissing(
                    "timeline is empty; run the transcribe stage first".to_string(),
                ))
            } else {
                Ok(())
            }
        }
        PipelineStage::Prompts | PipelineStage::Clips => {
            if store.scenes()?.is_empty() {
                Err(PipelineError::InputMissing(
                    "no scenes; run the storyboard stage first".to_string(),
                ))
            } else {
                Ok(())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stage_names_round_trip() {
        for stage in PipelineStage::ALL {
            assert_eq!(stage.as_str().parse::<PipelineStage>(), Ok(stage));
        }
        assert!("stitch".parse::<PipelineStage>().is_err());
    }

    #[test]
    fn media_stages_outlast_text_stages() {
        assert!(PipelineStage::Transcribe.timeout() > PipelineStage::Storyboard.timeout());
        assert!(PipelineStage::Clips.timeout() > PipelineStage::Prompts.timeout());
    }

    #[test]
    fn targets_follow_marker_order() {
        let targets: Vec<_> = PipelineStage::ALL.iter().map(|s| s.target()).collect();
        let mut sorted = targets.clone();
        sorted.sort();
        assert_eq!(targets, sorted);
    }
}
