use crate::timeline::{Scene, Transition};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Length of a cross-dissolve junction, in seconds. Each fade junction
/// consumes the trailing half second of the left clip and the leading
/// half second of the right clip, so the assembled video is 0.5s
/// shorter per fade than a naive concatenation.
pub const FADE_DURATION: f64 = 0.5;

#[derive(Debug, Error)]
pub enum StitchError {
    #[error("no rendered clips found; run the clips stage first")]
    NoClips,
}

/// One rendered clip file, already in playback order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClipSource {
    pub path: String,
    /// Probed duration in seconds.
    pub duration: f64,
}

/// How a pair of adjacent clips is joined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Junction {
    Cut,
    Fade,
}

/// The assembly plan for the final video. Built once from the scene
/// list and the sorted clip files, then handed to the render-arg
/// builder; the planner itself never touches ffmpeg.
#[derive(Debug, Clone)]
pub enum StitchPlan {
    /// No fade junctions anywhere: plain ordered concatenation.
    Concat { clips: Vec<ClipSource> },
    /// Fades requested but only one clip exists, so there is nothing
    /// to dissolve into; the clip passes through untouched.
    Single { clip: ClipSource },
    /// Two or more clips with at least one fade junction. `junctions`
    /// has exactly `clips.len() - 1` entries; junction `i` joins clip
    /// `i` to clip `i + 1`.
    Crossfade {
        clips: Vec<ClipSource>,
        junctions: Vec<Junction>,
    },
}

/// Decide the assembly plan. Clips must already be in playback order
/// (lexicographic filename order upstream). Scene `i`'s transition
/// describes the junction into scene `i`, so the junction between
/// clips `i-1` and `i` reads `scenes[i]`; a clip without a matching
/// scene defaults to a hard cut.
pub fn plan(scenes: &[Scene], clips: &[ClipSource]) -> Result<StitchPlan, StitchError> {
    if clips.is_empty() {
        return Err(StitchError::NoClips);
    }

    let has_fades = scenes
        .iter()
        .skip(1)
        .any(|s| s.transition == Transition::Fade);

    if !has_fades {
        return Ok(StitchPlan::Concat {
            clips: clips.to_vec(),
        });
    }

    if clips.len() == 1 {
        return Ok(StitchPlan::Single {
            clip: clips[0].clone(),
        });
    }

    let junctions = (1..clips.len())
        .map(|i| match scenes.get(i).map(|s| s.transition) {
            Some(Transition::Fade) => Junction::Fade,
            _ => Junction::Cut,
        })
        .collect();

    Ok(StitchPlan::Crossfade {
        clips: clips.to_vec(),
        junctions,
    })
}

impl StitchPlan {
    /// Number of cross-dissolve junctions in the plan.
    pub fn fade_count(&self) -> usize {
        match self {
            StitchPlan::Concat { .. } | StitchPlan::Single { .. } => 0,
            StitchPlan::Crossfade { junctions, .. } => junctions
                .iter()
                .filter(|j| **j == Junction::Fade)
                .count(),
        }
    }

    /// Number of pairwise join steps the fold will perform.
    pub fn step_count(&self) -> usize {
        match self {
            StitchPlan::Single { .. } => 0,
            StitchPlan::Concat { clips } => clips.len().saturating_sub(1),
            StitchPlan::Crossfade { junctions, .. } => junctions.len(),
        }
    }

    /// Duration of the assembled video: the sum of clip durations,
    /// minus FADE_DURATION per fade junction.
    pub fn output_duration(&self) -> f64 {
        match self {
            StitchPlan::Single { clip } => clip.duration,
            StitchPlan::Concat { clips } => clips.iter().map(|c| c.duration).sum(),
            StitchPlan::Crossfade { clips, .. } => {
                let total: f64 = clips.iter().map(|c| c.duration).sum();
                total - FADE_DURATION * self.fade_count() as f64
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(transition: Transition) -> Scene {
        Scene {
            label: "scene".to_string(),
            description: "".to_string(),
            start: 0.0,
            end: 1.0,
            status: "approved".to_string(),
            prompt: None,
            annotation: None,
            transition,
        }
    }

    fn clip(name: &str, duration: f64) -> ClipSource {
        ClipSource {
            path: name.to_string(),
            duration,
        }
    }

    #[test]
    fn no_clips_is_an_error() {
        let scenes = vec![scene(Transition::Cut)];
        assert!(matches!(plan(&scenes, &[]), Err(StitchError::NoClips)));
    }

    #[test]
    fn all_cuts_concatenates() {
        let scenes = vec![scene(Transition::Cut), scene(Transition::Cut)];
        let clips = vec![clip("001.mp4", 3.0), clip("002.mp4", 4.0)];
        let plan = plan(&scenes, &clips).unwrap();
        assert!(matches!(plan, StitchPlan::Concat { .. }));
        assert_eq!(plan.output_duration(), 7.0);
    }

    #[test]
    fn first_scene_fade_is_ignored() {
        // The first scene has no previous clip to dissolve from.
        let scenes = vec![scene(Transition::Fade), scene(Transition::Cut)];
        let clips = vec![clip("001.mp4", 3.0), clip("002.mp4", 4.0)];
        let plan = plan(&scenes, &clips).unwrap();
        assert!(matches!(plan, StitchPlan::Concat { .. }));
    }

    #[test]
    fn single_clip_with_fades_never_dissolves() {
        let scenes = vec![scene(Transition::Cut), scene(Transition::Fade)];
        let clips = vec![clip("001.mp4", 6.0)];
        let plan = plan(&scenes, &clips).unwrap();
        assert!(matches!(plan, StitchPlan::Single { .. }));
        assert_eq!(plan.step_count(), 0);
        assert_eq!(plan.output_duration(), 6.0);
    }

    #[test]
    fn cut_then_fade_scenario() {
        // clips 001.mp4 (3s) + 002.mp4 (4s), transitions [cut, fade]:
        // one dissolve junction, output runs 3 + 4 - 0.5 = 6.5s.
        let scenes = vec![scene(Transition::Cut), scene(Transition::Fade)];
        let clips = vec![clip("001.mp4", 3.0), clip("002.mp4", 4.0)];
        let plan = plan(&scenes, &clips).unwrap();
        assert_eq!(plan.fade_count(), 1);
        assert_eq!(plan.output_duration(), 6.5);
    }

    #[test]
    fn mixed_junctions_duration_property() {
        let scenes = vec![
            scene(Transition::Cut),
            scene(Transition::Fade),
            scene(Transition::Cut),
            scene(Transition::Fade),
        ];
        let clips = vec![
            clip("001.mp4", 2.0),
            clip("002.mp4", 3.0),
            clip("003.mp4", 4.0),
            clip("004.mp4", 5.0),
        ];
        let plan = plan(&scenes, &clips).unwrap();
        let StitchPlan::Crossfade { junctions, .. } = &plan else {
            panic!("expected crossfade plan");
        };
        assert_eq!(
            junctions,
            &vec![Junction::Fade, Junction::Cut, Junction::Fade]
        );
        assert_eq!(plan.fade_count(), 2);
        assert_eq!(plan.output_duration(), 2.0 + 3.0 + 4.0 + 5.0 - 1.0);
    }

    #[test]
    fn more_clips_than_scenes_defaults_to_cuts() {
        let scenes = vec![scene(Transition::Cut), scene(Transition::Fade)];
        let clips = vec![
            clip("001.mp4", 2.0),
            clip("002.mp4", 2.0),
            clip("003.mp4", 2.0),
        ];
        let plan = plan(&scenes, &clips).unwrap();
        let StitchPlan::Crossfade { junctions, .. } = &plan else {
            panic!("expected crossfade plan");
        };
        assert_eq!(junctions, &vec![Junction::Fade, Junction::Cut]);
    }
}
