//! Assembles the rendered clips into the final video.

use engine::render::build_stitch_args;
use engine::stitch::{self, ClipSource, StitchPlan};
use engine::timeline::Stage;
use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::error::PipelineError;
use crate::events::{EventChannel, StageStatus};
use crate::media::ffmpeg;
use crate::store::ProjectStore;

const STAGE_NAME: &str = "stitch";

#[derive(Debug, Serialize)]
pub struct StitchOutcome {
    pub output: PathBuf,
    pub duration: f64,
    pub clip_count: usize,
    pub fade_count: usize,
}

/// Collect the rendered clips in playback order. Lexicographic file
/// name order is the playback order by contract; clip counts are not
/// cross-validated against scenes here.
fn collect_clips(store: &ProjectStore) -> Result<Vec<PathBuf>, PipelineError> {
    let mut paths: Vec<PathBuf> = std::fs::read_dir(store.clips_dir())?
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| {
            matches!(
                path.extension().and_then(|e| e.to_str()),
                Some("mp4") | Some("mov") | Some("webm")
            )
        })
        .collect();
    paths.sort();
    Ok(paths)
}

/// Stitch the clips into `output/final.mp4`, overwriting any prior
/// result, and on success move the project to its terminal stage.
pub async fn run(
    store: &ProjectStore,
    events: &EventChannel,
) -> Result<StitchOutcome, PipelineError> {
    events.status(STAGE_NAME, StageStatus::Running, "assembling final video");

    let scenes = store.scenes()?;
    let clip_paths = collect_clips(store)?;

    let mut clips = Vec::with_capacity(clip_paths.len());
    for path in &clip_paths {
        let duration = ffmpeg::probe_duration(path).await?;
        clips.push(ClipSource {
            path: path.to_string_lossy().into_owned(),
            duration,
        });
    }

    let plan = stitch::plan(&scenes, &clips).map_err(|e| {
        events.status(STAGE_NAME, StageStatus::Error, e.to_string());
        PipelineError::from(e)
    })?;

    let audio = store.audio_path();
    if audio.is_none() {
        // Tolerated: the result is video-only.
        warn!("no audio track found; producing video-only output");
        events.log(STAGE_NAME, "no audio track found, output will be silent");
    }

    let output = store.output_path();
    let args = build_stitch_args(&plan, audio.as_deref(), &output);

    let fade_count = plan.fade_count();
    info!(
        "stitching {} clips with {} fade junction(s) into {}",
        clips.len(),
        fade_count,
        output.display()
    );

    if let Err(e) = ffmpeg::run_ffmpeg(&args).await {
        events.status(STAGE_NAME, StageStatus::Error, e.to_string());
        return Err(e);
    }

    store.commit_stage_result(Stage::Done, &[])?;
    events.status(STAGE_NAME, StageStatus::Done, "final video written");

    Ok(StitchOutcome {
        output,
        duration: plan.output_duration(),
        clip_count: match &plan {
            StitchPlan::Single { .. } => 1,
            StitchPlan::Concat { clips } => clips.len(),
            StitchPlan::Crossfade { clips, .. } => clips.len(),
        },
        fade_count,
    })
}
