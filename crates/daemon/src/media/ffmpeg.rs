use serde::Deserialize;
use std::path::Path;
use tokio::process::Command;

use crate::error::PipelineError;

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    format: Option<FormatInfo>,
}

#[derive(Debug, Deserialize)]
struct FormatInfo {
    duration: Option<String>,
}

/// Probe one media file for its duration in seconds.
pub async fn probe_duration(media_path: &Path) -> Result<f64, PipelineError> {
    let output = Command::new("ffprobe")
        .args([
            "-v",
            "error",
            "-show_entries",
            "format=duration",
            "-of",
            "json",
        ])
        .arg(media_path)
        .output()
        .await
        .map_err(|e| PipelineError::ExternalProcess {
            stage: "probe".to_string(),
            code: "spawn".to_string(),
            detail: format!("failed to run ffprobe (is FFmpeg installed?): {}", e),
        })?;

    if !output.status.success() {
        return Err(PipelineError::ExternalProcess {
            stage: "probe".to_string(),
            code: exit_code(&output.status),
            detail: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }

    let probe: ProbeOutput = serde_json::from_slice(&output.stdout)?;
    Ok(probe
        .format
        .and_then(|f| f.duration)
        .and_then(|d| d.parse::<f64>().ok())
        .unwrap_or(0.0))
}

/// Run the compositing tool with a prebuilt argument list. A non-zero
/// exit is fatal and its diagnostics are surfaced verbatim.
pub async fn run_ffmpeg(args: &[String]) -> Result<(), PipelineError> {
    let output = Command::new("ffmpeg")
        .args(args)
        .output()
        .await
        .map_err(|e| PipelineError::ExternalProcess {
            stage: "stitch".to_string(),
            code: "spawn".to_string(),
            detail: format!("failed to run ffmpeg (is FFmpeg installed?): {}", e),
        })?;

    if !output.status.success() {
        return Err(PipelineError::ExternalProcess {
            stage: "stitch".to_string(),
            code: exit_code(&output.status),
            detail: String::from_utf8_lossy(&output.stderr).into_owned(),
        });
    }
    Ok(())
}

fn exit_code(status: &std::process::ExitStatus) -> String {
    status
        .code()
        .map(|c| format!("exit {}", c))
        .unwrap_or_else(|| "killed by signal".to_string())
}
