use crate::stitch::{Junction, StitchPlan, FADE_DURATION};
use std::path::Path;

/// Build the full ffmpeg argument list for an assembly plan.
///
/// Clip inputs come first, in playback order; the optional song audio
/// is the last input and is truncated (or the video truncated) to the
/// shorter of the two via `-shortest`. Fade junctions become `xfade`
/// steps with offsets computed by a left-to-right fold: each step's
/// output is the left input of the next, and every fade shortens the
/// running total by FADE_DURATION before the next offset is taken.
pub fn build_stitch_args(
    plan: &StitchPlan,
    audio_path: Option<&Path>,
    output_path: &Path,
) -> Vec<String> {
    let mut args: Vec<String> = Vec::new();

    let clips: Vec<&str> = match plan {
        StitchPlan::Single { clip } => vec![clip.path.as_str()],
        StitchPlan::Concat { clips } => clips.iter().map(|c| c.path.as_str()).collect(),
        StitchPlan::Crossfade { clips, .. } => clips.iter().map(|c| c.path.as_str()).collect(),
    };

    for path in &clips {
        args.push("-i".to_string());
        args.push(path.to_string());
    }

    let audio_index = clips.len();
    if let Some(audio) = audio_path {
        args.push("-i".to_string());
        args.push(audio.to_string_lossy().to_string());
    }

    // A single input needs no filter graph at all.
    let video_label = if clips.len() >= 2 {
        let filter = match plan {
            StitchPlan::Concat { clips } => concat_filter(clips.len()),
            StitchPlan::Crossfade { clips, junctions } => {
                let durations: Vec<f64> = clips.iter().map(|c| c.duration).collect();
                fold_filter(&durations, junctions)
            }
            StitchPlan::Single { .. } => unreachable!("single plans have one input"),
        };
        args.push("-filter_complex".to_string());
        args.push(filter);
        "[outv]".to_string()
    } else {
        "0:v".to_string()
    };

    args.push("-map".to_string());
    args.push(video_label);

    if audio_path.is_some() {
        args.push("-map".to_string());
        args.push(format!("{}:a", audio_index));
        args.push("-shortest".to_string());
    }

    for arg in [
        "-c:v", "libx264", "-preset", "medium", "-crf", "23", "-pix_fmt", "yuv420p",
    ] {
        args.push(arg.to_string());
    }
    if audio_path.is_some() {
        for arg in ["-c:a", "aac", "-b:a", "192k"] {
            args.push(arg.to_string());
        }
    }

    args.push("-y".to_string());
    args.push(output_path.to_string_lossy().to_string());
    args
}

/// Plain n-ary concat of all video streams.
fn concat_filter(n: usize) -> String {
    let mut filter = String::new();
    for i in 0..n {
        filter.push_str(&format!("[{}:v]", i));
    }
    filter.push_str(&format!("concat=n={}:v=1:a=0[outv]", n));
    filter
}

/// Pairwise fold over the clip chain. Fade junctions use xfade with an
/// offset of (assembled duration so far - FADE_DURATION); cut junctions
/// use a 2-ary concat and lose no time.
fn fold_filter(durations: &[f64], junctions: &[Junction]) -> String {
    let mut parts: Vec<String> = Vec::new();
    let mut prev = "0:v".to_string();
    let mut assembled = durations[0];

    for (step, junction) in junctions.iter().enumerate() {
        let right = step + 1;
        let label = if right == durations.len() - 1 {
            "outv".to_string()
        } else {
            format!("v{}", right)
        };
        match junction {
            Junction::Fade => {
                parts.push(format!(
                    "[{}][{}:v]xfade=transition=fade:duration={}:offset={:.3}[{}]",
                    prev,
                    right,
                    FADE_DURATION,
                    assembled - FADE_DURATION,
                    label
                ));
                assembled += durations[right] - FADE_DURATION;
            }
            Junction::Cut => {
                parts.push(format!(
                    "[{}][{}:v]concat=n=2:v=1:a=0[{}]",
                    prev, right, label
                ));
                assembled += durations[right];
            }
        }
        prev = label;
    }

    parts.join(";")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stitch::ClipSource;
    use std::path::PathBuf;

    fn clip(name: &str, duration: f64) -> ClipSource {
        ClipSource {
            path: name.to_string(),
            duration,
        }
    }

    fn has_window(args: &[String], window: &[&str]) -> bool {
        args.windows(window.len())
            .any(|w| w.iter().zip(window).all(|(a, b)| a == b))
    }

    #[test]
    fn single_clip_maps_directly() {
        let plan = StitchPlan::Single {
            clip: clip("clips/001.mp4", 6.0),
        };
        let args = build_stitch_args(&plan, None, &PathBuf::from("output/final.mp4"));
        assert!(!args.contains(&"-filter_complex".to_string()));
        assert!(has_window(&args, &["-map", "0:v"]));
        assert_eq!(args.last().unwrap(), "output/final.mp4");
    }

    #[test]
    fn concat_plan_uses_nary_concat() {
        let plan = StitchPlan::Concat {
            clips: vec![clip("001.mp4", 3.0), clip("002.mp4", 4.0), clip("003.mp4", 5.0)],
        };
        let args = build_stitch_args(&plan, None, &PathBuf::from("out.mp4"));
        let pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[pos + 1], "[0:v][1:v][2:v]concat=n=3:v=1:a=0[outv]");
        assert!(has_window(&args, &["-map", "[outv]"]));
    }

    #[test]
    fn fade_offset_trails_by_half_second() {
        let plan = StitchPlan::Crossfade {
            clips: vec![clip("001.mp4", 3.0), clip("002.mp4", 4.0)],
            junctions: vec![Junction::Fade],
        };
        let args = build_stitch_args(&plan, None, &PathBuf::from("out.mp4"));
        let pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(
            args[pos + 1],
            "[0:v][1:v]xfade=transition=fade:duration=0.5:offset=2.500[outv]"
        );
    }

    #[test]
    fn fold_accounts_for_earlier_fades() {
        // 2s |fade| 3s |cut| 4s |fade| 5s
        // first offset: 2 - 0.5 = 1.5; assembled after = 4.5
        // cut: assembled = 8.5; final offset: 8.5 - 0.5 = 8.0
        let plan = StitchPlan::Crossfade {
            clips: vec![
                clip("a.mp4", 2.0),
                clip("b.mp4", 3.0),
                clip("c.mp4", 4.0),
                clip("d.mp4", 5.0),
            ],
            junctions: vec![Junction::Fade, Junction::Cut, Junction::Fade],
        };
        let args = build_stitch_args(&plan, None, &PathBuf::from("out.mp4"));
        let pos = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(
            args[pos + 1],
            "[0:v][1:v]xfade=transition=fade:duration=0.5:offset=1.500[v1];\
             [v1][2:v]concat=n=2:v=1:a=0[v2];\
             [v2][3:v]xfade=transition=fade:duration=0.5:offset=8.000[outv]"
        );
    }

    #[test]
    fn audio_input_is_mapped_and_shortest() {
        let plan = StitchPlan::Concat {
            clips: vec![clip("001.mp4", 3.0), clip("002.mp4", 4.0)],
        };
        let args = build_stitch_args(
            &plan,
            Some(&PathBuf::from("audio.mp3")),
            &PathBuf::from("out.mp4"),
        );
        assert!(has_window(&args, &["-i", "audio.mp3"]));
        assert!(has_window(&args, &["-map", "2:a"]));
        assert!(args.contains(&"-shortest".to_string()));
        assert!(has_window(&args, &["-c:a", "aac"]));
    }

    #[test]
    fn video_only_output_when_audio_missing() {
        let plan = StitchPlan::Concat {
            clips: vec![clip("001.mp4", 3.0)],
        };
        let args = build_stitch_args(&plan, None, &PathBuf::from("out.mp4"));
        assert!(!args.contains(&"-shortest".to_string()));
        assert!(!args.contains(&"-c:a".to_string()));
    }
}
