//! Local video processing using ffmpeg and ffprobe.
//!
//! Every operation here is a thin wrapper over an external command. Probe
//! sub-queries degrade to documented defaults (0 / "unknown") instead of
//! failing the whole call; per-frame extraction failures are dropped from
//! the result list.

use crate::error::{Result, SiktError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument, warn};

/// Metadata for a local video file.
///
/// Fields that could not be probed hold their defaults: `0` for duration
/// and resolution, `"unknown"` for the codec.
#[derive(Debug, Clone, PartialEq)]
pub struct VideoInfo {
    pub duration: f64,
    pub width: u32,
    pub height: u32,
    pub codec: String,
    pub path: PathBuf,
    pub filename: String,
}

/// Probe a video file with ffprobe.
///
/// Runs three independent queries (duration, resolution, codec). A query
/// that fails or produces unparsable output only degrades its own field.
/// The call errors only when ffprobe itself cannot be executed.
#[instrument(fields(path = %path.display()))]
pub async fn probe_video(path: &Path) -> Result<VideoInfo> {
    let duration = probe_duration(path).await?;
    let (width, height) = probe_resolution(path).await?;
    let codec = probe_codec(path).await?;

    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    Ok(VideoInfo {
        duration,
        width,
        height,
        codec,
        path: path.to_path_buf(),
        filename,
    })
}

/// Query container duration in seconds. Returns 0.0 if undetermined.
async fn probe_duration(path: &Path) -> Result<f64> {
    let output = run_ffprobe(&[
        "-v",
        "error",
        "-show_entries",
        "format=duration",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ], path)
    .await?;

    Ok(output
        .and_then(|s| s.trim().parse::<f64>().ok())
        .unwrap_or(0.0))
}

/// Query the resolution of the first video stream. Returns (0, 0) if undetermined.
async fn probe_resolution(path: &Path) -> Result<(u32, u32)> {
    let output = run_ffprobe(&[
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=width,height",
        "-of",
        "csv=s=x:p=0",
    ], path)
    .await?;

    let parsed = output.and_then(|s| {
        let s = s.trim();
        let (w, h) = s.split_once('x')?;
        Some((w.parse::<u32>().ok()?, h.parse::<u32>().ok()?))
    });

    Ok(parsed.unwrap_or((0, 0)))
}

/// Query the codec name of the first video stream. Returns "unknown" if undetermined.
async fn probe_codec(path: &Path) -> Result<String> {
    let output = run_ffprobe(&[
        "-v",
        "error",
        "-select_streams",
        "v:0",
        "-show_entries",
        "stream=codec_name",
        "-of",
        "default=noprint_wrappers=1:nokey=1",
    ], path)
    .await?;

    Ok(output
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "unknown".to_string()))
}

/// Run ffprobe, returning stdout on success and None on non-zero exit.
async fn run_ffprobe(args: &[&str], path: &Path) -> Result<Option<String>> {
    let result = Command::new("ffprobe")
        .args(args)
        .arg(path)
        .stdin(Stdio::null())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiktError::ToolNotFound("ffprobe".into()));
        }
        Err(e) => {
            return Err(SiktError::VideoProcessing(format!(
                "ffprobe execution failed: {e}"
            )));
        }
    };

    if output.status.success() {
        Ok(Some(String::from_utf8_lossy(&output.stdout).into_owned()))
    } else {
        debug!("ffprobe query failed for {:?}", path);
        Ok(None)
    }
}

/// Compute evenly spaced sample timestamps strictly inside the clip.
///
/// For `count` frames the interval is `duration / (count + 1)` and samples
/// land at `i * interval` for `i = 1..=count`, leaving one interval of
/// margin at each end.
pub fn frame_timestamps(duration: f64, count: u64) -> Vec<f64> {
    if duration <= 0.0 || count == 0 {
        return Vec::new();
    }
    let interval = duration / (count + 1) as f64;
    (1..=count).map(|i| i as f64 * interval).collect()
}

/// Extract frames from a video at equal intervals.
///
/// Frames land next to the video unless `output_dir` is given. A frame
/// whose ffmpeg invocation fails is dropped from the result; partial
/// success is normal. Returns an empty list when the duration cannot be
/// determined.
#[instrument(skip(output_dir), fields(path = %path.display()))]
pub async fn extract_frames(
    path: &Path,
    num_frames: u64,
    output_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let output_dir = resolve_output_dir(path, output_dir);
    std::fs::create_dir_all(&output_dir)?;

    let info = match probe_video(path).await {
        Ok(info) => info,
        Err(e) => {
            warn!("Probe failed before frame extraction: {}", e);
            return Ok(Vec::new());
        }
    };

    if info.duration <= 0.0 {
        return Ok(Vec::new());
    }

    let stem = file_stem(path);
    let mut extracted = Vec::new();

    for (i, timestamp) in frame_timestamps(info.duration, num_frames)
        .into_iter()
        .enumerate()
    {
        let frame_path = output_dir.join(format!("{}_frame_{:03}.jpg", stem, i + 1));

        let status = Command::new("ffmpeg")
            .arg("-y")
            .arg("-i").arg(path)
            .arg("-ss").arg(format!("{timestamp}"))
            .arg("-vframes").arg("1")
            .arg("-q:v").arg("2")
            .arg(&frame_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .await;

        match status {
            Ok(s) if s.success() && frame_path.exists() => extracted.push(frame_path),
            Ok(_) => warn!("Frame {} extraction failed, skipping", i + 1),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(SiktError::ToolNotFound("ffmpeg".into()));
            }
            Err(e) => warn!("Frame {} extraction error: {}, skipping", i + 1, e),
        }
    }

    debug!("Extracted {} of {} frames", extracted.len(), num_frames);
    Ok(extracted)
}

/// Extract the audio track of a video to MP3.
///
/// Defaults to `<stem>_audio.mp3` next to the video.
#[instrument(skip(output_path), fields(path = %path.display()))]
pub async fn extract_audio(path: &Path, output_path: Option<PathBuf>) -> Result<PathBuf> {
    let output_path = output_path.unwrap_or_else(|| {
        resolve_output_dir(path, None).join(format!("{}_audio.mp3", file_stem(path)))
    });

    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i").arg(path)
        .arg("-vn")
        .arg("-acodec").arg("libmp3lame")
        .arg("-q:a").arg("2")
        .arg(&output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiktError::ToolNotFound("ffmpeg".into()));
        }
        Err(e) => {
            return Err(SiktError::VideoProcessing(format!(
                "ffmpeg execution failed: {e}"
            )));
        }
    };

    if output.status.success() && output_path.exists() {
        Ok(output_path)
    } else {
        let stderr = String::from_utf8_lossy(&output.stderr);
        Err(SiktError::ToolFailed(format!(
            "audio extraction failed: {}",
            stderr.trim()
        )))
    }
}

/// Split a video into fixed-length segments via stream copy.
///
/// Segment files are named `<stem>_segment_NNN.mp4` and returned sorted by
/// name; the zero-padded index makes lexicographic order equal numeric
/// order up to 999 segments. Returns an empty list when the duration
/// cannot be determined, without invoking ffmpeg.
#[instrument(skip(output_dir), fields(path = %path.display()))]
pub async fn split_video(
    path: &Path,
    segment_duration: u64,
    output_dir: Option<&Path>,
) -> Result<Vec<PathBuf>> {
    let output_dir = resolve_output_dir(path, output_dir);
    std::fs::create_dir_all(&output_dir)?;

    let info = match probe_video(path).await {
        Ok(info) => info,
        Err(e) => {
            warn!("Probe failed before splitting: {}", e);
            return Ok(Vec::new());
        }
    };

    if info.duration <= 0.0 {
        return Ok(Vec::new());
    }

    let stem = file_stem(path);
    let pattern = output_dir.join(format!("{}_segment_%03d.mp4", stem));

    let result = Command::new("ffmpeg")
        .arg("-y")
        .arg("-i").arg(path)
        .arg("-c").arg("copy")
        .arg("-map").arg("0")
        .arg("-segment_time").arg(segment_duration.to_string())
        .arg("-f").arg("segment")
        .arg("-reset_timestamps").arg("1")
        .arg(&pattern)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .await;

    match result {
        Ok(_) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiktError::ToolNotFound("ffmpeg".into()));
        }
        Err(e) => {
            return Err(SiktError::VideoProcessing(format!(
                "ffmpeg execution failed: {e}"
            )));
        }
    }

    collect_segments(&output_dir, &stem)
}

/// List segment files produced by [`split_video`], sorted by name.
fn collect_segments(dir: &Path, stem: &str) -> Result<Vec<PathBuf>> {
    let prefix = format!("{}_segment_", stem);
    let mut segments = Vec::new();

    for entry in std::fs::read_dir(dir)?.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(&prefix) && name.ends_with(".mp4") {
            segments.push(entry.path());
        }
    }

    segments.sort();
    Ok(segments)
}

/// Default output directory: the directory containing the video.
fn resolve_output_dir(video_path: &Path, output_dir: Option<&Path>) -> PathBuf {
    match output_dir {
        Some(dir) => dir.to_path_buf(),
        None => video_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(|p| p.to_path_buf())
            .unwrap_or_else(|| PathBuf::from(".")),
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "video".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_timestamps_evenly_spaced() {
        let ts = frame_timestamps(10.0, 4);
        assert_eq!(ts, vec![2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_frame_timestamps_strictly_inside_clip() {
        for count in 1..=20u64 {
            let duration = 37.5;
            let ts = frame_timestamps(duration, count);
            assert_eq!(ts.len(), count as usize);

            for window in ts.windows(2) {
                assert!(window[0] < window[1], "timestamps must increase");
            }
            assert!(ts[0] > 0.0);
            assert!(*ts.last().unwrap() < duration);
        }
    }

    #[test]
    fn test_frame_timestamps_zero_duration() {
        assert!(frame_timestamps(0.0, 5).is_empty());
        assert!(frame_timestamps(-1.0, 5).is_empty());
    }

    #[test]
    fn test_collect_segments_sorted() {
        let dir = tempfile::tempdir().unwrap();
        for idx in [2, 0, 1, 10] {
            let name = format!("clip_segment_{:03}.mp4", idx);
            std::fs::write(dir.path().join(name), b"").unwrap();
        }
        // Unrelated files are ignored
        std::fs::write(dir.path().join("other_segment_000.mp4"), b"").unwrap();
        std::fs::write(dir.path().join("clip_segment_000.tmp"), b"").unwrap();

        let segments = collect_segments(dir.path(), "clip").unwrap();
        let names: Vec<String> = segments
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(
            names,
            vec![
                "clip_segment_000.mp4",
                "clip_segment_001.mp4",
                "clip_segment_002.mp4",
                "clip_segment_010.mp4",
            ]
        );
    }

    #[test]
    fn test_resolve_output_dir_defaults_to_parent() {
        let dir = resolve_output_dir(Path::new("/videos/clip.mp4"), None);
        assert_eq!(dir, PathBuf::from("/videos"));

        let dir = resolve_output_dir(Path::new("clip.mp4"), None);
        assert_eq!(dir, PathBuf::from("."));

        let dir = resolve_output_dir(Path::new("/videos/clip.mp4"), Some(Path::new("/out")));
        assert_eq!(dir, PathBuf::from("/out"));
    }

    #[tokio::test]
    async fn test_extract_frames_missing_video_returns_empty() {
        // Probing a nonexistent file yields duration 0, so no frames are
        // requested and no ffmpeg invocation happens.
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");
        match extract_frames(&missing, 5, None).await {
            Ok(frames) => assert!(frames.is_empty()),
            // Environments without ffprobe surface ToolNotFound instead
            Err(SiktError::ToolNotFound(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }

    #[tokio::test]
    async fn test_split_video_missing_video_returns_empty() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");
        match split_video(&missing, 60, None).await {
            Ok(segments) => assert!(segments.is_empty()),
            Err(SiktError::ToolNotFound(_)) => {}
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
}
