//! Info command - probe a local video file.

use crate::cli::Output;
use crate::video;
use anyhow::{bail, Result};
use std::path::Path;

/// Probe a video and print its metadata.
pub async fn run_info(video_path: &str) -> Result<()> {
    let path = Path::new(video_path);
    if !path.exists() {
        bail!("Video file not found: {}", video_path);
    }

    let info = video::probe_video(path).await?;

    Output::header(&info.filename);
    Output::kv(
        "Duration",
        &format!("{:.2} seconds ({:.1} minutes)", info.duration, info.duration / 60.0),
    );
    Output::kv("Resolution", &format!("{}x{}", info.width, info.height));
    Output::kv("Codec", &info.codec);

    Ok(())
}
