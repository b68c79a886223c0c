//! Download command - fetch a YouTube video.

use crate::cli::Output;
use crate::config::Settings;
use crate::youtube::{self, Quality};
use anyhow::Result;
use std::path::PathBuf;

/// Download a YouTube video at the requested quality.
pub async fn run_download(
    url: &str,
    quality: Option<String>,
    output_dir: Option<String>,
    settings: &Settings,
) -> Result<()> {
    let quality = Quality::parse(
        quality
            .as_deref()
            .unwrap_or(&settings.youtube.default_quality),
    );
    let output_dir = output_dir
        .map(PathBuf::from)
        .unwrap_or_else(|| settings.download_dir());

    Output::info(&format!("Downloading {} at {}...", url, quality.label()));

    let result = youtube::download(url, quality, Some(output_dir)).await?;

    Output::success(&format!("Downloaded '{}'", result.title));
    Output::kv("Saved to", &result.video_path.display().to_string());
    Output::kv("Duration", &format!("{} seconds", result.duration));
    Output::kv("Uploader", &result.uploader);

    Ok(())
}
