//! YouTube metadata fetch and download using yt-dlp.

use crate::error::{Result, SiktError};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Maximum stored description length for a fetched video.
const DESCRIPTION_LIMIT: usize = 500;

/// Download quality selector.
///
/// Each variant maps to a yt-dlp format expression selecting the best
/// available streams not exceeding the height cap, preferring mp4/m4a and
/// falling back to any container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Quality {
    Q360,
    Q480,
    #[default]
    Q720,
    Q1080,
    Best,
}

impl Quality {
    /// Parse a quality label, falling back to the default for unknown input.
    pub fn parse(label: &str) -> Self {
        match label {
            "360p" => Quality::Q360,
            "480p" => Quality::Q480,
            "720p" => Quality::Q720,
            "1080p" => Quality::Q1080,
            "best" => Quality::Best,
            _ => Quality::default(),
        }
    }

    /// The yt-dlp format selection expression for this quality.
    pub fn format_selector(&self) -> &'static str {
        match self {
            Quality::Best => "bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best",
            Quality::Q1080 => {
                "bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080]"
            }
            Quality::Q720 => {
                "bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720]"
            }
            Quality::Q480 => {
                "bestvideo[height<=480][ext=mp4]+bestaudio[ext=m4a]/best[height<=480]"
            }
            Quality::Q360 => {
                "bestvideo[height<=360][ext=mp4]+bestaudio[ext=m4a]/best[height<=360]"
            }
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Quality::Q360 => "360p",
            Quality::Q480 => "480p",
            Quality::Q720 => "720p",
            Quality::Q1080 => "1080p",
            Quality::Best => "best",
        }
    }
}

/// Metadata snapshot for a remote video, fetched without downloading.
#[derive(Debug, Clone)]
pub struct YoutubeInfo {
    pub title: String,
    pub duration: u64,
    pub uploader: String,
    pub description: String,
    pub view_count: u64,
    pub like_count: u64,
    pub upload_date: String,
    pub url: String,
}

/// Result of a completed download.
#[derive(Debug, Clone)]
pub struct DownloadResult {
    pub video_path: PathBuf,
    pub title: String,
    pub duration: u64,
    pub uploader: String,
    pub description: String,
    pub output_dir: PathBuf,
}

/// Fetch metadata for a video URL without downloading content.
#[instrument(fields(url = %url))]
pub async fn fetch_info(url: &str) -> Result<YoutubeInfo> {
    let json = dump_json(url).await?;
    Ok(parse_info(&json, url))
}

/// Download a video to `output_dir` at the requested quality.
///
/// The output template is `<dir>/<title>.<ext>` with the final container
/// merged to mp4. After yt-dlp finishes, the on-disk path is resolved:
/// first the expected `<title>.mp4`, then any non-partial file sharing the
/// title prefix.
#[instrument(skip(output_dir), fields(url = %url, quality = %quality.label()))]
pub async fn download(
    url: &str,
    quality: Quality,
    output_dir: Option<PathBuf>,
) -> Result<DownloadResult> {
    let output_dir = output_dir.unwrap_or_else(default_download_dir);
    std::fs::create_dir_all(&output_dir)?;

    // Metadata first: the title determines the expected output filename.
    let info = fetch_info(url).await?;
    info!("Downloading '{}' at {}", info.title, quality.label());

    let template = output_dir.join("%(title)s.%(ext)s");

    let result = Command::new("yt-dlp")
        .arg("-f").arg(quality.format_selector())
        .arg("--output").arg(&template)
        .arg("--merge-output-format").arg("mp4")
        .arg("--no-playlist")
        .arg("--quiet")
        .arg("--no-warnings")
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::piped())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiktError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(SiktError::Download(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SiktError::Download(format!(
            "yt-dlp failed: {}",
            stderr.trim()
        )));
    }

    let video_path = resolve_downloaded_file(&output_dir, &info.title)?;
    debug!("Resolved downloaded file to {:?}", video_path);

    Ok(DownloadResult {
        video_path,
        title: info.title,
        duration: info.duration,
        uploader: info.uploader,
        description: info.description,
        output_dir,
    })
}

/// Default directory for downloaded videos: `~/video-downloads`.
pub fn default_download_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("video-downloads")
}

/// Run `yt-dlp --dump-json` for a URL and parse the output.
async fn dump_json(url: &str) -> Result<serde_json::Value> {
    let result = Command::new("yt-dlp")
        .args([
            "--dump-json",
            "--no-download",
            "--no-warnings",
            "--no-playlist",
            url,
        ])
        .stdin(Stdio::null())
        .output()
        .await;

    let output = match result {
        Ok(o) => o,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(SiktError::ToolNotFound("yt-dlp".into()));
        }
        Err(e) => {
            return Err(SiktError::Youtube(format!("yt-dlp execution failed: {e}")));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(SiktError::Youtube(format!(
            "Video not found or unavailable: {}",
            stderr.trim()
        )));
    }

    let json_str = String::from_utf8_lossy(&output.stdout);
    serde_json::from_str(&json_str)
        .map_err(|e| SiktError::Youtube(format!("Failed to parse yt-dlp output: {e}")))
}

/// Extract the fields of interest from a yt-dlp JSON dump.
fn parse_info(json: &serde_json::Value, url: &str) -> YoutubeInfo {
    YoutubeInfo {
        title: json["title"].as_str().unwrap_or("unknown").to_string(),
        duration: json["duration"].as_f64().unwrap_or(0.0) as u64,
        uploader: json["uploader"]
            .as_str()
            .or_else(|| json["channel"].as_str())
            .unwrap_or("unknown")
            .to_string(),
        description: truncate(json["description"].as_str().unwrap_or(""), DESCRIPTION_LIMIT),
        view_count: json["view_count"].as_u64().unwrap_or(0),
        like_count: json["like_count"].as_u64().unwrap_or(0),
        upload_date: json["upload_date"].as_str().unwrap_or("unknown").to_string(),
        url: url.to_string(),
    }
}

/// Locate the downloaded file on disk.
///
/// The on-disk name is predicted by applying yt-dlp's filename sanitization
/// to the title. If the expected `<sanitized>.mp4` is absent the directory
/// is scanned for the first non-partial file sharing that prefix (raw title
/// accepted too, for names the sanitizer leaves untouched).
fn resolve_downloaded_file(dir: &Path, title: &str) -> Result<PathBuf> {
    let sanitized = sanitize_title(title);

    let expected = dir.join(format!("{}.mp4", sanitized));
    if expected.exists() {
        return Ok(expected);
    }

    for entry in std::fs::read_dir(dir)?.flatten() {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if (name.starts_with(&sanitized) || name.starts_with(title)) && !name.ends_with(".part") {
            return Ok(entry.path());
        }
    }

    Err(SiktError::Download(
        "Download completed but file not found".into(),
    ))
}

/// Approximate yt-dlp's default filename sanitization for `%(title)s`.
///
/// Unsafe characters are mapped to their fullwidth Unicode counterparts
/// (`/` and `\` to big solidus variants), newlines become spaces, control
/// characters are dropped, and trailing dots/spaces are trimmed.
fn sanitize_title(title: &str) -> String {
    let sanitized: String = title
        .chars()
        .filter_map(|c| match c {
            '/' => Some('\u{29F8}'),
            '\\' => Some('\u{29F9}'),
            '"' | '*' | ':' | '<' | '>' | '?' | '|' => char::from_u32(c as u32 + 0xFEE0),
            '\n' => Some(' '),
            c if c.is_control() => None,
            c => Some(c),
        })
        .collect();

    sanitized.trim_end_matches(['.', ' ']).to_string()
}

/// Truncate a string to at most `max_chars` characters.
pub fn truncate(s: &str, max_chars: usize) -> String {
    s.chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_quality_parse() {
        assert_eq!(Quality::parse("360p"), Quality::Q360);
        assert_eq!(Quality::parse("480p"), Quality::Q480);
        assert_eq!(Quality::parse("720p"), Quality::Q720);
        assert_eq!(Quality::parse("1080p"), Quality::Q1080);
        assert_eq!(Quality::parse("best"), Quality::Best);
        // Unknown labels fall back to the default
        assert_eq!(Quality::parse("4k"), Quality::Q720);
        assert_eq!(Quality::parse(""), Quality::Q720);
    }

    #[test]
    fn test_format_selector_caps_height() {
        assert!(Quality::Q360.format_selector().contains("height<=360"));
        assert!(Quality::Q480.format_selector().contains("height<=480"));
        assert!(Quality::Q720.format_selector().contains("height<=720"));
        assert!(Quality::Q1080.format_selector().contains("height<=1080"));
        assert!(!Quality::Best.format_selector().contains("height"));
        // All selectors prefer mp4 containers
        for q in [
            Quality::Q360,
            Quality::Q480,
            Quality::Q720,
            Quality::Q1080,
            Quality::Best,
        ] {
            assert!(q.format_selector().contains("[ext=mp4]"));
        }
    }

    #[test]
    fn test_parse_info_defaults() {
        let info = parse_info(&json!({}), "https://example.com/v");
        assert_eq!(info.title, "unknown");
        assert_eq!(info.duration, 0);
        assert_eq!(info.uploader, "unknown");
        assert_eq!(info.view_count, 0);
        assert_eq!(info.upload_date, "unknown");
        assert_eq!(info.url, "https://example.com/v");
    }

    #[test]
    fn test_parse_info_truncates_description() {
        let long = "x".repeat(2000);
        let info = parse_info(&json!({ "description": long }), "u");
        assert_eq!(info.description.chars().count(), DESCRIPTION_LIMIT);
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo wörld", 5), "héllo");
        assert_eq!(truncate("short", 500), "short");
    }

    #[test]
    fn test_resolve_downloaded_file_expected_path() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("My Video.mp4"), b"").unwrap();

        let path = resolve_downloaded_file(dir.path(), "My Video").unwrap();
        assert_eq!(path, dir.path().join("My Video.mp4"));
    }

    #[test]
    fn test_resolve_downloaded_file_prefix_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("My Video.webm"), b"").unwrap();
        std::fs::write(dir.path().join("My Video.mp4.part"), b"").unwrap();

        let path = resolve_downloaded_file(dir.path(), "My Video").unwrap();
        assert_eq!(path, dir.path().join("My Video.webm"));
    }

    #[test]
    fn test_sanitize_title() {
        // Clean titles pass through unchanged
        assert_eq!(sanitize_title("My Video"), "My Video");
        // Unsafe characters map to their fullwidth counterparts
        assert_eq!(sanitize_title("A/B Test"), "A\u{29F8}B Test");
        assert_eq!(sanitize_title("Q&A: part 2?"), "Q&A\u{FF1A} part 2\u{FF1F}");
        assert_eq!(sanitize_title("a|b*c"), "a\u{FF5C}b\u{FF0A}c");
        // Newlines become spaces, trailing dots are trimmed
        assert_eq!(sanitize_title("line\nbreak..."), "line break");
    }

    #[test]
    fn test_resolve_downloaded_file_sanitized_title() {
        let dir = tempfile::tempdir().unwrap();
        // yt-dlp writes the sanitized name for a title containing '/'
        std::fs::write(dir.path().join("A\u{29F8}B Test.mp4"), b"").unwrap();

        let path = resolve_downloaded_file(dir.path(), "A/B Test").unwrap();
        assert_eq!(path, dir.path().join("A\u{29F8}B Test.mp4"));
    }

    #[test]
    fn test_resolve_downloaded_file_sanitized_prefix_fallback() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("What\u{FF1F} Why\u{FF1F}.webm"), b"").unwrap();

        let path = resolve_downloaded_file(dir.path(), "What? Why?").unwrap();
        assert_eq!(path, dir.path().join("What\u{FF1F} Why\u{FF1F}.webm"));
    }

    #[test]
    fn test_resolve_downloaded_file_missing() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("Other.mp4"), b"").unwrap();

        let err = resolve_downloaded_file(dir.path(), "My Video").unwrap_err();
        assert!(err.to_string().contains("file not found"));
    }
}
