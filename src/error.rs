//! Error types for Sikt.

use thiserror::Error;

/// Library-level error type for Sikt operations.
#[derive(Error, Debug)]
pub enum SiktError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Video processing failed: {0}")]
    VideoProcessing(String),

    #[error("YouTube error: {0}")]
    Youtube(String),

    #[error("Download failed: {0}")]
    Download(String),

    #[error("Analysis failed: {0}")]
    Analysis(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Groq API error: {0}")]
    Groq(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),
}

/// Result type alias for Sikt operations.
pub type Result<T> = std::result::Result<T, SiktError>;
