//! Configuration settings for Sikt.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub youtube: YoutubeSettings,
    pub ai: AiSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Directory for downloaded videos.
    pub download_dir: String,
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            download_dir: "~/video-downloads".to_string(),
            log_level: "info".to_string(),
        }
    }
}

/// YouTube download settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct YoutubeSettings {
    /// Default download quality (360p, 480p, 720p, 1080p, best).
    pub default_quality: String,
}

impl Default for YoutubeSettings {
    fn default() -> Self {
        Self {
            default_quality: "720p".to_string(),
        }
    }
}

/// Groq AI settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiSettings {
    /// Groq API base URL (OpenAI-compatible).
    pub api_base: String,
    /// Vision model for frame analysis.
    pub vision_model: String,
    /// Speech-to-text model for transcription.
    pub audio_model: String,
    /// Maximum completion tokens for analysis requests.
    pub max_tokens: u32,
    /// Sampling temperature for analysis requests.
    pub temperature: f32,
}

impl Default for AiSettings {
    fn default() -> Self {
        Self {
            api_base: crate::groq::DEFAULT_API_BASE.to_string(),
            vision_model: "meta-llama/llama-4-scout-17b-16e-instruct".to_string(),
            audio_model: "whisper-large-v3-turbo".to_string(),
            max_tokens: 4096,
            temperature: 0.7,
        }
    }
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> crate::error::Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    pub fn load_from(path: Option<&PathBuf>) -> crate::error::Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            let settings: Settings = toml::from_str(&content)?;
            Ok(settings)
        } else {
            Ok(Settings::default())
        }
    }

    /// Save settings to a specific path.
    pub fn save_to(&self, path: &PathBuf) -> crate::error::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| crate::error::SiktError::Config(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("sikt")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    /// Get the expanded download directory path.
    pub fn download_dir(&self) -> PathBuf {
        Self::expand_path(&self.general.download_dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = Settings::default();
        assert_eq!(settings.youtube.default_quality, "720p");
        assert_eq!(settings.general.download_dir, "~/video-downloads");
        assert!(settings.ai.api_base.contains("groq.com"));
        assert_eq!(settings.ai.audio_model, "whisper-large-v3-turbo");
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let settings: Settings =
            toml::from_str("[youtube]\ndefault_quality = \"1080p\"\n").unwrap();
        assert_eq!(settings.youtube.default_quality, "1080p");
        assert_eq!(settings.general.download_dir, "~/video-downloads");
        assert_eq!(settings.ai.max_tokens, 4096);
    }

    #[test]
    fn test_expand_path() {
        let expanded = Settings::expand_path("~/video-downloads");
        assert!(!expanded.to_string_lossy().starts_with('~'));
    }
}
