//! Configuration management for Sikt.

mod settings;

pub use settings::{AiSettings, GeneralSettings, Settings, YoutubeSettings};
