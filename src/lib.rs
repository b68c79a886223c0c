//! Sikt - Video Processing MCP Server
//!
//! An MCP (Model Context Protocol) server that gives AI assistants video
//! processing capabilities: metadata inspection, frame and audio extraction,
//! video splitting, YouTube download, and optional AI analysis.
//!
//! The name "Sikt" comes from the Norwegian word for "sight."
//!
//! # Overview
//!
//! Sikt exposes three tiers of tools over JSON-RPC 2.0 on stdio:
//!
//! - Local media tools backed by ffmpeg/ffprobe (no API key needed)
//! - YouTube tools backed by yt-dlp (no API key needed)
//! - AI analysis tools backed by the Groq API (require `GROQ_API_KEY`)
//!
//! When `GROQ_API_KEY` is absent the AI tools remain listed but answer with
//! an instructional message instead of calling the backend.
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration management
//! - `video` - ffmpeg/ffprobe wrappers (probe, frames, audio, split)
//! - `youtube` - yt-dlp wrappers (metadata fetch, download)
//! - `analysis` - Groq vision analysis and audio transcription
//! - `mcp` - JSON-RPC protocol, tool catalog, and dispatcher
//!
//! # Example
//!
//! ```rust,no_run
//! use sikt::config::Settings;
//! use sikt::mcp::McpServer;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let mut server = McpServer::new(settings);
//!     server.run().await
//! }
//! ```

pub mod analysis;
pub mod cli;
pub mod config;
pub mod error;
pub mod groq;
pub mod mcp;
pub mod video;
pub mod youtube;

pub use error::{Result, SiktError};
