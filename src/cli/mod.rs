//! CLI module for Sikt.

pub mod commands;
mod output;

pub use output::Output;

use clap::{Parser, Subcommand};

/// Sikt - Video Processing MCP Server
///
/// Exposes video processing tools (ffmpeg, yt-dlp, optional Groq AI) to AI
/// assistants over the Model Context Protocol.
/// The name "Sikt" comes from the Norwegian word for "sight."
#[derive(Parser, Debug)]
#[command(name = "sikt")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Start the MCP server (JSON-RPC 2.0 over stdio)
    Mcp,

    /// Check system requirements and configuration
    Doctor,

    /// Show metadata for a local video file
    Info {
        /// Path to the video file
        video_path: String,
    },

    /// Download a YouTube video
    Download {
        /// YouTube video URL
        url: String,

        /// Video quality: 360p, 480p, 720p, 1080p, or best
        #[arg(short, long)]
        quality: Option<String>,

        /// Directory to save the video
        #[arg(short, long)]
        output_dir: Option<String>,
    },
}
