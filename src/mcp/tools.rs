//! Tool catalog for the Sikt MCP server.
//!
//! Ten tools in three tiers: local media (ffmpeg), YouTube (yt-dlp), and AI
//! analysis (Groq, requires an API key). The catalog order is fixed and
//! exposed verbatim to callers.

use super::protocol::Tool;
use serde_json::json;

/// Closed set of tool identifiers, in catalog order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToolName {
    GetVideoInfo,
    ExtractVideoFrames,
    ExtractVideoAudio,
    SplitVideo,
    GetYoutubeInfo,
    DownloadYoutubeVideo,
    AnalyzeVideo,
    SummarizeVideo,
    TranscribeVideo,
    AnalyzeVideoComplete,
}

impl ToolName {
    /// All tools in catalog order.
    pub const ALL: [ToolName; 10] = [
        ToolName::GetVideoInfo,
        ToolName::ExtractVideoFrames,
        ToolName::ExtractVideoAudio,
        ToolName::SplitVideo,
        ToolName::GetYoutubeInfo,
        ToolName::DownloadYoutubeVideo,
        ToolName::AnalyzeVideo,
        ToolName::SummarizeVideo,
        ToolName::TranscribeVideo,
        ToolName::AnalyzeVideoComplete,
    ];

    /// Parse a wire name into a tool identifier.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.name() == name)
    }

    /// The wire name of this tool.
    pub fn name(&self) -> &'static str {
        match self {
            ToolName::GetVideoInfo => "get_video_info",
            ToolName::ExtractVideoFrames => "extract_video_frames",
            ToolName::ExtractVideoAudio => "extract_video_audio",
            ToolName::SplitVideo => "split_video",
            ToolName::GetYoutubeInfo => "get_youtube_info",
            ToolName::DownloadYoutubeVideo => "download_youtube_video",
            ToolName::AnalyzeVideo => "analyze_video",
            ToolName::SummarizeVideo => "summarize_video",
            ToolName::TranscribeVideo => "transcribe_video",
            ToolName::AnalyzeVideoComplete => "analyze_video_complete",
        }
    }

    /// Whether the tool needs the Groq API key.
    pub fn requires_api_key(&self) -> bool {
        matches!(
            self,
            ToolName::AnalyzeVideo
                | ToolName::SummarizeVideo
                | ToolName::TranscribeVideo
                | ToolName::AnalyzeVideoComplete
        )
    }
}

/// Get all available tools.
pub fn get_tools() -> Vec<Tool> {
    vec![
        // Local media tools (always available)
        Tool {
            name: "get_video_info".to_string(),
            description: "Get metadata about a video file (duration, resolution, codec, etc.). \
                No API key required."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    }
                },
                "required": ["video_path"]
            }),
        },
        Tool {
            name: "extract_video_frames".to_string(),
            description: "Extract frames/screenshots from video at equal intervals. \
                No API key required. Returns paths to extracted images."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    },
                    "num_frames": {
                        "type": "integer",
                        "description": "Number of frames to extract (default: 5, max: 20)",
                        "default": 5,
                        "minimum": 1,
                        "maximum": 20
                    },
                    "output_dir": {
                        "type": "string",
                        "description": "Directory to save frames (optional)"
                    }
                },
                "required": ["video_path"]
            }),
        },
        Tool {
            name: "extract_video_audio".to_string(),
            description: "Extract audio track from video to MP3 file. No API key required."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    },
                    "output_path": {
                        "type": "string",
                        "description": "Path for output MP3 (optional)"
                    }
                },
                "required": ["video_path"]
            }),
        },
        Tool {
            name: "split_video".to_string(),
            description: "Split video into smaller segments. No API key required.".to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    },
                    "segment_duration": {
                        "type": "integer",
                        "description": "Segment duration in seconds (default: 60, max: 300)",
                        "default": 60,
                        "minimum": 10,
                        "maximum": 300
                    },
                    "output_dir": {
                        "type": "string",
                        "description": "Directory for segments (optional)"
                    }
                },
                "required": ["video_path"]
            }),
        },
        // YouTube tools (no API key required)
        Tool {
            name: "get_youtube_info".to_string(),
            description: "Get information about a YouTube video (title, duration, uploader, \
                description) without downloading. No API key required."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "YouTube video URL (e.g., https://www.youtube.com/watch?v=...)"
                    }
                },
                "required": ["url"]
            }),
        },
        Tool {
            name: "download_youtube_video".to_string(),
            description: "Download a YouTube video to local storage. No API key required. \
                Supports quality selection (360p-1080p). Returns path to downloaded video file."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "url": {
                        "type": "string",
                        "description": "YouTube video URL"
                    },
                    "quality": {
                        "type": "string",
                        "description": "Video quality: 360p, 480p, 720p, 1080p, or best (default: 720p)",
                        "default": "720p",
                        "enum": ["360p", "480p", "720p", "1080p", "best"]
                    },
                    "output_dir": {
                        "type": "string",
                        "description": "Directory to save the video (optional)"
                    }
                },
                "required": ["url"]
            }),
        },
        // AI tools (require GROQ_API_KEY)
        Tool {
            name: "analyze_video".to_string(),
            description: "AI-powered video analysis using the Groq API (requires GROQ_API_KEY). \
                Extracts frames and analyzes them with a vision model."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    },
                    "prompt": {
                        "type": "string",
                        "description": "Analysis prompt (default: 'Describe this video in detail')",
                        "default": "Describe this video in detail, including scenes, actions, objects, people, and context"
                    },
                    "num_frames": {
                        "type": "integer",
                        "description": "Number of frames to analyze (default: 5, max: 10)",
                        "default": 5,
                        "minimum": 1,
                        "maximum": 10
                    }
                },
                "required": ["video_path"]
            }),
        },
        Tool {
            name: "summarize_video".to_string(),
            description: "AI-powered video summarization (requires GROQ_API_KEY). \
                Provides comprehensive summary with narrative flow."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    },
                    "num_frames": {
                        "type": "integer",
                        "description": "Number of frames to analyze (default: 8, max: 10)",
                        "default": 8,
                        "minimum": 3,
                        "maximum": 10
                    }
                },
                "required": ["video_path"]
            }),
        },
        Tool {
            name: "transcribe_video".to_string(),
            description: "AI-powered audio transcription using Groq Whisper (requires \
                GROQ_API_KEY). Converts speech to text."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    }
                },
                "required": ["video_path"]
            }),
        },
        Tool {
            name: "analyze_video_complete".to_string(),
            description: "Complete video analysis with visual AND audio content using the Groq \
                API (requires GROQ_API_KEY). Most comprehensive analysis."
                .to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "video_path": {
                        "type": "string",
                        "description": "Path to the video file"
                    },
                    "num_frames": {
                        "type": "integer",
                        "description": "Number of frames to analyze (default: 5, max: 10)",
                        "default": 5,
                        "minimum": 1,
                        "maximum": 10
                    }
                },
                "required": ["video_path"]
            }),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalog_matches_enum_order() {
        let tools = get_tools();
        assert_eq!(tools.len(), ToolName::ALL.len());

        for (tool, name) in tools.iter().zip(ToolName::ALL.iter()) {
            assert_eq!(tool.name, name.name());
        }
    }

    #[test]
    fn test_names_unique() {
        let tools = get_tools();
        let mut names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), tools.len());
    }

    #[test]
    fn test_parse_round_trip() {
        for tool in ToolName::ALL {
            assert_eq!(ToolName::parse(tool.name()), Some(tool));
        }
        assert_eq!(ToolName::parse("does_not_exist"), None);
    }

    #[test]
    fn test_exactly_four_ai_tools() {
        let ai: Vec<ToolName> = ToolName::ALL
            .into_iter()
            .filter(|t| t.requires_api_key())
            .collect();
        assert_eq!(
            ai,
            vec![
                ToolName::AnalyzeVideo,
                ToolName::SummarizeVideo,
                ToolName::TranscribeVideo,
                ToolName::AnalyzeVideoComplete,
            ]
        );
    }

    #[test]
    fn test_numeric_params_declare_bounds_and_default() {
        for tool in get_tools() {
            let props = tool.input_schema["properties"].as_object().unwrap();
            for (name, schema) in props {
                if schema["type"] == "integer" {
                    assert!(
                        schema.get("default").is_some()
                            && schema.get("minimum").is_some()
                            && schema.get("maximum").is_some(),
                        "{}.{} missing bounds or default",
                        tool.name,
                        name
                    );
                }
            }
        }
    }

    #[test]
    fn test_quality_enum_is_closed() {
        let tools = get_tools();
        let download = tools
            .iter()
            .find(|t| t.name == "download_youtube_video")
            .unwrap();
        let values = download.input_schema["properties"]["quality"]["enum"]
            .as_array()
            .unwrap();
        assert_eq!(values.len(), 5);
    }
}
