//! MCP server implementation.
//!
//! Owns the protocol loop and the tool dispatcher. Every tool call is
//! answered with a single text block; failures of any kind are rendered
//! into that text rather than escaping to the transport.

use super::protocol::*;
use super::tools::{get_tools, ToolName};
use crate::analysis::Analyzer;
use crate::config::Settings;
use crate::video;
use crate::youtube::{self, Quality};
use serde_json::{json, Value};
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};

const PROTOCOL_VERSION: &str = "2024-11-05";
const SERVER_NAME: &str = "sikt";
const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Answer returned for AI tools when no API key is configured.
const MISSING_KEY_MESSAGE: &str = "Error: GROQ_API_KEY environment variable is required for AI features.\n\
    Set it with: export GROQ_API_KEY=your-key\n\
    Or use FFmpeg-only tools: get_video_info, extract_video_frames, extract_video_audio, split_video";

const DEFAULT_ANALYZE_PROMPT: &str =
    "Describe this video in detail, including scenes, actions, objects, people, and context";

const SUMMARY_PROMPT: &str = "Analyze this video and provide a comprehensive summary:\n\
    1. Main topic or subject\n\
    2. Key events or actions in chronological order\n\
    3. Setting and context\n\
    4. Visual elements (objects, people, text visible)\n\
    5. Overall narrative or message\n\
    6. Important details worth noting";

const COMPLETE_PROMPT: &str = "Analyze this video thoroughly. Describe:\n\
    1. Visual scenes, settings, and environments\n\
    2. Actions, movements, and events\n\
    3. Objects, people, and visual elements\n\
    4. Visual context and atmosphere";

/// MCP server for Sikt.
///
/// The analyzer is constructed exactly once at startup when `GROQ_API_KEY`
/// is present and handed to the dispatcher as an explicit dependency.
pub struct McpServer {
    settings: Settings,
    analyzer: Option<Arc<Analyzer>>,
}

impl McpServer {
    /// Create a new MCP server, building the AI analyzer if a key is set.
    pub fn new(settings: Settings) -> Self {
        let analyzer = if crate::groq::api_key_configured() {
            match Analyzer::new(&settings.ai) {
                Ok(analyzer) => Some(Arc::new(analyzer)),
                Err(e) => {
                    warn!("Failed to initialize AI analyzer: {}", e);
                    None
                }
            }
        } else {
            None
        };

        Self { settings, analyzer }
    }

    /// Whether AI tools are usable.
    pub fn ai_enabled(&self) -> bool {
        self.analyzer.is_some()
    }

    /// Run the MCP server (reads from stdin, writes to stdout).
    pub async fn run(&mut self) -> anyhow::Result<()> {
        let stdin = io::stdin();
        let mut stdout = io::stdout();

        // Log to stderr so it doesn't interfere with JSON-RPC
        if self.ai_enabled() {
            eprintln!("Sikt MCP server started with AI capabilities (Groq API)");
        } else {
            eprintln!("Sikt MCP server started (FFmpeg-only mode)");
            eprintln!("Set GROQ_API_KEY for AI features");
        }

        for line in stdin.lock().lines() {
            let line = line?;
            if line.is_empty() {
                continue;
            }

            let request: JsonRpcRequest = match serde_json::from_str(&line) {
                Ok(req) => req,
                Err(e) => {
                    warn!("Failed to parse request: {}", e);
                    let response = JsonRpcResponse::error(None, -32700, "Parse error");
                    writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
                    stdout.flush()?;
                    continue;
                }
            };

            let response = self.handle_request(request).await;
            writeln!(stdout, "{}", serde_json::to_string(&response)?)?;
            stdout.flush()?;
        }

        Ok(())
    }

    /// Handle a single JSON-RPC request.
    async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        match request.method.as_str() {
            "initialize" => self.handle_initialize(request.id),
            "initialized" => JsonRpcResponse::success(request.id, json!({})),
            "tools/list" => self.handle_tools_list(request.id),
            "tools/call" => self.handle_tools_call(request.id, request.params).await,
            _ => JsonRpcResponse::error(
                request.id,
                -32601,
                &format!("Method not found: {}", request.method),
            ),
        }
    }

    /// Handle initialize request.
    fn handle_initialize(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: ToolsCapability { list_changed: false },
            },
            server_info: ServerInfo {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
        };

        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Handle tools/list request.
    fn handle_tools_list(&self, id: Option<Value>) -> JsonRpcResponse {
        let result = ToolsListResult { tools: get_tools() };
        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Handle tools/call request.
    async fn handle_tools_call(&self, id: Option<Value>, params: Option<Value>) -> JsonRpcResponse {
        let params: ToolCallParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(id, -32602, &format!("Invalid params: {}", e))
                }
            },
            None => return JsonRpcResponse::error(id, -32602, "Missing params"),
        };

        let arguments = params.arguments.unwrap_or_else(|| json!({}));
        let text = self.call_tool(&params.name, &arguments).await;
        let result = ToolCallResult::text(text);

        JsonRpcResponse::success(id, serde_json::to_value(result).unwrap())
    }

    /// Dispatch one tool invocation and format the answer as text.
    ///
    /// Precondition failures (unknown tool, missing key, missing file) are
    /// answered before any backend call; everything else that errors is
    /// rendered as `Error: <message>`.
    pub async fn call_tool(&self, name: &str, args: &Value) -> String {
        info!("Tool call: {}", name);

        let Some(tool) = ToolName::parse(name) else {
            return format!("Unknown tool: {}", name);
        };

        if tool.requires_api_key() && self.analyzer.is_none() {
            return MISSING_KEY_MESSAGE.to_string();
        }

        // Uniform existence check for every tool taking a video path
        if let Some(path) = arg_str(args, "video_path") {
            if !path.is_empty() && !Path::new(path).exists() {
                return format!("Error: Video file not found: {}", path);
            }
        }

        match self.dispatch(tool, args).await {
            Ok(text) => text,
            Err(e) => format!("Error: {}", e),
        }
    }

    /// Route a validated invocation to its backend operation.
    async fn dispatch(&self, tool: ToolName, args: &Value) -> crate::Result<String> {
        match tool {
            ToolName::GetVideoInfo => self.tool_get_video_info(args).await,
            ToolName::ExtractVideoFrames => self.tool_extract_frames(args).await,
            ToolName::ExtractVideoAudio => self.tool_extract_audio(args).await,
            ToolName::SplitVideo => self.tool_split_video(args).await,
            ToolName::GetYoutubeInfo => self.tool_get_youtube_info(args).await,
            ToolName::DownloadYoutubeVideo => self.tool_download(args).await,
            ToolName::AnalyzeVideo => self.tool_analyze_video(args).await,
            ToolName::SummarizeVideo => self.tool_summarize_video(args).await,
            ToolName::TranscribeVideo => self.tool_transcribe_video(args).await,
            ToolName::AnalyzeVideoComplete => self.tool_analyze_complete(args).await,
        }
    }

    async fn tool_get_video_info(&self, args: &Value) -> crate::Result<String> {
        let path = video_path(args);
        let info = video::probe_video(&path).await?;
        Ok(format_video_info(&info))
    }

    async fn tool_extract_frames(&self, args: &Value) -> crate::Result<String> {
        let path = video_path(args);
        let num_frames = clamped_u64(args, "num_frames", 5, 1, 20);
        let output_dir = arg_str(args, "output_dir").map(PathBuf::from);

        let frames = video::extract_frames(&path, num_frames, output_dir.as_deref()).await?;

        if frames.is_empty() {
            return Ok("Error: Failed to extract frames from video.".to_string());
        }

        let mut result = format!("Successfully extracted {} frames:\n", frames.len());
        result.push_str(&numbered_list(&frames));
        if self.analyzer.is_none() {
            result.push_str("\n\nYou can analyze these images with your own vision model.");
        }
        Ok(result)
    }

    async fn tool_extract_audio(&self, args: &Value) -> crate::Result<String> {
        let path = video_path(args);
        let output_path = arg_str(args, "output_path").map(PathBuf::from);

        match video::extract_audio(&path, output_path).await {
            Ok(audio_file) => {
                let mut result =
                    format!("Successfully extracted audio to:\n  {}", audio_file.display());
                if self.analyzer.is_some() {
                    result.push_str("\n\nYou can transcribe this with: transcribe_video");
                }
                Ok(result)
            }
            Err(e @ crate::SiktError::ToolNotFound(_)) => Err(e),
            Err(_) => Ok("Error: Failed to extract audio from video.".to_string()),
        }
    }

    async fn tool_split_video(&self, args: &Value) -> crate::Result<String> {
        let path = video_path(args);
        let segment_duration = clamped_u64(args, "segment_duration", 60, 10, 300);
        let output_dir = arg_str(args, "output_dir").map(PathBuf::from);

        let segments = video::split_video(&path, segment_duration, output_dir.as_deref()).await?;

        if segments.is_empty() {
            return Ok("Error: Failed to split video into segments.".to_string());
        }

        Ok(format!(
            "Successfully split into {} segments ({}s each):\n{}",
            segments.len(),
            segment_duration,
            numbered_list(&segments)
        ))
    }

    async fn tool_get_youtube_info(&self, args: &Value) -> crate::Result<String> {
        let Some(url) = arg_str(args, "url").filter(|u| !u.is_empty()) else {
            return Ok("Error: YouTube URL is required".to_string());
        };

        let info = youtube::fetch_info(url).await?;
        Ok(format_youtube_info(&info))
    }

    async fn tool_download(&self, args: &Value) -> crate::Result<String> {
        let Some(url) = arg_str(args, "url").filter(|u| !u.is_empty()) else {
            return Ok("Error: YouTube URL is required".to_string());
        };

        let quality = Quality::parse(
            arg_str(args, "quality").unwrap_or(&self.settings.youtube.default_quality),
        );
        let output_dir = arg_str(args, "output_dir")
            .map(PathBuf::from)
            .unwrap_or_else(|| self.settings.download_dir());

        match youtube::download(url, quality, Some(output_dir)).await {
            Ok(result) => {
                let duration_min = result.duration as f64 / 60.0;
                Ok(format!(
                    "Successfully downloaded YouTube video!\n\n\
                     Title: {}\n\
                     Duration: {} seconds ({:.1} minutes)\n\
                     Uploader: {}\n\
                     Saved to: {}\n\n\
                     You can now analyze this video:\n\
                     - Extract frames: extract_video_frames\n\
                     - Extract audio: extract_video_audio\n\
                     - Get info: get_video_info\n\
                     - AI analysis: analyze_video (requires API key)",
                    result.title,
                    result.duration,
                    duration_min,
                    result.uploader,
                    result.video_path.display()
                ))
            }
            Err(e) => Ok(format!("Error downloading video: {}", e)),
        }
    }

    async fn tool_analyze_video(&self, args: &Value) -> crate::Result<String> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(MISSING_KEY_MESSAGE.to_string());
        };

        let path = video_path(args);
        let prompt = arg_str(args, "prompt").unwrap_or(DEFAULT_ANALYZE_PROMPT);
        let num_frames = clamped_u64(args, "num_frames", 5, 1, 10);

        let analysis = match analyzer.analyze_video(&path, prompt, num_frames, false).await {
            Ok(analysis) => analysis,
            Err(e) => return render_analysis_error(e),
        };

        Ok(format!(
            "=== AI Video Analysis ===\n\n{}\n\nAnalyzed {} frames.",
            analysis.visual_analysis,
            analysis.frames.len()
        ))
    }

    async fn tool_summarize_video(&self, args: &Value) -> crate::Result<String> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(MISSING_KEY_MESSAGE.to_string());
        };

        let path = video_path(args);
        let num_frames = clamped_u64(args, "num_frames", 8, 3, 10);

        let analysis = match analyzer
            .analyze_video(&path, SUMMARY_PROMPT, num_frames, false)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => return render_analysis_error(e),
        };

        Ok(format!(
            "=== Video Summary ===\n\n{}",
            analysis.visual_analysis
        ))
    }

    async fn tool_transcribe_video(&self, args: &Value) -> crate::Result<String> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(MISSING_KEY_MESSAGE.to_string());
        };

        let path = video_path(args);

        let audio_path = match video::extract_audio(&path, None).await {
            Ok(p) => p,
            Err(e @ crate::SiktError::ToolNotFound(_)) => return Err(e),
            Err(_) => return Ok("Error: Failed to extract audio from video".to_string()),
        };

        match analyzer.transcribe_audio(&audio_path).await {
            Ok(transcript) => Ok(format!("=== Audio Transcription ===\n\n{}", transcript)),
            Err(e) => Ok(format!("Error transcribing audio: {}", e)),
        }
    }

    async fn tool_analyze_complete(&self, args: &Value) -> crate::Result<String> {
        let Some(analyzer) = &self.analyzer else {
            return Ok(MISSING_KEY_MESSAGE.to_string());
        };

        let path = video_path(args);
        let num_frames = clamped_u64(args, "num_frames", 5, 1, 10);

        let analysis = match analyzer
            .analyze_video(&path, COMPLETE_PROMPT, num_frames, true)
            .await
        {
            Ok(analysis) => analysis,
            Err(e) => return render_analysis_error(e),
        };

        let mut result = format!("=== VISUAL ANALYSIS ===\n{}", analysis.visual_analysis);

        if let Some(transcript) = &analysis.transcript {
            result.push_str(&format!("\n\n=== AUDIO TRANSCRIPTION ===\n{}", transcript));
        } else if let Some(audio_error) = &analysis.audio_error {
            result.push_str(&format!(
                "\n\nNote: Audio analysis unavailable ({})",
                audio_error
            ));
        }

        Ok(result)
    }
}

/// String argument lookup.
fn arg_str<'a>(args: &'a Value, key: &str) -> Option<&'a str> {
    args.get(key).and_then(|v| v.as_str())
}

/// Integer argument lookup: absent or non-integer values take the default,
/// out-of-range values clamp to the declared bounds.
fn clamped_u64(args: &Value, key: &str, default: u64, min: u64, max: u64) -> u64 {
    args.get(key)
        .and_then(|v| v.as_u64())
        .unwrap_or(default)
        .clamp(min, max)
}

/// Analysis pipeline failures are rendered into the answer text without the
/// error taxonomy prefix; everything else propagates.
fn render_analysis_error(e: crate::SiktError) -> crate::Result<String> {
    match e {
        crate::SiktError::Analysis(msg) => Ok(format!("Error: {}", msg)),
        other => Err(other),
    }
}

/// The `video_path` argument as a path. Existence was already verified.
fn video_path(args: &Value) -> PathBuf {
    PathBuf::from(arg_str(args, "video_path").unwrap_or_default())
}

/// Format a list of paths as a numbered, indented list.
fn numbered_list(paths: &[PathBuf]) -> String {
    paths
        .iter()
        .enumerate()
        .map(|(i, p)| format!("  {}. {}", i + 1, p.display()))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render local video metadata. Field order and labels are part of the
/// tool contract.
fn format_video_info(info: &video::VideoInfo) -> String {
    format!(
        "Video Information:\n\
         - File: {}\n\
         - Duration: {:.2} seconds ({:.1} minutes)\n\
         - Resolution: {}x{}\n\
         - Video Codec: {}",
        info.filename,
        info.duration,
        info.duration / 60.0,
        info.width,
        info.height,
        info.codec
    )
}

/// Render YouTube metadata. Field order and labels are part of the tool
/// contract.
fn format_youtube_info(info: &youtube::YoutubeInfo) -> String {
    format!(
        "YouTube Video Information:\n\
         - Title: {}\n\
         - Duration: {} seconds ({:.1} minutes)\n\
         - Uploader: {}\n\
         - Views: {}\n\
         - Likes: {}\n\
         - Upload Date: {}\n\
         - Description: {}...\n\n\
         To download this video, use: download_youtube_video",
        info.title,
        info.duration,
        info.duration as f64 / 60.0,
        info.uploader,
        group_digits(info.view_count),
        group_digits(info.like_count),
        info.upload_date,
        youtube::truncate(&info.description, 200)
    )
}

/// Format an integer with thousands separators (1234567 -> "1,234,567").
fn group_digits(n: u64) -> String {
    let digits = n.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);

    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::VideoInfo;
    use crate::youtube::YoutubeInfo;

    fn server_without_key() -> McpServer {
        McpServer {
            settings: Settings::default(),
            analyzer: None,
        }
    }

    #[tokio::test]
    async fn test_unknown_tool() {
        let server = server_without_key();
        let text = server.call_tool("does_not_exist", &json!({})).await;
        assert_eq!(text, "Unknown tool: does_not_exist");
    }

    #[tokio::test]
    async fn test_missing_video_file() {
        let server = server_without_key();

        for name in [
            "get_video_info",
            "extract_video_frames",
            "extract_video_audio",
            "split_video",
        ] {
            let args = json!({ "video_path": "/nonexistent/clip.mp4" });
            let text = server.call_tool(name, &args).await;
            assert_eq!(
                text, "Error: Video file not found: /nonexistent/clip.mp4",
                "tool {} must check the file before any backend call",
                name
            );
        }
    }

    #[tokio::test]
    async fn test_ai_tools_without_key() {
        let server = server_without_key();

        for name in [
            "analyze_video",
            "summarize_video",
            "transcribe_video",
            "analyze_video_complete",
        ] {
            // The key precheck fires before the file check and before any
            // backend call, even with a bogus path.
            let args = json!({ "video_path": "/nonexistent/clip.mp4" });
            let text = server.call_tool(name, &args).await;
            assert_eq!(text, MISSING_KEY_MESSAGE, "tool {}", name);
        }

        assert!(MISSING_KEY_MESSAGE.contains("export GROQ_API_KEY=your-key"));
        for alternative in [
            "get_video_info",
            "extract_video_frames",
            "extract_video_audio",
            "split_video",
        ] {
            assert!(MISSING_KEY_MESSAGE.contains(alternative));
        }
    }

    #[tokio::test]
    async fn test_youtube_info_requires_url() {
        let server = server_without_key();

        let text = server.call_tool("get_youtube_info", &json!({})).await;
        assert_eq!(text, "Error: YouTube URL is required");

        let text = server
            .call_tool("download_youtube_video", &json!({ "url": "" }))
            .await;
        assert_eq!(text, "Error: YouTube URL is required");
    }

    #[test]
    fn test_numeric_args_clamped_not_rejected() {
        // Each handler's bounds, exercised through the shared lookup:
        // extract_video_frames
        assert_eq!(clamped_u64(&json!({ "num_frames": 50 }), "num_frames", 5, 1, 20), 20);
        assert_eq!(clamped_u64(&json!({ "num_frames": 0 }), "num_frames", 5, 1, 20), 1);
        // analyze_video / analyze_video_complete
        assert_eq!(clamped_u64(&json!({ "num_frames": 50 }), "num_frames", 5, 1, 10), 10);
        // summarize_video
        assert_eq!(clamped_u64(&json!({ "num_frames": 0 }), "num_frames", 8, 3, 10), 3);
        // split_video
        assert_eq!(
            clamped_u64(&json!({ "segment_duration": 5 }), "segment_duration", 60, 10, 300),
            10
        );

        // Absent or non-integer arguments take the default
        assert_eq!(clamped_u64(&json!({}), "num_frames", 5, 1, 20), 5);
        assert_eq!(clamped_u64(&json!({ "num_frames": "many" }), "num_frames", 5, 1, 20), 5);
    }

    #[test]
    fn test_analysis_error_rendered_without_variant_prefix() {
        let text = render_analysis_error(crate::SiktError::Analysis(
            "Failed to extract frames from video".to_string(),
        ))
        .unwrap();
        assert_eq!(text, "Error: Failed to extract frames from video");

        // Infrastructure failures still propagate to the dispatcher
        let err = render_analysis_error(crate::SiktError::ToolNotFound("ffmpeg".to_string()));
        assert!(err.is_err());
    }

    #[test]
    fn test_format_video_info_template() {
        let info = VideoInfo {
            duration: 10.0,
            width: 1280,
            height: 720,
            codec: "h264".to_string(),
            path: "/tmp/fixture.mp4".into(),
            filename: "fixture.mp4".to_string(),
        };

        assert_eq!(
            format_video_info(&info),
            "Video Information:\n\
             - File: fixture.mp4\n\
             - Duration: 10.00 seconds (0.2 minutes)\n\
             - Resolution: 1280x720\n\
             - Video Codec: h264"
        );
    }

    #[test]
    fn test_format_youtube_info_template() {
        let info = YoutubeInfo {
            title: "A Video".to_string(),
            duration: 212,
            uploader: "someone".to_string(),
            description: "about things".to_string(),
            view_count: 1234567,
            like_count: 890,
            upload_date: "20230115".to_string(),
            url: "https://www.youtube.com/watch?v=abc".to_string(),
        };

        let text = format_youtube_info(&info);
        assert!(text.starts_with("YouTube Video Information:\n- Title: A Video\n"));
        assert!(text.contains("- Duration: 212 seconds (3.5 minutes)"));
        assert!(text.contains("- Views: 1,234,567"));
        assert!(text.contains("- Likes: 890"));
        assert!(text.contains("- Upload Date: 20230115"));
        assert!(text.contains("- Description: about things..."));
        assert!(text.ends_with("To download this video, use: download_youtube_video"));
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits(0), "0");
        assert_eq!(group_digits(999), "999");
        assert_eq!(group_digits(1000), "1,000");
        assert_eq!(group_digits(1234567), "1,234,567");
    }

    #[tokio::test]
    async fn test_tools_list_response() {
        let server = server_without_key();
        let response = server.handle_tools_list(Some(json!(1)));

        let result = response.result.unwrap();
        let tools = result["tools"].as_array().unwrap();
        assert_eq!(tools.len(), 10);
        assert_eq!(tools[0]["name"], "get_video_info");
        assert_eq!(tools[9]["name"], "analyze_video_complete");
    }

    #[tokio::test]
    async fn test_unknown_method() {
        let server = server_without_key();
        let request = JsonRpcRequest {
            jsonrpc: "2.0".to_string(),
            id: Some(json!(1)),
            method: "resources/list".to_string(),
            params: None,
        };

        let response = server.handle_request(request).await;
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_tools_call_wraps_text_content() {
        let server = server_without_key();
        let params = json!({ "name": "does_not_exist", "arguments": {} });

        let response = server.handle_tools_call(Some(json!(2)), Some(params)).await;
        let result = response.result.unwrap();

        let content = result["content"].as_array().unwrap();
        assert_eq!(content.len(), 1);
        assert_eq!(content[0]["type"], "text");
        assert_eq!(content[0]["text"], "Unknown tool: does_not_exist");
    }
}
