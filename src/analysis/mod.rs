//! AI video analysis using the Groq API.
//!
//! Combines frame extraction with a vision model for visual analysis and
//! Whisper for audio transcription. Constructed once at startup when
//! `GROQ_API_KEY` is present; the dispatcher receives it as an explicit
//! dependency.

use crate::config::AiSettings;
use crate::error::{Result, SiktError};
use crate::video;
use async_openai::types::{
    AudioInput, AudioResponseFormat, ChatCompletionRequestMessage,
    ChatCompletionRequestMessageContentPartImageArgs,
    ChatCompletionRequestMessageContentPartTextArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequestArgs, CreateTranscriptionRequestArgs, ImageUrlArgs,
};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use std::path::Path;
use tracing::{debug, info, instrument, warn};

/// Result of a combined visual/audio analysis.
///
/// Visual analysis is always present when frame extraction succeeded; the
/// audio side is best-effort, with failures captured in `audio_error`.
#[derive(Debug, Clone)]
pub struct AnalysisResult {
    pub visual_analysis: String,
    pub frames: Vec<std::path::PathBuf>,
    pub transcript: Option<String>,
    pub audio_error: Option<String>,
}

/// Groq-backed analyzer holding one long-lived API client.
pub struct Analyzer {
    client: async_openai::Client<async_openai::config::OpenAIConfig>,
    vision_model: String,
    audio_model: String,
    max_tokens: u32,
    temperature: f32,
}

impl Analyzer {
    /// Create an analyzer from AI settings. Fails if no API key is set.
    pub fn new(settings: &AiSettings) -> Result<Self> {
        let client = crate::groq::create_client(&settings.api_base)?;

        Ok(Self {
            client,
            vision_model: settings.vision_model.clone(),
            audio_model: settings.audio_model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
        })
    }

    /// Analyze a set of frame images with one multimodal request.
    ///
    /// The request carries the prompt followed by each frame inlined as a
    /// base64 JPEG data URL. An empty completion is returned as an empty
    /// string, not an error.
    #[instrument(skip(self, frame_paths, prompt), fields(frames = frame_paths.len()))]
    pub async fn analyze_frames(&self, frame_paths: &[std::path::PathBuf], prompt: &str) -> Result<String> {
        let mut parts: Vec<ChatCompletionRequestUserMessageContentPart> =
            vec![ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartTextArgs::default()
                    .text(prompt)
                    .build()
                    .map_err(|e| SiktError::Analysis(e.to_string()))?,
            )];

        for frame_path in frame_paths {
            let bytes = tokio::fs::read(frame_path).await?;
            let data_url = format!("data:image/jpeg;base64,{}", BASE64.encode(&bytes));

            parts.push(ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImageArgs::default()
                    .image_url(
                        ImageUrlArgs::default()
                            .url(data_url)
                            .build()
                            .map_err(|e| SiktError::Analysis(e.to_string()))?,
                    )
                    .build()
                    .map_err(|e| SiktError::Analysis(e.to_string()))?,
            ));
        }

        let messages: Vec<ChatCompletionRequestMessage> = vec![
            ChatCompletionRequestUserMessageArgs::default()
                .content(ChatCompletionRequestUserMessageContent::Array(parts))
                .build()
                .map_err(|e| SiktError::Analysis(e.to_string()))?
                .into(),
        ];

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.vision_model)
            .messages(messages)
            .temperature(self.temperature)
            .max_tokens(self.max_tokens)
            .build()
            .map_err(|e| SiktError::Analysis(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| SiktError::Groq(format!("Vision request failed: {e}")))?;

        let answer = response
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!("Vision model returned {} characters", answer.len());
        Ok(answer)
    }

    /// Transcribe an audio file with the Whisper model.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    pub async fn transcribe_audio(&self, audio_path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(audio_path).await?;

        let filename = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(filename, bytes))
            .model(&self.audio_model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| SiktError::Transcription(format!("Failed to build request: {e}")))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| SiktError::Groq(format!("Whisper request failed: {e}")))?;

        Ok(response.text)
    }

    /// Full video analysis: extract frames, analyze them, and optionally
    /// transcribe the audio track.
    ///
    /// Fails if no frames could be extracted. With `include_audio`, audio
    /// extraction or transcription failures land in `audio_error` while the
    /// visual analysis is still returned.
    #[instrument(skip(self, prompt), fields(video_path = %video_path.display()))]
    pub async fn analyze_video(
        &self,
        video_path: &Path,
        prompt: &str,
        num_frames: u64,
        include_audio: bool,
    ) -> Result<AnalysisResult> {
        let frames = video::extract_frames(video_path, num_frames, None).await?;
        if frames.is_empty() {
            return Err(SiktError::Analysis(
                "Failed to extract frames from video".into(),
            ));
        }

        info!("Analyzing {} frames with {}", frames.len(), self.vision_model);
        let visual_analysis = self.analyze_frames(&frames, prompt).await?;

        let mut result = AnalysisResult {
            visual_analysis,
            frames,
            transcript: None,
            audio_error: None,
        };

        if include_audio {
            let outcome = match video::extract_audio(video_path, None).await {
                Ok(audio_path) => self.transcribe_audio(&audio_path).await,
                Err(e) => Err(e),
            };
            apply_audio_outcome(&mut result, outcome);
        }

        Ok(result)
    }
}

/// Fold the audio side into the result. Success populates the transcript;
/// any failure, from extraction or transcription, lands in `audio_error`
/// without touching the visual side.
fn apply_audio_outcome(result: &mut AnalysisResult, outcome: Result<String>) {
    match outcome {
        Ok(transcript) => result.transcript = Some(transcript),
        Err(e) => {
            warn!("Audio analysis failed: {}", e);
            result.audio_error = Some(e.to_string());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_openai::config::OpenAIConfig;

    fn offline_analyzer() -> Analyzer {
        // Points at an unroutable address; only code paths that fail before
        // any API call may run against it.
        let config = OpenAIConfig::new()
            .with_api_base("http://127.0.0.1:1")
            .with_api_key("test-key");

        Analyzer {
            client: async_openai::Client::with_config(config),
            vision_model: "test-vision".to_string(),
            audio_model: "test-audio".to_string(),
            max_tokens: 16,
            temperature: 0.0,
        }
    }

    fn visual_only_result() -> AnalysisResult {
        AnalysisResult {
            visual_analysis: "a walkthrough of a kitchen".to_string(),
            frames: vec!["frame_001.jpg".into()],
            transcript: None,
            audio_error: None,
        }
    }

    #[test]
    fn test_audio_failure_keeps_visual_analysis() {
        let mut result = visual_only_result();
        apply_audio_outcome(
            &mut result,
            Err(SiktError::ToolFailed(
                "audio extraction failed: no audio stream".to_string(),
            )),
        );

        assert_eq!(result.visual_analysis, "a walkthrough of a kitchen");
        assert!(result.transcript.is_none());
        let audio_error = result.audio_error.expect("failure must be recorded");
        assert!(!audio_error.is_empty());
        assert!(audio_error.contains("no audio stream"));
    }

    #[test]
    fn test_audio_success_sets_transcript() {
        let mut result = visual_only_result();
        apply_audio_outcome(&mut result, Ok("hello from the kitchen".to_string()));

        assert_eq!(result.transcript.as_deref(), Some("hello from the kitchen"));
        assert!(result.audio_error.is_none());
    }

    #[tokio::test]
    async fn test_analyze_video_fails_without_frames() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.mp4");

        match offline_analyzer()
            .analyze_video(&missing, "describe", 3, false)
            .await
        {
            Err(SiktError::Analysis(msg)) => {
                assert_eq!(msg, "Failed to extract frames from video")
            }
            // Environments without ffprobe surface ToolNotFound instead
            Err(SiktError::ToolNotFound(_)) => {}
            other => panic!("expected frame extraction failure, got {:?}", other.map(|r| r.frames)),
        }
    }
}
