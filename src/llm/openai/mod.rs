mod types;

use super::http_client::build_backend_client;
use super::scrub::api_error;
use super::traits::{AiBackend, AudioClip, BackendFuture};
use crate::error::TransportError;
use reqwest::Client;
use reqwest::multipart::{Form, Part};
use types::{ChatRequest, ChatResponse, Message, TranscriptionResponse};

const BACKEND_NAME: &str = "openai";
const DEFAULT_TEMPERATURE: f64 = 0.7;
const MAX_TOKENS_CEILING: u32 = 1000;

/// Connection and request parameters for [`OpenAiBackend`].
#[derive(Debug, Clone)]
pub struct BackendSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
    pub transcription_model: String,
    pub temperature: f64,
    pub max_tokens: u32,
    pub timeout_secs: u64,
    pub transcription_language: String,
}

/// Chat completions and Whisper transcription over an OpenAI-compatible API.
pub struct OpenAiBackend {
    /// Pre-computed `"Bearer <key>"` header value.
    cached_auth_header: Option<String>,
    client: Client,
    base_url: String,
    model: String,
    transcription_model: String,
    temperature: f64,
    max_tokens: u32,
    timeout_secs: u64,
    transcription_language: String,
}

impl OpenAiBackend {
    pub fn new(settings: BackendSettings) -> Self {
        Self {
            cached_auth_header: settings
                .api_key
                .filter(|key| !key.trim().is_empty())
                .map(|key| format!("Bearer {}", key.trim())),
            client: build_backend_client(settings.timeout_secs),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model,
            transcription_model: settings.transcription_model,
            temperature: clamp_temperature(settings.temperature),
            max_tokens: settings.max_tokens.clamp(1, MAX_TOKENS_CEILING),
            timeout_secs: settings.timeout_secs,
            transcription_language: settings.transcription_language,
        }
    }

    fn send_error(&self, error: reqwest::Error) -> TransportError {
        if error.is_timeout() {
            TransportError::Timeout {
                backend: BACKEND_NAME.into(),
                timeout_secs: self.timeout_secs,
            }
        } else {
            TransportError::Network {
                backend: BACKEND_NAME.into(),
                message: super::scrub::sanitize_api_error(&error.to_string()),
            }
        }
    }

    fn auth_header(&self) -> Result<&str, TransportError> {
        self.cached_auth_header
            .as_deref()
            .ok_or(TransportError::MissingApiKey)
    }

    async fn send_chat(&self, system_prompt: &str, message: &str) -> Result<String, TransportError> {
        let auth = self.auth_header()?;
        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                Message {
                    role: "system",
                    content: system_prompt,
                },
                Message {
                    role: "user",
                    content: message,
                },
            ],
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .header("Authorization", auth)
            .json(&request)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            return Err(api_error(BACKEND_NAME, response).await);
        }

        let chat: ChatResponse = response.json().await.map_err(decode_error)?;
        chat.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| TransportError::Decode {
                backend: BACKEND_NAME.into(),
                message: "response contained no message content".into(),
            })
    }

    async fn send_transcription(&self, clip: &AudioClip) -> Result<String, TransportError> {
        let auth = self.auth_header()?;
        let file = Part::bytes(clip.bytes.clone())
            .file_name(clip.file_name.clone())
            .mime_str(&clip.mime_type)
            .map_err(|e| TransportError::Decode {
                backend: BACKEND_NAME.into(),
                message: format!("invalid audio mime type {}: {e}", clip.mime_type),
            })?;
        let form = Form::new()
            .text("model", self.transcription_model.clone())
            .text("language", self.transcription_language.clone())
            .part("file", file);

        let response = self
            .client
            .post(format!("{}/audio/transcriptions", self.base_url))
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await
            .map_err(|e| self.send_error(e))?;

        if !response.status().is_success() {
            return Err(api_error(BACKEND_NAME, response).await);
        }

        let transcript: TranscriptionResponse = response.json().await.map_err(decode_error)?;
        Ok(transcript.text)
    }
}

impl AiBackend for OpenAiBackend {
    fn name(&self) -> &str {
        BACKEND_NAME
    }

    fn complete<'a>(&'a self, system_prompt: &'a str, message: &'a str) -> BackendFuture<'a> {
        Box::pin(self.send_chat(system_prompt, message))
    }

    fn transcribe<'a>(&'a self, clip: &'a AudioClip) -> BackendFuture<'a> {
        Box::pin(self.send_transcription(clip))
    }
}

/// Temperatures outside `[0, 1]` fall back to the default.
pub fn clamp_temperature(temperature: f64) -> f64 {
    if (0.0..=1.0).contains(&temperature) {
        temperature
    } else {
        DEFAULT_TEMPERATURE
    }
}

fn decode_error(error: reqwest::Error) -> TransportError {
    TransportError::Decode {
        backend: BACKEND_NAME.into(),
        message: error.to_string(),
    }
}
