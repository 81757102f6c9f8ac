use crate::error::TransportError;
use std::future::Future;
use std::pin::Pin;

pub type BackendFuture<'a> =
    Pin<Box<dyn Future<Output = Result<String, TransportError>> + Send + 'a>>;

/// Recorded or uploaded audio handed to the transcription endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioClip {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl AudioClip {
    pub fn new(file_name: impl Into<String>, mime_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            file_name: file_name.into(),
            mime_type: mime_type.into(),
            bytes,
        }
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// The two opaque operations the orchestrator needs from an AI provider.
pub trait AiBackend: Send + Sync {
    /// Backend identifier used in logs and errors (e.g. "openai").
    fn name(&self) -> &str;

    /// Run one chat completion and return the raw model text unmodified.
    fn complete<'a>(&'a self, system_prompt: &'a str, message: &'a str) -> BackendFuture<'a>;

    /// Return the recognized speech in `clip` as plain text.
    fn transcribe<'a>(&'a self, clip: &'a AudioClip) -> BackendFuture<'a>;
}
