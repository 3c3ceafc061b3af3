//! Provider abstraction: the capability surface the orchestrator needs
//! from a multimodal model API.
//!
//! The vendor SDK is a black box behind [`ModelClient`]. The production
//! implementation is [`crate::gemini::GeminiClient`]; tests drive the
//! orchestrator through scripted fakes implementing the same trait.
//! Object safety matters here (the config stores `Arc<dyn ModelClient>`),
//! hence `async_trait` rather than native async-in-trait.

use std::pin::Pin;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use futures::Stream;
use serde_json::Value;

use crate::error::PdftomdError;

/// A PDF the model can read, either uploaded ahead of time or embedded
/// in the generate request itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileHandle {
    /// A Files API resource, referenced by URI in the generate request.
    Remote { uri: String, mime_type: String },
    /// Base64 payload carried inline in the generate request. Used when
    /// the caller supplies raw bytes rather than a path.
    Inline { data: String, mime_type: String },
}

impl FileHandle {
    /// Wrap raw bytes as an inline base64 payload.
    pub fn inline(bytes: &[u8], mime_type: &str) -> Self {
        Self::Inline {
            data: STANDARD.encode(bytes),
            mime_type: mime_type.to_string(),
        }
    }

    pub fn mime_type(&self) -> &str {
        match self {
            Self::Remote { mime_type, .. } | Self::Inline { mime_type, .. } => mime_type,
        }
    }
}

/// Per-call generation parameters, assembled by the orchestrator from
/// the [`crate::config::ExtractionConfig`].
#[derive(Debug, Clone)]
pub struct GenerateRequest {
    pub model: String,
    pub temperature: f32,
    pub max_output_tokens: Option<u32>,
    /// `responseSchema` for structured mode; `None` selects raw text.
    pub response_schema: Option<Value>,
    /// Grounding with Google Search, passed through opaquely.
    pub use_search: bool,
    /// URL context grounding, passed through opaquely.
    pub use_url_context: bool,
    pub timeout_secs: u64,
}

/// Token accounting reported by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// A complete (non-streaming) model response.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    /// Concatenated text of all returned parts.
    pub text: String,
    pub usage: Option<TokenUsage>,
    /// Vendor finish reason, e.g. `STOP` or `MAX_TOKENS`.
    pub finish_reason: Option<String>,
}

impl ModelResponse {
    /// True when the model stopped because it hit the output token cap.
    pub fn was_truncated(&self) -> bool {
        matches!(self.finish_reason.as_deref(), Some("MAX_TOKENS") | Some("LENGTH"))
    }
}

/// Ordered stream of partial text chunks ending when the response is
/// complete. Errors terminate the stream.
pub type ChunkStream = Pin<Box<dyn Stream<Item = Result<String, PdftomdError>> + Send>>;

/// The capability surface of a multimodal model API.
///
/// One extraction makes at most one `upload` call followed by exactly
/// one `generate` or `generate_stream` call. Implementations do not
/// retry; transient failures surface as transport errors.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Upload a document so the model can reference it by handle.
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<FileHandle, PdftomdError>;

    /// Run one generation over the uploaded document and the prompt,
    /// returning the complete response.
    async fn generate(
        &self,
        file: &FileHandle,
        prompt: &str,
        request: &GenerateRequest,
    ) -> Result<ModelResponse, PdftomdError>;

    /// Run one generation, yielding partial text chunks in arrival
    /// order. The caller assembles the full text from the chunks.
    async fn generate_stream(
        &self,
        file: &FileHandle,
        prompt: &str,
        request: &GenerateRequest,
    ) -> Result<ChunkStream, PdftomdError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inline_handle_encodes_base64() {
        let handle = FileHandle::inline(b"%PDF-1.7", "application/pdf");
        match &handle {
            FileHandle::Inline { data, mime_type } => {
                assert_eq!(mime_type, "application/pdf");
                assert_eq!(STANDARD.decode(data).unwrap(), b"%PDF-1.7");
            }
            other => panic!("unexpected handle: {other:?}"),
        }
        assert_eq!(handle.mime_type(), "application/pdf");
    }

    #[test]
    fn truncation_detected_from_finish_reason() {
        let mut resp = ModelResponse {
            text: "{}".into(),
            usage: None,
            finish_reason: Some("MAX_TOKENS".into()),
        };
        assert!(resp.was_truncated());
        resp.finish_reason = Some("STOP".into());
        assert!(!resp.was_truncated());
        resp.finish_reason = None;
        assert!(!resp.was_truncated());
    }
}
