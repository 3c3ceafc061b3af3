//! Gemini REST implementation of [`ModelClient`].
//!
//! Three endpoints of the Generative Language API are used:
//!
//! * `upload/v1beta/files` — raw-protocol Files API upload, returning a
//!   file URI the generate call references.
//! * `v1beta/models/{model}:generateContent` — one-shot generation. In
//!   structured mode the request carries `responseMimeType:
//!   application/json` plus a `responseSchema`.
//! * `v1beta/models/{model}:streamGenerateContent?alt=sse` — the same
//!   generation delivered as server-sent events, one JSON chunk per
//!   `data:` line.
//!
//! No retries here. Rate limits and auth failures map to their own
//! error variants so callers can implement their own policy.

use futures::StreamExt;
use serde_json::{json, Value};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info, warn};

use crate::client::{ChunkStream, FileHandle, GenerateRequest, ModelClient, ModelResponse, TokenUsage};
use crate::error::PdftomdError;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";

/// HTTP client for the Gemini API.
pub struct GeminiClient {
    http: reqwest::Client,
    api_key: String,
    base_url: String,
    upload_timeout_secs: u64,
}

impl std::fmt::Debug for GeminiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // The key never appears in debug output or logs.
        f.debug_struct("GeminiClient")
            .field("base_url", &self.base_url)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .finish_non_exhaustive()
    }
}

impl GeminiClient {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            upload_timeout_secs: 60,
        }
    }

    /// Override the API origin. Intended for tests against a local stub.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_upload_timeout(mut self, secs: u64) -> Self {
        self.upload_timeout_secs = secs;
        self
    }

    fn generate_url(&self, model: &str, streaming: bool) -> String {
        let verb = if streaming {
            "streamGenerateContent"
        } else {
            "generateContent"
        };
        let alt = if streaming { "&alt=sse" } else { "" };
        format!(
            "{}/v1beta/models/{model}:{verb}?key={}{alt}",
            self.base_url, self.api_key
        )
    }

    fn build_request_body(file: &FileHandle, prompt: &str, request: &GenerateRequest) -> Value {
        let file_part = match file {
            FileHandle::Remote { uri, mime_type } => json!({
                "file_data": { "file_uri": uri, "mime_type": mime_type }
            }),
            FileHandle::Inline { data, mime_type } => json!({
                "inline_data": { "mime_type": mime_type, "data": data }
            }),
        };

        let mut generation_config = json!({ "temperature": request.temperature });
        if let Some(max) = request.max_output_tokens {
            generation_config["maxOutputTokens"] = json!(max);
        }
        if let Some(schema) = &request.response_schema {
            generation_config["responseMimeType"] = json!("application/json");
            generation_config["responseSchema"] = schema.clone();
        }

        let mut body = json!({
            "contents": [{
                "role": "user",
                "parts": [file_part, { "text": prompt }]
            }],
            "generationConfig": generation_config,
        });

        // Grounding tools pass through opaquely; the API interprets them.
        let mut tools = Vec::new();
        if request.use_search {
            tools.push(json!({ "google_search": {} }));
        }
        if request.use_url_context {
            tools.push(json!({ "url_context": {} }));
        }
        if !tools.is_empty() {
            body["tools"] = json!(tools);
        }
        body
    }

    /// Map a non-success HTTP status to the right error variant.
    async fn status_error(response: reqwest::Response) -> PdftomdError {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(reqwest::header::RETRY_AFTER)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse::<u64>().ok());
        let body = response.text().await.unwrap_or_default();
        let detail = api_error_message(&body).unwrap_or_else(|| truncate(&body, 200));

        match status.as_u16() {
            401 | 403 => PdftomdError::AuthError { detail },
            429 => PdftomdError::RateLimited {
                retry_after_secs: retry_after,
            },
            _ => PdftomdError::ApiError {
                message: format!("HTTP {status}: {detail}"),
            },
        }
    }

    fn transport_error(err: reqwest::Error, timeout_secs: u64) -> PdftomdError {
        if err.is_timeout() {
            PdftomdError::ApiTimeout { secs: timeout_secs }
        } else {
            PdftomdError::ApiError {
                message: err.to_string(),
            }
        }
    }
}

#[async_trait::async_trait]
impl ModelClient for GeminiClient {
    async fn upload(&self, bytes: &[u8], mime_type: &str) -> Result<FileHandle, PdftomdError> {
        let url = format!("{}/upload/v1beta/files?key={}", self.base_url, self.api_key);
        info!(size = bytes.len(), "uploading PDF to the Files API");

        let response = self
            .http
            .post(&url)
            .header("X-Goog-Upload-Protocol", "raw")
            .header(reqwest::header::CONTENT_TYPE, mime_type)
            .timeout(std::time::Duration::from_secs(self.upload_timeout_secs))
            .body(bytes.to_vec())
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    PdftomdError::ApiTimeout {
                        secs: self.upload_timeout_secs,
                    }
                } else {
                    PdftomdError::UploadFailed {
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            let status = response.status();
            if status.as_u16() == 401 || status.as_u16() == 403 || status.as_u16() == 429 {
                return Err(Self::status_error(response).await);
            }
            let body = response.text().await.unwrap_or_default();
            return Err(PdftomdError::UploadFailed {
                reason: format!("HTTP {status}: {}", truncate(&body, 200)),
            });
        }

        let payload: Value = response.json().await.map_err(|e| PdftomdError::UploadFailed {
            reason: format!("unreadable upload response: {e}"),
        })?;
        let uri = payload["file"]["uri"]
            .as_str()
            .ok_or_else(|| PdftomdError::UploadFailed {
                reason: "upload response carried no file.uri".to_string(),
            })?;

        debug!(uri, "upload complete");
        Ok(FileHandle::Remote {
            uri: uri.to_string(),
            mime_type: mime_type.to_string(),
        })
    }

    async fn generate(
        &self,
        file: &FileHandle,
        prompt: &str,
        request: &GenerateRequest,
    ) -> Result<ModelResponse, PdftomdError> {
        let url = self.generate_url(&request.model, false);
        let body = Self::build_request_body(file, prompt, request);
        info!(model = %request.model, "requesting generation");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(request.timeout_secs))
            .send()
            .await
            .map_err(|e| Self::transport_error(e, request.timeout_secs))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let payload: Value = response.json().await.map_err(|e| PdftomdError::ApiError {
            message: format!("unreadable generate response: {e}"),
        })?;
        parse_generate_response(&payload)
    }

    async fn generate_stream(
        &self,
        file: &FileHandle,
        prompt: &str,
        request: &GenerateRequest,
    ) -> Result<ChunkStream, PdftomdError> {
        let url = self.generate_url(&request.model, true);
        let body = Self::build_request_body(file, prompt, request);
        info!(model = %request.model, "requesting streaming generation");

        let response = self
            .http
            .post(&url)
            .json(&body)
            .timeout(std::time::Duration::from_secs(request.timeout_secs))
            .send()
            .await
            .map_err(|e| Self::transport_error(e, request.timeout_secs))?;

        if !response.status().is_success() {
            return Err(Self::status_error(response).await);
        }

        let (tx, rx) = mpsc::channel::<Result<String, PdftomdError>>(32);
        let mut bytes = response.bytes_stream();

        tokio::spawn(async move {
            let mut buffer = SseBuffer::default();
            while let Some(next) = bytes.next().await {
                match next {
                    Ok(chunk) => {
                        for event in buffer.push(&chunk) {
                            match chunk_text(&event) {
                                Ok(Some(text)) => {
                                    if tx.send(Ok(text)).await.is_err() {
                                        return; // receiver dropped, stop reading
                                    }
                                }
                                Ok(None) => {}
                                Err(e) => {
                                    let _ = tx.send(Err(e)).await;
                                    return;
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!(error = %e, "response stream failed mid-flight");
                        let _ = tx
                            .send(Err(PdftomdError::StreamInterrupted {
                                detail: e.to_string(),
                            }))
                            .await;
                        return;
                    }
                }
            }
        });

        Ok(Box::pin(ReceiverStream::new(rx)))
    }
}

// ── Response parsing ──────────────────────────────────────────────────────

/// Pull text, usage, and finish reason out of a `generateContent`
/// response body.
fn parse_generate_response(payload: &Value) -> Result<ModelResponse, PdftomdError> {
    let candidate = payload["candidates"]
        .get(0)
        .ok_or_else(|| PdftomdError::ApiError {
            message: format!(
                "response carried no candidates: {}",
                truncate(&payload.to_string(), 200)
            ),
        })?;

    let mut text = String::new();
    if let Some(parts) = candidate["content"]["parts"].as_array() {
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
        }
    }

    let usage = payload.get("usageMetadata").map(|u| TokenUsage {
        prompt_tokens: u["promptTokenCount"].as_u64().unwrap_or(0) as u32,
        completion_tokens: u["candidatesTokenCount"].as_u64().unwrap_or(0) as u32,
        total_tokens: u["totalTokenCount"].as_u64().unwrap_or(0) as u32,
    });

    Ok(ModelResponse {
        text,
        usage,
        finish_reason: candidate["finishReason"].as_str().map(str::to_string),
    })
}

/// Text carried by one SSE event, if any. Events without candidate text
/// (usage-only frames, safety frames) yield `Ok(None)`.
fn chunk_text(event: &str) -> Result<Option<String>, PdftomdError> {
    let payload: Value =
        serde_json::from_str(event).map_err(|e| PdftomdError::StreamInterrupted {
            detail: format!("malformed SSE chunk: {e}"),
        })?;
    let mut text = String::new();
    if let Some(parts) = payload["candidates"][0]["content"]["parts"].as_array() {
        for part in parts {
            if let Some(t) = part["text"].as_str() {
                text.push_str(t);
            }
        }
    }
    Ok(if text.is_empty() { None } else { Some(text) })
}

/// Incremental server-sent-events framer.
///
/// Collects `data:` payloads across arbitrarily split byte chunks and
/// yields one complete payload per blank-line-terminated event.
#[derive(Default)]
struct SseBuffer {
    pending: String,
}

impl SseBuffer {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.push_str(&String::from_utf8_lossy(chunk));
        let mut events = Vec::new();
        while let Some(pos) = self.pending.find("\n\n") {
            let frame: String = self.pending.drain(..pos + 2).collect();
            let data: Vec<&str> = frame
                .lines()
                .filter_map(|line| line.strip_prefix("data:"))
                .map(str::trim_start)
                .collect();
            if !data.is_empty() {
                events.push(data.join("\n"));
            }
        }
        events
    }
}

fn api_error_message(body: &str) -> Option<String> {
    let payload: Value = serde_json::from_str(body).ok()?;
    payload["error"]["message"].as_str().map(str::to_string)
}

fn truncate(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let cut = (0..=max).rev().find(|i| s.is_char_boundary(*i)).unwrap_or(0);
    format!("{}…", &s[..cut])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_full_generate_response() {
        let payload = json!({
            "candidates": [{
                "content": { "parts": [{ "text": "{\"a\":" }, { "text": "1}" }] },
                "finishReason": "STOP"
            }],
            "usageMetadata": {
                "promptTokenCount": 1200,
                "candidatesTokenCount": 340,
                "totalTokenCount": 1540
            }
        });
        let resp = parse_generate_response(&payload).unwrap();
        assert_eq!(resp.text, "{\"a\":1}");
        assert_eq!(resp.finish_reason.as_deref(), Some("STOP"));
        let usage = resp.usage.unwrap();
        assert_eq!(usage.prompt_tokens, 1200);
        assert_eq!(usage.total_tokens, 1540);
        assert!(!resp.was_truncated());
    }

    #[test]
    fn empty_candidates_is_an_api_error() {
        let payload = json!({ "candidates": [] });
        let err = parse_generate_response(&payload).unwrap_err();
        assert!(matches!(err, PdftomdError::ApiError { .. }));
    }

    #[test]
    fn sse_buffer_reassembles_split_events() {
        let mut buf = SseBuffer::default();
        assert!(buf.push(b"data: {\"x\"").is_empty());
        let events = buf.push(b": 1}\n\ndata: {\"y\": 2}\n\n");
        assert_eq!(events, vec!["{\"x\": 1}", "{\"y\": 2}"]);
    }

    #[test]
    fn sse_buffer_ignores_comment_and_event_lines() {
        let mut buf = SseBuffer::default();
        let events = buf.push(b": keepalive\nevent: message\ndata: {\"z\": 3}\n\n");
        assert_eq!(events, vec!["{\"z\": 3}"]);
    }

    #[test]
    fn chunk_text_concatenates_parts_and_skips_empty_frames() {
        let with_text = r#"{"candidates":[{"content":{"parts":[{"text":"hel"},{"text":"lo"}]}}]}"#;
        assert_eq!(chunk_text(with_text).unwrap().as_deref(), Some("hello"));
        let usage_only = r#"{"usageMetadata":{"totalTokenCount":10}}"#;
        assert_eq!(chunk_text(usage_only).unwrap(), None);
        assert!(chunk_text("not json").is_err());
    }

    #[test]
    fn request_body_carries_schema_and_tools() {
        let file = FileHandle::Remote {
            uri: "https://example.com/files/abc".into(),
            mime_type: "application/pdf".into(),
        };
        let request = GenerateRequest {
            model: "gemini-3-flash-preview".into(),
            temperature: 0.1,
            max_output_tokens: Some(8192),
            response_schema: Some(json!({ "type": "object" })),
            use_search: true,
            use_url_context: false,
            timeout_secs: 120,
        };
        let body = GeminiClient::build_request_body(&file, "extract", &request);
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            json!("application/json")
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], json!(8192));
        assert_eq!(body["tools"], json!([{ "google_search": {} }]));
        assert_eq!(
            body["contents"][0]["parts"][0]["file_data"]["file_uri"],
            json!("https://example.com/files/abc")
        );
    }

    #[test]
    fn inline_handles_embed_base64_data() {
        let file = FileHandle::inline(b"%PDF-1.7 x", "application/pdf");
        let request = GenerateRequest {
            model: "gemini-3-flash-preview".into(),
            temperature: 0.0,
            max_output_tokens: None,
            response_schema: None,
            use_search: false,
            use_url_context: false,
            timeout_secs: 120,
        };
        let body = GeminiClient::build_request_body(&file, "extract", &request);
        let part = &body["contents"][0]["parts"][0]["inline_data"];
        assert_eq!(part["mime_type"], json!("application/pdf"));
        assert!(part["data"].as_str().is_some());
        assert!(body.get("tools").is_none());
    }

    #[test]
    fn api_error_message_prefers_structured_detail() {
        let body = r#"{"error":{"code":400,"message":"Invalid model name"}}"#;
        assert_eq!(api_error_message(body).as_deref(), Some("Invalid model name"));
        assert_eq!(api_error_message("<html>502</html>"), None);
    }

    #[test]
    fn debug_output_never_contains_the_key() {
        let client = GeminiClient::new("secret-key-123");
        let debug = format!("{client:?}");
        assert!(!debug.contains("secret-key-123"));
    }
}
