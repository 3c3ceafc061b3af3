//! Extraction orchestration: upload, generate, validate, render.
//!
//! Every public entry point here drives the same sequence through a
//! [`ModelClient`]: validate the input locally, obtain a file handle
//! (Files API upload for paths, inline base64 for byte inputs), run one
//! generation, then validate the payload into a typed [`Document`].
//!
//! There is no retry and no caching. A failed call returns an error,
//! never a partial document; per-call state lives entirely on the stack
//! so concurrent extractions share nothing mutable. Cancellation is
//! cooperative: dropping the future between await points abandons the
//! call, and elapsed timeouts surface as transport errors from the
//! client.

use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tracing::{debug, info, warn};

use crate::client::{FileHandle, GenerateRequest, ModelClient, ModelResponse};
use crate::config::{ExtractionConfig, OutputFormat, ResponseMode};
use crate::error::PdftomdError;
use crate::gemini::GeminiClient;
use crate::input::PdfInput;
use crate::output::{Extraction, ExtractionStats};
use crate::postprocess::postprocess;
use crate::prompts::{RAW_MARKDOWN_PROMPT, STRUCTURED_PROMPT};
use crate::validate::{response_schema, validate_payload};

/// Error type callers may return from a streaming chunk callback.
pub type CallbackError = Box<dyn std::error::Error + Send + Sync>;

const PDF_MIME: &str = "application/pdf";

/// Extract a structured document from a PDF.
///
/// Always runs in structured mode regardless of
/// [`ExtractionConfig::mode`]; raw-text mode only applies to the
/// Markdown-producing entry points, since a raw response carries no
/// JSON to validate.
pub async fn extract(
    input: impl Into<PdfInput>,
    config: &ExtractionConfig,
) -> Result<Extraction, PdftomdError> {
    run_structured(&input.into(), config, None).await
}

/// Extract and return Markdown.
///
/// In structured mode this is [`extract`] followed by the renderer. In
/// raw-text mode the model writes the Markdown itself and the output is
/// the deterministic cleanup of that text.
pub async fn extract_to_markdown(
    input: impl Into<PdfInput>,
    config: &ExtractionConfig,
) -> Result<String, PdftomdError> {
    let input = input.into();
    match config.mode {
        ResponseMode::Structured => {
            let extraction = run_structured(&input, config, None).await?;
            Ok(extraction.to_markdown())
        }
        ResponseMode::RawText => {
            let response = run_raw(&input, config).await?;
            if response.was_truncated() {
                warn!("raw response was truncated at the output token cap");
            }
            Ok(postprocess(&response.text))
        }
    }
}

/// Extract with a streaming callback.
///
/// Each partial chunk is forwarded to `on_chunk` synchronously, in
/// arrival order, before the full response is assembled and validated.
/// A callback error aborts the extraction immediately and surfaces as
/// [`PdftomdError::ChunkCallback`]; it is not retried.
pub async fn extract_with_streaming(
    input: impl Into<PdfInput>,
    config: &ExtractionConfig,
    mut on_chunk: impl FnMut(&str) -> Result<(), CallbackError> + Send,
) -> Result<Extraction, PdftomdError> {
    run_structured(&input.into(), config, Some(&mut on_chunk)).await
}

/// Extract and write the output to `path` atomically.
///
/// The content is written to a sibling temp file first and renamed into
/// place, so a crash mid-write never leaves a truncated output file.
/// [`ExtractionConfig::output`] selects Markdown or JSON content.
pub async fn extract_to_file(
    input: impl Into<PdfInput>,
    path: impl AsRef<Path>,
    config: &ExtractionConfig,
) -> Result<Extraction, PdftomdError> {
    let path = path.as_ref();
    let extraction = run_structured(&input.into(), config, None).await?;

    let content = match config.output {
        OutputFormat::Markdown => extraction.to_markdown(),
        OutputFormat::Json => extraction.to_json()?,
    };

    let tmp = path.with_extension("tmp");
    let write_err = |source: std::io::Error| PdftomdError::OutputWriteFailed {
        path: path.to_path_buf(),
        source,
    };
    std::fs::write(&tmp, content).map_err(write_err)?;
    std::fs::rename(&tmp, path).map_err(write_err)?;
    info!(path = %path.display(), "output written");
    Ok(extraction)
}

/// Blocking wrapper around [`extract`] for synchronous callers.
///
/// Builds a throwaway Tokio runtime; do not call from within an async
/// context.
pub fn extract_sync(
    input: impl Into<PdfInput>,
    config: &ExtractionConfig,
) -> Result<Extraction, PdftomdError> {
    let runtime = tokio::runtime::Runtime::new()
        .map_err(|e| PdftomdError::Internal(format!("failed to build runtime: {e}")))?;
    runtime.block_on(extract(input, config))
}

// ── Shared pipeline ───────────────────────────────────────────────────────

/// Resolve the model client: an injected one wins, otherwise a Gemini
/// client is built from the resolved credential. Credential resolution
/// happens before any network call.
pub(crate) fn resolve_client(
    config: &ExtractionConfig,
) -> Result<Arc<dyn ModelClient>, PdftomdError> {
    if let Some(client) = &config.client {
        return Ok(Arc::clone(client));
    }
    let api_key = config.resolve_api_key()?;
    Ok(Arc::new(
        GeminiClient::new(api_key).with_upload_timeout(config.upload_timeout_secs),
    ))
}

fn build_request(config: &ExtractionConfig, structured: bool) -> GenerateRequest {
    GenerateRequest {
        model: config.model.clone(),
        temperature: config.temperature,
        max_output_tokens: config.max_output_tokens,
        response_schema: structured.then(response_schema),
        use_search: config.use_search,
        use_url_context: config.use_url_context,
        timeout_secs: config.api_timeout_secs,
    }
}

/// Obtain a file handle for the input: byte inputs travel inline in the
/// generate request, path inputs go through the Files API.
async fn obtain_handle(
    input: &PdfInput,
    client: &Arc<dyn ModelClient>,
) -> Result<FileHandle, PdftomdError> {
    let bytes = input.load()?;
    if input.is_inline() {
        debug!(size = bytes.len(), "embedding PDF inline");
        Ok(FileHandle::inline(&bytes, PDF_MIME))
    } else {
        client.upload(&bytes, PDF_MIME).await
    }
}

type ChunkCallback<'a> = &'a mut (dyn FnMut(&str) -> Result<(), CallbackError> + Send);

pub(crate) async fn run_structured(
    input: &PdfInput,
    config: &ExtractionConfig,
    on_chunk: Option<ChunkCallback<'_>>,
) -> Result<Extraction, PdftomdError> {
    // Step 1: resolve the client. Missing credentials fail here, before
    // any transport call is made.
    let client = resolve_client(config)?;

    // Step 2: validate input and obtain a file handle.
    let handle = obtain_handle(input, &client).await?;

    // Step 3: one generation, streamed or not.
    let request = build_request(config, true);
    let response = match on_chunk {
        Some(callback) => stream_response(&client, &handle, &request, callback).await?,
        None => client.generate(&handle, STRUCTURED_PROMPT, &request).await?,
    };

    // Step 4: parse and validate the payload.
    let stats = ExtractionStats::from_response(&response);
    let payload: serde_json::Value = serde_json::from_str(&response.text).map_err(|e| {
        let detail = if response.was_truncated() {
            format!("response is not valid JSON (output was truncated at the token cap): {e}")
        } else {
            format!("response is not valid JSON: {e}")
        };
        PdftomdError::SchemaValidation {
            path: "$".to_string(),
            detail,
            fragment: fragment_of(&response.text),
        }
    })?;
    let validated = validate_payload(&payload)?;

    if !validated.warnings.is_empty() {
        debug!(count = validated.warnings.len(), "validation applied fixups");
    }
    info!(
        total_tokens = stats.total_tokens,
        warnings = validated.warnings.len(),
        "extraction complete"
    );

    Ok(Extraction {
        document: validated.document,
        warnings: validated.warnings,
        stats,
    })
}

async fn run_raw(
    input: &PdfInput,
    config: &ExtractionConfig,
) -> Result<ModelResponse, PdftomdError> {
    let client = resolve_client(config)?;
    let handle = obtain_handle(input, &client).await?;
    let request = build_request(config, false);
    client.generate(&handle, RAW_MARKDOWN_PROMPT, &request).await
}

/// Drive the streaming endpoint, forwarding each chunk to the callback
/// and assembling the full text. Usage accounting is not reported on
/// the SSE path, so streamed extractions carry zeroed stats.
async fn stream_response(
    client: &Arc<dyn ModelClient>,
    handle: &FileHandle,
    request: &GenerateRequest,
    on_chunk: ChunkCallback<'_>,
) -> Result<ModelResponse, PdftomdError> {
    let mut stream = client
        .generate_stream(handle, STRUCTURED_PROMPT, request)
        .await?;

    let mut text = String::new();
    while let Some(next) = stream.next().await {
        let chunk = next?;
        on_chunk(&chunk).map_err(PdftomdError::ChunkCallback)?;
        text.push_str(&chunk);
    }

    Ok(ModelResponse {
        text,
        usage: None,
        finish_reason: None,
    })
}

fn fragment_of(text: &str) -> String {
    const MAX: usize = 120;
    if text.len() <= MAX {
        return text.to_string();
    }
    let cut = (0..=MAX).rev().find(|i| text.is_char_boundary(*i)).unwrap_or(0);
    format!("{}…", &text[..cut])
}
