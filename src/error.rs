//! Error types for the pdftomd library.
//!
//! Two distinct types reflect two distinct failure modes:
//!
//! * [`PdftomdError`] — **Fatal**: the extraction cannot produce a document
//!   (missing credentials, transport failure, payload that violates the
//!   schema). Returned as `Err(PdftomdError)` from the top-level `extract*`
//!   functions. A failed extraction never yields a partial document.
//!
//! * [`ExtractWarning`] — **Non-fatal**: the payload needed a fixup during
//!   validation (a padded table row, a coerced section level, a duplicate
//!   glossary term). Accumulated on [`crate::output::Extraction`] so callers
//!   can inspect what was repaired without losing the document.
//!
//! [`PdftomdError::kind`] partitions the fatal variants into coarse
//! [`ErrorKind`] categories so callers can branch on the class of failure
//! without matching every variant.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Coarse classification of a [`PdftomdError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Bad or missing configuration, caught before any network call.
    Configuration,
    /// The Gemini API or the network path to it failed.
    Transport,
    /// The model's payload did not satisfy the document schema.
    Schema,
    /// The extraction was cancelled cooperatively.
    Cancelled,
    /// A local filesystem write failed.
    Io,
    /// A bug in this library or a caller-supplied callback failure.
    Internal,
}

/// All fatal errors returned by the pdftomd library.
///
/// Validation fixups that do not abort the extraction use
/// [`ExtractWarning`] and are stored on [`crate::output::Extraction`]
/// rather than propagated here.
#[derive(Debug, Error)]
pub enum PdftomdError {
    // ── Configuration errors ──────────────────────────────────────────────
    /// No API key was supplied and `GOOGLE_API_KEY` is not set.
    #[error(
        "no API key: pass ExtractionConfig::builder().api_key(..) or set GOOGLE_API_KEY \
         (a .env file in the working directory is honoured)"
    )]
    MissingApiKey,

    /// A configuration value was rejected before any work started.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Input file was not found at the given path.
    #[error("PDF file not found: '{path}'\nCheck the path exists and is readable.")]
    FileNotFound { path: PathBuf },

    /// Input file exists but cannot be read.
    #[error("cannot read '{path}': permission denied")]
    PermissionDenied { path: PathBuf },

    /// Input file does not start with the `%PDF` magic bytes.
    #[error("'{path}' is not a PDF (file starts with {magic:02x?}, expected %PDF)")]
    NotAPdf { path: PathBuf, magic: [u8; 4] },

    // ── Transport errors ──────────────────────────────────────────────────
    /// The Files API upload did not return a usable file handle.
    #[error("PDF upload failed: {reason}")]
    UploadFailed { reason: String },

    /// The generate call failed with a non-auth, non-rate-limit status.
    #[error("Gemini API error: {message}")]
    ApiError { message: String },

    /// The API rejected the credentials (HTTP 401/403).
    #[error("authentication failed: {detail}\nCheck that GOOGLE_API_KEY is valid.")]
    AuthError { detail: String },

    /// The API throttled the request (HTTP 429).
    #[error("rate limited by the Gemini API{}", retry_after_secs.map(|s| format!(" (retry after {s}s)")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    /// The upload or generate call outlived its configured timeout.
    #[error("Gemini API call timed out after {secs}s")]
    ApiTimeout { secs: u64 },

    /// The SSE stream ended before a terminal chunk arrived.
    #[error("response stream interrupted: {detail}")]
    StreamInterrupted { detail: String },

    // ── Schema errors ─────────────────────────────────────────────────────
    /// The model's JSON payload violated the document schema.
    ///
    /// `path` names the offending field in dotted/indexed notation
    /// (`images[2].description`); `fragment` is a truncated excerpt of the
    /// payload around the violation.
    #[error("schema validation failed at '{path}': {detail} (payload: {fragment})")]
    SchemaValidation {
        path: String,
        detail: String,
        fragment: String,
    },

    // ── Caller errors ─────────────────────────────────────────────────────
    /// The caller's streaming chunk callback returned an error.
    ///
    /// The extraction is aborted immediately and is not retried.
    #[error("chunk callback failed: {0}")]
    ChunkCallback(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// The extraction was cancelled before completion.
    #[error("extraction cancelled")]
    Cancelled,

    // ── I/O errors ────────────────────────────────────────────────────────
    /// Writing the rendered output to disk failed.
    #[error("failed to write output to '{path}': {source}")]
    OutputWriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Invariant violation inside the library. Indicates a bug.
    #[error("internal error: {0}")]
    Internal(String),
}

impl PdftomdError {
    /// Coarse category of this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::MissingApiKey
            | Self::InvalidConfig(_)
            | Self::FileNotFound { .. }
            | Self::PermissionDenied { .. }
            | Self::NotAPdf { .. } => ErrorKind::Configuration,
            Self::UploadFailed { .. }
            | Self::ApiError { .. }
            | Self::AuthError { .. }
            | Self::RateLimited { .. }
            | Self::ApiTimeout { .. }
            | Self::StreamInterrupted { .. } => ErrorKind::Transport,
            Self::SchemaValidation { .. } => ErrorKind::Schema,
            Self::Cancelled => ErrorKind::Cancelled,
            Self::OutputWriteFailed { .. } => ErrorKind::Io,
            Self::ChunkCallback(_) | Self::Internal(_) => ErrorKind::Internal,
        }
    }
}

/// A non-fatal fixup applied while validating the model's payload.
///
/// Warnings never abort an extraction. They are accumulated in payload
/// order on [`crate::output::Extraction::warnings`].
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ExtractWarning {
    /// A table row had fewer cells than the header and was padded.
    #[error("table {table}: row {row} padded from {from} to {to} cells")]
    TableRowPadded {
        table: usize,
        row: usize,
        from: usize,
        to: usize,
    },

    /// A table row had more cells than the header and was truncated.
    #[error("table {table}: row {row} truncated from {from} to {to} cells")]
    TableRowTruncated {
        table: usize,
        row: usize,
        from: usize,
        to: usize,
    },

    /// A child section's level did not exceed its parent's and was coerced.
    #[error("section '{title}': level adjusted from {from} to {to}")]
    SectionLevelAdjusted { title: String, from: u8, to: u8 },

    /// A glossary term repeated an earlier one case-insensitively.
    #[error("glossary: duplicate term '{term}' dropped")]
    DuplicateGlossaryTerm { term: String },
}
