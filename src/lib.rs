//! # pdftomd
//!
//! Structured PDF content extraction to Markdown and JSON using Google
//! Gemini.
//!
//! ## Why this crate?
//!
//! Traditional PDF-to-text tools (pdftotext, pdf-extract) fail on
//! complex layouts. Multi-column text, tables, figures, and formulae
//! come out garbled or out of reading order. Instead this crate hands
//! the whole PDF to a multimodal model and asks it for the document's
//! *structure*: metadata, sections, tables, figures, equations, code,
//! references, and a glossary, constrained by a JSON response schema,
//! validated locally, and rendered to deterministic Markdown.
//!
//! ## Pipeline Overview
//!
//! ```text
//! PDF
//!  │
//!  ├─ 1. Input     validate path or bytes (%PDF magic)
//!  ├─ 2. Upload    Files API for paths, inline base64 for bytes
//!  ├─ 3. Generate  one generateContent call (optionally streamed)
//!  ├─ 4. Validate  loosely-typed JSON → typed Document + warnings
//!  └─ 5. Render    deterministic Markdown, or JSON serialization
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pdftomd::{extract, ExtractionConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Credential read from GOOGLE_API_KEY (.env honoured)
//!     let config = ExtractionConfig::default();
//!     let extraction = extract("paper.pdf", &config).await?;
//!     println!("{}", extraction.to_markdown());
//!     eprintln!(
//!         "tokens: {} in / {} out, {} warnings",
//!         extraction.stats.prompt_tokens,
//!         extraction.stats.completion_tokens,
//!         extraction.warnings.len()
//!     );
//!     Ok(())
//! }
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `pdftomd` binary (clap + anyhow + indicatif + tracing-subscriber) |
//!
//! Disable `cli` when using only the library to avoid pulling in
//! CLI-only deps:
//! ```toml
//! pdftomd = { version = "0.2", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod client;
pub mod config;
pub mod document;
pub mod error;
pub mod extract;
pub mod gemini;
pub mod input;
pub mod output;
pub mod postprocess;
pub mod prompts;
pub mod render;
pub mod stream;
pub mod validate;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use client::{ChunkStream, FileHandle, GenerateRequest, ModelClient, ModelResponse, TokenUsage};
pub use config::{
    ExtractionConfig, ExtractionConfigBuilder, OutputFormat, ResponseMode, DEFAULT_MODEL,
};
pub use document::{
    CodeBlock, Document, Equation, GlossaryTerm, Image, Metadata, Reference, Section, Table,
};
pub use error::{ErrorKind, ExtractWarning, PdftomdError};
pub use extract::{
    extract, extract_sync, extract_to_file, extract_to_markdown, extract_with_streaming,
};
pub use gemini::GeminiClient;
pub use input::PdfInput;
pub use output::{Extraction, ExtractionStats};
pub use render::render;
pub use stream::{extract_stream, ExtractEvent, ExtractStream};
pub use validate::{response_schema, validate_payload, Validated};
