//! Configuration types for PDF extraction.
//!
//! All extraction behaviour is controlled through [`ExtractionConfig`],
//! built via its [`ExtractionConfigBuilder`]. Keeping every knob in one
//! struct makes it trivial to share configs across tasks, log them, and
//! diff two runs to understand why their outputs differ.

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::client::ModelClient;
use crate::error::PdftomdError;

/// Default Gemini model used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-3-flash-preview";

/// Environment variable consulted when no explicit API key is set.
pub const API_KEY_ENV: &str = "GOOGLE_API_KEY";

/// Shape of the final output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Rendered Markdown document.
    #[default]
    Markdown,
    /// The validated document serialized as JSON.
    Json,
}

/// How the model is asked to respond.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseMode {
    /// JSON constrained by the document response schema, then validated
    /// and rendered locally. The default.
    #[default]
    Structured,
    /// The model writes Markdown directly; output passes through the
    /// deterministic cleanup pass instead of the renderer.
    RawText,
}

/// Configuration for one or more extractions.
///
/// Built via [`ExtractionConfig::builder()`] or
/// [`ExtractionConfig::default()`].
///
/// # Example
/// ```rust
/// use pdftomd::ExtractionConfig;
///
/// let config = ExtractionConfig::builder()
///     .model("gemini-3-flash-preview")
///     .temperature(0.0)
///     .use_search(true)
///     .build();
/// ```
#[derive(Clone)]
pub struct ExtractionConfig {
    /// Gemini model identifier. Default: [`DEFAULT_MODEL`].
    pub model: String,

    /// Sampling temperature, clamped to 0.0–1.0. Default: 0.1.
    ///
    /// Extraction wants determinism, so the default sits near zero.
    pub temperature: f32,

    /// Enable Google Search grounding. Default: false.
    pub use_search: bool,

    /// Enable URL context grounding. Default: false.
    pub use_url_context: bool,

    /// Final output shape. Default: Markdown.
    pub output: OutputFormat,

    /// Structured JSON or raw Markdown from the model. Default: Structured.
    pub mode: ResponseMode,

    /// Explicit API key. When `None`, `GOOGLE_API_KEY` is consulted at
    /// extraction time (a `.env` file in the working directory is
    /// honoured).
    pub api_key: Option<String>,

    /// Timeout for the generate call, in seconds. Default: 120.
    pub api_timeout_secs: u64,

    /// Timeout for the Files API upload, in seconds. Default: 60.
    pub upload_timeout_secs: u64,

    /// Cap on generated tokens. `None` leaves the model's default.
    pub max_output_tokens: Option<u32>,

    /// Injected model client. When set it is used as-is and no
    /// credential is resolved. This is how tests drive the orchestrator
    /// without a network.
    pub client: Option<Arc<dyn ModelClient>>,
}

impl fmt::Debug for ExtractionConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // api_key and the dyn client are skipped: one is a secret, the
        // other has no useful Debug.
        f.debug_struct("ExtractionConfig")
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("use_search", &self.use_search)
            .field("use_url_context", &self.use_url_context)
            .field("output", &self.output)
            .field("mode", &self.mode)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("upload_timeout_secs", &self.upload_timeout_secs)
            .field("max_output_tokens", &self.max_output_tokens)
            .field("has_api_key", &self.api_key.is_some())
            .field("has_client", &self.client.is_some())
            .finish()
    }
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.1,
            use_search: false,
            use_url_context: false,
            output: OutputFormat::default(),
            mode: ResponseMode::default(),
            api_key: None,
            api_timeout_secs: 120,
            upload_timeout_secs: 60,
            max_output_tokens: None,
            client: None,
        }
    }
}

impl ExtractionConfig {
    pub fn builder() -> ExtractionConfigBuilder {
        ExtractionConfigBuilder::default()
    }

    /// Resolve the API key: explicit config value first, then the
    /// process environment. A `.env` file is loaded once per call site
    /// that needs it; absence of both is a fatal configuration error.
    ///
    /// Not consulted when an injected [`ModelClient`] is present.
    pub fn resolve_api_key(&self) -> Result<String, PdftomdError> {
        if let Some(key) = &self.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }
        // Best effort: a missing .env file is not an error.
        let _ = dotenvy::dotenv();
        match std::env::var(API_KEY_ENV) {
            Ok(key) if !key.is_empty() => {
                debug!("API key resolved from {API_KEY_ENV}");
                Ok(key)
            }
            _ => Err(PdftomdError::MissingApiKey),
        }
    }
}

/// Builder for [`ExtractionConfig`]. Every setter returns `self` so
/// calls chain; out-of-range values are clamped rather than rejected.
#[derive(Debug, Default)]
pub struct ExtractionConfigBuilder {
    config: ExtractionConfig,
}

impl ExtractionConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Clamped to 0.0–1.0.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature.clamp(0.0, 1.0);
        self
    }

    pub fn use_search(mut self, enabled: bool) -> Self {
        self.config.use_search = enabled;
        self
    }

    pub fn use_url_context(mut self, enabled: bool) -> Self {
        self.config.use_url_context = enabled;
        self
    }

    pub fn output(mut self, output: OutputFormat) -> Self {
        self.config.output = output;
        self
    }

    pub fn mode(mut self, mode: ResponseMode) -> Self {
        self.config.mode = mode;
        self
    }

    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.config.api_key = Some(key.into());
        self
    }

    /// Clamped to at least 1 second.
    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs.max(1);
        self
    }

    /// Clamped to at least 1 second.
    pub fn upload_timeout_secs(mut self, secs: u64) -> Self {
        self.config.upload_timeout_secs = secs.max(1);
        self
    }

    pub fn max_output_tokens(mut self, tokens: u32) -> Self {
        self.config.max_output_tokens = Some(tokens);
        self
    }

    /// Inject a model client, bypassing Gemini and credential
    /// resolution. Primarily for tests.
    pub fn client(mut self, client: Arc<dyn ModelClient>) -> Self {
        self.config.client = Some(client);
        self
    }

    pub fn build(self) -> ExtractionConfig {
        self.config
    }
}
