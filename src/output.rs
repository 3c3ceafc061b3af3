//! Extraction results: the validated document plus everything worth
//! knowing about how it was produced.

use serde::{Deserialize, Serialize};

use crate::client::{ModelResponse, TokenUsage};
use crate::document::Document;
use crate::error::ExtractWarning;

/// Accounting for one extraction call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ExtractionStats {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
    /// True when the model hit its output token cap. A truncated
    /// structured response usually fails validation; a truncated raw
    /// response is silently incomplete, so callers should check this.
    pub was_truncated: bool,
}

impl ExtractionStats {
    pub(crate) fn from_response(response: &ModelResponse) -> Self {
        let usage = response.usage.unwrap_or(TokenUsage::default());
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
            was_truncated: response.was_truncated(),
        }
    }
}

/// A completed extraction: the document, the validation fixups applied
/// while building it, and the call accounting.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Extraction {
    pub document: Document,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<ExtractWarning>,
    #[serde(default)]
    pub stats: ExtractionStats,
}

impl Extraction {
    /// Render the document as Markdown.
    pub fn to_markdown(&self) -> String {
        crate::render::render(&self.document)
    }

    /// Serialize the whole result (document, warnings, stats) as JSON.
    pub fn to_json(&self) -> Result<String, crate::error::PdftomdError> {
        serde_json::to_string_pretty(self).map_err(|e| {
            crate::error::PdftomdError::Internal(format!("extraction serialization: {e}"))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    #[test]
    fn stats_derive_from_response() {
        let response = ModelResponse {
            text: String::new(),
            usage: Some(TokenUsage {
                prompt_tokens: 100,
                completion_tokens: 50,
                total_tokens: 150,
            }),
            finish_reason: Some("MAX_TOKENS".into()),
        };
        let stats = ExtractionStats::from_response(&response);
        assert_eq!(stats.total_tokens, 150);
        assert!(stats.was_truncated);
    }

    #[test]
    fn extraction_json_includes_stats() {
        let extraction = Extraction {
            document: Document {
                metadata: Metadata {
                    title: "T".into(),
                    ..Metadata::default()
                },
                ..Document::default()
            },
            warnings: vec![],
            stats: ExtractionStats::default(),
        };
        let json = extraction.to_json().unwrap();
        assert!(json.contains("\"stats\""));
        assert!(!json.contains("\"warnings\""));
    }
}
