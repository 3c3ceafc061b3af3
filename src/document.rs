//! Typed document model produced by extraction.
//!
//! [`Document`] is the root aggregate. It owns every child element by
//! value, is immutable after construction, and serializes to JSON with
//! serde. Instances are only built by [`crate::validate::validate_payload`],
//! which guarantees the invariants documented on each field; the renderer
//! can therefore stay total and never re-check them.

use serde::{Deserialize, Serialize};

/// Bibliographic metadata extracted from the document.
///
/// `title` may be empty (the source had no discernible title) but the
/// field itself is always present. Everything else is optional.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Metadata {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtitle: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_pages: Option<u32>,
}

/// A heading-delimited region of the document.
///
/// `level` is always 1–6 and a child's level always exceeds its
/// parent's; the validator coerces payloads that violate this.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    pub title: String,
    pub level: u8,
    #[serde(default)]
    pub body: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<Section>,
}

/// A tabular structure. Every row has exactly `headers.len()` cells;
/// the validator pads or truncates rows that do not.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Table {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    pub headers: Vec<String>,
    pub rows: Vec<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A figure or image, described rather than embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Image {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub figure_number: Option<String>,
    /// Always non-empty. A payload image without a description is a
    /// schema violation, not a fixup.
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub caption: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alt_text: Option<String>,
}

/// A display equation in LaTeX.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Equation {
    /// Always non-empty.
    pub latex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A code listing or algorithm.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    pub code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
}

/// A bibliographic reference, kept in source order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reference {
    pub citation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub number: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub authors: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
}

/// A glossary entry. Terms are unique case-insensitively within a
/// document; the validator drops later duplicates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GlossaryTerm {
    pub term: String,
    pub definition: String,
}

/// The structured content of one extracted PDF.
///
/// Empty collections are valid; a scanned image with no recoverable
/// structure yields a `Document` whose collections are all empty.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Document {
    pub metadata: Metadata,
    #[serde(default)]
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub key_points: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sections: Vec<Section>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tables: Vec<Table>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub images: Vec<Image>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub equations: Vec<Equation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub code_blocks: Vec<CodeBlock>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub references: Vec<Reference>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub glossary: Vec<GlossaryTerm>,
}

impl Document {
    /// Serialize to pretty-printed JSON.
    ///
    /// Infallible in practice: every field type serializes without
    /// error, so failures are mapped to `Internal`.
    pub fn to_json(&self) -> Result<String, crate::error::PdftomdError> {
        serde_json::to_string_pretty(self)
            .map_err(|e| crate::error::PdftomdError::Internal(format!("document serialization: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_document_is_empty() {
        let doc = Document::default();
        assert!(doc.metadata.title.is_empty());
        assert!(doc.sections.is_empty());
        assert!(doc.glossary.is_empty());
    }

    #[test]
    fn json_round_trip_preserves_structure() {
        let doc = Document {
            metadata: Metadata {
                title: "Attention Is All You Need".into(),
                authors: vec!["Vaswani".into()],
                total_pages: Some(15),
                ..Metadata::default()
            },
            summary: "Introduces the Transformer.".into(),
            sections: vec![Section {
                title: "Model Architecture".into(),
                level: 1,
                body: "Encoder and decoder stacks.".into(),
                children: vec![Section {
                    title: "Attention".into(),
                    level: 2,
                    body: String::new(),
                    children: vec![],
                }],
            }],
            ..Document::default()
        };
        let json = doc.to_json().unwrap();
        let back: Document = serde_json::from_str(&json).unwrap();
        assert_eq!(back, doc);
    }

    #[test]
    fn empty_collections_are_not_serialized() {
        let json = Document::default().to_json().unwrap();
        assert!(!json.contains("\"sections\""));
        assert!(!json.contains("\"references\""));
    }
}
