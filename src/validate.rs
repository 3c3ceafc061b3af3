//! Payload validation: loosely-typed model JSON → typed [`Document`].
//!
//! The model returns JSON that usually matches the response schema but is
//! allowed to wobble: figure numbers arrive as integers, table rows come
//! up short, glossary entries collapse to `"term: definition"` strings.
//! This module absorbs the benign wobble (recording an [`ExtractWarning`]
//! per fixup) and rejects real violations with a [`PdftomdError::SchemaValidation`]
//! naming the offending field in dotted/indexed notation.
//!
//! Validation is all-or-nothing: an `Err` means no `Document` was built.

use serde_json::Value;

use crate::document::{
    CodeBlock, Document, Equation, GlossaryTerm, Image, Metadata, Reference, Section, Table,
};
use crate::error::{ExtractWarning, PdftomdError};

/// Longest payload excerpt embedded in a schema error.
const FRAGMENT_MAX: usize = 120;

/// A successfully validated payload: the document plus every fixup
/// applied while building it, in payload order.
#[derive(Debug, Clone)]
pub struct Validated {
    pub document: Document,
    pub warnings: Vec<ExtractWarning>,
}

/// Validate and coerce a raw model payload into a [`Document`].
///
/// Unknown fields are ignored. Absent optional collections become empty.
/// See the module docs for the fixup/violation split.
pub fn validate_payload(payload: &Value) -> Result<Validated, PdftomdError> {
    let root = payload
        .as_object()
        .ok_or_else(|| violation("$", "payload is not a JSON object", payload))?;

    let mut warnings = Vec::new();

    let metadata = match root.get("metadata") {
        Some(m) => parse_metadata(m)?,
        None => return Err(violation("metadata", "required object is missing", payload)),
    };

    let summary = opt_string(root.get("summary")).unwrap_or_default();
    let key_points = string_array(root.get("key_points"));

    let sections = match root.get("sections").and_then(Value::as_array) {
        Some(items) => parse_sections(items, 0, "sections", &mut warnings)?,
        None => Vec::new(),
    };

    let mut tables = Vec::new();
    if let Some(items) = root.get("tables").and_then(Value::as_array) {
        for (i, item) in items.iter().enumerate() {
            tables.push(parse_table(item, i, &mut warnings)?);
        }
    }

    let mut images = Vec::new();
    if let Some(items) = root.get("images").and_then(Value::as_array) {
        for (i, item) in items.iter().enumerate() {
            images.push(parse_image(item, i)?);
        }
    }

    let mut equations = Vec::new();
    if let Some(items) = root.get("equations").and_then(Value::as_array) {
        for (i, item) in items.iter().enumerate() {
            equations.push(parse_equation(item, i)?);
        }
    }

    let mut code_blocks = Vec::new();
    if let Some(items) = root.get("code_blocks").and_then(Value::as_array) {
        for (i, item) in items.iter().enumerate() {
            code_blocks.push(parse_code_block(item, i)?);
        }
    }

    let mut references = Vec::new();
    if let Some(items) = root.get("references").and_then(Value::as_array) {
        for (i, item) in items.iter().enumerate() {
            references.push(parse_reference(item, i)?);
        }
    }

    let glossary = match root.get("glossary").and_then(Value::as_array) {
        Some(items) => parse_glossary(items, &mut warnings)?,
        None => Vec::new(),
    };

    Ok(Validated {
        document: Document {
            metadata,
            summary,
            key_points,
            sections,
            tables,
            images,
            equations,
            code_blocks,
            references,
            glossary,
        },
        warnings,
    })
}

// ── Per-element parsers ───────────────────────────────────────────────────

fn parse_metadata(value: &Value) -> Result<Metadata, PdftomdError> {
    let obj = value
        .as_object()
        .ok_or_else(|| violation("metadata", "expected an object", value))?;

    // The key itself is required; an empty title is a valid document
    // with its heading omitted at render time.
    let title = match obj.get("title") {
        Some(t) => t
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| violation("metadata.title", "expected a string", value))?,
        None => return Err(violation("metadata.title", "required field is missing", value)),
    };

    Ok(Metadata {
        title,
        subtitle: opt_string(obj.get("subtitle")),
        authors: string_array(obj.get("authors")),
        date: opt_string(obj.get("date")),
        document_type: opt_string(obj.get("document_type")),
        language: opt_string(obj.get("language")),
        total_pages: obj.get("total_pages").and_then(Value::as_u64).map(|n| n as u32),
    })
}

/// Recursive section parser.
///
/// `parent_level` is 0 at the top (any level 1–6 is accepted there);
/// below that a child's level must exceed its parent's or it is coerced
/// to `parent + 1`, capped at 6.
fn parse_sections(
    items: &[Value],
    parent_level: u8,
    path: &str,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<Section>, PdftomdError> {
    let mut sections = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        let here = format!("{path}[{i}]");
        let obj = item
            .as_object()
            .ok_or_else(|| violation(&here, "expected an object", item))?;

        let title = opt_string(obj.get("title")).unwrap_or_default();
        let raw_level = obj
            .get("level")
            .and_then(Value::as_u64)
            .map(|n| n.min(u8::MAX as u64) as u8)
            .unwrap_or(parent_level + 1);

        let level = if raw_level > parent_level && (1..=6).contains(&raw_level) {
            raw_level
        } else {
            let coerced = (parent_level + 1).min(6);
            if raw_level != coerced {
                warnings.push(ExtractWarning::SectionLevelAdjusted {
                    title: title.clone(),
                    from: raw_level,
                    to: coerced,
                });
            }
            coerced
        };

        let children = match obj.get("children").and_then(Value::as_array) {
            Some(kids) => parse_sections(kids, level, &format!("{here}.children"), warnings)?,
            None => Vec::new(),
        };

        sections.push(Section {
            title,
            level,
            body: opt_string(obj.get("body")).unwrap_or_default(),
            children,
        });
    }
    Ok(sections)
}

fn parse_table(
    value: &Value,
    index: usize,
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Table, PdftomdError> {
    let path = format!("tables[{index}]");
    let obj = value
        .as_object()
        .ok_or_else(|| violation(&path, "expected an object", value))?;

    let headers = string_array(obj.get("headers"));
    let width = headers.len();

    let mut rows = Vec::new();
    if let Some(raw_rows) = obj.get("rows").and_then(Value::as_array) {
        for (r, raw_row) in raw_rows.iter().enumerate() {
            let cells_raw = raw_row
                .as_array()
                .ok_or_else(|| violation(&format!("{path}.rows[{r}]"), "expected an array", raw_row))?;
            let mut cells: Vec<String> = cells_raw
                .iter()
                .map(|c| coerce_string(c).unwrap_or_default())
                .collect();

            if cells.len() < width {
                warnings.push(ExtractWarning::TableRowPadded {
                    table: index,
                    row: r,
                    from: cells.len(),
                    to: width,
                });
                cells.resize(width, String::new());
            } else if cells.len() > width {
                warnings.push(ExtractWarning::TableRowTruncated {
                    table: index,
                    row: r,
                    from: cells.len(),
                    to: width,
                });
                cells.truncate(width);
            }
            rows.push(cells);
        }
    }

    Ok(Table {
        caption: opt_string(obj.get("caption")),
        headers,
        rows,
        context: opt_string(obj.get("context")),
    })
}

fn parse_image(value: &Value, index: usize) -> Result<Image, PdftomdError> {
    let path = format!("images[{index}]");
    let obj = value
        .as_object()
        .ok_or_else(|| violation(&path, "expected an object", value))?;

    let description = opt_string(obj.get("description"))
        .filter(|d| !d.trim().is_empty())
        .ok_or_else(|| {
            violation(
                &format!("{path}.description"),
                "required field is missing or empty",
                value,
            )
        })?;

    Ok(Image {
        // Models emit figure numbers as both strings and bare integers.
        figure_number: obj.get("figure_number").and_then(coerce_string_ref),
        description,
        caption: opt_string(obj.get("caption")),
        context: opt_string(obj.get("context")),
        alt_text: opt_string(obj.get("alt_text")),
    })
}

fn parse_equation(value: &Value, index: usize) -> Result<Equation, PdftomdError> {
    let path = format!("equations[{index}]");
    let obj = value
        .as_object()
        .ok_or_else(|| violation(&path, "expected an object", value))?;

    let latex = opt_string(obj.get("latex"))
        .filter(|l| !l.trim().is_empty())
        .ok_or_else(|| {
            violation(
                &format!("{path}.latex"),
                "required field is missing or empty",
                value,
            )
        })?;

    Ok(Equation {
        latex,
        number: obj
            .get("number")
            .or_else(|| obj.get("equation_number"))
            .and_then(coerce_string_ref),
        description: opt_string(obj.get("description")),
    })
}

fn parse_code_block(value: &Value, index: usize) -> Result<CodeBlock, PdftomdError> {
    let path = format!("code_blocks[{index}]");
    let obj = value
        .as_object()
        .ok_or_else(|| violation(&path, "expected an object", value))?;

    Ok(CodeBlock {
        language: opt_string(obj.get("language")).filter(|l| !l.is_empty()),
        code: opt_string(obj.get("code")).unwrap_or_default(),
        context: opt_string(obj.get("context")),
    })
}

fn parse_reference(value: &Value, index: usize) -> Result<Reference, PdftomdError> {
    let path = format!("references[{index}]");

    // References sometimes arrive as bare citation strings.
    if let Some(citation) = value.as_str() {
        return Ok(Reference {
            citation: citation.to_string(),
            number: None,
            authors: Vec::new(),
            year: None,
            title: None,
        });
    }

    let obj = value
        .as_object()
        .ok_or_else(|| violation(&path, "expected an object or string", value))?;

    Ok(Reference {
        citation: opt_string(obj.get("citation")).unwrap_or_default(),
        number: obj.get("number").and_then(coerce_string_ref),
        authors: string_array(obj.get("authors")),
        year: obj.get("year").and_then(coerce_string_ref),
        title: opt_string(obj.get("title")),
    })
}

fn parse_glossary(
    items: &[Value],
    warnings: &mut Vec<ExtractWarning>,
) -> Result<Vec<GlossaryTerm>, PdftomdError> {
    let mut seen: Vec<String> = Vec::new();
    let mut glossary = Vec::new();

    for (i, item) in items.iter().enumerate() {
        let path = format!("glossary[{i}]");
        let entry = if let Some(s) = item.as_str() {
            // Coerce "term: definition" strings.
            match s.split_once(':') {
                Some((term, definition)) => GlossaryTerm {
                    term: term.trim().to_string(),
                    definition: definition.trim().to_string(),
                },
                None => GlossaryTerm {
                    term: s.trim().to_string(),
                    definition: String::new(),
                },
            }
        } else if let Some(obj) = item.as_object() {
            GlossaryTerm {
                term: opt_string(obj.get("term")).unwrap_or_default(),
                definition: opt_string(obj.get("definition")).unwrap_or_default(),
            }
        } else {
            return Err(violation(&path, "expected an object or string", item));
        };

        let folded = entry.term.to_lowercase();
        if seen.contains(&folded) {
            warnings.push(ExtractWarning::DuplicateGlossaryTerm {
                term: entry.term.clone(),
            });
            continue;
        }
        seen.push(folded);
        glossary.push(entry);
    }
    Ok(glossary)
}

// ── Coercion helpers ──────────────────────────────────────────────────────

fn coerce_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn coerce_string_ref(value: &Value) -> Option<String> {
    coerce_string(value)
}

fn opt_string(value: Option<&Value>) -> Option<String> {
    value.and_then(|v| v.as_str().map(str::to_string))
}

fn string_array(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| items.iter().filter_map(coerce_string_ref).collect())
        .unwrap_or_default()
}

fn violation(path: &str, detail: &str, payload: &Value) -> PdftomdError {
    let mut fragment = payload.to_string();
    if fragment.len() > FRAGMENT_MAX {
        let cut = (0..=FRAGMENT_MAX).rev().find(|i| fragment.is_char_boundary(*i));
        fragment.truncate(cut.unwrap_or(0));
        fragment.push('…');
    }
    PdftomdError::SchemaValidation {
        path: path.to_string(),
        detail: detail.to_string(),
        fragment,
    }
}

// ── Response schema for structured mode ───────────────────────────────────

/// JSON response schema sent to the model in structured mode.
///
/// This is the OpenAPI-flavoured subset Gemini's `responseSchema`
/// accepts, not a full JSON Schema document.
pub fn response_schema() -> Value {
    serde_json::json!({
        "type": "object",
        "properties": {
            "metadata": {
                "type": "object",
                "properties": {
                    "title": { "type": "string" },
                    "subtitle": { "type": "string" },
                    "authors": { "type": "array", "items": { "type": "string" } },
                    "date": { "type": "string" },
                    "document_type": { "type": "string" },
                    "language": { "type": "string" },
                    "total_pages": { "type": "integer" }
                },
                "required": ["title"]
            },
            "summary": { "type": "string" },
            "key_points": { "type": "array", "items": { "type": "string" } },
            "sections": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "title": { "type": "string" },
                        "level": { "type": "integer" },
                        "body": { "type": "string" },
                        "children": { "type": "array", "items": { "type": "object" } }
                    },
                    "required": ["title", "level"]
                }
            },
            "tables": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "caption": { "type": "string" },
                        "headers": { "type": "array", "items": { "type": "string" } },
                        "rows": {
                            "type": "array",
                            "items": { "type": "array", "items": { "type": "string" } }
                        },
                        "context": { "type": "string" }
                    },
                    "required": ["headers", "rows"]
                }
            },
            "images": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "figure_number": { "type": "string" },
                        "description": { "type": "string" },
                        "caption": { "type": "string" },
                        "context": { "type": "string" },
                        "alt_text": { "type": "string" }
                    },
                    "required": ["description"]
                }
            },
            "equations": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "latex": { "type": "string" },
                        "number": { "type": "string" },
                        "description": { "type": "string" }
                    },
                    "required": ["latex"]
                }
            },
            "code_blocks": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "language": { "type": "string" },
                        "code": { "type": "string" },
                        "context": { "type": "string" }
                    },
                    "required": ["code"]
                }
            },
            "references": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "citation": { "type": "string" },
                        "number": { "type": "string" },
                        "authors": { "type": "array", "items": { "type": "string" } },
                        "year": { "type": "string" },
                        "title": { "type": "string" }
                    },
                    "required": ["citation"]
                }
            },
            "glossary": {
                "type": "array",
                "items": {
                    "type": "object",
                    "properties": {
                        "term": { "type": "string" },
                        "definition": { "type": "string" }
                    },
                    "required": ["term", "definition"]
                }
            }
        },
        "required": ["metadata", "summary"]
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn minimal_payload_validates() {
        let payload = json!({ "metadata": { "title": "Q3 Report" } });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.metadata.title, "Q3 Report");
        assert!(v.warnings.is_empty());
        assert!(v.document.sections.is_empty());
    }

    #[test]
    fn missing_title_key_is_a_violation() {
        let payload = json!({ "metadata": {} });
        let err = validate_payload(&payload).unwrap_err();
        match err {
            PdftomdError::SchemaValidation { path, .. } => {
                assert_eq!(path, "metadata.title");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn empty_title_is_allowed() {
        let payload = json!({ "metadata": { "title": "" } });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.metadata.title, "");
    }

    #[test]
    fn empty_image_description_is_a_violation_with_indexed_path() {
        let payload = json!({
            "metadata": { "title": "T" },
            "images": [
                { "description": "a chart" },
                { "description": "  " }
            ]
        });
        let err = validate_payload(&payload).unwrap_err();
        match err {
            PdftomdError::SchemaValidation { path, .. } => {
                assert_eq!(path, "images[1].description");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn numeric_figure_number_is_coerced_to_string() {
        let payload = json!({
            "metadata": { "title": "T" },
            "images": [{ "figure_number": 3, "description": "a chart" }]
        });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.images[0].figure_number.as_deref(), Some("3"));
    }

    #[test]
    fn short_table_rows_are_padded_with_warning() {
        let payload = json!({
            "metadata": { "title": "T" },
            "tables": [{
                "headers": ["a", "b", "c"],
                "rows": [["1"], ["1", "2", "3", "4"]]
            }]
        });
        let v = validate_payload(&payload).unwrap();
        let table = &v.document.tables[0];
        assert_eq!(table.rows[0], vec!["1", "", ""]);
        assert_eq!(table.rows[1], vec!["1", "2", "3"]);
        assert_eq!(v.warnings.len(), 2);
        assert!(matches!(
            v.warnings[0],
            ExtractWarning::TableRowPadded { table: 0, row: 0, from: 1, to: 3 }
        ));
        assert!(matches!(
            v.warnings[1],
            ExtractWarning::TableRowTruncated { table: 0, row: 1, from: 4, to: 3 }
        ));
    }

    #[test]
    fn child_level_not_exceeding_parent_is_coerced() {
        let payload = json!({
            "metadata": { "title": "T" },
            "sections": [{
                "title": "Top",
                "level": 2,
                "children": [{ "title": "Child", "level": 2 }]
            }]
        });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.sections[0].children[0].level, 3);
        assert!(matches!(
            v.warnings[0],
            ExtractWarning::SectionLevelAdjusted { from: 2, to: 3, .. }
        ));
    }

    #[test]
    fn deep_nesting_caps_levels_at_six() {
        let payload = json!({
            "metadata": { "title": "T" },
            "sections": [{
                "title": "L6",
                "level": 6,
                "children": [{ "title": "L7?", "level": 9 }]
            }]
        });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.sections[0].children[0].level, 6);
    }

    #[test]
    fn duplicate_glossary_terms_drop_later_occurrences() {
        let payload = json!({
            "metadata": { "title": "T" },
            "glossary": [
                { "term": "API", "definition": "first" },
                { "term": "api", "definition": "second" },
                { "term": "SDK", "definition": "kit" }
            ]
        });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.glossary.len(), 2);
        assert_eq!(v.document.glossary[0].definition, "first");
        assert!(matches!(
            &v.warnings[0],
            ExtractWarning::DuplicateGlossaryTerm { term } if term == "api"
        ));
    }

    #[test]
    fn string_glossary_entries_are_coerced() {
        let payload = json!({
            "metadata": { "title": "T" },
            "glossary": ["VLM: vision language model"]
        });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.glossary[0].term, "VLM");
        assert_eq!(v.document.glossary[0].definition, "vision language model");
    }

    #[test]
    fn unknown_fields_are_ignored() {
        let payload = json!({
            "metadata": { "title": "T", "publisher": "ignored" },
            "confidence": 0.93
        });
        assert!(validate_payload(&payload).is_ok());
    }

    #[test]
    fn string_references_are_accepted() {
        let payload = json!({
            "metadata": { "title": "T" },
            "references": ["Smith 2021", { "citation": "Doe 2020", "year": 2020 }]
        });
        let v = validate_payload(&payload).unwrap();
        assert_eq!(v.document.references[0].citation, "Smith 2021");
        assert_eq!(v.document.references[1].year.as_deref(), Some("2020"));
    }

    #[test]
    fn error_fragment_is_truncated() {
        let long = "x".repeat(500);
        let payload = json!({ "metadata": { "title": 42, "pad": long } });
        let err = validate_payload(&payload).unwrap_err();
        match err {
            PdftomdError::SchemaValidation { fragment, .. } => {
                assert!(fragment.chars().count() <= FRAGMENT_MAX + 1);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn response_schema_requires_title_and_description() {
        let schema = response_schema();
        assert_eq!(
            schema["properties"]["metadata"]["required"][0],
            serde_json::json!("title")
        );
        assert_eq!(
            schema["properties"]["images"]["items"]["required"][0],
            serde_json::json!("description")
        );
    }
}
