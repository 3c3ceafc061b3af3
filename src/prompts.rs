//! Extraction prompts sent to the model.
//!
//! Centralising every prompt here serves two purposes:
//!
//! 1. **Single source of truth**: changing the default behaviour (e.g.
//!    tweaking table handling) requires editing exactly one place.
//!
//! 2. **Testability**: unit tests can inspect prompts directly without
//!    spinning up a real model, making prompt regressions easy to catch.
//!
//! One prompt per [`crate::config::ResponseMode`]: the structured prompt
//! pairs with the JSON response schema, the raw prompt asks for Markdown
//! directly.

/// Prompt for structured mode. The response schema constrains the output
/// shape; this prompt explains what belongs in each field.
pub const STRUCTURED_PROMPT: &str = r#"You are an expert document analyst. Read the attached PDF completely and extract its content as structured JSON.

Follow these rules precisely:

1. METADATA
   - Extract the document title exactly as printed; use an empty string if there is none
   - Capture subtitle, authors, publication date, document type, language, and total page count when present

2. SUMMARY AND KEY POINTS
   - Write a concise summary (3-6 sentences) of the whole document
   - List the most important findings or claims as key points

3. SECTIONS
   - Reproduce the document's heading hierarchy as nested sections with levels 1-6
   - A child section's level must be greater than its parent's
   - Put each section's running text in its body, preserving reading order

4. TABLES
   - Extract every table with its headers and all data rows
   - Every row must have exactly as many cells as there are headers
   - Include the caption and nearby context when present

5. IMAGES AND FIGURES
   - Describe every figure, chart, and image; the description is required
   - Include figure numbers and captions exactly as printed

6. EQUATIONS
   - Transcribe display equations as LaTeX; the latex field is required
   - Include equation numbers and a short description when present

7. CODE
   - Extract code listings verbatim with their language when identifiable

8. REFERENCES AND GLOSSARY
   - List references in their original order without deduplication
   - Collect defined terms into the glossary; each term appears once"#;

/// Prompt for raw-text mode. The model writes the Markdown itself and
/// local cleanup normalizes the artefacts.
pub const RAW_MARKDOWN_PROMPT: &str = r#"You are an expert document converter. Read the attached PDF completely and convert it to clean, well-structured Markdown.

Follow these rules precisely:

1. TEXT PRESERVATION
   - Preserve ALL text content completely and accurately
   - Maintain the reading order as a human would read the document

2. STRUCTURE
   - Use # for the document title, ## for major sections, ### and below for subsections
   - Use - for unordered lists and 1. 2. 3. for ordered lists
   - Use **bold** and *italic* to match the visual emphasis

3. TABLES
   - Convert tables to GFM pipe format with a separator row after the header

4. CODE AND FORMULAS
   - Wrap code blocks in triple backticks with a language identifier
   - Render mathematical expressions using LaTeX: $inline$ and $$display$$

5. WHAT TO IGNORE
   - Page numbers and repeated per-page headers and footers
   - Decorative borders and lines that carry no content meaning

6. OUTPUT FORMAT
   - Output ONLY the Markdown content
   - Do NOT wrap the answer in ```markdown fences
   - Do NOT add commentary or explanations"#;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn structured_prompt_names_required_fields() {
        assert!(STRUCTURED_PROMPT.contains("description is required"));
        assert!(STRUCTURED_PROMPT.contains("latex field is required"));
        assert!(STRUCTURED_PROMPT.contains("without deduplication"));
    }

    #[test]
    fn raw_prompt_forbids_fence_wrapping() {
        assert!(RAW_MARKDOWN_PROMPT.contains("Do NOT wrap the answer in ```markdown fences"));
    }
}
