//! Markdown rendering: typed [`Document`] → Markdown string.
//!
//! Pure assembly, no I/O, no network. The same `Document` always renders
//! to the same bytes, so goldens in tests stay stable. Block order is
//! fixed (title, metadata, summary, key points, contents, sections,
//! tables, figures, equations, code, references, glossary); blocks are
//! joined with a blank line and the output ends in exactly one newline.
//!
//! The renderer is total: every `Document` the validator can produce
//! renders without error, which is why this module returns `String`
//! rather than `Result`.

use crate::document::{Document, Section};

/// Render a document as Markdown.
pub fn render(doc: &Document) -> String {
    let mut blocks: Vec<String> = Vec::new();

    // 1. Title heading, omitted entirely when the title is empty.
    if !doc.metadata.title.is_empty() {
        blocks.push(format!("# {}", doc.metadata.title));
    }
    if let Some(subtitle) = &doc.metadata.subtitle {
        if !subtitle.is_empty() {
            blocks.push(format!("*{subtitle}*"));
        }
    }

    // 2. Metadata bullets, only for fields with something to show.
    if let Some(meta) = metadata_block(doc) {
        blocks.push(meta);
    }

    // 3. Summary and key points.
    if !doc.summary.is_empty() {
        blocks.push("## Summary".to_string());
        blocks.push(doc.summary.clone());
    }
    if !doc.key_points.is_empty() {
        blocks.push("## Key Points".to_string());
        blocks.push(bullet_list(&doc.key_points));
    }

    // 4. Table of contents for documents with many top-level sections.
    if doc.sections.len() > 5 {
        blocks.push("## Table of Contents".to_string());
        let toc: Vec<String> = doc
            .sections
            .iter()
            .map(|s| format!("- [{}](#{})", s.title, anchor(&s.title)))
            .collect();
        blocks.push(toc.join("\n"));
    }

    // 5. Sections, recursively, in payload order.
    for section in &doc.sections {
        push_section(section, &mut blocks);
    }

    // 6. Tables.
    if !doc.tables.is_empty() {
        blocks.push("## Tables".to_string());
        for table in &doc.tables {
            if let Some(caption) = &table.caption {
                if !caption.is_empty() {
                    blocks.push(format!("*{caption}*"));
                }
            }
            blocks.push(pipe_table(&table.headers, &table.rows));
            if let Some(context) = &table.context {
                if !context.is_empty() {
                    blocks.push(context.clone());
                }
            }
        }
    }

    // 7. Figures and images.
    if !doc.images.is_empty() {
        blocks.push("## Figures and Images".to_string());
        for image in &doc.images {
            let mut lines = Vec::new();
            match (&image.figure_number, &image.caption) {
                (Some(num), Some(caption)) => lines.push(format!("**Figure {num}**: {caption}")),
                (Some(num), None) => lines.push(format!("**Figure {num}**")),
                (None, Some(caption)) => lines.push(format!("**{caption}**")),
                (None, None) => {}
            }
            lines.push(image.description.clone());
            if let Some(context) = &image.context {
                if !context.is_empty() {
                    lines.push(format!("*{context}*"));
                }
            }
            blocks.push(lines.join("\n\n"));
        }
    }

    // 8. Equations as display math.
    if !doc.equations.is_empty() {
        blocks.push("## Equations".to_string());
        for eq in &doc.equations {
            if let Some(number) = &eq.number {
                blocks.push(format!("**Equation ({number})**"));
            }
            blocks.push(format!("$$\n{}\n$$", eq.latex));
            if let Some(description) = &eq.description {
                if !description.is_empty() {
                    blocks.push(format!("*{description}*"));
                }
            }
        }
    }

    // 9. Code listings as fenced blocks.
    if !doc.code_blocks.is_empty() {
        blocks.push("## Code and Algorithms".to_string());
        for cb in &doc.code_blocks {
            if let Some(context) = &cb.context {
                if !context.is_empty() {
                    blocks.push(format!("*{context}*"));
                }
            }
            let lang = cb.language.as_deref().unwrap_or("");
            blocks.push(format!("```{lang}\n{}\n```", cb.code));
        }
    }

    // 10. References, numbered in source order. No dedup, no sorting.
    if !doc.references.is_empty() {
        blocks.push("## References".to_string());
        let items: Vec<String> = doc
            .references
            .iter()
            .enumerate()
            .map(|(i, r)| format!("{}. {}", i + 1, r.citation))
            .collect();
        blocks.push(items.join("\n"));
    }

    // 11. Glossary bullets in extraction order.
    if !doc.glossary.is_empty() {
        blocks.push("## Glossary".to_string());
        let items: Vec<String> = doc
            .glossary
            .iter()
            .map(|g| format!("- **{}**: {}", g.term, g.definition))
            .collect();
        blocks.push(items.join("\n"));
    }

    let mut out = blocks.join("\n\n");
    out.push('\n');
    out
}

fn metadata_block(doc: &Document) -> Option<String> {
    let meta = &doc.metadata;
    let mut lines = Vec::new();
    if !meta.authors.is_empty() {
        lines.push(format!("- **Authors**: {}", meta.authors.join(", ")));
    }
    if let Some(date) = meta.date.as_deref().filter(|d| !d.is_empty()) {
        lines.push(format!("- **Date**: {date}"));
    }
    if let Some(kind) = meta.document_type.as_deref().filter(|t| !t.is_empty()) {
        lines.push(format!("- **Type**: {kind}"));
    }
    if let Some(lang) = meta.language.as_deref().filter(|l| !l.is_empty()) {
        lines.push(format!("- **Language**: {lang}"));
    }
    if let Some(pages) = meta.total_pages {
        lines.push(format!("- **Pages**: {pages}"));
    }
    if lines.is_empty() {
        None
    } else {
        Some(lines.join("\n"))
    }
}

/// Emit a section heading, its body, then its children, depth-first.
/// Levels were fixed during validation so no renumbering happens here.
fn push_section(section: &Section, blocks: &mut Vec<String>) {
    blocks.push(format!(
        "{} {}",
        "#".repeat(section.level as usize),
        section.title
    ));
    if !section.body.is_empty() {
        blocks.push(section.body.clone());
    }
    for child in &section.children {
        push_section(child, blocks);
    }
}

fn bullet_list(items: &[String]) -> String {
    items
        .iter()
        .map(|p| format!("- {p}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// GFM pipe table. Cell content containing `|` is escaped so the table
/// structure survives.
fn pipe_table(headers: &[String], rows: &[Vec<String>]) -> String {
    let esc = |cell: &str| cell.replace('|', "\\|");
    let mut lines = Vec::with_capacity(rows.len() + 2);
    lines.push(format!(
        "| {} |",
        headers.iter().map(|h| esc(h)).collect::<Vec<_>>().join(" | ")
    ));
    lines.push(format!(
        "|{}|",
        headers.iter().map(|_| " --- ").collect::<Vec<_>>().join("|")
    ));
    for row in rows {
        lines.push(format!(
            "| {} |",
            row.iter().map(|c| esc(c)).collect::<Vec<_>>().join(" | ")
        ));
    }
    lines.join("\n")
}

/// GitHub-style heading anchor: lowercase, spaces to hyphens,
/// punctuation dropped.
fn anchor(title: &str) -> String {
    title
        .to_lowercase()
        .chars()
        .filter_map(|c| {
            if c.is_alphanumeric() {
                Some(c)
            } else if c == ' ' || c == '-' {
                Some('-')
            } else {
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::{
        CodeBlock, Equation, GlossaryTerm, Image, Metadata, Reference, Table,
    };

    fn doc_with_title(title: &str) -> Document {
        Document {
            metadata: Metadata {
                title: title.to_string(),
                ..Metadata::default()
            },
            ..Document::default()
        }
    }

    #[test]
    fn title_section_body_golden() {
        let mut doc = doc_with_title("Q3 Report");
        doc.sections.push(Section {
            title: "Overview".into(),
            level: 1,
            body: "Revenue grew.".into(),
            children: vec![],
        });
        assert_eq!(render(&doc), "# Q3 Report\n\n# Overview\n\nRevenue grew.\n");
    }

    #[test]
    fn empty_title_omits_heading_entirely() {
        let mut doc = doc_with_title("");
        doc.summary = "A summary.".into();
        let out = render(&doc);
        assert!(!out.starts_with("# "));
        assert_eq!(out, "## Summary\n\nA summary.\n");
    }

    #[test]
    fn rendering_is_deterministic() {
        let mut doc = doc_with_title("Stable");
        doc.key_points = vec!["one".into(), "two".into()];
        assert_eq!(render(&doc), render(&doc));
    }

    #[test]
    fn output_ends_with_single_newline() {
        let out = render(&doc_with_title("T"));
        assert!(out.ends_with('\n'));
        assert!(!out.ends_with("\n\n"));
    }

    #[test]
    fn tables_render_as_gfm_with_italic_caption() {
        let mut doc = doc_with_title("T");
        doc.tables.push(Table {
            caption: Some("Quarterly revenue".into()),
            headers: vec!["Quarter".into(), "Revenue".into()],
            rows: vec![vec!["Q1".into(), "10".into()], vec!["Q2".into(), "12".into()]],
            context: None,
        });
        let out = render(&doc);
        assert!(out.contains("## Tables"));
        assert!(out.contains("*Quarterly revenue*"));
        assert!(out.contains("| Quarter | Revenue |\n| --- | --- |\n| Q1 | 10 |\n| Q2 | 12 |"));
    }

    #[test]
    fn pipe_characters_in_cells_are_escaped() {
        let mut doc = doc_with_title("T");
        doc.tables.push(Table {
            caption: None,
            headers: vec!["expr".into()],
            rows: vec![vec!["a | b".into()]],
            context: None,
        });
        assert!(render(&doc).contains("| a \\| b |"));
    }

    #[test]
    fn toc_appears_only_above_five_top_level_sections() {
        let mut doc = doc_with_title("T");
        for i in 0..5 {
            doc.sections.push(Section {
                title: format!("S{i}"),
                level: 1,
                body: String::new(),
                children: vec![],
            });
        }
        assert!(!render(&doc).contains("## Table of Contents"));
        doc.sections.push(Section {
            title: "Final Thoughts".into(),
            level: 1,
            body: String::new(),
            children: vec![],
        });
        let out = render(&doc);
        assert!(out.contains("## Table of Contents"));
        assert!(out.contains("- [Final Thoughts](#final-thoughts)"));
    }

    #[test]
    fn references_keep_source_order_without_dedup() {
        let mut doc = doc_with_title("T");
        for citation in ["Zhu 2020", "Adams 2019", "Zhu 2020"] {
            doc.references.push(Reference {
                citation: citation.into(),
                number: None,
                authors: vec![],
                year: None,
                title: None,
            });
        }
        let out = render(&doc);
        let refs = out.split("## References").nth(1).unwrap();
        assert!(refs.contains("1. Zhu 2020\n2. Adams 2019\n3. Zhu 2020"));
    }

    #[test]
    fn equations_render_as_display_math() {
        let mut doc = doc_with_title("T");
        doc.equations.push(Equation {
            latex: "E = mc^2".into(),
            number: Some("1".into()),
            description: Some("Mass-energy equivalence".into()),
        });
        let out = render(&doc);
        assert!(out.contains("**Equation (1)**"));
        assert!(out.contains("$$\nE = mc^2\n$$"));
        assert!(out.contains("*Mass-energy equivalence*"));
    }

    #[test]
    fn code_blocks_are_fenced_with_language() {
        let mut doc = doc_with_title("T");
        doc.code_blocks.push(CodeBlock {
            language: Some("python".into()),
            code: "print(1)".into(),
            context: None,
        });
        doc.code_blocks.push(CodeBlock {
            language: None,
            code: "x = 1".into(),
            context: None,
        });
        let out = render(&doc);
        assert!(out.contains("```python\nprint(1)\n```"));
        assert!(out.contains("```\nx = 1\n```"));
    }

    #[test]
    fn figures_show_number_and_caption() {
        let mut doc = doc_with_title("T");
        doc.images.push(Image {
            figure_number: Some("2".into()),
            description: "Training curve over epochs.".into(),
            caption: Some("Loss".into()),
            context: None,
            alt_text: None,
        });
        let out = render(&doc);
        assert!(out.contains("**Figure 2**: Loss"));
        assert!(out.contains("Training curve over epochs."));
    }

    #[test]
    fn glossary_bullets_in_order() {
        let mut doc = doc_with_title("T");
        doc.glossary.push(GlossaryTerm {
            term: "VLM".into(),
            definition: "vision language model".into(),
        });
        assert!(render(&doc).contains("## Glossary\n\n- **VLM**: vision language model\n"));
    }

    #[test]
    fn nested_sections_render_depth_first() {
        let mut doc = doc_with_title("T");
        doc.sections.push(Section {
            title: "Parent".into(),
            level: 2,
            body: "p".into(),
            children: vec![Section {
                title: "Child".into(),
                level: 3,
                body: "c".into(),
                children: vec![],
            }],
        });
        doc.sections.push(Section {
            title: "Next".into(),
            level: 2,
            body: String::new(),
            children: vec![],
        });
        let out = render(&doc);
        let parent = out.find("## Parent").unwrap();
        let child = out.find("### Child").unwrap();
        let next = out.find("## Next").unwrap();
        assert!(parent < child && child < next);
    }
}
