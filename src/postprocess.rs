//! Raw-mode cleanup: deterministic normalization of model-written
//! Markdown.
//!
//! In raw-text mode the model writes the Markdown itself, and even
//! well-prompted models add artefacts: the whole answer wrapped in a
//! ` ```markdown ` fence despite instructions, Windows line endings,
//! stray trailing spaces, zero-width characters from the source PDF.
//! This pass applies six cheap string/regex rules that fix those
//! quirks without touching content.
//!
//! It applies only to raw-mode output. Structured-mode output comes
//! from [`crate::render::render`], which already emits clean Markdown.

use once_cell::sync::Lazy;
use regex::Regex;

/// Normalize raw model Markdown.
///
/// Rules, in order:
/// 1. Strip an outer ` ``` `/` ```markdown ` fence wrapping the answer.
/// 2. Normalize line endings (CRLF and bare CR to LF).
/// 3. Trim trailing whitespace per line.
/// 4. Collapse runs of blank lines down to one.
/// 5. Strip invisible Unicode (zero-width spaces, BOM, soft hyphens).
/// 6. End with exactly one newline.
///
/// Fences must be stripped before line-based passes so rule 3 sees the
/// real first and last lines; the final-newline pass runs last.
pub fn postprocess(input: &str) -> String {
    let s = strip_outer_fence(input);
    let s = normalize_line_endings(&s);
    let s = trim_line_ends(&s);
    let s = collapse_blank_runs(&s);
    let s = strip_invisible(&s);
    finalize_newline(&s)
}

// ── Rule 1: outer fence ───────────────────────────────────────────────────

static OUTER_FENCE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)^```(?:markdown|md)?\n(.*)\n```\s*$").unwrap());

fn strip_outer_fence(input: &str) -> String {
    match OUTER_FENCE.captures(input.trim()) {
        Some(caps) => caps[1].to_string(),
        None => input.to_string(),
    }
}

// ── Rule 2: line endings ──────────────────────────────────────────────────

fn normalize_line_endings(input: &str) -> String {
    input.replace("\r\n", "\n").replace('\r', "\n")
}

// ── Rule 3: trailing whitespace ───────────────────────────────────────────

fn trim_line_ends(input: &str) -> String {
    input
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

// ── Rule 4: blank runs ────────────────────────────────────────────────────

static BLANK_RUN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

fn collapse_blank_runs(input: &str) -> String {
    BLANK_RUN.replace_all(input, "\n\n").to_string()
}

// ── Rule 5: invisible characters ──────────────────────────────────────────

fn strip_invisible(input: &str) -> String {
    input.replace(
        [
            '\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}', '\u{00AD}',
        ],
        "",
    )
}

// ── Rule 6: final newline ─────────────────────────────────────────────────

fn finalize_newline(input: &str) -> String {
    let trimmed = input.trim_end();
    if trimmed.is_empty() {
        String::from("\n")
    } else {
        format!("{trimmed}\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_markdown_fence_wrapper() {
        assert_eq!(
            strip_outer_fence("```markdown\n# Title\nBody\n```"),
            "# Title\nBody"
        );
        assert_eq!(strip_outer_fence("```\n# T\n```"), "# T");
    }

    #[test]
    fn inner_fences_survive() {
        let input = "# T\n\n```rust\nfn main() {}\n```";
        assert_eq!(strip_outer_fence(input), input);
    }

    #[test]
    fn crlf_becomes_lf() {
        assert_eq!(normalize_line_endings("a\r\nb\rc"), "a\nb\nc");
    }

    #[test]
    fn trailing_spaces_trimmed_leading_kept() {
        assert_eq!(trim_line_ends("  indented   \nplain\t"), "  indented\nplain");
    }

    #[test]
    fn blank_runs_collapse_to_one_blank_line() {
        assert_eq!(collapse_blank_runs("a\n\n\n\n\nb"), "a\n\nb");
        assert_eq!(collapse_blank_runs("a\n\nb"), "a\n\nb");
    }

    #[test]
    fn invisible_characters_removed() {
        assert_eq!(strip_invisible("he\u{200B}llo\u{FEFF} wor\u{00AD}ld"), "hello world");
    }

    #[test]
    fn exactly_one_final_newline() {
        assert_eq!(finalize_newline("x"), "x\n");
        assert_eq!(finalize_newline("x\n\n\n"), "x\n");
        assert_eq!(finalize_newline(""), "\n");
    }

    #[test]
    fn full_pass_is_idempotent() {
        let raw = "```markdown\n# Title\r\n\r\nBody text   \n\n\n\n## Next\u{200B}\n```";
        let once = postprocess(raw);
        assert_eq!(postprocess(&once), once);
        assert!(once.starts_with("# Title"));
        assert!(once.ends_with("## Next\n"));
    }
}
