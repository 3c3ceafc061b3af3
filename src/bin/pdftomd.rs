//! CLI binary for pdftomd.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `ExtractionConfig` and prints results.

use std::io::{self, Write};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use tracing_subscriber::EnvFilter;

use pdftomd::{
    extract, extract_to_file, extract_to_markdown, extract_with_streaming, Extraction,
    ExtractionConfig, OutputFormat, ResponseMode,
};

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn yellow(s: &str) -> String {
    format!("\x1b[33m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Basic extraction (Markdown to stdout)
  pdftomd paper.pdf

  # Write to a file
  pdftomd paper.pdf -o paper.md

  # Structured JSON instead of Markdown
  pdftomd --json paper.pdf > paper.json

  # Let the model write Markdown directly (no schema)
  pdftomd --raw report.pdf

  # Stream the response while a large document is processed
  pdftomd --stream book.pdf -o book.md

  # Ground the extraction with Google Search
  pdftomd --search --url-context whitepaper.pdf

  # Deterministic output
  pdftomd -t 0.0 paper.pdf

ENVIRONMENT VARIABLES:
  GOOGLE_API_KEY      Gemini API key (a .env file in the working
                      directory is honoured)

SETUP:
  1. Set API key:     export GOOGLE_API_KEY=...
  2. Extract:         pdftomd paper.pdf -o paper.md
"#;

/// Extract structured content from PDFs as Markdown or JSON using Google Gemini.
#[derive(Parser, Debug)]
#[command(
    name = "pdftomd",
    version,
    about = "Extract structured content from PDFs as Markdown or JSON using Google Gemini",
    long_about = "Extract structured content (metadata, sections, tables, figures, equations, \
code, references, glossary) from PDF documents using the Gemini API. The model reads the PDF \
directly; the response is schema-constrained JSON, validated locally and rendered to Markdown.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local PDF file path.
    input: PathBuf,

    /// Write output to this file instead of stdout.
    #[arg(short, long, env = "PDFTOMD_OUTPUT")]
    output: Option<PathBuf>,

    /// Gemini model ID.
    #[arg(short, long, env = "PDFTOMD_MODEL", default_value = pdftomd::DEFAULT_MODEL)]
    model: String,

    /// Sampling temperature (clamped to 0.0-1.0).
    #[arg(short, long, env = "PDFTOMD_TEMPERATURE", default_value_t = 0.1)]
    temperature: f32,

    /// Enable Google Search grounding.
    #[arg(long, env = "PDFTOMD_SEARCH")]
    search: bool,

    /// Enable URL context grounding.
    #[arg(long, env = "PDFTOMD_URL_CONTEXT")]
    url_context: bool,

    /// Output the full extraction (document, warnings, stats) as JSON.
    #[arg(long, env = "PDFTOMD_JSON", conflicts_with = "raw")]
    json: bool,

    /// Raw mode: the model writes Markdown directly, no schema.
    #[arg(long, env = "PDFTOMD_RAW")]
    raw: bool,

    /// Stream the response; the spinner shows text as it arrives.
    #[arg(long, env = "PDFTOMD_STREAM")]
    stream: bool,

    /// Max output tokens for the generation.
    #[arg(long, env = "PDFTOMD_MAX_TOKENS")]
    max_tokens: Option<u32>,

    /// Generate call timeout in seconds.
    #[arg(long, env = "PDFTOMD_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Upload timeout in seconds.
    #[arg(long, env = "PDFTOMD_UPLOAD_TIMEOUT", default_value_t = 60)]
    upload_timeout: u64,

    /// Enable DEBUG-level tracing logs and print validation warnings.
    #[arg(short, long, env = "PDFTOMD_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors and the result.
    #[arg(short, long, env = "PDFTOMD_QUIET", conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs while the spinner is active; the
    // spinner provides the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.json;
    let filter = if cli.verbose {
        "debug"
    } else if cli.quiet || show_progress {
        "error"
    } else {
        "info"
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr)
        .init();

    let config = build_config(&cli);

    // ── Raw mode: the model's own Markdown, cleaned up ───────────────────
    if cli.raw {
        let spinner = show_progress.then(|| start_spinner("Extracting"));
        let markdown = extract_to_markdown(cli.input.as_path(), &config)
            .await
            .context("Extraction failed")?;
        if let Some(spinner) = spinner {
            spinner.finish_and_clear();
        }
        return write_text(&cli, &markdown);
    }

    // ── Structured mode ──────────────────────────────────────────────────
    let spinner = show_progress.then(|| start_spinner("Extracting"));

    let extraction = if cli.stream {
        let bar = spinner.clone();
        let mut received = 0usize;
        extract_with_streaming(cli.input.as_path(), &config, move |chunk| {
            received += chunk.len();
            if let Some(bar) = &bar {
                bar.set_message(format!("{received} chars received"));
            }
            Ok(())
        })
        .await
        .context("Extraction failed")?
    } else if let Some(output_path) = &cli.output {
        let extraction = extract_to_file(cli.input.as_path(), output_path, &config)
            .await
            .context("Extraction failed")?;
        if let Some(spinner) = &spinner {
            spinner.finish_and_clear();
        }
        print_summary(&cli, &extraction, Some(output_path));
        return Ok(());
    } else {
        extract(cli.input.as_path(), &config)
            .await
            .context("Extraction failed")?
    };

    if let Some(spinner) = &spinner {
        spinner.finish_and_clear();
    }

    let content = if cli.json {
        extraction.to_json().context("Failed to serialise output")?
    } else {
        extraction.to_markdown()
    };

    match &cli.output {
        Some(path) => {
            std::fs::write(path, &content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            print_summary(&cli, &extraction, Some(path));
        }
        None => {
            write_stdout(&content)?;
            print_summary(&cli, &extraction, None);
        }
    }

    Ok(())
}

/// Map CLI args to `ExtractionConfig`.
fn build_config(cli: &Cli) -> ExtractionConfig {
    let mut builder = ExtractionConfig::builder()
        .model(&cli.model)
        .temperature(cli.temperature)
        .use_search(cli.search)
        .use_url_context(cli.url_context)
        .mode(if cli.raw {
            ResponseMode::RawText
        } else {
            ResponseMode::Structured
        })
        .output(if cli.json {
            OutputFormat::Json
        } else {
            OutputFormat::Markdown
        })
        .api_timeout_secs(cli.api_timeout)
        .upload_timeout_secs(cli.upload_timeout);
    if let Some(tokens) = cli.max_tokens {
        builder = builder.max_output_tokens(tokens);
    }
    builder.build()
}

fn start_spinner(prefix: &str) -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_prefix(prefix.to_string());
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

fn write_text(cli: &Cli, content: &str) -> Result<()> {
    match &cli.output {
        Some(path) => {
            std::fs::write(path, content)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            if !cli.quiet {
                eprintln!("{} {}", green("✔"), bold(&path.display().to_string()));
            }
            Ok(())
        }
        None => write_stdout(content),
    }
}

fn write_stdout(content: &str) -> Result<()> {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    handle
        .write_all(content.as_bytes())
        .context("Failed to write to stdout")?;
    if !content.ends_with('\n') {
        handle.write_all(b"\n").ok();
    }
    Ok(())
}

/// Result line on stderr, plus validation warnings under --verbose.
fn print_summary(cli: &Cli, extraction: &Extraction, output_path: Option<&PathBuf>) {
    if cli.quiet {
        return;
    }
    match output_path {
        Some(path) => eprintln!(
            "{} {}  {}",
            green("✔"),
            bold(&path.display().to_string()),
            dim(&format!(
                "{} tokens in / {} tokens out",
                extraction.stats.prompt_tokens, extraction.stats.completion_tokens
            )),
        ),
        None => eprintln!(
            "{} {}",
            green("✔"),
            dim(&format!(
                "{} tokens in / {} tokens out",
                extraction.stats.prompt_tokens, extraction.stats.completion_tokens
            )),
        ),
    }
    if extraction.stats.was_truncated {
        eprintln!("{} output was truncated at the token cap", yellow("⚠"));
    }
    if !extraction.warnings.is_empty() {
        if cli.verbose {
            for warning in &extraction.warnings {
                eprintln!("  {} {warning}", yellow("⚠"));
            }
        } else {
            eprintln!(
                "{} {} validation fixups applied (rerun with --verbose to list)",
                yellow("⚠"),
                extraction.warnings.len()
            );
        }
    }
}
