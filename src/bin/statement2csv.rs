//! CLI binary for edgequake-statement.
//!
//! A thin shim over the library crate that maps CLI flags to
//! `StatementConfig`, runs one statement through `StatementProcessor` and
//! prints the CSV, a category summary and any chat answers.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_statement::{
    ExtractionMethod, MemoryJobStore, ProcessOutput, ProcessProgressCallback, ProgressCallback,
    ScanMode, StatementConfig, StatementProcessor,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal spinner that reports each pipeline stage on its own line.
struct CliProgressCallback {
    bar: ProgressBar,
    started: Instant,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  ⏱ {elapsed}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.enable_steady_tick(Duration::from_millis(80));
        Self::with_bar(bar)
    }

    fn with_bar(bar: ProgressBar) -> Arc<Self> {
        bar.set_prefix("Preparing");
        bar.set_message("Opening PDF…");
        Arc::new(Self {
            bar,
            started: Instant::now(),
        })
    }

    /// Stop the spinner if no stage finished it, so an error prints on a clean line.
    fn abandon(&self) {
        if !self.bar.is_finished() {
            self.bar.finish_and_clear();
        }
    }

    fn step(&self, line: String) {
        self.bar.println(format!(
            "  {} {:<44} {}",
            green("✓"),
            line,
            dim(&format!("{:.1}s", self.started.elapsed().as_secs_f64()))
        ));
    }
}

impl ProcessProgressCallback for CliProgressCallback {
    fn on_extraction_start(&self, filename: &str, size_bytes: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Reading {filename} ({} KiB)…", size_bytes / 1024))
        ));
        self.bar.set_prefix("Extracting");
        self.bar.set_message("text layer");
    }

    fn on_scanned_path(&self, page_count: usize, dpi: u32) {
        self.step(format!("Scanned PDF: {page_count} pages @ {dpi} DPI"));
        self.bar.set_message("OCR / vision");
    }

    fn on_text_extracted(&self, chars: usize, method: ExtractionMethod) {
        self.step(format!("{chars} chars of text ({method})"));
        self.bar.set_prefix("Reading");
        self.bar.set_message("transactions");
    }

    fn on_chunk_start(&self, chunk: usize, total_chunks: usize) {
        self.bar.set_message(format!("chunk {chunk}/{total_chunks}"));
    }

    fn on_transactions_extracted(&self, count: usize) {
        self.step(format!("{count} transactions found"));
        self.bar.set_prefix("Categorising");
        self.bar.set_message("");
    }

    fn on_categorized(&self, count: usize) {
        self.step(format!("{count} transactions categorised"));
    }

    fn on_job_stored(&self, job_id: &str, _transactions: usize) {
        self.bar.finish_and_clear();
        eprintln!("{} job {}", green("✔"), dim(job_id));
    }
}

impl Drop for CliProgressCallback {
    fn drop(&mut self) {
        self.abandon();
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Statement to CSV on stdout
  statement2csv statement.pdf

  # Write to a file and ask a question about it
  statement2csv statement.pdf -o march.csv --ask "How much did I spend on dining?"

  # Force OCR for a scanned statement
  statement2csv --mode ocr scan.pdf -o scan.csv

  # Vision transcription with a different model than the text passes
  statement2csv --mode vision --vision-model gpt-4.1 scan.pdf

  # Full JSON output (transactions + category summary)
  statement2csv --json statement.pdf > statement.json

  # Interactive questions after processing
  statement2csv statement.pdf -o out.csv --chat

CATEGORIES:
  Groceries, Utilities, Shopping, Transfer, Dining, Transport, Healthcare,
  Entertainment, Other

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  PDFIUM_LIB_PATH         Path to libpdfium (needed for scanned PDFs)
  RUST_LOG                Log filter (overrides -v / -q)

SCANNED PDFS:
  Statements with little text per page are rendered with pdfium and read by
  Tesseract and/or a vision model. Install tesseract (brew install tesseract,
  apt install tesseract-ocr) or configure a vision-capable provider.
"#;

/// Turn bank-statement PDFs into categorised transactions and CSV.
#[derive(Parser, Debug)]
#[command(
    name = "statement2csv",
    version,
    about = "Turn bank-statement PDFs into categorised transactions and CSV",
    long_about = "Extract transactions from a bank-statement PDF (text-layer or scanned) with an \
LLM, assign each one a spending category, and write them as CSV. Supports OpenAI, Anthropic, \
Google Gemini, Azure OpenAI, and any OpenAI-compatible endpoint (Ollama, vLLM, LiteLLM, etc.).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Statement PDF file path.
    input: PathBuf,

    /// Write CSV to this file instead of stdout.
    #[arg(short, long, env = "STATEMENT2CSV_OUTPUT")]
    output: Option<PathBuf>,

    /// Scanned-PDF strategy: auto, ocr, vision.
    #[arg(long, env = "STATEMENT2CSV_MODE", default_value = "auto")]
    mode: String,

    /// LLM model ID for extraction, categorisation and chat.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(
        long,
        env = "EDGEQUAKE_LLM_PROVIDER",
        long_help = "LLM provider. Auto-detected from API key env vars if not set.\n\
          Supported: openai, anthropic, gemini, azure, ollama, or any OpenAI-compatible URL."
    )]
    provider: Option<String>,

    /// Provider for page-image transcription (defaults to --provider).
    #[arg(long, env = "STATEMENT2CSV_VISION_PROVIDER")]
    vision_provider: Option<String>,

    /// Model for page-image transcription (defaults to --model).
    #[arg(long, env = "STATEMENT2CSV_VISION_MODEL")]
    vision_model: Option<String>,

    /// Path to the tesseract binary.
    #[arg(long, env = "TESSERACT_PATH", default_value = "tesseract")]
    tesseract_path: String,

    /// Tesseract language code(s), e.g. eng or eng+fra.
    #[arg(long, env = "STATEMENT2CSV_OCR_LANG", default_value = "eng")]
    ocr_lang: String,

    /// Path to an existing libpdfium.
    #[arg(long, env = "PDFIUM_LIB_PATH")]
    pdfium_lib: Option<PathBuf>,

    /// Do not straighten scanned pages before OCR.
    #[arg(long)]
    no_deskew: bool,

    /// Output structured JSON (transactions + summary) instead of CSV.
    #[arg(long, env = "STATEMENT2CSV_JSON")]
    json: bool,

    /// Ask a question about the statement after processing (repeatable).
    #[arg(long, value_name = "QUESTION")]
    ask: Vec<String>,

    /// Read questions from stdin after processing, one per line.
    #[arg(long)]
    chat: bool,

    /// Disable progress spinner.
    #[arg(long, env = "STATEMENT2CSV_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STATEMENT2CSV_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "STATEMENT2CSV_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner carries stage feedback; INFO logs would tear through it.
    let show_progress = !cli.quiet && !cli.no_progress && !cli.json;
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

    // ── Build processor ──────────────────────────────────────────────────
    let spinner = show_progress.then(CliProgressCallback::new);
    let progress_cb: Option<ProgressCallback> = spinner
        .clone()
        .map(|s| s as Arc<dyn ProcessProgressCallback>);

    let config = build_config(&cli, progress_cb)?;
    let processor = StatementProcessor::new(config, Arc::new(MemoryJobStore::new()))
        .context("Failed to initialise LLM provider")?;

    // ── Run ──────────────────────────────────────────────────────────────
    let bytes = tokio::fs::read(&cli.input)
        .await
        .with_context(|| format!("Failed to read {}", cli.input.display()))?;
    let filename = cli
        .input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| cli.input.display().to_string());
    let mode = ScanMode::parse_lenient(Some(&cli.mode));

    let output = match processor.process_pdf(&bytes, &filename, None, mode).await {
        Ok(output) => output,
        Err(e) => {
            if let Some(ref spinner) = spinner {
                spinner.abandon();
            }
            return Err(e).context("Statement processing failed");
        }
    };

    // ── Emit ─────────────────────────────────────────────────────────────
    if cli.json {
        let json = serde_json::to_string_pretty(&output).context("Failed to serialise output")?;
        println!("{json}");
    } else if let Some(ref path) = cli.output {
        processor
            .write_csv(&output.job_id, path)
            .await
            .context("Failed to write CSV")?;
        if !cli.quiet {
            eprintln!(
                "{}  {} transactions  →  {}",
                green("✔"),
                output.transactions.len(),
                bold(&path.display().to_string())
            );
        }
    } else {
        let csv = processor.download_csv(&output.job_id)?;
        io::stdout()
            .lock()
            .write_all(csv.as_bytes())
            .context("Failed to write to stdout")?;
    }

    if !cli.quiet && !cli.json {
        print_summary(&output);
    }

    // ── Chat ─────────────────────────────────────────────────────────────
    for question in &cli.ask {
        answer(&processor, &output.job_id, question).await?;
    }

    if cli.chat {
        eprintln!("{}", dim("Ask about the statement (empty line or Ctrl-D to quit)."));
        let stdin = io::stdin();
        loop {
            eprint!("{} ", cyan("?"));
            io::stderr().flush().ok();
            let mut line = String::new();
            let read = stdin
                .lock()
                .read_line(&mut line)
                .context("Failed to read from stdin")?;
            let question = line.trim();
            if read == 0 || question.is_empty() {
                break;
            }
            answer(&processor, &output.job_id, question).await?;
        }
    }

    Ok(())
}

/// Ask one question and print the reply on stdout.
async fn answer(processor: &StatementProcessor, job_id: &str, question: &str) -> Result<()> {
    let reply = processor
        .chat(job_id, question)
        .await
        .with_context(|| format!("Chat failed for question '{question}'"))?;
    println!("{}", reply.trim_end());
    Ok(())
}

/// Category totals on stderr, largest first. Debits are positive.
fn print_summary(output: &ProcessOutput) {
    if output.summary_by_category.is_empty() {
        eprintln!("{}", dim("No transactions found."));
        return;
    }
    eprintln!("{}", bold("Spending by category"));
    for row in &output.summary_by_category {
        eprintln!("  {:<14} {:>12.2}", row.category.as_str(), row.total);
    }
}

/// Map CLI args to `StatementConfig`.
fn build_config(cli: &Cli, progress: Option<ProgressCallback>) -> Result<StatementConfig> {
    let mut builder = StatementConfig::builder()
        .tesseract_path(cli.tesseract_path.clone())
        .ocr_language(cli.ocr_lang.clone())
        .deskew(!cli.no_deskew);

    if let Some(ref path) = cli.pdfium_lib {
        builder = builder.pdfium_lib_path(path.clone());
    }
    if let Some(ref name) = cli.provider {
        builder = builder.provider_name(name.clone());
    }
    if let Some(ref model) = cli.model {
        builder = builder.model(model.clone());
    }
    if let Some(ref name) = cli.vision_provider {
        builder = builder.vision_provider_name(name.clone());
    }
    if let Some(ref model) = cli.vision_model {
        builder = builder.vision_model(model.clone());
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb);
    }

    builder.build().context("Invalid configuration")
}
