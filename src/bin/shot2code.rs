//! CLI binary for edgequake-shot2code.
//!
//! A thin shim over the library: maps flags to `GenerationConfig`, runs one
//! `GenerationSession`, and prints the generated markup.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_shot2code::pipeline::input::resolve_input;
use edgequake_shot2code::pipeline::provider::KeyedProvider;
use edgequake_shot2code::{
    write_output, GeneratedCode, GenerationClient, GenerationConfig, GenerationFailure,
    GenerationResult, GenerationSession, SessionSnapshot, SessionState,
};
use futures::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers ──────────────────────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn red(s: &str) -> String {
    format!("\x1b[31m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}
fn bold(s: &str) -> String {
    format!("\x1b[1m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Print the generated HTML
  shot2code screenshot.png

  # Write a preview document you can open in a browser
  shot2code screenshot.png -o preview.html

  # Line-numbered code view
  shot2code --listing screenshot.png

  # Screenshot from a URL, structured output
  shot2code --json https://example.com/mockup.webp > result.json

  # Any OpenAI-compatible server
  shot2code --base-url http://localhost:8000/v1 --model llava screenshot.png

  # Route through an edgequake-llm provider instead
  shot2code --provider anthropic --model claude-sonnet-4-20250514 screenshot.png

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          API key for the default endpoint and --provider openai
  ANTHROPIC_API_KEY       API key for --provider anthropic
  GEMINI_API_KEY          API key for --provider gemini
  OPENROUTER_API_KEY      API key for --provider openrouter
  SHOT2CODE_MODEL         Override model ID (default: gpt-4o)
  SHOT2CODE_BASE_URL      OpenAI-compatible base URL
  RUST_LOG                Log filter, e.g. edgequake_shot2code=debug

SETUP:
  1. Get an API key:  https://platform.openai.com/api-keys
  2. Set it:          export OPENAI_API_KEY=sk-...
  3. Generate:        shot2code screenshot.png -o preview.html
"#;

/// Turn a UI screenshot into a single HTML + Tailwind document.
#[derive(Parser, Debug)]
#[command(
    name = "shot2code",
    version,
    about = "Turn UI screenshots into HTML + Tailwind using Vision LLMs",
    long_about = "Send a screenshot (PNG, JPEG or WebP; local file or URL) to a vision-capable \
chat model and print a single self-contained HTML document that reproduces it, styled with \
Tailwind CSS from the CDN.",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Local image path or HTTP/HTTPS URL.
    input: String,

    /// Write the generated HTML to this file instead of stdout.
    #[arg(short, long, env = "SHOT2CODE_OUTPUT")]
    output: Option<PathBuf>,

    /// API key for the completion endpoint. Falls back to the selected
    /// provider's environment variable (OPENAI_API_KEY by default).
    #[arg(long)]
    api_key: Option<String>,

    /// Model ID.
    #[arg(long, env = "SHOT2CODE_MODEL", default_value = "gpt-4o")]
    model: String,

    /// Use a named edgequake-llm provider (openai, anthropic, gemini, ollama).
    #[arg(long, env = "SHOT2CODE_PROVIDER")]
    provider: Option<String>,

    /// OpenAI-compatible base URL.
    #[arg(long, env = "SHOT2CODE_BASE_URL", default_value = "https://api.openai.com/v1")]
    base_url: String,

    /// Screenshots wider than this are scaled down, keeping aspect ratio.
    #[arg(long, env = "SHOT2CODE_MAX_WIDTH", default_value_t = 1024,
          value_parser = clap::value_parser!(u32).range(1..))]
    max_width: u32,

    /// JPEG quality for the image sent to the model (0.01–1.0).
    #[arg(long, env = "SHOT2CODE_QUALITY", default_value_t = 0.7)]
    quality: f32,

    /// Max completion tokens.
    #[arg(long, env = "SHOT2CODE_MAX_TOKENS", default_value_t = 4096)]
    max_tokens: usize,

    /// Sampling temperature (0.0–2.0). Provider default when unset.
    #[arg(long, env = "SHOT2CODE_TEMPERATURE")]
    temperature: Option<f32>,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "SHOT2CODE_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Completion request timeout in seconds. No timeout when unset.
    #[arg(long, env = "SHOT2CODE_API_TIMEOUT")]
    api_timeout: Option<u64>,

    /// HTTP download timeout in seconds for URL inputs.
    #[arg(long, env = "SHOT2CODE_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,

    /// Print a line-numbered listing instead of raw HTML.
    #[arg(long, conflicts_with = "json")]
    listing: bool,

    /// Output the structured result as JSON.
    #[arg(long, env = "SHOT2CODE_JSON")]
    json: bool,

    /// Disable the progress spinner.
    #[arg(long, env = "SHOT2CODE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SHOT2CODE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SHOT2CODE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep INFO logs out of
    // its way unless asked for.
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

    // ── Build config and load the screenshot ─────────────────────────────
    let config = build_config(&cli).await?;
    let client = GenerationClient::new(config).context("Failed to set up the completion endpoint")?;
    let source = resolve_input(&cli.input, cli.download_timeout)
        .await
        .context("Failed to load screenshot")?;

    // ── Run one session ──────────────────────────────────────────────────
    let session = Arc::new(GenerationSession::new(client));
    let spinner = show_progress.then(|| spawn_spinner(Arc::clone(&session)));

    if let Some(handle) = session.select_image(source) {
        handle.finished().await;
    }
    let snapshot = session.settled().await;
    if let Some(task) = spinner {
        task.await.ok();
    }

    match snapshot.state {
        SessionState::Succeeded(code) => emit_success(&cli, code).await,
        SessionState::Failed(failure) => emit_failure(&cli, failure),
        other => anyhow::bail!("Session ended in unexpected state: {other:?}"),
    }
}

/// Drive an indicatif spinner from the session's state updates until the
/// session settles.
fn spawn_spinner(session: Arc<GenerationSession>) -> tokio::task::JoinHandle<()> {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}  {elapsed:.dim}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.enable_steady_tick(Duration::from_millis(80));

    tokio::spawn(async move {
        let mut updates = session.updates();
        while let Some(SessionSnapshot { state, .. }) = updates.next().await {
            match state {
                SessionState::Idle => {
                    bar.set_prefix("Waiting");
                    bar.set_message("no screenshot selected");
                }
                SessionState::Preparing => {
                    bar.set_prefix("Preparing");
                    bar.set_message("resizing and encoding screenshot…");
                }
                SessionState::AwaitingResponse => {
                    bar.set_prefix("Generating");
                    bar.set_message("waiting for the model…");
                }
                SessionState::Succeeded(_) | SessionState::Failed(_) => break,
            }
        }
        bar.finish_and_clear();
    })
}

async fn emit_success(cli: &Cli, code: GeneratedCode) -> Result<()> {
    if let Some(ref output_path) = cli.output {
        write_output(output_path, &code.source_code)
            .await
            .context("Failed to write output")?;
    }

    if cli.json {
        let json = serde_json::to_string_pretty(&GenerationResult::Success(code.clone()))
            .context("Failed to serialise output")?;
        println!("{json}");
    } else if cli.listing {
        print!("{}", code.listing());
    } else if cli.output.is_none() {
        let stdout = io::stdout();
        let mut handle = stdout.lock();
        handle
            .write_all(code.source_code.as_bytes())
            .context("Failed to write to stdout")?;
        if !code.source_code.ends_with('\n') {
            handle.write_all(b"\n").ok();
        }
    }

    if !cli.quiet && !cli.json {
        let target = match cli.output {
            Some(ref p) => format!("  →  {}", bold(&p.display().to_string())),
            None => String::new(),
        };
        eprintln!(
            "{}  {} lines  {}ms{}",
            green("✔"),
            code.source_code.lines().count(),
            code.stats.duration_ms,
            target,
        );
        eprintln!(
            "   {} tokens in  /  {} tokens out  ({}, {}x{})",
            dim(&code.stats.input_tokens.to_string()),
            dim(&code.stats.output_tokens.to_string()),
            code.stats.model,
            code.stats.image_width,
            code.stats.image_height,
        );
    }
    Ok(())
}

fn emit_failure(cli: &Cli, failure: GenerationFailure) -> Result<()> {
    if cli.json {
        let json = serde_json::to_string_pretty(&GenerationResult::Failure(failure.clone()))
            .context("Failed to serialise output")?;
        println!("{json}");
    } else if !cli.quiet {
        eprintln!("{} {}", red("✘"), bold("Generation failed"));
    }
    Err(anyhow::Error::new(failure).context("Generation failed"))
}

/// Map CLI args to `GenerationConfig`.
/// `--api-key`, else the key variable of the selected provider.
fn api_key(cli: &Cli) -> Option<String> {
    if let Some(ref key) = cli.api_key {
        return Some(key.clone());
    }
    let env_var = match cli.provider.as_deref() {
        None => KeyedProvider::OpenAi.env_var(),
        Some(name) => KeyedProvider::from_name(name)?.env_var(),
    };
    std::env::var(env_var).ok()
}

async fn build_config(cli: &Cli) -> Result<GenerationConfig> {
    let mut builder = GenerationConfig::builder()
        .model(&cli.model)
        .base_url(&cli.base_url)
        .max_width(cli.max_width)
        .jpeg_quality(cli.quality)
        .max_tokens(cli.max_tokens)
        .download_timeout_secs(cli.download_timeout);

    if let Some(key) = api_key(cli) {
        builder = builder.api_key(key);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(t) = cli.temperature {
        builder = builder.temperature(t);
    }
    if let Some(secs) = cli.api_timeout {
        builder = builder.api_timeout_secs(secs);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {:?}", path))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}
