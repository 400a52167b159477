//! CLI binary for slidewipe.
//!
//! A thin shim over the library crate that maps CLI flags
//! to `PipelineConfig`, drives the batch, and writes results.

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use slidewipe::{
    GeminiClient, Page, PageProgressCallback, PageStatus, Pipeline, PipelineConfig,
    ProgressCallback, RecognitionStrategy, RunOptions,
};
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

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
fn cyan(s: &str) -> String {
    format!("\x1b[36m{s}\x1b[0m")
}

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Terminal progress callback: renders a live progress bar plus a per-page
/// log line when each page reaches a terminal state. The bar message tracks
/// the current sub-stage so slow model calls are visibly attributed.
struct CliProgressCallback {
    /// The single progress bar anchored at the bottom of the terminal.
    bar: ProgressBar,
    /// Per-page wall-clock start times for elapsed reporting.
    start_times: Mutex<HashMap<usize, Instant>>,
}

impl CliProgressCallback {
    fn new(total: usize) -> Arc<Self> {
        let bar = ProgressBar::new(total as u64);
        let style = ProgressStyle::with_template(
            "{spinner:.cyan} {prefix:.bold}  \
             [{bar:42.green/238}] {pos:>3}/{len} pages  {msg}  \
             ⏱ {elapsed_precise}",
        )
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("█▉▊▋▌▍▎▏  ")
        .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);

        bar.set_style(style);
        bar.set_prefix("Cleaning");
        bar.enable_steady_tick(Duration::from_millis(80));

        Arc::new(Self {
            bar,
            start_times: Mutex::new(HashMap::new()),
        })
    }
}

impl PageProgressCallback for CliProgressCallback {
    fn on_batch_start(&self, total_pages: usize) {
        self.bar.println(format!(
            "{} {}",
            cyan("◆"),
            bold(&format!("Starting cleanup of {total_pages} pages…"))
        ));
    }

    fn on_stage_change(&self, page_id: usize, status: PageStatus) {
        if status == PageStatus::Analyzing {
            self.start_times
                .lock()
                .unwrap()
                .insert(page_id, Instant::now());
        }
        if !status.is_terminal() {
            self.bar
                .set_message(format!("page {} · {status}", page_id + 1));
        }
    }

    fn on_page_finished(&self, page_id: usize, status: PageStatus) {
        let elapsed_ms = self
            .start_times
            .lock()
            .unwrap()
            .remove(&page_id)
            .map(|t| t.elapsed().as_millis())
            .unwrap_or(0);

        let tick = if status == PageStatus::Done {
            green("✓")
        } else {
            red("✗")
        };
        self.bar.println(format!(
            "  {} Page {:>3}  {}",
            tick,
            page_id + 1,
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
        self.bar.inc(1);
    }

    fn on_batch_complete(&self, total_pages: usize, completed: usize) {
        let failed = total_pages.saturating_sub(completed);
        self.bar.finish_and_clear();

        if failed == 0 {
            eprintln!(
                "{} {} pages cleaned successfully",
                green("✔"),
                bold(&completed.to_string())
            );
        } else {
            eprintln!(
                "{} {}/{} pages cleaned  ({} failed)",
                if failed == total_pages {
                    red("✘")
                } else {
                    cyan("⚠")
                },
                bold(&completed.to_string()),
                total_pages,
                red(&failed.to_string()),
            );
        }
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Clean a single slide (writes slide-01.cleaned.png next to it)
  slidewipe slide-01.png

  # Clean a whole deck export into a separate directory
  slidewipe exports/*.png -o cleaned/

  # Tighter regions, verification pass for stubborn decks
  slidewipe --padding 10 --verify deck/*.png

  # Keep embedded-art text, dump the recognized blocks as JSON
  slidewipe --blocks slide-01.png

  # Skip the local pre-fill and let the model inpaint raw regions
  slidewipe --no-premask slide-01.png

  # Single-call recognition (faster, skips style enrichment)
  slidewipe --one-call deck/*.png

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY        Google Gemini API key (required)
  SLIDEWIPE_MODEL       Override the text-recognition model ID
  SLIDEWIPE_IMAGE_MODEL Override the image-reconstruction model ID

SETUP:
  1. Set API key:   export GEMINI_API_KEY=AIza...
  2. Clean:         slidewipe deck/*.png -o cleaned/

Text blocks categorised as embedded art (logos, diagram labels, photo
captions) are left untouched; only presentation text is removed. Use the
--blocks JSON to audit what was recognised on each page.
"#;

/// Remove overlaid text from slide images using vision models.
#[derive(Parser, Debug)]
#[command(
    name = "slidewipe",
    version,
    about = "Remove overlaid text from slide images using vision models",
    long_about = "Detect the text on scanned or exported slide images with a vision model, \
pre-fill the text regions with a locally sampled background estimate, and reconstruct the \
underlying artwork with an image-output model. Originals are never modified; cleaned copies \
are written alongside them (or into --output).",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// Slide image files (PNG or JPEG), processed in the order given.
    #[arg(required = true)]
    inputs: Vec<PathBuf>,

    /// Directory for cleaned images instead of alongside the inputs.
    #[arg(short, long, env = "SLIDEWIPE_OUTPUT")]
    output: Option<PathBuf>,

    /// Padding in pixels applied around each consolidated text region.
    #[arg(long, env = "SLIDEWIPE_PADDING", default_value_t = 20,
          value_parser = clap::value_parser!(u32).range(0..=200))]
    padding: u32,

    /// Run a verification pass and retouch any residual text.
    #[arg(long, env = "SLIDEWIPE_VERIFY")]
    verify: bool,

    /// Maximum number of regions sent for reconstruction per page.
    #[arg(long, env = "SLIDEWIPE_MAX_REGIONS", default_value_t = 24)]
    max_regions: usize,

    /// Merge distance for nearby text boxes, in 0–1000 normalized units.
    #[arg(long, env = "SLIDEWIPE_MERGE_THRESHOLD", default_value_t = 15.0)]
    merge_threshold: f32,

    /// Skip the local background pre-fill before reconstruction.
    #[arg(long, env = "SLIDEWIPE_NO_PREMASK")]
    no_premask: bool,

    /// Recognize geometry and style in one model call instead of two.
    #[arg(long, env = "SLIDEWIPE_ONE_CALL")]
    one_call: bool,

    /// Text-recognition model ID.
    #[arg(long, env = "SLIDEWIPE_MODEL")]
    model: Option<String>,

    /// Image-reconstruction model ID.
    #[arg(long, env = "SLIDEWIPE_IMAGE_MODEL")]
    image_model: Option<String>,

    /// Delay between pages in milliseconds (client-side rate limiting).
    #[arg(long, env = "SLIDEWIPE_DELAY_MS", default_value_t = 300)]
    delay_ms: u64,

    /// Model sampling temperature (0.0–2.0).
    #[arg(long, env = "SLIDEWIPE_TEMPERATURE", default_value_t = 0.0)]
    temperature: f32,

    /// Per-call API timeout in seconds.
    #[arg(long, env = "SLIDEWIPE_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// Write the recognized text blocks of each page as <stem>.blocks.json.
    #[arg(long, env = "SLIDEWIPE_BLOCKS")]
    blocks: bool,

    /// Disable progress bar.
    #[arg(long, env = "SLIDEWIPE_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "SLIDEWIPE_VERBOSE")]
    verbose: bool,

    /// Suppress all output except errors.
    #[arg(short, long, env = "SLIDEWIPE_QUIET")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // Suppress INFO-level library logs when the progress bar is active;
    // the bar provides all the feedback that matters to the user.
    let show_progress = !cli.quiet && !cli.no_progress;
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

    // ── Output directory ─────────────────────────────────────────────────
    if let Some(ref dir) = cli.output {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create output directory {:?}", dir))?;
    }

    // ── Load pages ───────────────────────────────────────────────────────
    let mut pages = Vec::with_capacity(cli.inputs.len());
    for (id, path) in cli.inputs.iter().enumerate() {
        pages.push(Page::from_path(id, path)?);
    }

    // ── Build pipeline ───────────────────────────────────────────────────
    let api_key = std::env::var("GEMINI_API_KEY")
        .context("GEMINI_API_KEY is not set (get a key at https://aistudio.google.com)")?;

    let progress_cb: Option<ProgressCallback> = if show_progress {
        let cb = CliProgressCallback::new(pages.len());
        Some(cb as Arc<dyn PageProgressCallback>)
    } else {
        None
    };

    let mut builder = PipelineConfig::builder()
        .padding_px(cli.padding)
        .merge_threshold(cli.merge_threshold)
        .max_regions(cli.max_regions)
        .premask(!cli.no_premask)
        .strategy(if cli.one_call {
            RecognitionStrategy::OneCall
        } else {
            RecognitionStrategy::TwoCall
        })
        .inter_page_delay_ms(cli.delay_ms)
        .api_timeout_secs(cli.api_timeout)
        .temperature(cli.temperature);

    if let Some(cb) = progress_cb {
        builder = builder.progress_callback(cb);
    }

    let config = builder.build().context("Invalid configuration")?;

    let mut client = GeminiClient::from_config(api_key, &config)
        .context("Failed to initialise Gemini client")?;
    if let Some(ref model) = cli.model {
        client = client.with_text_model(model.clone());
    }
    if let Some(ref model) = cli.image_model {
        client = client.with_image_model(model.clone());
    }

    let pipeline = Pipeline::new(Arc::new(client.clone()), Arc::new(client), config);

    // ── Run batch ────────────────────────────────────────────────────────
    let opts = RunOptions {
        force_reanalyze: false,
        verify: cli.verify,
        padding_px: None,
    };
    let (pages, stats) = pipeline.run_batch(pages, &opts).await;

    // ── Write outputs ────────────────────────────────────────────────────
    for page in &pages {
        let input = &cli.inputs[page.id];
        match page.status {
            PageStatus::Done => {
                let out = output_path(input, cli.output.as_deref(), "cleaned.png");
                page.save_working(&out)?;

                if cli.blocks {
                    let blocks_out = output_path(input, cli.output.as_deref(), "blocks.json");
                    let json = serde_json::to_string_pretty(&page.blocks)
                        .context("Failed to serialise text blocks")?;
                    std::fs::write(&blocks_out, json)
                        .with_context(|| format!("Failed to write {:?}", blocks_out))?;
                }
            }
            _ => {
                if let Some(ref err) = page.last_error {
                    eprintln!("  {} {:?}: {err}", red("✗"), input);
                }
            }
        }
    }

    // Summary (the callback already printed the final green/red tick).
    if !cli.quiet && !show_progress {
        eprintln!(
            "Cleaned {}/{} pages in {}ms",
            stats.completed, stats.total, stats.duration_ms
        );
        if stats.failed > 0 {
            eprintln!("  {} pages failed", stats.failed);
        }
    } else if !cli.quiet {
        eprintln!("   {}", dim(&format!("{}ms total", stats.duration_ms)));
    }

    if stats.completed == 0 && stats.total > 0 {
        anyhow::bail!("all {} pages failed", stats.total);
    }
    Ok(())
}

/// Derive `<stem>.<suffix>` for `input`, in `dir` when given.
fn output_path(input: &Path, dir: Option<&Path>, suffix: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "page".to_string());
    let name = format!("{stem}.{suffix}");
    match dir {
        Some(d) => d.join(name),
        None => input.with_file_name(name),
    }
}
