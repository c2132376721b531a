//! CLI binary for fine-appeal.
//!
//! A thin shim over the library crate: maps CLI flags to `AppealConfig` /
//! `LayoutConfig`, runs one pipeline operation and prints or writes the result.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use fine_appeal::pipeline::input::{is_url, resolve_input, sibling_path};
use fine_appeal::render::{export_file_name, export_pdf, save_pdf};
use fine_appeal::{
    AppealComposer, AppealConfig, AppealDocument, AppealOptions, AppealType, FineRecord,
    LayoutConfig, MarkupMode, PipelineProgressCallback, ProgressCallback, Stage,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::io;
use std::path::{Path, PathBuf};
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

// ── CLI progress callback using indicatif ────────────────────────────────────

/// Spinner showing the running stage, with one log line per finished stage.
struct CliProgressCallback {
    bar: ProgressBar,
}

impl CliProgressCallback {
    fn new() -> Arc<Self> {
        let bar = ProgressBar::new_spinner();
        let style = ProgressStyle::with_template("{spinner:.cyan} {prefix:.bold}  {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]);
        bar.set_style(style);
        bar.set_prefix("Working");
        bar.enable_steady_tick(Duration::from_millis(80));
        Arc::new(Self { bar })
    }

    fn finish(&self) {
        self.bar.finish_and_clear();
    }
}

fn stage_label(stage: Stage) -> &'static str {
    match stage {
        Stage::Validate => "Checking input",
        Stage::Extract => "Reading document",
        Stage::Infer => "Waiting for the model",
        Stage::Parse => "Checking the answer",
    }
}

impl PipelineProgressCallback for CliProgressCallback {
    fn on_stage_start(&self, stage: Stage) {
        self.bar.set_message(format!("{}…", stage_label(stage)));
    }

    fn on_stage_complete(&self, stage: Stage, elapsed_ms: u64) {
        self.bar.println(format!(
            "  {} {:<24} {}",
            green("✓"),
            stage_label(stage),
            dim(&format!("{:.1}s", elapsed_ms as f64 / 1000.0)),
        ));
    }

    fn on_stage_error(&self, stage: Stage, error: &str) {
        let msg = match error.char_indices().nth(100) {
            Some((idx, _)) => format!("{}\u{2026}", &error[..idx]),
            None => error.to_string(),
        };
        self.bar
            .println(format!("  {} {:<24} {}", red("✗"), stage_label(stage), red(&msg)));
    }
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Read the details of a fine (prints JSON)
  fine-appeal analyze notice.pdf

  # Whole pipeline: analyse, write a factual appeal, export it as PDF
  fine-appeal run notice.pdf --type factual -o appeal.pdf

  # Generate from edited fine data, with extra facts from the appellant
  fine-appeal generate --fine notice.fine.json --type procedural \
      --details "The notice arrived 40 days after the offence." -o appeal.pdf

  # Re-render an edited appeal text without calling the model
  fine-appeal export --fine notice.fine.json --appeal appeal.txt -o appeal.pdf

APPEAL TYPES:
  procedural      errors in how the fine was issued or served
  factual         the facts on the fine are wrong
  legal           the fine has no legal basis
  comprehensive   all of the above (default)

ENVIRONMENT VARIABLES:
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  GEMINI_API_KEY          Google Gemini API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (openai, anthropic, gemini, ollama)
  EDGEQUAKE_MODEL         Override model ID
  FINE_APPEAL_*           Defaults for the flags below (see --help)
"#;

/// Turn traffic and parking fines into formal appeal letters.
#[derive(Parser, Debug)]
#[command(
    name = "fine-appeal",
    version,
    about = "Turn traffic and parking fines into formal appeal letters",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[command(flatten)]
    llm: LlmArgs,

    #[command(flatten)]
    layout: LayoutArgs,

    /// Disable the progress spinner.
    #[arg(long, global = true, env = "FINE_APPEAL_NO_PROGRESS")]
    no_progress: bool,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, global = true, env = "FINE_APPEAL_VERBOSE")]
    verbose: bool,

    /// Suppress all output except results and errors.
    #[arg(short, long, global = true, env = "FINE_APPEAL_QUIET")]
    quiet: bool,
}

#[derive(Args, Debug)]
struct LlmArgs {
    /// LLM model ID (e.g. gpt-4.1-mini, claude-sonnet-4-20250514).
    #[arg(long, global = true, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: openai, anthropic, gemini, ollama, azure.
    #[arg(long, global = true, env = "EDGEQUAKE_PROVIDER")]
    provider: Option<String>,

    /// Wall-clock limit per analysis or generation, in seconds.
    #[arg(long, global = true, env = "FINE_APPEAL_TIMEOUT", default_value_t = 60)]
    timeout: u64,

    /// Upload size limit in bytes.
    #[arg(long, global = true, env = "FINE_APPEAL_MAX_UPLOAD_BYTES",
          default_value_t = fine_appeal::config::DEFAULT_MAX_UPLOAD_BYTES)]
    max_upload_bytes: u64,

    /// HTTP download timeout for URL inputs, in seconds.
    #[arg(long, global = true, env = "FINE_APPEAL_DOWNLOAD_TIMEOUT", default_value_t = 120)]
    download_timeout: u64,
}

#[derive(Args, Debug)]
struct LayoutArgs {
    /// Title printed on the exported appeal.
    #[arg(long, global = true, env = "FINE_APPEAL_TITLE")]
    title: Option<String>,

    /// Honour only the first emphasis type found on each line.
    #[arg(long, global = true, env = "FINE_APPEAL_FIRST_MARKER")]
    first_marker: bool,
}

#[derive(Args, Debug)]
struct StrategyArgs {
    /// Appeal strategy.
    #[arg(short = 't', long = "type", value_enum, default_value = "comprehensive")]
    appeal_type: TypeArg,

    /// Extra facts from the appellant, passed to the model verbatim.
    #[arg(short, long)]
    details: Option<String>,

    /// Use placeholders ([FULL NAME], [ADDRESS]…) instead of first-person text.
    #[arg(long)]
    template: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Read the details of a fine and print them as JSON.
    Analyze {
        /// Local file (PDF, JPEG, PNG) or HTTP/HTTPS URL.
        input: String,

        /// Write the JSON to this file instead of stdout.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Write an appeal from fine data (JSON as printed by `analyze`).
    Generate {
        /// Fine data JSON file.
        #[arg(long)]
        fine: PathBuf,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// Export the appeal as PDF to this path.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Analyse a fine, write the appeal and export it as PDF.
    Run {
        /// Local file (PDF, JPEG, PNG) or HTTP/HTTPS URL.
        input: String,

        #[command(flatten)]
        strategy: StrategyArgs,

        /// PDF output path. Default: appeal-<reference>.pdf
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Also save the extracted fine data next to a local input file.
        #[arg(long)]
        save_fine: bool,
    },

    /// Render an appeal text as PDF without calling the model.
    Export {
        /// Fine data JSON file.
        #[arg(long)]
        fine: PathBuf,

        /// Appeal text file (with **bold** / _italic_ markup).
        #[arg(long)]
        appeal: PathBuf,

        /// PDF output path. Default: appeal-<reference>.pdf
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum TypeArg {
    Procedural,
    Factual,
    Legal,
    Comprehensive,
}

impl From<TypeArg> for AppealType {
    fn from(v: TypeArg) -> Self {
        match v {
            TypeArg::Procedural => AppealType::Procedural,
            TypeArg::Factual => AppealType::Factual,
            TypeArg::Legal => AppealType::Legal,
            TypeArg::Comprehensive => AppealType::Comprehensive,
        }
    }
}

impl From<&StrategyArgs> for AppealOptions {
    fn from(args: &StrategyArgs) -> Self {
        AppealOptions {
            appeal_type: args.appeal_type.into(),
            custom_details: args.details.clone().filter(|d| !d.trim().is_empty()),
            include_template_text: args.template,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    // The spinner gives all the feedback that matters; keep library INFO
    // logs out of its way unless asked for.
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

    let progress = if show_progress && !matches!(cli.command, Command::Export { .. }) {
        Some(CliProgressCallback::new())
    } else {
        None
    };
    let result = run_command(&cli, progress.clone()).await;
    if let Some(ref p) = progress {
        p.finish();
    }
    result
}

async fn run_command(cli: &Cli, progress: Option<Arc<CliProgressCallback>>) -> Result<()> {
    let layout = build_layout(&cli.layout);

    match &cli.command {
        Command::Analyze { input, output } => {
            let composer = build_composer(&cli.llm, progress)?;
            let fine = analyze(&composer, input).await?;
            let json = serde_json::to_string_pretty(&fine).context("Failed to serialise fine data")?;
            match output {
                Some(path) => {
                    write_text(path, &json).await?;
                    report(cli, &format!("Fine data written to {}", bold(&path.display().to_string())));
                }
                None => println!("{json}"),
            }
        }

        Command::Generate {
            fine,
            strategy,
            output,
        } => {
            let fine = read_fine(fine).await?;
            let composer = build_composer(&cli.llm, progress)?;
            let appeal = composer
                .generate_appeal(&fine, &strategy.into())
                .await
                .context("Appeal generation failed")?;
            match output {
                Some(path) => {
                    export_to(&appeal, &layout, path).await?;
                    report(cli, &format!("Appeal written to {}", bold(&path.display().to_string())));
                }
                None => println!("{}", appeal.appeal_text),
            }
        }

        Command::Run {
            input,
            strategy,
            output,
            save_fine,
        } => {
            let composer = build_composer(&cli.llm, progress)?;
            let fine = analyze(&composer, input).await?;

            if *save_fine {
                if is_url(input) {
                    bail!("--save-fine needs a local input file");
                }
                let path = sibling_path(Path::new(input), ".fine.json");
                let json = serde_json::to_string_pretty(&fine)
                    .context("Failed to serialise fine data")?;
                write_text(&path, &json).await?;
                report(cli, &format!("Fine data written to {}", path.display()));
            }

            let appeal = composer
                .generate_appeal(&fine, &strategy.into())
                .await
                .context("Appeal generation failed")?;
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(export_file_name(&fine.reference_number)));
            export_to(&appeal, &layout, &path).await?;
            report(cli, &format!("Appeal written to {}", bold(&path.display().to_string())));
        }

        Command::Export {
            fine,
            appeal,
            output,
        } => {
            let fine = read_fine(fine).await?;
            let text = tokio::fs::read_to_string(appeal)
                .await
                .with_context(|| format!("Failed to read appeal text from {:?}", appeal))?;
            if text.trim().is_empty() {
                bail!("Appeal text in {:?} is empty", appeal);
            }
            let doc = AppealDocument::new(text.trim_end(), &fine, AppealType::default());
            let path = output
                .clone()
                .unwrap_or_else(|| PathBuf::from(export_file_name(&fine.reference_number)));
            export_to(&doc, &layout, &path).await?;
            report(cli, &format!("Appeal written to {}", bold(&path.display().to_string())));
        }
    }
    Ok(())
}

/// Map CLI args to `AppealConfig` and resolve the provider.
fn build_composer(
    args: &LlmArgs,
    progress: Option<Arc<CliProgressCallback>>,
) -> Result<AppealComposer> {
    let mut builder = AppealConfig::builder()
        .timeout_secs(args.timeout)
        .max_upload_bytes(args.max_upload_bytes)
        .download_timeout_secs(args.download_timeout);
    if let Some(ref model) = args.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = args.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(cb) = progress {
        builder = builder.progress_callback(cb as ProgressCallback);
    }
    let config = builder.build().context("Invalid configuration")?;
    AppealComposer::from_config(config).context("LLM provider is not available")
}

fn build_layout(args: &LayoutArgs) -> LayoutConfig {
    let mut layout = LayoutConfig::default();
    if let Some(ref title) = args.title {
        layout.title = title.clone();
    }
    if args.first_marker {
        layout.markup_mode = MarkupMode::FirstMarker;
    }
    layout
}

async fn analyze(composer: &AppealComposer, input: &str) -> Result<FineRecord> {
    let file = resolve_input(input, composer.config())
        .await
        .with_context(|| format!("Failed to read {input}"))?;
    composer
        .analyze_fine(file)
        .await
        .context("Fine analysis failed")
}

async fn read_fine(path: &Path) -> Result<FineRecord> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read fine data from {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("{:?} is not valid fine data JSON", path))
}

async fn export_to(doc: &AppealDocument, layout: &LayoutConfig, path: &Path) -> Result<()> {
    let bytes = export_pdf(doc, layout).context("Failed to render appeal")?;
    save_pdf(&bytes, path).await?;
    Ok(())
}

async fn write_text(path: &Path, text: &str) -> Result<()> {
    tokio::fs::write(path, format!("{text}\n"))
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

fn report(cli: &Cli, line: &str) {
    if !cli.quiet {
        eprintln!("{} {}", green("✔"), line);
    }
}
