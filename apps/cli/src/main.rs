use std::{
    io::Read,
    path::{Path, PathBuf},
    process::ExitCode,
    time::{Duration, Instant},
};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use console::style;
use indicatif::{ProgressBar, ProgressStyle};
use recap_core::{
    ContentRecord, FileSummaryStore, Provider, Recap, RecapError, Settings, SourceMetadata,
    SummaryRecord, SummaryRequest, SummaryStore, format_summary_readable, format_timestamp,
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

const PREVIEW_CHARS: usize = 200;

fn format_duration(d: Duration) -> String {
    let secs = d.as_secs_f64();
    if secs < 60.0 {
        format!("{:.1}s", secs)
    } else {
        format!("{:.0}m {:.0}s", (secs / 60.0).floor(), secs % 60.0)
    }
}

/// CLI wrapper for Provider enum (needed for clap ValueEnum)
#[derive(Clone, ValueEnum)]
enum CliProvider {
    Grok,
    Openai,
    Gemini,
}

impl From<CliProvider> for Provider {
    fn from(cli: CliProvider) -> Self {
        match cli {
            CliProvider::Grok => Provider::Grok,
            CliProvider::Openai => Provider::Openai,
            CliProvider::Gemini => Provider::Gemini,
        }
    }
}

#[derive(Parser)]
#[command(name = "recap", version)]
#[command(about = "Summarize YouTube videos, web articles, PDFs and text with AI")]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Summary language (e.g. "English", "French", "Ukrainian")
    #[arg(short, long, global = true)]
    lang: Option<String>,

    /// Owner the summary is stored under
    #[arg(long, global = true, env = "RECAP_OWNER", default_value = "anonymous")]
    owner: String,

    /// AI provider for summaries
    #[arg(short, long, global = true)]
    provider: Option<CliProvider>,

    /// Override the provider's default model
    #[arg(short, long, global = true)]
    model: Option<String>,

    /// Where finished summaries are kept
    #[arg(long, global = true)]
    store_dir: Option<PathBuf>,

    /// Print the record as JSON instead of a readable report
    #[arg(long, global = true)]
    json: bool,

    /// More log output (-v info, -vv debug)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Summarize a YouTube video from its captions
    Video { url: String },

    /// Summarize a web article
    Article { url: String },

    /// Summarize free text (argument, --file, or stdin)
    Text {
        text: Option<String>,

        #[arg(short, long, conflicts_with = "text")]
        file: Option<PathBuf>,
    },

    /// Summarize a PDF document
    Pdf { path: PathBuf },

    /// Show the caption track a video would be summarized from
    Captions { url: String },

    /// List stored summaries, newest first
    History {
        #[arg(short = 'n', long)]
        limit: Option<usize>,
    },
}

fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .tick_chars("⠁⠂⠄⡀⢀⠠⠐⠈ ")
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(Duration::from_millis(80));
    pb
}

fn init_tracing(verbose: u8) {
    let level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn settings_for(cli: &Cli) -> Result<Settings> {
    let mut settings = Settings::from_env()?;
    if let Some(provider) = cli.provider.clone() {
        settings.provider = provider.into();
    }
    if let Some(model) = &cli.model {
        settings.model = Some(model.clone());
    }
    if let Some(dir) = &cli.store_dir {
        settings.store_dir = Some(dir.clone());
    }
    if let Some(lang) = &cli.lang {
        settings.default_language = lang.clone();
    }
    Ok(settings)
}

/// 2: input rejected, 3: nothing usable found, 1: anything else.
fn exit_code(err: &anyhow::Error) -> ExitCode {
    match err.downcast_ref::<RecapError>() {
        Some(e) if e.is_client_error() => ExitCode::from(2),
        Some(e) if e.is_not_found() => ExitCode::from(3),
        _ => ExitCode::FAILURE,
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    tokio::select! {
        result = run(cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("{} {:#}", style("Error:").red().bold(), e);
                exit_code(&e)
            }
        },
        _ = tokio::signal::ctrl_c() => {
            eprintln!("\n{}", style("Cancelled").yellow());
            ExitCode::from(130)
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let settings = settings_for(&cli)?;
    debug!(?settings, "settings resolved");

    // Reading history needs no provider credentials.
    if let Command::History { limit } = cli.command {
        let store = FileSummaryStore::new(settings.store_dir_or_default());
        let limit = limit.unwrap_or(settings.history_limit);
        let records = store.list_by_owner(&cli.owner, limit).await?;
        return print_history(&records, cli.json);
    }

    let recap = Recap::from_settings(&settings)?;
    let request = SummaryRequest::new(settings.default_language.clone(), cli.owner.clone());

    if !cli.json {
        eprintln!(
            "\n{}  {}\n",
            style("recap").cyan().bold(),
            style(format!("{} · {}", settings.provider.name(), request.language)).dim()
        );
    }

    match cli.command {
        Command::Video { url } => {
            let record = summarize(
                "Fetching captions and summarizing...",
                recap.summarize_video(&url, &request),
            )
            .await?;
            print_record(&record, cli.json)
        }
        Command::Article { url } => {
            let record = summarize(
                "Reading article and summarizing...",
                recap.summarize_article(&url, &request),
            )
            .await?;
            print_record(&record, cli.json)
        }
        Command::Text { text, file } => {
            let input = read_text(text, file.as_deref()).await?;
            let record = summarize(
                "Summarizing text...",
                recap.summarize_text(&input, &request),
            )
            .await?;
            print_record(&record, cli.json)
        }
        Command::Pdf { path } => {
            let bytes = tokio::fs::read(&path)
                .await
                .with_context(|| format!("could not read {}", path.display()))?;
            let filename = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            let record = summarize(
                "Extracting PDF text and summarizing...",
                recap.summarize_document(bytes, &filename, &request),
            )
            .await?;
            print_record(&record, cli.json)
        }
        Command::Captions { url } => {
            let spinner = create_spinner("Fetching captions...");
            let content = recap.preview_captions(&url).await;
            spinner.finish_and_clear();
            print_captions(&content?, cli.json)
        }
        Command::History { .. } => Ok(()),
    }
}

async fn summarize(
    msg: &str,
    flow: impl Future<Output = recap_core::Result<SummaryRecord>>,
) -> Result<SummaryRecord> {
    let started = Instant::now();
    let spinner = create_spinner(msg);
    match flow.await {
        Ok(record) => {
            spinner.finish_with_message(format!(
                "{} Summary ready {}",
                style("✓").green().bold(),
                style(format!("[{}]", format_duration(started.elapsed()))).dim()
            ));
            Ok(record)
        }
        Err(e) => {
            spinner.finish_and_clear();
            Err(e.into())
        }
    }
}

async fn read_text(text: Option<String>, file: Option<&Path>) -> Result<String> {
    if let Some(text) = text {
        return Ok(text);
    }
    if let Some(path) = file {
        return tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("could not read {}", path.display()));
    }
    let input = tokio::task::spawn_blocking(|| {
        let mut input = String::new();
        std::io::stdin().read_to_string(&mut input).map(|_| input)
    })
    .await??;
    Ok(input)
}

fn print_record(record: &SummaryRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(record)?);
        return Ok(());
    }
    println!("{}", style("─".repeat(60)).dim());
    println!("{}", format_summary_readable(record));
    Ok(())
}

fn print_captions(content: &ContentRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(content)?);
        return Ok(());
    }
    if let SourceMetadata::Caption {
        video_id,
        language_code,
        translated,
        track,
        ..
    } = content.metadata()
    {
        println!(
            "{} {} {}",
            style("✓").green().bold(),
            style(video_id).cyan(),
            style(if *translated {
                format!("{language_code}, translated")
            } else {
                language_code.clone()
            })
            .yellow()
        );
        println!(
            "  {} segments, {} long, {} characters",
            track.segment_count,
            format_timestamp(track.total_duration_seconds),
            content.char_count()
        );
    }
    let preview: String = content.text().chars().take(PREVIEW_CHARS).collect();
    println!("\n{}", preview);
    if content.char_count() > PREVIEW_CHARS {
        println!("{}", style("...").dim());
    }
    Ok(())
}

fn print_history(records: &[SummaryRecord], json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(records)?);
        return Ok(());
    }
    if records.is_empty() {
        println!("{}", style("No stored summaries").dim());
        return Ok(());
    }
    for record in records {
        println!(
            "{}  {:<8} {}  {}",
            style(record.created_at.format("%Y-%m-%d %H:%M")).dim(),
            record.content.source_kind().content_kind(),
            style(&record.id).cyan(),
            style(record.language()).yellow()
        );
    }
    Ok(())
}
