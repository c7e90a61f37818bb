use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;
use tracing::{info, Level};

use promoscan::{
    ClassifierConfig, ContentClassifier, ExtractedPage, HtmlRenderer, JsonRenderer, Label, ModelBackend, OfflineBackend,
    OpenAiCompatBackend, Renderer,
};

#[derive(Parser, Debug)]
#[command(name = "promoscan")]
#[command(about = "Classify text into informational, promotional and risk content")]
#[command(version)]
struct Args {
    /// Text file to classify, or `-` for stdin
    input: PathBuf,

    /// Treat the input as an extracted-page JSON document
    #[arg(long)]
    page: bool,

    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Write the result JSON here instead of stdout
    #[arg(long)]
    out: Option<PathBuf>,

    /// Write the condensed JSON summary instead of the full result
    #[arg(long)]
    summary: bool,

    /// Also write an HTML rendering
    #[arg(long)]
    html: Option<PathBuf>,

    /// Skip the model; label everything `info`
    #[arg(long)]
    dry_run: bool,

    /// Suppress the progress bar
    #[arg(long)]
    no_progress: bool,

    /// Attach the debug trace and log at debug level
    #[arg(long)]
    debug: bool,

    /// OpenAI-compatible endpoint base URL
    #[arg(long, env = "PROMOSCAN_BASE_URL")]
    base_url: Option<String>,

    /// API key for the model endpoint
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Model name
    #[arg(long, env = "PROMOSCAN_MODEL")]
    model: Option<String>,

    /// Batches dispatched concurrently
    #[arg(long)]
    concurrency: Option<usize>,
}

impl Args {
    fn load_config(&self) -> Result<ClassifierConfig> {
        let mut config = match &self.config {
            Some(path) => ClassifierConfig::load(path)?,
            None => ClassifierConfig::default(),
        };

        if let Some(base_url) = &self.base_url {
            config.model.base_url = base_url.clone();
        }
        if let Some(api_key) = &self.api_key {
            config.model.api_key = Some(api_key.clone());
        }
        if let Some(model) = &self.model {
            config.model.model = model.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.batching.max_concurrent_batches = concurrency;
        }
        config.debug |= self.debug;

        config.validate()?;
        Ok(config)
    }
}

async fn read_input(path: &Path) -> Result<String> {
    if path.as_os_str() == "-" {
        let mut buf = String::new();
        tokio::io::stdin()
            .read_to_string(&mut buf)
            .await
            .context("Failed to read stdin")?;
        return Ok(buf);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("Failed to read input file: {}", path.display()))
}

fn build_backend(args: &Args, config: &ClassifierConfig) -> Result<Box<dyn ModelBackend>> {
    if args.dry_run {
        info!("Dry run, using offline backend");
        return Ok(Box::new(OfflineBackend));
    }
    if config.model.api_key.is_none() {
        anyhow::bail!("No API key configured; set OPENAI_API_KEY, pass --api-key or use --dry-run");
    }
    let http = reqwest::Client::builder()
        .build()
        .context("Failed to build HTTP client")?;
    Ok(Box::new(OpenAiCompatBackend::new(http, config.model.clone())))
}

fn progress_bar(hidden: bool) -> Result<ProgressBar> {
    if hidden {
        return Ok(ProgressBar::hidden());
    }
    let pb = ProgressBar::new(0);
    pb.set_style(
        ProgressStyle::with_template("{spinner} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")?
            .progress_chars("=>-"),
    );
    Ok(pb)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // stdout carries the result JSON, logs go to stderr
    let level = if args.debug { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(level)
        .with_writer(std::io::stderr)
        .json()
        .init();

    info!("Starting promoscan");
    info!(input = %args.input.display(), page = args.page, dry_run = args.dry_run, "Parsed CLI arguments");

    let config = args.load_config()?;
    let raw = read_input(&args.input).await?;

    let page = if args.page {
        Some(ExtractedPage::from_json_str(&raw).context("Failed to parse page JSON")?)
    } else {
        None
    };
    let text = match &page {
        Some(page) => page.classifiable_text()?,
        None => raw.as_str(),
    };

    let backend = build_backend(&args, &config)?;
    info!(backend = backend.name(), model = %config.model.model, "Model backend ready");

    let classifier = ContentClassifier::new(backend, &config)?.with_progress(progress_bar(args.no_progress)?);
    let result = classifier.classify(text).await;

    let json = if args.summary {
        JsonRenderer.render(&result, page.as_ref())
    } else {
        serde_json::to_string_pretty(&result).context("Failed to serialize result")?
    };
    match &args.out {
        Some(path) => tokio::fs::write(path, json)
            .await
            .with_context(|| format!("Failed to write result: {}", path.display()))?,
        None => println!("{json}"),
    }

    if let Some(path) = &args.html {
        let html = HtmlRenderer.render(&result, page.as_ref());
        tokio::fs::write(path, html)
            .await
            .with_context(|| format!("Failed to write HTML: {}", path.display()))?;
    }

    let stats = result.statistics();
    eprintln!("promoscan v{} - classification complete", env!("CARGO_PKG_VERSION"));
    eprintln!("  Sentences: {}", result.sentences().len());
    for label in Label::ALL {
        eprintln!(
            "  {label}: {} chars ({:.1}%)",
            stats.chars(label),
            stats.percentage(label)
        );
    }
    if result.is_degraded() {
        eprintln!("  Issues: {} (see result JSON)", result.issues().len());
    }

    Ok(())
}
