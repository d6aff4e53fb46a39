use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;
use url::Url;

use includer::{
    Document, FetchScriptRuntime, FragmentFetcher, HttpFetcher, IncludeResolver,
    InertScriptRuntime, ResolverConfig, ScriptRuntime,
};

/// Expands data-include fragments in an HTML document.
#[derive(Debug, Parser)]
#[command(name = "includer", version)]
struct Cli {
    /// Document to expand: a local path or an http(s)/file URL
    input: String,

    /// Write the expanded document here instead of stdout
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Base URL include paths resolve against (defaults to the input location)
    #[arg(short, long)]
    base: Option<Url>,

    /// Attribute that marks include hosts
    #[arg(long, default_value = includer::constants::DEFAULT_INCLUDE_ATTRIBUTE)]
    attribute: String,

    /// Retry a failed path with its first letter's case flipped
    #[arg(long)]
    case_fallback: bool,

    /// Fetch external script sources; an unreachable src fails the include
    #[arg(long)]
    load_scripts: bool,

    /// Per-request timeout in seconds (default: wait forever)
    #[arg(long)]
    timeout: Option<u64>,

    /// Print a JSON summary of every include to stderr
    #[arg(long)]
    summary: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let fetcher: Arc<dyn FragmentFetcher> = Arc::new(match cli.timeout {
        Some(secs) => HttpFetcher::with_timeout(Duration::from_secs(secs)),
        None => HttpFetcher::new(),
    }
    .context("failed to build HTTP client")?);

    let (text, input_base) = load_input(&cli.input, fetcher.as_ref()).await?;
    let base = cli.base.clone().unwrap_or(input_base);

    let scripts: Arc<dyn ScriptRuntime> = if cli.load_scripts {
        Arc::new(FetchScriptRuntime::new(fetcher.clone()))
    } else {
        Arc::new(InertScriptRuntime)
    };

    let config = ResolverConfig {
        attribute: cli.attribute.clone(),
        case_fallback: cli.case_fallback,
    };
    let resolver = IncludeResolver::new(config, fetcher, scripts);

    let doc = Document::parse_document(&text).into_shared();
    let report = resolver.resolve_document(&doc, &base).await;
    let html = doc.lock().await.to_html();

    match &cli.output {
        Some(path) => std::fs::write(path, html)
            .with_context(|| format!("failed to write {}", path.display()))?,
        None => print!("{html}"),
    }

    if cli.summary {
        eprintln!("{}", serde_json::to_string_pretty(&report)?);
    }
    if report.failed() > 0 {
        warn!(
            failed = report.failed(),
            resolved = report.resolved(),
            "some includes could not be resolved"
        );
    } else {
        info!(
            hosts = report.hosts(),
            resolved = report.resolved(),
            skipped = report.skipped(),
            "includes processed"
        );
    }
    Ok(())
}

/// Reads the document and derives the base URL its include paths resolve
/// against: the URL itself for URL inputs, a file URL for local paths.
async fn load_input(input: &str, fetcher: &dyn FragmentFetcher) -> Result<(String, Url)> {
    if let Ok(url) = Url::parse(input) {
        if matches!(url.scheme(), "http" | "https" | "file") {
            let text = fetcher
                .fetch(&url)
                .await
                .with_context(|| format!("failed to load document {url}"))?;
            return Ok((text, url));
        }
    }

    let path = std::fs::canonicalize(input).with_context(|| format!("cannot open {input}"))?;
    let text = tokio::fs::read_to_string(&path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let base = Url::from_file_path(&path)
        .map_err(|()| anyhow!("cannot derive a base URL from {}", path.display()))?;
    Ok((text, base))
}
