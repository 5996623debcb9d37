use anyhow::{Context, Result};
use clap::Parser;
use invoice_enrich::{
    emit::DirectoryTarget,
    fetch::{FileSource, HttpSource},
    Config, Session,
};
use std::path::PathBuf;
use tracing::{info, warn};
use tracing_subscriber::{fmt, EnvFilter};

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Append resolved option names to a shipping-invoice CSV"
)]
struct Args {
    /// Invoice CSV with a header row.
    input: PathBuf,
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,
    /// YAML settings; defaults apply to anything left out.
    #[arg(long)]
    config: Option<PathBuf>,
    /// Read the reference table from a local file instead of the network.
    #[arg(long)]
    mapping_file: Option<PathBuf>,
    /// Print the run summary as JSON on stdout.
    #[arg(long)]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder()
        .with_env_filter(env)
        .with_span_events(fmt::format::FmtSpan::CLOSE)
        .init();

    let args = Args::parse();
    let cfg = match &args.config {
        Some(path) => Config::from_yaml_file(path)?,
        None => Config::default(),
    };

    // ─── 2) load reference mapping ───────────────────────────────────
    let mut session = match &args.mapping_file {
        Some(path) => Session::start(&FileSource::new(path), &cfg).await,
        None => Session::start(&HttpSource::from_config(&cfg)?, &cfg).await,
    }
    .context("loading the reference table failed; check the network and run again")?;
    if session.mapping().is_empty() {
        warn!("reference mapping is empty; every row will get the not-found value");
    }

    // ─── 3) parse + enrich the invoice ───────────────────────────────
    session
        .process_file(&args.input)
        .await
        .context("processing the invoice failed; check that it is a valid CSV")?;

    // ─── 4) save the result ──────────────────────────────────────────
    let path = session
        .download(&DirectoryTarget::new(&args.out_dir))
        .await
        .context("saving the result failed")?;
    info!(path = %path.display(), "done");

    if let Some(summary) = session.summary() {
        if args.json {
            println!("{}", serde_json::to_string_pretty(&summary)?);
        } else {
            println!(
                "{} rows ({} matched, {} without option name) → {} at {}",
                summary.rows,
                summary.matched,
                summary.unmatched,
                path.display(),
                summary.completed_at
            );
        }
    }
    Ok(())
}
