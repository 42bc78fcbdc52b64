use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tickerflux::{router, AppState};
use tickerflux_core::bucket::{BucketStore, MemoryBucketStore, S3BucketStore, S3Config};
use tickerflux_core::config::Settings;
use tickerflux_core::invocation::{handle, InvocationEvent, InvocationResponse};
use tickerflux_core::jobs::{all_job_descriptors, JobKind};
use tickerflux_core::provider::{ReportProvider, TcbsProvider};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Fetch financial reports, reshape them and upload to S3", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run one job and print its invocation response
    Run(RunArgs),
    /// Run every registered job in turn
    RunAll(SharedArgs),
    /// List registered jobs
    Jobs,
    /// Serve job invocations over HTTP
    Serve(ServeArgs),
}

#[derive(Args, Debug, Default)]
struct SharedArgs {
    /// TOML file with bucket, provider_url and [jobs.<code>] tables
    #[arg(long)]
    config: Option<PathBuf>,
    /// Upload into an in-memory store instead of S3
    #[arg(long)]
    dry_run: bool,
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Job code, e.g. balance_sheet or price_stock
    job: String,
    /// JSON event file with optional tickers, bucket and prefix
    #[arg(long)]
    event: Option<PathBuf>,
    #[command(flatten)]
    shared: SharedArgs,
}

#[derive(Args, Debug)]
struct ServeArgs {
    #[arg(long, default_value_t = 3000)]
    port: u16,
    #[command(flatten)]
    shared: SharedArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Jobs => {
            for job in all_job_descriptors() {
                println!(
                    "{:<17} {:<8} {:<22} {}",
                    job.kind.code(),
                    job.format,
                    job.default_prefix,
                    job.description
                );
            }
            Ok(())
        }
        Command::Run(args) => {
            let kind: JobKind = args.job.parse()?;
            let event = match &args.event {
                Some(path) => read_event(path)?,
                None => InvocationEvent::default(),
            };
            let state = build_state(&args.shared).await?;
            let response = invoke(&state, kind, &event).await?;
            println!("{}", serde_json::to_string_pretty(&response)?);
            Ok(())
        }
        Command::RunAll(shared) => {
            let state = build_state(&shared).await?;
            let event = InvocationEvent::default();
            for kind in JobKind::ALL {
                let response = invoke(&state, kind, &event).await?;
                println!("{}", serde_json::to_string(&response)?);
            }
            Ok(())
        }
        Command::Serve(args) => {
            let state = build_state(&args.shared).await?;
            let listener = TcpListener::bind((std::net::Ipv4Addr::UNSPECIFIED, args.port))
                .await
                .with_context(|| format!("failed to bind port {}", args.port))?;
            info!("listening on {}", listener.local_addr()?);
            axum::serve(listener, router(state).into_make_service()).await?;
            Ok(())
        }
    }
}

async fn invoke(
    state: &AppState,
    kind: JobKind,
    event: &InvocationEvent,
) -> Result<InvocationResponse> {
    handle(
        kind,
        event,
        &state.settings,
        state.provider.as_ref(),
        state.store.as_ref(),
    )
    .await
    .with_context(|| format!("job {kind} produced a summary that could not be encoded"))
}

fn read_event(path: &Path) -> Result<InvocationEvent> {
    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read event file {}", path.display()))?;
    InvocationEvent::from_json(&raw)
        .with_context(|| format!("invalid event file {}", path.display()))
}

async fn build_state(args: &SharedArgs) -> Result<AppState> {
    let mut settings = Settings::from_env();
    if let Some(path) = &args.config {
        settings = settings.overlay(Settings::load(path)?);
    }

    let provider: Arc<dyn ReportProvider> = Arc::new(
        TcbsProvider::new(settings.provider_url.as_deref())
            .context("failed to build provider client")?,
    );

    let store: Arc<dyn BucketStore> = if args.dry_run {
        info!("dry run: artifacts stay in memory");
        Arc::new(MemoryBucketStore::new())
    } else {
        Arc::new(
            S3BucketStore::new(S3Config::from_env())
                .await
                .context("failed to build S3 client")?,
        )
    };

    Ok(AppState::new(settings, provider, store))
}
