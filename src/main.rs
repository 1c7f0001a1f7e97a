use anyhow::Context;
use clap::Parser;
use slicefetch::{
    download_file_retry, CompleteSlicePolicy, DataClient, DownloadConfig, DownloadOutcome,
    FileEntity,
};
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "slicefetch")]
#[command(about = "Download large archive files with parallel, resumable range requests", long_about = None)]
#[command(version)]
struct Args {
    /// Archive file id to download
    file_id: String,

    /// Output file path (defaults to <output-dir>/<file id>/<display name>)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Directory used when no output file path is given
    #[arg(long, default_value = ".")]
    output_dir: PathBuf,

    /// Number of parallel connections (1-128)
    #[arg(short, long, default_value_t = 1)]
    connections: usize,

    /// Whole-file retries after the first attempt (negative for unlimited)
    #[arg(long, default_value_t = 5, allow_negative_numbers = true)]
    max_retries: i64,

    /// Wait between retries, e.g. "5s" or "1m"
    #[arg(long, default_value = "5s", value_parser = humantime::parse_duration)]
    retry_wait: Duration,

    /// Data API base URL
    #[arg(long)]
    base_url: String,

    /// Bearer token for the data API
    #[arg(long)]
    token: Option<String>,

    /// Delete slice temp files when all retries fail
    #[arg(long)]
    delete_temp: bool,

    /// Fetch again slices whose temp file already has the full length
    #[arg(long)]
    refetch_complete_slices: bool,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize tracing
    let log_level = if args.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(format!("slicefetch={}", log_level))
        .init();

    info!("SliceFetch - archive file downloader");
    info!("File id: {}", args.file_id);

    let mut client = DataClient::new(args.base_url);
    if let Some(token) = args.token {
        client = client.with_bearer_token(token);
    }

    let config = DownloadConfig {
        connections: args.connections,
        max_retries: args.max_retries,
        retry_wait: args.retry_wait,
        delete_temporary_files: args.delete_temp,
        complete_slice_policy: if args.refetch_complete_slices {
            CompleteSlicePolicy::Refetch
        } else {
            CompleteSlicePolicy::AcceptByLength
        },
        show_progress: atty::is(atty::Stream::Stderr),
        ..DownloadConfig::default()
    };

    let mut file = FileEntity::new(&args.file_id);
    let output = match args.output {
        Some(path) => path,
        None => {
            file.ensure_metadata_loaded(&client)
                .await
                .with_context(|| format!("Failed to load metadata for {}", args.file_id))?;
            file.generate_output_filename(&args.output_dir, None)?
        }
    };

    let outcome = download_file_retry(&client, &mut file, Some(output), &config)
        .await
        .with_context(|| format!("Failed to download {}", args.file_id))?;

    match outcome {
        DownloadOutcome::AlreadyPresent => info!("Local copy is already up to date"),
        DownloadOutcome::Downloaded { attempts, .. } => {
            info!("Download completed after {} attempt(s)", attempts)
        }
        DownloadOutcome::Skipped { reason } => info!("Skipped: {}", reason),
    }
    Ok(())
}
