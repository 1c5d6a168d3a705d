//! resumable-upload - upload a file over a resumable chunked protocol

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use resumable_upload::config::{Config, ConfigOptions};
use resumable_upload::{SessionOutcome, UploadSession, UploadTarget};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser, Debug)]
#[command(name = "resumable-upload")]
#[command(about = "Upload a file over a resumable chunked protocol")]
struct Args {
    /// File to upload
    file: PathBuf,

    /// Upload endpoint URL (creation requests are POSTed here)
    #[arg(long)]
    endpoint: String,

    /// Bearer token sent with every request
    #[arg(long)]
    token: Option<String>,

    /// Description sent in the creation request
    #[arg(long)]
    description: Option<String>,

    /// Distributor sent in the creation request
    #[arg(long)]
    distributor: Option<String>,

    /// Re-attempts per chunk before giving up
    #[arg(long)]
    max_retries: Option<u32>,

    /// Per-attempt timeout in seconds
    #[arg(long)]
    attempt_timeout: Option<u64>,

    /// Initial chunk size in bytes
    #[arg(long)]
    initial_chunk_size: Option<u64>,

    /// Keep the chunk size fixed instead of adapting to latency
    #[arg(long, default_value_t = false)]
    no_adaptive: bool,

    /// Continue an existing upload resource instead of creating one
    #[arg(long, value_name = "RESOURCE_ID")]
    resume: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();

    let config = Config::new(
        args.endpoint,
        ConfigOptions {
            token: args.token,
            max_retries: args.max_retries,
            attempt_timeout_secs: args.attempt_timeout,
            initial_chunk_size: args.initial_chunk_size,
            no_adaptive: args.no_adaptive,
            description: args.description,
            distributor: args.distributor,
        },
    )?;

    let target = UploadTarget::from_path(&args.file)
        .await
        .with_context(|| format!("Cannot upload {}", args.file.display()))?;

    info!(
        "Uploading {} ({} bytes) to {}",
        target.name(),
        target.file_size(),
        config.endpoint
    );

    let mut session = match args.resume {
        Some(resource_id) => UploadSession::reattach(config, target, resource_id).await?,
        None => UploadSession::new(config, target)?,
    };

    // Ctrl-C pauses at the next chunk boundary
    let pause = session.pause_token();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("Interrupt received, pausing after the current chunk...");
            pause.request();
        }
    });

    let mut progress = session.subscribe();
    tokio::spawn(async move {
        let mut last_percent = None;
        while progress.changed().await.is_ok() {
            let snapshot = progress.borrow_and_update().clone();
            if last_percent != Some(snapshot.percent) {
                info!(
                    "Progress: {}% ({}/{} bytes, chunk {}KB, {})",
                    snapshot.percent,
                    snapshot.offset,
                    snapshot.file_size,
                    snapshot.chunk_size / 1024,
                    snapshot.state
                );
                last_percent = Some(snapshot.percent);
            }
        }
    });

    let result = if session.resource_id().is_some() {
        session.resume().await
    } else {
        session.start().await
    };

    match result {
        Ok(SessionOutcome::Completed {
            resource_id,
            file_size,
        }) => {
            info!("Upload complete: {} ({} bytes)", resource_id, file_size);
            Ok(())
        }
        Ok(SessionOutcome::Paused {
            resource_id,
            offset,
        }) => {
            println!(
                "Paused at {}/{} bytes. Continue with: --resume {}",
                offset,
                session.file_size(),
                resource_id
            );
            Ok(())
        }
        Err(e) => {
            error!("Upload failed: {}", e);
            if let Some(resource_id) = session.resource_id() {
                eprintln!(
                    "Upload failed at offset {}. Retry later with: --resume {}",
                    session.offset(),
                    resource_id
                );
            }
            std::process::exit(1);
        }
    }
}
