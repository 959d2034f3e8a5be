//! Comment Vault - YouTube top-level comment archiver
//!
//! Drains every top-level comment of a video into SQLite, replacing what was
//! stored before, and serves author-deduplicated pages from the stored set.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::application::CommentService;
use crate::infrastructure::config::AppConfig;
use crate::infrastructure::logging::init_logging;

/// Command line for a single retrieval
#[derive(Parser, Debug)]
#[command(name = "comment-vault", version, about = "Archive YouTube top-level comments and print one page")]
pub struct Cli {
    /// YouTube video id
    #[arg(long)]
    pub video_id: String,

    /// 1-based page number (values below 1 are treated as 1)
    #[arg(long, default_value_t = 1, allow_negative_numbers = true)]
    pub page: i64,

    /// Configuration file (defaults to config/default.* when present)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Address recorded in the request audit log
    #[arg(long)]
    pub requester: Option<String>,

    /// Pretty-print the JSON output
    #[arg(long, default_value_t = false)]
    pub pretty: bool,
}

/// Parse the command line, run one retrieval and print the page as JSON.
pub fn run() -> Result<ExitCode> {
    let cli = Cli::parse();

    let config = AppConfig::load(cli.config.as_deref()).context("Failed to load configuration")?;
    init_logging(&config.logging).context("Failed to initialize logging")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("Failed to start async runtime")?;

    runtime.block_on(run_once(cli, config))
}

async fn run_once(cli: Cli, config: AppConfig) -> Result<ExitCode> {
    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("🛑 Interrupt received, cancelling retrieval");
            signal_token.cancel();
        }
    });

    let service = CommentService::connect(&config)
        .await
        .context("Failed to set up comment service")?;

    info!("🚀 Retrieving comments for {} (page {})", cli.video_id, cli.page);
    let outcome = service
        .retrieve_and_audit(&cli.video_id, cli.page, cli.requester, &cancel)
        .await;
    service.shutdown().await;

    match outcome {
        Ok(page) => {
            let json = if cli.pretty {
                serde_json::to_string_pretty(&page)?
            } else {
                serde_json::to_string(&page)?
            };
            println!("{json}");
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => {
            error!("❌ Retrieval failed for {}: {}", cli.video_id, e);
            let body = serde_json::json!({
                "status": e.status_code(),
                "error": e.public_message(),
            });
            println!("{body}");
            Ok(ExitCode::FAILURE)
        }
    }
}
