#![allow(missing_docs)]

//! Mailveil CLI — scan prompt bodies and inspect the detection history.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};

use mailveil::config::Config;
use mailveil::detector::{AnalyzePromptPayload, DetectionService};
use mailveil::ledger::{dismissal, HistoryLedger};
use mailveil::logging;
use mailveil::storage::{KeyValueStore, SqliteStore};

#[derive(Parser)]
#[command(
    name = "mailveil",
    about = "Email detection and redaction for chat prompt traffic"
)]
struct Cli {
    /// Path to config.toml (optional; defaults apply when absent).
    #[arg(long, default_value = "config.toml")]
    config: PathBuf,

    /// Override the SQLite database path.
    #[arg(long)]
    db: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Redact a prompt body read from a file or stdin and record the finds.
    Scan {
        /// File containing the request body (defaults to stdin).
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Print the detection history log, oldest first.
    History,
    /// Print currently active dismissals (expired entries are pruned).
    Dismissed,
    /// Snooze an address for 24 hours.
    Dismiss {
        /// Address to dismiss (normalized to lower case).
        email: String,
    },
    /// Delete the detection history log. Dismissals are unaffected.
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    logging::init_cli();
    let cli = Cli::parse();

    let config = Config::load(&cli.config).context("failed to load configuration")?;
    let db_path = cli.db.unwrap_or(config.storage.db_path);
    if let Some(parent) = db_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }
    }

    let store = Arc::new(
        SqliteStore::open(&db_path)
            .await
            .context("failed to open storage")?,
    ) as Arc<dyn KeyValueStore>;
    let ledger = Arc::new(HistoryLedger::new(store));

    match cli.command {
        Command::Scan { file } => {
            let body = read_body(file.as_deref())?;
            let service = DetectionService::new(Arc::clone(&ledger));
            let response = service
                .analyze_prompt(AnalyzePromptPayload::from_body(body))
                .await
                .context("analysis failed")?;
            println!("{}", serde_json::to_string_pretty(&response)?);
        }
        Command::History => {
            for record in ledger.load_history().await? {
                println!("{}\t{}", record.timestamp, record.email);
            }
        }
        Command::Dismissed => {
            let now = chrono::Utc::now().timestamp_millis();
            for (email, dismissed_at) in ledger.clean_expired_dismissals().await? {
                let until = dismissal::dismissed_until(dismissed_at, now).unwrap_or(dismissed_at);
                println!("{email}\tuntil {until}");
            }
        }
        Command::Dismiss { email } => {
            ledger.dismiss_email(&email).await?;
            println!(
                "dismissed {} for {} hours",
                email.to_lowercase(),
                dismissal::DISMISS_DURATION_HOURS
            );
        }
        Command::Clear => {
            ledger.clear_history().await?;
            println!("detection history cleared");
        }
    }

    Ok(())
}

fn read_body(file: Option<&Path>) -> Result<String> {
    match file {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display())),
        None => {
            let mut buf = String::new();
            std::io::stdin()
                .read_to_string(&mut buf)
                .context("failed to read stdin")?;
            Ok(buf)
        }
    }
}
