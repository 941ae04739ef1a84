use clap::Parser;
use cuotabot::application::engine::ConversationEngine;
use cuotabot::config::Config;
use cuotabot::domain::ports::{GuardianRegistryRef, RemoteStoreRef};
use cuotabot::infrastructure::clock::SystemClock;
use cuotabot::infrastructure::dropbox::DropboxStore;
use cuotabot::infrastructure::file_cache::RemoteFileCache;
use cuotabot::infrastructure::guardians::JsonGuardianRegistry;
use cuotabot::infrastructure::in_memory::InMemoryGuardianRegistry;
use cuotabot::infrastructure::local_dir::LocalDirStore;
use cuotabot::infrastructure::session_store::SessionStore;
use cuotabot::interfaces::console::ConsoleSender;
use cuotabot::interfaces::csv::pin_ledger::PinLedger;
use cuotabot::interfaces::csv::student_ledger::StudentLedger;
use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncBufReadExt;
use tracing::info;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Optional JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Sender identity for the interactive console session
    #[arg(long, default_value = "console")]
    sender: String,

    /// Serve ledger documents from a local directory instead of Dropbox
    #[arg(long)]
    local_docs: Option<PathBuf>,

    /// Override the document cache directory
    #[arg(long)]
    cache_dir: Option<PathBuf>,

    /// Keep guardian registrations in memory only
    #[arg(long)]
    ephemeral: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let mut config = Config::load(cli.config.as_deref()).into_diagnostic()?;
    if let Some(cache_dir) = cli.cache_dir {
        config.cache_dir = Some(cache_dir);
    }

    let store: RemoteStoreRef = match cli.local_docs {
        Some(dir) => {
            info!(dir = %dir.display(), "serving documents from local directory");
            Arc::new(LocalDirStore::new(dir))
        }
        // Without credentials no lookup can ever succeed, so this is the
        // one fatal startup condition.
        None => Arc::new(DropboxStore::from_env().into_diagnostic()?),
    };

    let cache = Arc::new(
        RemoteFileCache::new(store, config.cache_dir()).into_diagnostic()?,
    );

    let guardians: GuardianRegistryRef = if cli.ephemeral {
        Arc::new(InMemoryGuardianRegistry::new())
    } else {
        Arc::new(JsonGuardianRegistry::open(config.guardians_file.clone()))
    };

    let clock = Arc::new(SystemClock);
    let engine = ConversationEngine::new(
        SessionStore::new(clock.clone()),
        guardians,
        StudentLedger::new(Arc::clone(&cache), config.students_ledger.clone()),
        PinLedger::new(cache, config.pins_ledger.clone()),
        Arc::new(ConsoleSender::new()),
        clock,
        config.school.clone(),
    );

    info!(sender = %cli.sender, "bot ready, one message per line");

    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.into_diagnostic()? {
        let text = line.trim();
        if text.is_empty() {
            continue;
        }
        engine.handle_message(&cli.sender, text).await;
    }

    Ok(())
}
