mod cli;
mod config;
mod fs_source;

use std::fs::OpenOptions;
use std::sync::Arc;

use clap::Parser;
use eyre::{eyre, Result};
use fs2::FileExt;
use pritunl_archive::ArchiveExporter;
use pritunl_core::constants::DATABASE_NAME;
use pritunl_queue::{ExecutorRegistry, QueueConfig, QueueEngine};
use pritunl_store::{memory_store::FileDocumentStore, Messenger};

use cli::{Args, Command};
use config::ControlPlaneConfig;
use fs_source::FsArchiveSource;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let args = Args::parse();
    let cfg = ControlPlaneConfig::from_cli_and_env(&args)?;

    std::fs::create_dir_all(&cfg.data_root).map_err(|e| eyre!("failed to create data root {}: {e}", cfg.data_root.display()))?;

    // Single-instance guard: refuse to start a second daemon against the same data root.
    let lock_path = cfg.data_root.join("pritunld.lock");
    let lock_file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .open(&lock_path)
        .map_err(|e| eyre!("failed to open lock file {}: {e}", lock_path.display()))?;
    lock_file.try_lock_exclusive().map_err(|e| eyre!("pritunld already running against {} ({e})", cfg.data_root.display()))?;
    let _lock_guard = lock_file;

    tracing::info!(
        data_root = %cfg.data_root.display(),
        queue_ttl_seconds = cfg.queue_ttl_seconds,
        queue_max_attempts = cfg.queue_max_attempts,
        poll_interval_seconds = cfg.poll_interval_seconds,
        once = cfg.once,
        "pritunld starting"
    );

    match args.command.unwrap_or(Command::Run) {
        Command::Export { output } => run_export(&cfg, &output).await,
        Command::Run => run_queue_loop(&cfg).await,
    }
}

async fn run_export(cfg: &ControlPlaneConfig, output: &std::path::Path) -> Result<()> {
    let source = Arc::new(FsArchiveSource::new(&cfg.data_root));
    let exporter = ArchiveExporter::new(&cfg.data_root, source);
    let (filename, bytes) = exporter.export().await.map_err(|e| eyre!("archive export failed: {e}"))?;

    std::fs::write(output, &bytes).map_err(|e| eyre!("failed to write archive to {}: {e}", output.display()))?;
    tracing::info!(filename, bytes = bytes.len(), output = %output.display(), "export complete");
    Ok(())
}

async fn run_queue_loop(cfg: &ControlPlaneConfig) -> Result<()> {
    let store_path = cfg.data_root.join(DATABASE_NAME);
    let store = Arc::new(FileDocumentStore::open(&store_path).map_err(|e| eyre!("failed to open document store {}: {e}", store_path.display()))?);
    let messenger = Arc::new(Messenger::new());

    // Concrete queue_type executors belong to the admin surface; this daemon
    // only drives the generic scan/claim/execute protocol.
    let registry = ExecutorRegistry::new();

    let queue_config = QueueConfig {
        default_ttl_seconds: cfg.queue_ttl_seconds,
        max_attempts: cfg.queue_max_attempts,
        poll_interval_seconds: cfg.poll_interval_seconds,
    };

    let engine = QueueEngine::new(store, messenger, registry, queue_config);

    loop {
        if let Err(err) = engine.scan().await {
            tracing::warn!(error = %err, "queue scan cycle failed");
        }

        if cfg.once {
            break;
        }

        engine.subscribe().await;
    }

    Ok(())
}
