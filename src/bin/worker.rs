//! Standalone job worker.
//!
//! Consumes the `thumbnail` and `welcome` queues from the shared database
//! until interrupted.

use std::process::ExitCode;
use std::sync::Arc;

use tokio::sync::watch;
use tracing::{error, info};

use files_manager::{
    spawn_workers, Config, ContentStore, Database, JobHandler, JobQueue, LogSink,
    ThumbnailHandler, WelcomeHandler,
};

#[tokio::main]
async fn main() -> ExitCode {
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = files_manager::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        files_manager::logging::init_console_only(&config.logging.level);
    }

    let db = match Database::open(config.database.path()).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let queue = JobQueue::new(db.pool().clone(), &config.queue);
    let handlers: Vec<Arc<dyn JobHandler>> = vec![
        Arc::new(ThumbnailHandler::new(
            db.clone(),
            ContentStore::new(&config.files.folder_path),
        )) as Arc<dyn JobHandler>,
        Arc::new(WelcomeHandler::new(db.clone(), Arc::new(LogSink))),
    ];

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let workers = spawn_workers(&queue, handlers, &config.queue, shutdown_rx);

    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
    }
    info!("Shutting down workers");

    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }

    db.pool().close().await;
    ExitCode::SUCCESS
}
