use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tracing::{error, info};

use files_manager::{
    spawn_workers, Config, ContentStore, Database, JobHandler, JobQueue, KeyValueStore, LogSink,
    MemoryStore, ThumbnailHandler, WebServer, WelcomeHandler,
};

#[tokio::main]
async fn main() -> ExitCode {
    // Load configuration
    let config = match Config::load_with_env("config.toml") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            return ExitCode::FAILURE;
        }
    };

    // Initialize logging
    if let Err(e) = files_manager::logging::init(&config.logging) {
        eprintln!("Failed to initialize logging: {e}");
        // Fall back to console-only logging
        files_manager::logging::init_console_only(&config.logging.level);
    }

    info!("Files Manager");

    let db = match Database::open(config.database.path()).await {
        Ok(db) => db,
        Err(e) => {
            error!("Failed to open database: {}", e);
            return ExitCode::FAILURE;
        }
    };
    let store = Arc::new(MemoryStore::new());
    let kv: Arc<dyn KeyValueStore> = store.clone();

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper = {
        let every = Duration::from_secs(config.session.sweep_interval_secs);
        let shutdown = shutdown_rx.clone();
        tokio::spawn(async move { store.run_sweeper(every, shutdown).await })
    };
    let workers = if config.queue.embedded_workers {
        let queue = JobQueue::new(db.pool().clone(), &config.queue);
        let handlers: Vec<Arc<dyn JobHandler>> = vec![
            Arc::new(ThumbnailHandler::new(
                db.clone(),
                ContentStore::new(&config.files.folder_path),
            )) as Arc<dyn JobHandler>,
            Arc::new(WelcomeHandler::new(db.clone(), Arc::new(LogSink))),
        ];
        spawn_workers(&queue, handlers, &config.queue, shutdown_rx)
    } else {
        Vec::new()
    };

    let server = match WebServer::new(&config, db, kv) {
        Ok(server) => server,
        Err(e) => {
            error!("Failed to configure web server: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let result = server.run().await;

    let _ = shutdown_tx.send(true);
    for worker in workers {
        let _ = worker.await;
    }
    let _ = sweeper.await;

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("Web server error: {}", e);
            ExitCode::FAILURE
        }
    }
}
