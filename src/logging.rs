//! Tracing setup shared by the API server and the standalone worker.

use std::fs::{self, OpenOptions};
use std::path::Path;
use std::sync::Arc;

use tracing_subscriber::fmt::writer::{BoxMakeWriter, MakeWriterExt};
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;
use crate::Result;

/// Targets that are chatty at `debug` and below.
const QUIET_TARGETS: [&str; 3] = ["sqlx=warn", "tower_http=info", "hyper=info"];

/// Normalize a configured level name. Unknown names fall back to `info`.
fn level_name(level: &str) -> &'static str {
    match level.trim().to_ascii_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

/// `RUST_LOG` wins when set; otherwise the configured level with the
/// noisy dependency targets capped.
fn build_filter(level: &str) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }

    let mut directives = vec![level_name(level).to_string()];
    directives.extend(QUIET_TARGETS.iter().map(|d| d.to_string()));
    EnvFilter::new(directives.join(","))
}

fn install(writer: BoxMakeWriter, ansi: bool, level: &str) {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(ansi)
                .with_target(true),
        )
        .with(build_filter(level))
        .init();
}

/// Initialize logging from `config`.
///
/// Output goes to stdout, and is also appended to `config.file` when one is
/// configured.
pub fn init(config: &LoggingConfig) -> Result<()> {
    let Some(file) = config.file.as_deref() else {
        init_console_only(&config.level);
        return Ok(());
    };

    if let Some(parent) = Path::new(file).parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let log_file = Arc::new(OpenOptions::new().create(true).append(true).open(file)?);

    install(
        BoxMakeWriter::new(std::io::stdout.and(log_file)),
        false,
        &config.level,
    );
    Ok(())
}

/// Console-only logging, used when the log file cannot be opened.
pub fn init_console_only(level: &str) {
    install(BoxMakeWriter::new(std::io::stdout), true, level);
}
