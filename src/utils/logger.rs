use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;

/// Start the session log: one append-only file per run, holding job
/// lifecycle events and ffmpeg diagnostic excerpts.
///
/// Returns the writer guard (must stay alive for the session) and the log
/// path, or None when the log directory cannot be created.
pub fn init_session_log() -> Option<(WorkerGuard, PathBuf)> {
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("slowback")
        .join("logs");
    std::fs::create_dir_all(&log_dir).ok()?;

    let file_name = format!("{}.log", chrono::Local::now().format("%Y%m%d_%H%M%S"));
    let path = log_dir.join(&file_name);

    let file_appender = tracing_appender::rolling::never(&log_dir, &file_name);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::DEBUG.into()),
        )
        .init();

    tracing::info!("slowback session started");
    Some((guard, path))
}
