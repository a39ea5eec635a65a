//! Logging configuration with file and stdout output.
//!
//! Writes logs to `<exe_dir>/logs/coca_timer.log`. Set `DEBUG_LOGGING=1` to
//! enable debug output for this crate.

use tracing_subscriber::{
    fmt::{self, format::FmtSpan, time::ChronoLocal},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter,
};

use crate::paths::get_logs_dir;

pub const LOG_FILE_NAME: &str = "coca_timer.log";
const TIME_FORMAT: &str = "%H:%M:%S%.3f";

fn filter(debug_logging: bool) -> EnvFilter {
    EnvFilter::new(if debug_logging {
        "info,coca_timer=debug"
    } else {
        "info"
    })
}

/// Initialize logging with dual output (file + stdout).
///
/// Returns a `WorkerGuard` that must be held for the application lifetime so
/// buffered lines are flushed on shutdown. Falls back to stdout only when the
/// log directory cannot be created.
pub fn init() -> Option<tracing_appender::non_blocking::WorkerGuard> {
    let debug_logging = std::env::var("DEBUG_LOGGING").is_ok();
    let log_dir = get_logs_dir();

    if let Err(e) = std::fs::create_dir_all(&log_dir) {
        // Can't use tracing yet since the subscriber is not installed
        eprintln!(
            "Failed to create log directory {:?}: {}, using stdout only",
            log_dir, e
        );
        init_stdout_only(debug_logging);
        return None;
    }

    let file_appender = tracing_appender::rolling::never(&log_dir, LOG_FILE_NAME);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = fmt::layer()
        .with_writer(non_blocking)
        .with_ansi(false)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(true)
        .with_thread_names(true)
        .with_span_events(FmtSpan::NONE);

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(
        log_file = ?log_dir.join(LOG_FILE_NAME),
        debug_logging,
        session = %chrono::Local::now().format("%Y-%m-%d %H:%M:%S"),
        "Logging initialized"
    );

    Some(guard)
}

/// Fallback: stdout-only logging when the log file cannot be used.
fn init_stdout_only(debug_logging: bool) {
    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_timer(ChronoLocal::new(TIME_FORMAT.to_string()))
        .with_target(true)
        .with_span_events(FmtSpan::NONE);

    tracing_subscriber::registry()
        .with(stdout_layer)
        .with(filter(debug_logging))
        .init();

    tracing::info!(debug_logging, "Logging initialized (stdout only)");
}
