//! Logging helpers over `tracing`.
//!
//! All helpers are silenced when `SUI_INDEXER_SILENT` is set.

/// Log levels for the indexer
#[derive(Clone, Copy)]
pub enum LogLevel {
    Info,
    Success,
    Warning,
    Error,
    Debug,
}

fn silenced() -> bool {
    std::env::var("SUI_INDEXER_SILENT").is_ok()
}

/// Logs a message
pub fn log(level: LogLevel, message: &str) {
    if silenced() {
        return;
    }

    match level {
        LogLevel::Info | LogLevel::Success => tracing::info!("{}", message),
        LogLevel::Warning => tracing::warn!("{}", message),
        LogLevel::Error => tracing::error!("{}", message),
        LogLevel::Debug => tracing::debug!("{}", message),
    }
}

/// Masks credentials in a URL: the password of `user:pass@host` and the value
/// of an `api-key=` query parameter.
#[must_use]
pub fn redact_url(url: &str) -> String {
    let mut out = url.to_string();

    if let Some(scheme_end) = out.find("://") {
        let rest_start = scheme_end + 3;
        let authority_end = out[rest_start..]
            .find('/')
            .map_or(out.len(), |i| rest_start + i);
        if let Some(at) = out[rest_start..authority_end].rfind('@') {
            let at = rest_start + at;
            if let Some(colon) = out[rest_start..at].find(':') {
                out.replace_range(rest_start + colon + 1..at, "[REDACTED]");
            }
        }
    }

    if let Some(pos) = out.find("api-key=") {
        let value_start = pos + "api-key=".len();
        let value_end = out[value_start..]
            .find('&')
            .map_or(out.len(), |i| value_start + i);
        out.replace_range(value_start..value_end, "[REDACTED]");
    }

    out
}

/// Logs indexer startup information
pub fn log_startup(rpc_url: &str, database_url: &str, streams: usize, poll_interval_ms: u64) {
    if silenced() {
        return;
    }

    tracing::info!(
        rpc_url = %redact_url(rpc_url),
        database_url = %redact_url(database_url),
        streams,
        poll_interval_ms,
        "Sui Event Indexer Startup"
    );
}

/// Logs a sync pass summary
pub fn log_pass(success: usize, failed: usize, duration_ms: u64) {
    if silenced() {
        return;
    }
    if failed == 0 {
        tracing::debug!(streams = success, duration_ms, "event sync completed");
    } else {
        tracing::warn!(
            succeeded = success,
            failed,
            duration_ms,
            "event sync completed with errors"
        );
    }
}

/// Logs the number of events stored for one stream page
pub fn log_batch(handle: &str, stored: usize, fetched: usize) {
    if silenced() {
        return;
    }
    if stored > 0 {
        tracing::info!(handle, stored, fetched, "Events stored");
    }
}

/// Logs an error with context
pub fn log_error(context: &str, error: &str) {
    tracing::error!(context = context, error = error, "Indexer Error");
}
