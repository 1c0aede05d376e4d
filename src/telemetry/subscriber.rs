use super::config::TelemetryConfig;
use std::sync::OnceLock;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Keeps the telemetry subsystem alive for the lifetime of the process.
pub struct TelemetryGuard {
    _private: (),
}

static TELEMETRY_INIT: OnceLock<()> = OnceLock::new();

/// Initialize the global tracing subscriber.
///
/// Uses `RUST_LOG` if set, otherwise `config.log_filter`. Only the first call
/// installs a subscriber; later calls return a guard and do nothing else.
pub fn init_telemetry(config: TelemetryConfig) -> TelemetryGuard {
    TELEMETRY_INIT.get_or_init(|| {
        let env_filter = EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));

        let fmt_layer = fmt::layer()
            .with_target(config.show_target)
            .with_thread_ids(config.show_thread_ids)
            .with_ansi(config.enable_console_colors);

        // A subscriber installed elsewhere (e.g. by a test harness) wins.
        if tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .try_init()
            .is_ok()
        {
            tracing::debug!(service = %config.service_name, "telemetry initialized");
        }
    });

    TelemetryGuard { _private: () }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_telemetry_is_idempotent() {
        let _first = init_telemetry(TelemetryConfig::default());
        let _second = init_telemetry(TelemetryConfig::default().with_log_filter("debug"));
        assert!(TELEMETRY_INIT.get().is_some());
    }
}
