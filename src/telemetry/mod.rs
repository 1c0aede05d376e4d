// ── Submodules ────────────────────────────────────────────────────────────────

/// Telemetry configuration.
#[cfg(feature = "telemetry")]
pub mod config;

/// Global subscriber initialisation.
#[cfg(feature = "telemetry")]
pub mod subscriber;

// ── Re-exports ────────────────────────────────────────────────────────────────

#[cfg(feature = "telemetry")]
pub use config::TelemetryConfig;

#[cfg(feature = "telemetry")]
pub use subscriber::{TelemetryGuard, init_telemetry};
