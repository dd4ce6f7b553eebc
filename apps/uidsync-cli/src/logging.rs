//! Diagnostic logging setup.
//!
//! Logs go to stderr through `tracing_subscriber::fmt`. Operator-facing
//! progress lines are printed by the console and do not depend on the
//! filter chosen here.

use tracing_subscriber::EnvFilter;

/// Filter variable checked before `RUST_LOG`.
pub const LOG_ENV: &str = "UIDSYNC_LOG";

/// Filter directive for a `-v` count and the environment's own directive.
///
/// Any `-v` wins over the environment; without one the environment wins
/// over the `warn` default.
pub fn filter_directive(verbose: u8, env: Option<String>) -> String {
    match verbose {
        0 => env
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| "warn".to_string()),
        1 => "info".to_string(),
        _ => "debug".to_string(),
    }
}

pub fn init(verbose: u8) {
    let env = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var("RUST_LOG"))
        .ok();
    let directive = filter_directive(verbose, env);
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|e| {
        eprintln!("Ignoring invalid log filter {directive:?}: {e}");
        EnvFilter::new("warn")
    });

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();

    tracing::debug!(filter = %directive, "Logging initialized");
}
