//! Tracing subscriber installation helpers.
//!
//! Host code calls [`init_tracing`] once at startup; the env-filter honors
//! `RUST_LOG`. Both helpers are safe to call more than once; a second
//! installation attempt is ignored.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Install the default fmt subscriber with `RUST_LOG`-driven filtering
/// (falling back to `info`).
pub fn init_tracing() {
    init_tracing_with_filter("info");
}

/// Install the fmt subscriber with an explicit default filter directive,
/// still overridable through `RUST_LOG`.
pub fn init_tracing_with_filter(default_filter: &str) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter));
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}
