//! Tracing setup with a runtime-swappable level filter.
//!
//! The subscriber is installed before the config file is read, so startup
//! lines are never lost; once `[logging] level` is known,
//! [`apply_logging_level`] swaps the filter in place.

use std::sync::OnceLock;

use tracing_subscriber::{EnvFilter, fmt, prelude::*, reload};

static FILTER_HANDLE: OnceLock<reload::Handle<EnvFilter, tracing_subscriber::Registry>> =
    OnceLock::new();

pub fn init_tracing() {
    init_tracing_with_level("info");
}

/// Install the global subscriber. `RUST_LOG`, when set, wins over `level`
/// so operators can filter per target without editing the config file.
/// Safe to call more than once; the first installation sticks.
pub fn init_tracing_with_level(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let (filter, handle) = reload::Layer::new(filter);
    let _ = FILTER_HANDLE.set(handle);

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer())
        .try_init();
}

/// Replace the active filter, typically after the config file is loaded.
/// A no-op when tracing was never initialized (e.g. in tests).
pub fn apply_logging_level(level: &str) {
    if let Some(handle) = FILTER_HANDLE.get() {
        let _ = handle.modify(|filter| *filter = EnvFilter::new(level));
    }
}
