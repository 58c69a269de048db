//! Utility functions for the benchmark.
//!
//! This module provides the plain-text list readers and logging setup.

pub mod lists;

pub use lists::{load_labels, read_image_list};

/// Initializes the tracing subscriber for logging.
///
/// Filtering follows `RUST_LOG` and falls back to `info` so that progress and
/// the final summary are visible by default.
pub fn init_tracing() {
    use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();
}
