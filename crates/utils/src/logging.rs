//! Tracing subscriber setup shared by the binaries.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "info,sqlx=warn";

/// Install the global subscriber. `MEALMATCH_LOG` wins over `RUST_LOG`.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_env("MEALMATCH_LOG")
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    // try_init so tests that install their own subscriber don't panic
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .try_init();
}
