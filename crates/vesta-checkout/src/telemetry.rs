//! # Telemetry
//!
//! Tracing subscriber setup for processes that embed the checkout.
//!
//! ## Log Levels
//! - `RUST_LOG=debug` - Show debug messages
//! - `RUST_LOG=vesta_checkout=trace` - Trace the checkout only
//! - Default: `info` everywhere, `debug` for the vesta crates

use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset or unparseable.
pub const DEFAULT_FILTER: &str = "info,vesta=debug";

/// Installs the global fmt subscriber.
///
/// Returns `false` when a subscriber was already installed (by an earlier
/// call or by the host application); that is not an error.
pub fn init_tracing() -> bool {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .try_init()
        .is_ok()
}
