//! CLI command implementations for pcbook.
//!
//! - [`serve`] - run the catalog server over TCP
//! - [`client`] - demo client driving every method against a server

pub mod client;
pub mod serve;

/// Initialize stdout logging.
///
/// Honors `RUST_LOG` and falls back to `info`. With `json` set, every event
/// is written as one JSON object per line.
pub fn init_logging(json: bool) {
    use tracing_subscriber::{EnvFilter, fmt, prelude::*};

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let registry = tracing_subscriber::registry().with(filter);

    if json {
        registry.with(fmt::layer().json()).init();
    } else {
        registry.with(fmt::layer()).init();
    }
}
