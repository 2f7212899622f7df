//! Tracing initialization.

use std::sync::Once;

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

static INIT: Once = Once::new();

/// Environment variable holding the filter directives.
pub const LOG_ENV: &str = "VANTAGE_LOG";

/// Targets are crate paths (`vantage_select::greedy`), so the `vantage`
/// prefix covers every crate in the workspace.
pub const DEFAULT_FILTER: &str = "vantage=info";

/// Install the global subscriber.
///
/// Reads `VANTAGE_LOG` (e.g. `VANTAGE_LOG=vantage_select=debug,vantage_eval=info`)
/// and falls back to `vantage=info` when it is unset or invalid. Safe to call
/// more than once.
pub fn init_tracing() {
    INIT.call_once(|| {
        let filter =
            EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

        tracing_subscriber::registry()
            .with(fmt::layer().with_target(true).with_line_number(true))
            .with(filter)
            .init();
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_is_idempotent() {
        init_tracing();
        init_tracing();
        tracing::info!("logging initialized");
    }
}
