//! Tracing subscriber set-up shared by the binaries

use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

const DEFAULT_FILTER: &str = "ingres=info,tower_http=info,warn";
const VERBOSE_FILTER: &str = "ingres=debug,tower_http=debug,info";

/// Filter used when `RUST_LOG` is not set
pub fn default_filter(verbose: bool) -> &'static str {
  if verbose {
    VERBOSE_FILTER
  } else {
    DEFAULT_FILTER
  }
}

/// Install the global subscriber; `RUST_LOG` overrides the defaults.
/// Calling it twice is harmless.
pub fn init(verbose: bool) {
  let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter(verbose)));

  let _ = tracing_subscriber::registry().with(fmt::layer().with_target(false)).with(filter).try_init();
}
