use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is unset. The GPU stack is very chatty at
/// `info`, so it is held to warnings.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

fn env_filter(verbose: bool) -> EnvFilter {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return filter;
    }
    if verbose {
        EnvFilter::new(DEFAULT_FILTER.replacen("info", "debug", 1))
    } else {
        EnvFilter::new(DEFAULT_FILTER)
    }
}

/// Install the global formatter. `RUST_LOG` overrides the default filter;
/// `verbose` lowers it to `debug` so per-batch losses are printed.
///
/// Does nothing if a subscriber is already installed.
pub fn init(verbose: bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(env_filter(verbose))
        .with_target(false)
        .try_init();
}
