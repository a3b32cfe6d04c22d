use tracing_subscriber::EnvFilter;

const DEFAULT_DIRECTIVES: &str = "info,tessera_render=debug,wgpu_core=warn,naga=warn";

/// Install a formatted `tracing` subscriber.
///
/// `RUST_LOG` takes precedence over the built-in directives. Calling this more
/// than once is harmless; only the first subscriber is installed.
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_DIRECTIVES));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// Install a subscriber with explicit filter directives, ignoring `RUST_LOG`.
pub fn init_with_filter(directives: &str) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(directives))
        .try_init();
}
