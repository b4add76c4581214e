use tracing_subscriber::EnvFilter;

/// Filter directive to use when `RUST_LOG` is not set.
///
/// Each `-v` raises verbosity past the configured level.
pub(crate) fn directive(configured: &str, verbose: u8) -> String {
    match verbose {
        0 => configured.to_string(),
        1 => "debug".to_string(),
        _ => "trace".to_string(),
    }
}

/// Install the global `tracing` subscriber, writing to stderr so that stdout
/// only ever carries command output.
pub(crate) fn init(configured: &str, verbose: u8) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(directive(configured, verbose)));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}
