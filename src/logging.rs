use tracing::Level;
use tracing_subscriber::fmt::time::ChronoLocal;

/// Log level for the verbosity flag.
pub fn level(verbose: bool) -> Level {
    if verbose {
        Level::DEBUG
    } else {
        Level::INFO
    }
}

/// Installs the stderr subscriber, stamping lines with `date_format`.
/// A second call is a no-op.
pub fn init(verbose: bool, date_format: &str) {
    let _ = tracing_subscriber::fmt()
        .with_max_level(level(verbose))
        .with_timer(ChronoLocal::new(date_format.to_string()))
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init();
}
