use tracing_subscriber::EnvFilter;

/// Filter used when `RUST_LOG` is not set.
pub fn default_log_filter(verbose: u8, quiet: bool) -> String {
    let level = match (quiet, verbose) {
        (true, _) => "warn",
        (false, 0) => "info",
        (false, 1) => "debug",
        (false, _) => "trace",
    };
    format!("bucketkit_io_fs={level}")
}

/// Logs go to stderr; stdout carries the per-file lines.
pub fn init_tracing(verbose: u8, quiet: bool) {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(default_log_filter(verbose, quiet))),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::default_log_filter;

    #[test]
    fn verbosity_selects_level() {
        assert_eq!(default_log_filter(0, false), "bucketkit_io_fs=info");
        assert_eq!(default_log_filter(1, false), "bucketkit_io_fs=debug");
        assert_eq!(default_log_filter(3, false), "bucketkit_io_fs=trace");
        assert_eq!(default_log_filter(0, true), "bucketkit_io_fs=warn");
    }
}
