//! Tracing subscriber setup for the CLI.
use tracing_subscriber::EnvFilter;

/// Filter directive variable; `RUST_LOG` is honoured when it is unset.
pub const LOG_ENV: &str = "TCLHARNESS_LOG";
const DEFAULT_FILTER: &str = "info";

/// Pick the filter directive: `TCLHARNESS_LOG`, then `RUST_LOG`, then the
/// default (or `debug` when `--debug` was given).
pub fn filter_directive(
    harness_log: Option<String>,
    rust_log: Option<String>,
    debug: bool,
) -> String {
    harness_log
        .filter(|value| !value.trim().is_empty())
        .or_else(|| rust_log.filter(|value| !value.trim().is_empty()))
        .unwrap_or_else(|| {
            if debug {
                "debug".to_string()
            } else {
                DEFAULT_FILTER.to_string()
            }
        })
}

/// Install a stderr fmt subscriber. Logs stay off stdout so the fixture's own
/// output is not interleaved with ours there.
pub fn init_tracing(debug: bool) {
    let directive = filter_directive(
        std::env::var(LOG_ENV).ok(),
        std::env::var("RUST_LOG").ok(),
        debug,
    );
    let filter = EnvFilter::try_new(&directive).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn harness_variable_takes_precedence() {
        assert_eq!(
            filter_directive(Some("tclharness=trace".into()), Some("warn".into()), false),
            "tclharness=trace"
        );
        assert_eq!(filter_directive(None, Some("warn".into()), true), "warn");
        assert_eq!(filter_directive(Some(" ".into()), None, false), "info");
        assert_eq!(filter_directive(None, None, true), "debug");
    }
}
