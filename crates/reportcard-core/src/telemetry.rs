//! Log output for the reportcard binary.
//!
//! Filtering comes from `REPORTCARD_LOG`, then `RUST_LOG`, then the
//! verbosity the CLI asks for. Storage and HTTP dependencies stay at `warn`
//! unless a directive names them.

use tracing::Level;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding filter directives for reportcard.
pub const LOG_ENV: &str = "REPORTCARD_LOG";

const OUR_CRATES: &[&str] = &[
    "reportcard_cli",
    "reportcard_core",
    "reportcard_pipeline",
    "reportcard_state",
];

const QUIET_DEPENDENCIES: &[&str] = &["surrealdb", "surrealkv", "rustls", "tungstenite"];

/// Filter directives used when neither environment variable is set:
/// our crates at `level`, noisy dependencies at `warn`.
pub fn default_directives(level: Level) -> String {
    let level = level.as_str().to_ascii_lowercase();
    let mut directives = vec!["warn".to_string()];
    for krate in OUR_CRATES {
        directives.push(format!("{krate}={level}"));
    }
    directives.extend(QUIET_DEPENDENCIES.iter().map(|krate| format!("{krate}=warn")));
    directives.join(",")
}

fn build_filter(level: Level) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_directives(level)))
}

/// Install the global subscriber on stderr, so report output on stdout
/// stays clean. With `json`, events carry their span list for the
/// per-repository fields. Later calls are no-ops.
pub fn init_tracing(json: bool, level: Level) {
    let filter = build_filter(level);

    let result = if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .json()
                    .with_span_list(true)
                    .with_current_span(false)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .compact()
                    .with_target(level >= Level::DEBUG)
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };
    if result.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_directives_scope_level_to_our_crates() {
        let directives = default_directives(Level::INFO);
        assert!(directives.starts_with("warn,"));
        assert!(directives.contains("reportcard_pipeline=info"));
        assert!(directives.contains("reportcard_state=info"));
        assert!(directives.contains("surrealdb=warn"));
        assert!(!directives.contains("surrealdb=info"));
    }

    #[test]
    fn default_directives_parse() {
        for level in [Level::WARN, Level::INFO, Level::DEBUG, Level::TRACE] {
            assert!(EnvFilter::try_new(default_directives(level)).is_ok());
        }
    }

    #[test]
    fn repeated_init_is_harmless() {
        init_tracing(false, Level::WARN);
        init_tracing(true, Level::DEBUG);
    }
}
