//! Utilities: logging setup (dynamic level from -v / -q, RUST_LOG override).
//!
//! Key items:
//!   init_logging / derive_level

/// Logging helpers.
pub mod logging {
    use tracing::Level;
    use tracing_subscriber::EnvFilter;

    pub fn derive_level(verbose: u8, quiet: bool) -> Level {
        if quiet {
            return Level::ERROR;
        }
        match verbose {
            0 => Level::INFO,
            1 => Level::DEBUG,
            _ => Level::TRACE,
        }
    }

    /// Filter for this crate at `level`; `RUST_LOG` wins when set.
    pub fn build_filter(level: Level) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!(
                "warn,{}={}",
                env!("CARGO_CRATE_NAME"),
                level.as_str().to_ascii_lowercase()
            ))
        })
    }

    /// Install the global subscriber. Logs go to stderr; stdout carries replies.
    pub fn init_logging(level: Level) {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(build_filter(level))
            .with_writer(std::io::stderr)
            .with_target(false)
            .try_init();
    }

}

pub use logging::{derive_level, init_logging};
