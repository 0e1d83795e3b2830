//! `xlfmt_log` v1:
//! Explicitly constructed logging context.
//!
//! No global subscriber is installed; callers run their work inside
//! [`LogContext::scope`].

use tracing::level_filters::LevelFilter;
use tracing::{Dispatch, Level};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;

/// Logging options derived from command-line verbosity flags.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecLogConfig {
    /// Most verbose level emitted.
    pub level: Level,
    /// Include event targets (module paths) in each line.
    pub if_show_target: bool,
}

impl Default for SpecLogConfig {
    fn default() -> Self {
        Self {
            level: Level::INFO,
            if_show_target: false,
        }
    }
}

impl SpecLogConfig {
    /// `verbose` -> DEBUG, `quiet` -> WARN, otherwise INFO. Verbose wins.
    pub fn from_flags(if_verbose: bool, if_quiet: bool) -> Self {
        let level = if if_verbose {
            Level::DEBUG
        } else if if_quiet {
            Level::WARN
        } else {
            Level::INFO
        };
        Self {
            level,
            if_show_target: if_verbose,
        }
    }
}

/// Owned tracing dispatcher writing to stderr.
#[derive(Clone)]
pub struct LogContext {
    dispatch: Dispatch,
}

impl LogContext {
    /// Build the dispatcher; the filter ignores `RUST_LOG`.
    pub fn new(config: &SpecLogConfig) -> Self {
        let env_filter = EnvFilter::builder()
            .with_default_directive(LevelFilter::from_level(config.level).into())
            .parse_lossy("");

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(config.if_show_target)
            .without_time();

        let subscriber = tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer);

        Self {
            dispatch: Dispatch::new(subscriber),
        }
    }

    /// Run `f` with this context as the current dispatcher.
    pub fn scope<T>(&self, f: impl FnOnce() -> T) -> T {
        tracing::dispatcher::with_default(&self.dispatch, f)
    }
}
