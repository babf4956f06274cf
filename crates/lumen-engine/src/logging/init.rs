use std::sync::Once;

/// Filter used when neither the config nor `RUST_LOG` provide one.
///
/// wgpu's internal crates are chatty at `info`; keep them at `warn`.
pub const DEFAULT_FILTER: &str = "info,wgpu_core=warn,wgpu_hal=warn,naga=warn";

/// Logger configuration.
///
/// `env_filter` follows the `env_logger` filter syntax (e.g. "info", "warn",
/// "lumen_engine=debug,wgpu=warn").
///
/// `write_style` controls ANSI coloring behavior.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub env_filter: Option<String>,
    pub write_style: env_logger::WriteStyle,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            env_filter: None,
            write_style: env_logger::WriteStyle::Auto,
        }
    }
}

impl LoggingConfig {
    /// Returns the filter string that `init_logging` will apply.
    ///
    /// Precedence: explicit `env_filter`, then `RUST_LOG`, then [`DEFAULT_FILTER`].
    pub fn resolved_filter(&self) -> String {
        resolve_filter(self.env_filter.as_deref(), std::env::var("RUST_LOG").ok())
    }
}

fn resolve_filter(explicit: Option<&str>, from_env: Option<String>) -> String {
    explicit
        .map(str::to_owned)
        .or(from_env.filter(|f| !f.trim().is_empty()))
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

static INIT: Once = Once::new();

/// Initializes the global logger once.
///
/// This function is idempotent; subsequent calls are ignored.
/// Intended usage is early in `main`.
pub fn init_logging(config: LoggingConfig) {
    INIT.call_once(|| {
        let filter = config.resolved_filter();

        let mut builder = env_logger::Builder::new();
        builder.parse_filters(&filter);
        builder.write_style(config.write_style);

        // Another logger may already be installed (e.g. by a test harness).
        if builder.try_init().is_err() {
            return;
        }

        log::debug!("logging initialized with filter `{filter}`");
    });
}
