//! Diagnostic logging to stderr

use std::io::IsTerminal;
use std::sync::OnceLock;

use reify_core::config::LogFormat;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable that overrides the configured filter
pub const LOG_ENV: &str = "REIFY_LOG";

/// Filter from `REIFY_LOG` if set, else from `level`
pub fn filter(level: &str) -> anyhow::Result<EnvFilter> {
    match std::env::var(LOG_ENV) {
        Ok(directive) if !directive.trim().is_empty() => EnvFilter::try_new(directive)
            .map_err(|e| anyhow::anyhow!("invalid {} directive: {}", LOG_ENV, e)),
        _ => EnvFilter::try_new(level)
            .map_err(|e| anyhow::anyhow!("invalid log level '{}': {}", level, e)),
    }
}

/// Install the global subscriber; later calls are no-ops
pub fn init(level: &str, format: LogFormat) -> anyhow::Result<()> {
    static INITIALISED: OnceLock<()> = OnceLock::new();
    if INITIALISED.get().is_some() {
        return Ok(());
    }
    let env_filter = filter(level)?;
    let use_ansi = std::env::var_os("NO_COLOR").is_none() && std::io::stderr().is_terminal();

    INITIALISED.get_or_init(|| {
        let builder = fmt::fmt()
            .with_env_filter(env_filter)
            .with_ansi(use_ansi)
            .with_writer(std::io::stderr)
            .with_target(true);
        let _ = match format {
            LogFormat::Json => tracing::subscriber::set_global_default(builder.json().finish()),
            LogFormat::Text => tracing::subscriber::set_global_default(builder.compact().finish()),
        };
    });
    Ok(())
}
