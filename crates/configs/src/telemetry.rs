//! Process-wide `tracing` subscriber driven by [`AppSettings`].

use tracing_subscriber::EnvFilter;

use crate::{AppSettings, LogFormat};

/// `RUST_LOG` when set, otherwise `app.log_level`.
pub fn env_filter(app: &AppSettings) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&app.log_level))
}

/// Installs the global subscriber in the configured format. Output goes to
/// stderr; stdout is left to the command.
pub fn init_tracing(app: &AppSettings) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(env_filter(app))
        .with_writer(std::io::stderr);
    match app.log_format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.pretty().init(),
    }
}
