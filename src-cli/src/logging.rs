use tracing_subscriber::EnvFilter;

use crate::settings::{LogFormat, LogSettings};

/// Install the global subscriber. Logs go to stderr so stdout stays machine-readable.
///
/// `RUST_LOG` wins over the configured filter.
pub fn init_logging(settings: &LogSettings) {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&settings.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let result = match settings.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .json()
                .with_current_span(false)
                .with_span_list(false)
                .finish(),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            tracing_subscriber::fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .finish(),
        ),
    };

    if let Err(error) = result {
        eprintln!("global logger initialization failed: {error}");
    }
}
