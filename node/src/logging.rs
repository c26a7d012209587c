//! Tracing setup (§10.1), grounded in the teacher's `backend/lib::log::initialize_logging`:
//! an `EnvFilter` built from the configured directive string, fanned out to either a Bunyan
//! JSON layer or a human-readable `fmt` layer depending on [`LogFormat`].

use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogFormat;

pub fn init(log_level: &str, log_format: LogFormat) {
    let env_filter = EnvFilter::try_new(log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    match log_format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(JsonStorageLayer)
                .with(BunyanFormattingLayer::new(
                    "fisherman".to_string(),
                    std::io::stdout,
                ))
                .init();
        }
        LogFormat::Pretty => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
