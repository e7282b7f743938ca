// Library crate for the project board
// Data-access layer over a hosted PostgREST datastore: projects, members, tasks

pub mod client;
pub mod config;
pub mod error;
pub mod models;
pub mod repositories;
pub mod state;

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Install the global tracing subscriber (filter from `RUST_LOG`).
///
/// Returns `false` when a subscriber was already installed.
pub fn init_tracing(format: LogFormat) -> bool {
    let builder = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env());

    match format {
        LogFormat::Pretty => builder.try_init().is_ok(),
        LogFormat::Json => builder.json().try_init().is_ok(),
    }
}
