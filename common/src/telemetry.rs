use tracing::subscriber::{set_global_default, SetGlobalDefaultError};
use tracing::Subscriber;
use tracing_bunyan_formatter::{BunyanFormattingLayer, JsonStorageLayer};
use tracing_log::{log::SetLoggerError, LogTracer};
use tracing_subscriber::{fmt::MakeWriter, layer::SubscriberExt, EnvFilter, Registry};

/// Composes the layers of the `tracing` subscriber used by the service.
///
/// `Registry` stores span data and relationships, the layers on top of it:
/// - filter spans and events from `RUST_LOG`, or `fallback_env_filter` if it is not set
/// - keep span fields in a JSON-friendly storage, propagated from parent spans to children
/// - output every record as bunyan-compatible JSON to `sink`
///
/// # Arguments
/// - `name`: name of the app, found in each record
/// - `fallback_env_filter`: filter level for traces if the RUST_LOG env variable has not been set
/// - `sink`: where the records are written (stdout for the binary, a sink for silent tests)
pub fn get_tracing_subscriber<Sink>(
    name: String,
    fallback_env_filter: String,
    sink: Sink,
) -> impl Subscriber + Send + Sync
where
    // The sink implements `MakeWriter` for all choices of the lifetime `'a` (HRTB)
    Sink: for<'a> MakeWriter<'a> + Send + Sync + 'static,
{
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback_env_filter));

    let formatting_layer = BunyanFormattingLayer::new(name, sink);

    Registry::default()
        .with(env_filter)
        .with(JsonStorageLayer)
        .with(formatting_layer)
}

/// Registers a subscriber as the global default, redirecting `log` records to it.
///
/// Can only succeed once per process.
pub fn init_tracing_subscriber(
    subscriber: impl Subscriber + Send + Sync,
) -> Result<(), TelemetryError> {
    LogTracer::init()?;
    set_global_default(subscriber)?;

    Ok(())
}

#[derive(thiserror::Error, Debug)]
pub enum TelemetryError {
    #[error("Failed to redirect log records: {0}")]
    Logger(#[from] SetLoggerError),
    #[error("Failed to set the global tracing subscriber: {0}")]
    Subscriber(#[from] SetGlobalDefaultError),
}
