//! Structured logging bootstrap, mirroring the source system's `initLogger`:
//! a single global subscriber, JSON-encoded, with a runtime-adjustable
//! level.

use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::EnvFilter;

/// Initialize the global `tracing` subscriber. `level` accepts the usual
/// `tracing` level names (`trace`, `debug`, `info`, `warn`, `error`);
/// anything else falls back to `info`, matching the source's behavior of
/// falling back to the info level on an unparsable `--log_level`.
///
/// `json` selects the production (JSON) formatter; local/dev runs can set
/// it `false` for the human-readable formatter.
pub fn init(level: &str, json: bool) {
    let level_filter: LevelFilter = level.parse().unwrap_or(LevelFilter::INFO);
    let filter = EnvFilter::builder()
        .with_default_directive(level_filter.into())
        .from_env_lossy();

    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_span_events(FmtSpan::CLOSE);

    if json {
        let _ = subscriber.json().try_init();
    } else {
        let _ = subscriber.try_init();
    }
}
