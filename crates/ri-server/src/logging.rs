use std::sync::Once;

use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

use crate::config::LogFormat;

static INIT: Once = Once::new();

/// Install the global subscriber: `RUST_LOG` if set, else `level`; text or
/// JSON lines on stderr; `log` records bridged into tracing.
///
/// Only the first call has an effect. Stdout stays free for protocol
/// output.
pub fn init(level: &str, format: LogFormat) {
    INIT.call_once(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

        let layer = match format {
            LogFormat::Text => tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .boxed(),
            LogFormat::Json => tracing_subscriber::fmt::layer()
                .json()
                .with_writer(std::io::stderr)
                .with_current_span(true)
                .boxed(),
        };

        if let Err(e) = tracing_log::LogTracer::init() {
            eprintln!("log bridge not installed: {e}");
        }
        if let Err(e) = tracing_subscriber::registry()
            .with(layer.with_filter(filter))
            .try_init()
        {
            eprintln!("tracing subscriber not installed: {e}");
        }
    });
}
