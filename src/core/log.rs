use tracing_subscriber::{
    EnvFilter, fmt, prelude::__tracing_subscriber_SubscriberExt, util::SubscriberInitExt,
};

/// Initializes the global subscriber. `RUST_LOG` always wins; otherwise
/// terminal commands stay silent unless `verbose`, and the server logs at
/// `info`.
pub fn init_logging(verbose: bool, serving: bool) {
    let level = match (verbose, serving) {
        (true, _) => "debug",
        (false, true) => "info",
        (false, false) => "off",
    };
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("xconv={level},tower_http={level}")));

    let registry = tracing_subscriber::registry().with(env_filter);
    if serving {
        registry
            .with(fmt::layer().with_target(true).with_line_number(true))
            .init();
    } else {
        registry.with(fmt::layer().pretty().without_time()).init();
    }
}
