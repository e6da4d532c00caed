use tracing::level_filters::LevelFilter;
use tracing_subscriber::{
    EnvFilter, filter::Targets, fmt, prelude::__tracing_subscriber_SubscriberExt,
    util::SubscriberInitExt,
};

// Request spans come from tower_http, everything else from this crate.
const SERVICE_TARGETS: [&str; 2] = ["cgdp", "tower_http"];

fn service_targets(verbose: bool) -> Targets {
    let level = if verbose {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };
    SERVICE_TARGETS
        .iter()
        .fold(Targets::new(), |targets, name| targets.with_target(*name, level))
        .with_default(LevelFilter::WARN)
}

/// `RUST_LOG` narrows further when set.
pub fn init_logging(verbose: bool) {
    let fallback = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(fmt::layer().pretty().without_time())
        .with(service_targets(verbose))
        .with(env_filter)
        .init();
}
