use tracing_subscriber::EnvFilter;

/// Install the global subscriber.
///
/// `RUST_LOG` adds to the default `authgate=info` directive; `LOG_FORMAT=json`
/// switches to structured output.
pub fn init() {
    let filter = EnvFilter::from_default_env().add_directive(default_directive());
    let json = std::env::var("LOG_FORMAT")
        .map(|f| f.eq_ignore_ascii_case("json"))
        .unwrap_or(false);

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn default_directive() -> tracing_subscriber::filter::Directive {
    "authgate=info"
        .parse()
        .unwrap_or_else(|_| tracing_subscriber::filter::LevelFilter::INFO.into())
}
