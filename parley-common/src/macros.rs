use time::macros::format_description;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;

/// Installs the global tracing subscriber. `RUST_LOG` takes precedence over the given filter.
#[macro_export]
macro_rules! tracing_init {
    () => {
        $crate::macros::init_tracing("info")
    };
    ($filter:expr) => {
        $crate::macros::init_tracing(&$filter)
    };
}

pub fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));
    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second]"
    ));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(timer)
        .try_init();
}
