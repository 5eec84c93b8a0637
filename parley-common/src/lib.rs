pub mod config;
pub mod macros;
pub mod metrics_handler;
pub mod util;

/// Settings scope name used for values that apply everywhere.
pub static GLOBAL_SCOPE: &str = "global";
