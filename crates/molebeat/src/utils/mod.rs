mod config;
mod logging;

pub use config::{Config, TickerMode};
pub use logging::init_logging;
