//! Shared plumbing for the reporting service: the JSON config file and
//! the category-filtered logging setup driven by it.

pub mod config;
pub mod logging;

pub use config::{ListenConfig, LoggingConfig, ServerConfig, load_config};
pub use logging::init_logging;
