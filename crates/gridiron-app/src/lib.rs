// Application layer: settings, the JSON request/response protocol, the
// service that drives the optimizer and simulator, and CSV exports. The
// `gridiron` binary is a thin CLI over these.

pub mod config;
pub mod output;
pub mod protocol;
pub mod service;

pub use config::{load_settings, load_settings_from, ConfigError, Settings};
pub use service::{Service, ServiceError};
