//! Configuration and session state for the safari dashboard client.
//!
//! [`AppConfig`] is read from TOML and describes where the booking backend
//! lives and how each entity list is filtered. [`Session`] holds the bearer
//! credential shared by every request.

pub mod config;
pub mod session;

pub use config::{
    ApiConfig, AppConfig, ConfigError, FilterProfileConfig, SelectorConfig, SessionConfig,
};
pub use session::Session;
