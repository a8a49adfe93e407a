//! # svcwatch Config
//!
//! Configuration management for svcwatch: a TOML file with `${VAR}` expansion,
//! overridable through `SVCWATCH_*` environment variables.

mod error;
mod loader;
mod schema;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use schema::*;
