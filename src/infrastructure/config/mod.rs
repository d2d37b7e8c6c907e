//! Loading `Config` from defaults, `.ragforge/*.yaml` and `RAGFORGE_*`
//! environment variables.

pub mod loader;

pub use loader::{ConfigError, ConfigLoader};
