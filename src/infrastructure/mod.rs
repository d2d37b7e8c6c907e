//! Infrastructure: configuration, logging and HTTP plumbing.

pub mod config;
pub mod http;
pub mod logging;
