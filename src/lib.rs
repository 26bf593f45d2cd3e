// Caching HTTP proxy library

pub mod cache;
pub mod config;
pub mod constants;
pub mod error;
pub mod logging;
pub mod pipeline;
pub mod proxy;
pub mod server;
