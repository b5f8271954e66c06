//! Core gateway engine: backends, their caches and limiters, and the registry

pub mod backend;
pub mod cache;
pub mod config;
pub mod errors;
pub mod limiter;
pub mod models;
pub mod provider;
pub mod registry;

#[cfg(test)]
pub(crate) mod testing;
