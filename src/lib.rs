pub mod cache;
pub mod config;
pub mod domain;
pub mod messaging;
pub mod metrics;
pub mod store;
pub mod utils;

#[cfg(test)]
mod testing;
