pub mod backend;
pub mod config;
pub mod constant;
pub mod error;
mod opts;
pub mod protocol;
pub mod tokio;

pub use opts::{Credentials, Opts, Salt, ServerIdentity, Timeouts};

#[cfg(test)]
mod constant_test;
