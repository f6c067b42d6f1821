//! Core of the FAQ chat agent.
//!
//! Framework-agnostic: the chat transport lives behind [`transport::TransportPort`],
//! implemented in adapter crates. Everything else (contact store, classifier,
//! session lifecycle, paced dispatcher, event bus) is here.

pub mod agent;
pub mod bus;
pub mod classifier;
pub mod clock;
pub mod config;
pub mod contacts;
pub mod dispatcher;
pub mod domain;
pub mod errors;
pub mod logging;
pub mod session;
pub mod transport;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use agent::{Agent, AgentStats};
pub use errors::{Error, Result};
