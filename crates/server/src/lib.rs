//! tabwright: capability-gated browser tools over a long-lived session.
//!
//! The dispatch core sits between a stream of discrete tool-call requests
//! and one stateful browser connection: it gates tool visibility by
//! capability, validates arguments structurally, serializes execution per
//! tab, tracks frame context and network activity, applies interception
//! rules, and runs each tool's declared synchronization before replying.

pub mod capability;
pub mod config;
pub mod error;
pub mod logging;
pub mod network;
pub mod pattern;
pub mod routes;
pub mod server;
pub mod session;
pub mod tools;

pub use error::{Error, Result};
