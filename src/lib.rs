//! # Connect Four Showdown
//!
//! Client core for playing Connect Four against a remote policy/value model
//! served by interchangeable compute backends, with live latency telemetry.
//!
//! ## Modules
//!
//! - [`game`]: Board engine: moves, gravity, win/draw detection
//! - [`policy`]: Picks a legal column from a per-column score vector
//! - [`inference`]: HTTP contract with the inference service
//! - [`telemetry`]: Reconnecting WebSocket feed and rolling sample window
//! - [`orchestrator`]: Turn sequencing, hints and stale-reply rejection
//! - [`session`]: Event loop tying the match to the network
//! - [`config`]: TOML configuration loading and validation
//! - [`error`]: Structured error types
//! - [`logging`]: `tracing` subscriber setup

pub mod config;
pub mod error;
pub mod game;
pub mod inference;
pub mod logging;
pub mod orchestrator;
pub mod policy;
pub mod session;
pub mod telemetry;
