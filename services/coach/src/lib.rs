//! Englishly Coach Service
//!
//! Wires the coaching state machine to concrete collaborators: configuration
//! from the environment, a text-console dialogue layer backed by an
//! OpenAI-compatible chat model, a local room and the configured report store.
//! The `coach` binary is a thin wrapper around this library.

pub mod config;
pub mod console;
pub mod room;
pub mod runner;
