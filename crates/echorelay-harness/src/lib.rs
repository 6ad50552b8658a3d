//! Echorelay Harness
//!
//! An in-process chat network for exercising the relay without a real chat
//! service: integration tests and the CLI's offline demo both run on it.

pub mod network;

pub use network::{LocalNetwork, LocalSession, Target, Transmission};
