//! Echorelay Runtime
//!
//! The moving parts of the relay built on top of `echorelay-core`:
//! - `DeliveryEngine`: acknowledged sends, pushes and admin broadcasts
//! - `AckWitness`: the second session that confirms deliveries by echo
//! - `RelayContext`: per-event handling for the primary session
//! - `RuntimeBuilder` / `RelayRuntime`: connecting, event loops and shutdown

pub mod delivery;
pub mod dispatch;
mod runtime;
pub mod witness;

pub use delivery::{DeliveryEngine, DeliveryOutcome, PUSH_ALL_SELECTOR};
pub use dispatch::RelayContext;
pub use runtime::{RelayRuntime, RuntimeBuilder};
pub use witness::AckWitness;

// Re-export core types for convenience
pub use echorelay_core::{
    ChatEvent, ChatSession, Clock, Destination, DestinationId, DestinationKind, EchorelayError,
    EchorelayResult, RelayConfig,
};
