//! Echorelay Core
//!
//! This crate provides the foundational pieces of the echorelay chat relay:
//! the destination data model, the shared caches (roster and pending-delivery set),
//! the inbound routing and ad-injection policies, and the collaborator traits
//! (`ChatSession`, `BackendAdapter`, `ForumRelay`) that the runtime drives.
//!
//! Nothing in here talks to the network directly. Transport, Q&A backends and the
//! forum relay are injected as trait objects so the whole relay can run against an
//! in-process harness.

// ----------------------------------------------------------------------------
// Module Declarations
// ----------------------------------------------------------------------------

pub mod ads;
pub mod backend;
pub mod clock;
pub mod config;
pub mod errors;
pub mod forum;
pub mod jitter;
pub mod pending;
pub mod roster;
pub mod routing;
pub mod session;
pub mod types;

// ----------------------------------------------------------------------------
// Public API
// ----------------------------------------------------------------------------

pub use ads::AdPolicy;
pub use backend::{strip_bot_prefix, BackendAdapter};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{AdConfig, DeliveryConfig, JitterConfig, PushConfig, RelayConfig};
pub use errors::{
    BackendError, ConfigError, EchorelayError, EchorelayResult, RelayError, SessionError,
    SessionResult,
};
pub use forum::ForumRelay;
pub use jitter::Jitter;
pub use pending::PendingDeliveries;
pub use roster::RosterCache;
pub use routing::{Classification, RouteDecision, Router};
pub use session::{create_event_channel, ChatEvent, ChatSession, EventReceiver, EventSender};
pub use types::{Destination, DestinationId, DestinationKind, InboundEvent, Timestamp, UserId};
