//! Chat-network session abstraction
//!
//! The relay drives two independent sessions (primary and witness) through the
//! same `ChatSession` trait. Connecting a session yields a channel of
//! `ChatEvent`s; everything else is request/response.

use async_trait::async_trait;

use crate::errors::SessionResult;
use crate::types::{Destination, DestinationId, DestinationKind, InboundEvent, UserId};

// ----------------------------------------------------------------------------
// Events
// ----------------------------------------------------------------------------

/// Message delivered to a session by the chat network
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatEvent {
    /// One-to-one message addressed to this session's account
    Direct { sender_id: UserId, content: String },
    /// Message posted in a group or discussion the account belongs to
    Channel(InboundEvent),
}

impl ChatEvent {
    pub fn content(&self) -> &str {
        match self {
            ChatEvent::Direct { content, .. } => content,
            ChatEvent::Channel(event) => &event.raw_text,
        }
    }

    pub fn sender_id(&self) -> UserId {
        match self {
            ChatEvent::Direct { sender_id, .. } => *sender_id,
            ChatEvent::Channel(event) => event.sender_id,
        }
    }
}

pub type EventSender = tokio::sync::mpsc::Sender<ChatEvent>;
pub type EventReceiver = tokio::sync::mpsc::Receiver<ChatEvent>;

/// Create the bounded channel a session pushes its events into
pub fn create_event_channel(buffer_size: usize) -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::channel(buffer_size.max(1))
}

// ----------------------------------------------------------------------------
// Session Trait
// ----------------------------------------------------------------------------

/// One authenticated connection to the chat network
///
/// Sends are fire-and-forget at the transport level: `Ok(())` means the request
/// left this process, not that anyone received it.
#[async_trait]
pub trait ChatSession: Send + Sync {
    /// Short label used in logs ("primary", "witness")
    fn label(&self) -> &str;

    /// Authenticate and start receiving events
    async fn connect(&self) -> SessionResult<EventReceiver>;

    async fn list_groups(&self) -> SessionResult<Vec<Destination>>;

    async fn list_discusses(&self) -> SessionResult<Vec<Destination>>;

    async fn send_to_group(&self, group: DestinationId, text: &str) -> SessionResult<()>;

    async fn send_to_discuss(&self, discuss: DestinationId, text: &str) -> SessionResult<()>;

    async fn send_direct(&self, user: UserId, text: &str) -> SessionResult<()>;

    async fn group_member_count(&self, group: DestinationId) -> SessionResult<usize>;

    async fn close(&self) -> SessionResult<()>;

    /// List the destinations of one kind
    async fn list(&self, kind: DestinationKind) -> SessionResult<Vec<Destination>> {
        match kind {
            DestinationKind::Group => self.list_groups().await,
            DestinationKind::Discuss => self.list_discusses().await,
        }
    }

    /// Send to a destination of either kind
    async fn send_to(&self, destination: &Destination, text: &str) -> SessionResult<()> {
        match destination.kind {
            DestinationKind::Group => self.send_to_group(destination.id, text).await,
            DestinationKind::Discuss => self.send_to_discuss(destination.id, text).await,
        }
    }
}
