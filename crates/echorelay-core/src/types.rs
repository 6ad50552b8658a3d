//! Core types for the echorelay relay
//!
//! Destinations, users and timestamps use newtype wrappers so that a group id can't
//! be passed where a user id is expected.

use core::fmt;
use core::time::Duration;
use serde::{Deserialize, Serialize};

// ----------------------------------------------------------------------------
// Identifiers
// ----------------------------------------------------------------------------

/// Identifier of a group-like or discussion-like channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DestinationId(u64);

impl DestinationId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for DestinationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a chat-network account
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct UserId(u64);

impl UserId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ----------------------------------------------------------------------------
// Destinations
// ----------------------------------------------------------------------------

/// The two kinds of multi-user channel on the chat network
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DestinationKind {
    Group,
    Discuss,
}

impl DestinationKind {
    pub const ALL: [DestinationKind; 2] = [DestinationKind::Group, DestinationKind::Discuss];
}

impl fmt::Display for DestinationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DestinationKind::Group => write!(f, "group"),
            DestinationKind::Discuss => write!(f, "discuss"),
        }
    }
}

/// A known channel, as listed by the chat network
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Destination {
    pub id: DestinationId,
    pub kind: DestinationKind,
    pub display_name: String,
}

impl Destination {
    pub fn new<N: Into<String>>(id: DestinationId, kind: DestinationKind, display_name: N) -> Self {
        Self {
            id,
            kind,
            display_name: display_name.into(),
        }
    }

    pub fn group<N: Into<String>>(id: u64, display_name: N) -> Self {
        Self::new(DestinationId::new(id), DestinationKind::Group, display_name)
    }

    pub fn discuss<N: Into<String>>(id: u64, display_name: N) -> Self {
        Self::new(DestinationId::new(id), DestinationKind::Discuss, display_name)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{} {}]", self.display_name, self.kind, self.id)
    }
}

// ----------------------------------------------------------------------------
// Inbound Event
// ----------------------------------------------------------------------------

/// A message observed in a group or discussion channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundEvent {
    pub destination_id: DestinationId,
    pub kind: DestinationKind,
    pub sender_id: UserId,
    pub raw_text: String,
}

impl InboundEvent {
    pub fn new<T: Into<String>>(
        destination_id: DestinationId,
        kind: DestinationKind,
        sender_id: UserId,
        raw_text: T,
    ) -> Self {
        Self {
            destination_id,
            kind,
            sender_id,
            raw_text: raw_text.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Timestamp
// ----------------------------------------------------------------------------

/// Monotonic milliseconds on a `Clock`'s timeline
///
/// `Timestamp::ZERO` doubles as "never", which is what the ad-throttling window
/// treats as always eligible.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Timestamp(u64);

impl Timestamp {
    pub const ZERO: Self = Self(0);

    pub const fn new(millis: u64) -> Self {
        Self(millis)
    }

    pub fn as_millis(&self) -> u64 {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Elapsed time since an earlier timestamp (saturating)
    pub fn duration_since(&self, earlier: Self) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }

    pub fn saturating_add(&self, duration: Duration) -> Self {
        Self(self.0.saturating_add(duration.as_millis() as u64))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timestamp_duration_saturates() {
        let early = Timestamp::new(1_000);
        let late = Timestamp::new(4_500);
        assert_eq!(late.duration_since(early), Duration::from_millis(3_500));
        assert_eq!(early.duration_since(late), Duration::ZERO);
        assert!(Timestamp::default().is_zero());
    }

    #[test]
    fn test_destination_display() {
        let dest = Destination::group(42, "Rust 中文");
        assert_eq!(dest.to_string(), "Rust 中文 [group 42]");
        assert_eq!(dest.kind, DestinationKind::Group);
    }
}
