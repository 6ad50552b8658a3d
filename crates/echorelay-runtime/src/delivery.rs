//! Send-with-acknowledgment delivery
//!
//! The chat network accepts sends silently even when they never arrive. When
//! acknowledgment mode is on, every sent text is parked in the pending set and
//! re-sent on a fixed schedule until the witness session reports seeing it in a
//! channel. If it never does, the destination gets a single fallback notice.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

use echorelay_core::{
    ChatSession, Clock, DeliveryConfig, Destination, DestinationId, DestinationKind,
    PendingDeliveries, PushConfig, RosterCache,
};

/// Selector that targets every sufficiently large group
pub const PUSH_ALL_SELECTOR: &str = "*";

// ----------------------------------------------------------------------------
// Delivery Outcome
// ----------------------------------------------------------------------------

/// What happened to one `send`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeliveryOutcome {
    /// The destination was unknown even after a roster reload
    Unresolvable,
    /// Transmitted once, acknowledgment mode off
    Sent,
    /// The witness cleared the pending entry after `resends` resends
    Confirmed { resends: u32 },
    /// Every check found the entry still pending; the fallback notice went out
    Unconfirmed { resends: u32 },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Sent | DeliveryOutcome::Confirmed { .. })
    }
}

// ----------------------------------------------------------------------------
// Delivery Engine
// ----------------------------------------------------------------------------

/// Outbound path of the relay: acknowledged sends, pushes and admin broadcasts
pub struct DeliveryEngine {
    primary: Arc<dyn ChatSession>,
    roster: Arc<RosterCache>,
    pending: Arc<PendingDeliveries>,
    clock: Arc<dyn Clock>,
    delivery: DeliveryConfig,
    push: PushConfig,
    ack_enabled: AtomicBool,
}

impl DeliveryEngine {
    pub fn new(
        primary: Arc<dyn ChatSession>,
        roster: Arc<RosterCache>,
        pending: Arc<PendingDeliveries>,
        clock: Arc<dyn Clock>,
        delivery: DeliveryConfig,
        push: PushConfig,
    ) -> Self {
        let ack_enabled = AtomicBool::new(delivery.ack_enabled);
        Self {
            primary,
            roster,
            pending,
            clock,
            delivery,
            push,
            ack_enabled,
        }
    }

    pub fn ack_enabled(&self) -> bool {
        self.ack_enabled.load(Ordering::SeqCst)
    }

    /// Turn the resend protocol on or off for subsequent sends
    pub fn set_ack_enabled(&self, enabled: bool) {
        self.ack_enabled.store(enabled, Ordering::SeqCst);
    }

    pub fn roster(&self) -> &Arc<RosterCache> {
        &self.roster
    }

    pub fn pending(&self) -> &Arc<PendingDeliveries> {
        &self.pending
    }

    /// Send `text` to a destination, re-sending until the witness sees it
    ///
    /// Never fails: unknown destinations and transport errors are logged and
    /// reflected in the returned outcome only.
    pub async fn send(&self, id: DestinationId, kind: DestinationKind, text: &str) -> DeliveryOutcome {
        let destination = match self
            .roster
            .lookup_or_reload(self.primary.as_ref(), id, kind)
            .await
        {
            Some(destination) => destination,
            None => {
                warn!(%kind, destination = %id, "Destination not found, dropping message");
                return DeliveryOutcome::Unresolvable;
            }
        };

        self.transmit(&destination, text).await;
        if !self.ack_enabled() {
            return DeliveryOutcome::Sent;
        }

        let capacity = self.delivery.pending_factor * self.roster.total_count();
        for evicted in self.pending.insert(text, capacity) {
            debug!(capacity, "Evicted pending delivery: {}", evicted);
        }

        let max_resends = self.delivery.max_resends;
        let mut resends = 0;
        for attempt in 1..=max_resends {
            self.clock.sleep(self.delivery.retry_interval()).await;
            if !self.pending.contains(text) {
                break;
            }
            debug!(destination = %destination.id, attempt, "No echo yet, re-sending");
            self.transmit(&destination, text).await;
            resends += 1;
        }

        let outcome = if resends == max_resends {
            warn!(
                destination = %destination,
                resends, "Witness never confirmed delivery"
            );
            self.transmit(&destination, &self.delivery.fallback_notice)
                .await;
            DeliveryOutcome::Unconfirmed { resends }
        } else {
            DeliveryOutcome::Confirmed { resends }
        };
        self.pending.remove(text);
        outcome
    }

    /// Fire-and-forget send to every destination matched by `selector`
    ///
    /// Returns the number of destinations targeted.
    pub async fn push(&self, text: &str, selector: &str) -> usize {
        let targets = self.push_targets(selector).await;
        info!(selector, targets = targets.len(), "Pushing message");

        for (index, destination) in targets.iter().enumerate() {
            if index > 0 {
                self.clock.sleep(self.push.pause()).await;
            }
            self.transmit(destination, text).await;
        }
        targets.len()
    }

    /// Push using the configured selector
    pub async fn push_configured(&self, text: &str) -> usize {
        let selector = self.push.selector.clone();
        self.push(text, &selector).await
    }

    /// Acknowledged send of `text` to every known group, one after another
    pub async fn broadcast_admin(&self, text: &str) -> Vec<DeliveryOutcome> {
        let groups = self.roster.destinations(DestinationKind::Group);
        info!(groups = groups.len(), "Broadcasting admin message");

        let mut outcomes = Vec::with_capacity(groups.len());
        for group in groups {
            outcomes.push(self.send(group.id, group.kind, text).await);
        }
        outcomes
    }

    async fn push_targets(&self, selector: &str) -> Vec<Destination> {
        let selector = selector.trim();
        if selector == PUSH_ALL_SELECTOR {
            let mut targets = Vec::new();
            for group in self.roster.destinations(DestinationKind::Group) {
                match self.primary.group_member_count(group.id).await {
                    Ok(members) if members >= self.push.member_threshold => targets.push(group),
                    Ok(members) => {
                        debug!(destination = %group, members, "Group too small for push")
                    }
                    Err(e) => warn!(destination = %group, "Member count unavailable: {}", e),
                }
            }
            return targets;
        }

        let fragments: Vec<&str> = selector
            .split(',')
            .map(str::trim)
            .filter(|fragment| !fragment.is_empty())
            .collect();
        if fragments.is_empty() {
            return Vec::new();
        }

        DestinationKind::ALL
            .iter()
            .flat_map(|kind| self.roster.destinations(*kind))
            .filter(|destination| {
                fragments
                    .iter()
                    .any(|fragment| destination.display_name.contains(fragment))
            })
            .collect()
    }

    async fn transmit(&self, destination: &Destination, text: &str) {
        if let Err(e) = self.primary.send_to(destination, text).await {
            warn!(destination = %destination, "Transmission failed: {}", e);
        }
    }
}
