//! Roster cache of known destinations
//!
//! Holds the group and discussion lists fetched from the primary session plus a
//! per-destination "last ad injected" timestamp. A kind is only ever replaced
//! wholesale; there are no incremental updates.

use dashmap::DashMap;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{PoisonError, RwLock};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::errors::SessionResult;
use crate::session::ChatSession;
use crate::types::{Destination, DestinationId, DestinationKind, Timestamp};

type DestinationMap = HashMap<DestinationId, Destination>;

// ----------------------------------------------------------------------------
// Roster Cache
// ----------------------------------------------------------------------------

/// Concurrently readable cache of destinations and ad timestamps
#[derive(Debug, Default)]
pub struct RosterCache {
    groups: RwLock<DestinationMap>,
    discusses: RwLock<DestinationMap>,
    ad_stamps: DashMap<(DestinationKind, DestinationId), Timestamp>,
    group_reloads: AtomicU64,
    discuss_reloads: AtomicU64,
}

impl RosterCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn table(&self, kind: DestinationKind) -> &RwLock<DestinationMap> {
        match kind {
            DestinationKind::Group => &self.groups,
            DestinationKind::Discuss => &self.discusses,
        }
    }

    fn reload_counter(&self, kind: DestinationKind) -> &AtomicU64 {
        match kind {
            DestinationKind::Group => &self.group_reloads,
            DestinationKind::Discuss => &self.discuss_reloads,
        }
    }

    /// Cached lookup; never touches the network
    pub fn get(&self, id: DestinationId, kind: DestinationKind) -> Option<Destination> {
        self.table(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&id)
            .cloned()
    }

    /// Replace the cached set for `kind` with `destinations`
    ///
    /// Every ad timestamp of that kind goes back to zero.
    pub fn replace(&self, kind: DestinationKind, destinations: Vec<Destination>) {
        let fresh: DestinationMap = destinations
            .into_iter()
            .filter(|destination| destination.kind == kind)
            .map(|destination| (destination.id, destination))
            .collect();

        *self
            .table(kind)
            .write()
            .unwrap_or_else(PoisonError::into_inner) = fresh;
        self.ad_stamps.retain(|(stamp_kind, _), _| *stamp_kind != kind);
    }

    /// Fetch the full list for `kind` from the session and swap it in
    pub async fn reload(
        &self,
        session: &dyn ChatSession,
        kind: DestinationKind,
    ) -> SessionResult<usize> {
        self.reload_counter(kind).fetch_add(1, Ordering::SeqCst);
        let destinations = session.list(kind).await?;
        for destination in &destinations {
            info!("{}: {}", destination.display_name, destination.id);
        }
        let count = destinations.len();
        self.replace(kind, destinations);
        debug!(%kind, count, "Roster reloaded");
        Ok(count)
    }

    /// Cached lookup, falling back to exactly one reload of `kind` on a miss
    ///
    /// `None` after the reload is terminal for the caller's send.
    pub async fn lookup_or_reload(
        &self,
        session: &dyn ChatSession,
        id: DestinationId,
        kind: DestinationKind,
    ) -> Option<Destination> {
        if let Some(destination) = self.get(id, kind) {
            return Some(destination);
        }

        debug!(%kind, destination = %id, "Roster miss, reloading");
        if let Err(e) = self.reload(session, kind).await {
            warn!(%kind, "Roster reload failed: {}", e);
        }
        self.get(id, kind)
    }

    /// Snapshot of every cached destination of `kind`, ordered by id
    pub fn destinations(&self, kind: DestinationKind) -> Vec<Destination> {
        let mut destinations: Vec<Destination> = self
            .table(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect();
        destinations.sort_by_key(|destination| destination.id);
        destinations
    }

    pub fn count(&self, kind: DestinationKind) -> usize {
        self.table(kind)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Number of destinations across both kinds
    pub fn total_count(&self) -> usize {
        DestinationKind::ALL
            .iter()
            .map(|kind| self.count(*kind))
            .sum()
    }

    /// How many times `kind` has been reloaded (including failed attempts)
    pub fn reload_count(&self, kind: DestinationKind) -> u64 {
        self.reload_counter(kind).load(Ordering::SeqCst)
    }

    // ------------------------------------------------------------------------
    // Ad timestamps
    // ------------------------------------------------------------------------

    /// Last ad injection in a destination, `Timestamp::ZERO` if none since reload
    pub fn ad_stamp(&self, id: DestinationId, kind: DestinationKind) -> Timestamp {
        self.ad_stamps
            .get(&(kind, id))
            .map(|stamp| *stamp)
            .unwrap_or(Timestamp::ZERO)
    }

    /// Claim the ad slot of a destination if its window has elapsed
    ///
    /// Check and update happen under the destination's entry lock, so two
    /// concurrent replies to the same destination can't both win.
    pub fn try_claim_ad_slot(
        &self,
        id: DestinationId,
        kind: DestinationKind,
        now: Timestamp,
        window: Duration,
    ) -> bool {
        let mut stamp = self.ad_stamps.entry((kind, id)).or_insert(Timestamp::ZERO);
        if stamp.is_zero() || now.duration_since(*stamp) > window {
            *stamp = now;
            true
        } else {
            false
        }
    }
}
