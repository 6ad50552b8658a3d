//! Acknowledgment witness
//!
//! A second, independently authenticated session that sits in the same channels
//! as the primary one. Seeing a pending text come back in any channel is taken as
//! proof that it was delivered.

use std::sync::Arc;
use tracing::{debug, warn};

use echorelay_core::{ChatEvent, ChatSession, PendingDeliveries, UserId};

use crate::delivery::DeliveryEngine;

pub struct AckWitness {
    session: Arc<dyn ChatSession>,
    pending: Arc<PendingDeliveries>,
    engine: Arc<DeliveryEngine>,
    intro: String,
    admin_prefix: String,
}

impl AckWitness {
    pub fn new(
        session: Arc<dyn ChatSession>,
        engine: Arc<DeliveryEngine>,
        intro: impl Into<String>,
        admin_prefix: impl Into<String>,
    ) -> Self {
        Self {
            session,
            pending: engine.pending().clone(),
            engine,
            intro: intro.into(),
            admin_prefix: admin_prefix.into(),
        }
    }

    pub fn session(&self) -> &Arc<dyn ChatSession> {
        &self.session
    }

    /// React to one event seen by the witness session
    pub async fn handle_event(&self, event: ChatEvent) {
        match event {
            ChatEvent::Channel(inbound) => {
                // Content match only; the destination the echo came from is ignored.
                if self.pending.acknowledge(&inbound.raw_text) {
                    debug!(
                        destination = %inbound.destination_id,
                        kind = %inbound.kind,
                        "Echo observed, delivery confirmed"
                    );
                }
            }
            ChatEvent::Direct { sender_id, content } => {
                self.handle_direct(sender_id, &content).await;
            }
        }
    }

    async fn handle_direct(&self, sender: UserId, content: &str) {
        if let Some(command) = content.strip_prefix(self.admin_prefix.as_str()) {
            debug!(%sender, "Admin broadcast received by witness");
            self.engine.broadcast_admin(command).await;
            return;
        }

        if let Err(e) = self.session.send_direct(sender, &self.intro).await {
            warn!(%sender, "Witness auto-reply failed: {}", e);
        }
    }
}
