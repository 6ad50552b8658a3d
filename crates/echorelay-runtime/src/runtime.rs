//! Relay lifecycle
//!
//! [`RuntimeBuilder`] collects the collaborators, connects the sessions, loads the
//! rosters and spawns one event loop per session. Every inbound event is then
//! handled as its own tokio task after a random delay, so units of work run
//! concurrently and in no particular order.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use echorelay_core::{
    AdPolicy, BackendAdapter, ChatSession, Clock, DestinationKind, EchorelayError,
    EchorelayResult, EventReceiver, ForumRelay, Jitter, PendingDeliveries, RelayConfig,
    RosterCache, Router, SystemClock,
};

use crate::delivery::DeliveryEngine;
use crate::dispatch::RelayContext;
use crate::witness::AckWitness;

// ----------------------------------------------------------------------------
// Runtime Builder
// ----------------------------------------------------------------------------

/// Builder for a running relay
pub struct RuntimeBuilder {
    config: RelayConfig,
    primary: Option<Arc<dyn ChatSession>>,
    witness: Option<Arc<dyn ChatSession>>,
    backend: Option<Arc<dyn BackendAdapter>>,
    forum: Option<Arc<dyn ForumRelay>>,
    clock: Option<Arc<dyn Clock>>,
}

impl RuntimeBuilder {
    pub fn new(config: RelayConfig) -> Self {
        Self {
            config,
            primary: None,
            witness: None,
            backend: None,
            forum: None,
            clock: None,
        }
    }

    /// Session that receives traffic and sends every reply (required)
    pub fn primary(mut self, session: Arc<dyn ChatSession>) -> Self {
        self.primary = Some(session);
        self
    }

    /// Session used to observe echoes; without it acknowledgment mode is off
    pub fn witness(mut self, session: Arc<dyn ChatSession>) -> Self {
        self.witness = Some(session);
        self
    }

    /// Q&A backend consulted on mentions (required)
    pub fn backend(mut self, backend: Arc<dyn BackendAdapter>) -> Self {
        self.backend = Some(backend);
        self
    }

    pub fn forum(mut self, forum: Arc<dyn ForumRelay>) -> Self {
        self.forum = Some(forum);
        self
    }

    /// Override the time source; defaults to `SystemClock`
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Connect, load rosters and start handling events
    ///
    /// Fails only if the configuration is invalid, a required collaborator is
    /// missing or the primary session cannot connect.
    pub async fn build_and_start(self) -> EchorelayResult<RelayRuntime> {
        self.config.validate()?;
        let primary = self
            .primary
            .ok_or_else(|| EchorelayError::runtime("no primary session configured"))?;
        let backend = self
            .backend
            .ok_or_else(|| EchorelayError::runtime("no Q&A backend configured"))?;
        let clock = self
            .clock
            .unwrap_or_else(|| Arc::new(SystemClock::new()));

        info!(session = primary.label(), "Connecting primary session");
        let primary_events = primary.connect().await?;

        let roster = Arc::new(RosterCache::new());
        for kind in DestinationKind::ALL {
            match roster.reload(primary.as_ref(), kind).await {
                Ok(count) => info!(%kind, count, "Loaded destinations"),
                Err(e) => warn!(%kind, "Could not load destinations: {}", e),
            }
        }

        let witness = if self.config.delivery.ack_enabled {
            connect_witness(self.witness).await
        } else {
            debug!("Acknowledgment mode disabled, witness not started");
            None
        };

        let pending = Arc::new(PendingDeliveries::new());
        let engine = Arc::new(DeliveryEngine::new(
            primary.clone(),
            roster.clone(),
            pending,
            clock.clone(),
            self.config.delivery.clone(),
            self.config.push.clone(),
        ));
        engine.set_ack_enabled(witness.is_some());

        let config = self.config;
        let context = Arc::new(RelayContext {
            router: Router::new(&config),
            ads: AdPolicy::new(&config.ads, config.rng_seed),
            jitter: Jitter::new(&config.jitter, config.rng_seed.map(|seed| seed ^ 0x5eed)),
            primary: primary.clone(),
            roster,
            backend,
            forum: self.forum,
            engine: engine.clone(),
            clock,
            config,
        });

        let primary_task = tokio::spawn(run_primary_loop(context.clone(), primary_events));

        let (witness, witness_task) = match witness {
            Some((session, events)) => {
                let witness = Arc::new(AckWitness::new(
                    session,
                    engine.clone(),
                    context.config.witness_intro.clone(),
                    context.config.admin_prefix.clone(),
                ));
                let task = tokio::spawn(run_witness_loop(context.clone(), witness.clone(), events));
                (Some(witness), Some(task))
            }
            None => (None, None),
        };

        info!(
            destinations = context.roster.total_count(),
            ack = engine.ack_enabled(),
            "Relay started"
        );

        Ok(RelayRuntime {
            context,
            engine,
            witness,
            primary_task,
            witness_task,
        })
    }
}

async fn connect_witness(
    witness: Option<Arc<dyn ChatSession>>,
) -> Option<(Arc<dyn ChatSession>, EventReceiver)> {
    let Some(session) = witness else {
        warn!("No witness session configured, acknowledgment mode off");
        return None;
    };
    match session.connect().await {
        Ok(events) => {
            info!(session = session.label(), "Witness session connected");
            Some((session, events))
        }
        Err(e) => {
            error!("Witness session failed to connect, acknowledgment mode off: {}", e);
            None
        }
    }
}

// ----------------------------------------------------------------------------
// Event Loops
// ----------------------------------------------------------------------------

async fn run_primary_loop(context: Arc<RelayContext>, mut events: EventReceiver) {
    while let Some(event) = events.recv().await {
        let context = context.clone();
        tokio::spawn(async move {
            context.jitter.wait(context.clock.as_ref()).await;
            context.handle_primary_event(event).await;
        });
    }
    debug!("Primary event stream closed");
}

async fn run_witness_loop(
    context: Arc<RelayContext>,
    witness: Arc<AckWitness>,
    mut events: EventReceiver,
) {
    while let Some(event) = events.recv().await {
        let context = context.clone();
        let witness = witness.clone();
        tokio::spawn(async move {
            context.jitter.wait(context.clock.as_ref()).await;
            witness.handle_event(event).await;
        });
    }
    debug!("Witness event stream closed");
}

// ----------------------------------------------------------------------------
// Relay Runtime
// ----------------------------------------------------------------------------

/// Handle to a started relay
pub struct RelayRuntime {
    context: Arc<RelayContext>,
    engine: Arc<DeliveryEngine>,
    witness: Option<Arc<AckWitness>>,
    primary_task: JoinHandle<()>,
    witness_task: Option<JoinHandle<()>>,
}

impl RelayRuntime {
    pub fn engine(&self) -> &Arc<DeliveryEngine> {
        &self.engine
    }

    pub fn context(&self) -> &Arc<RelayContext> {
        &self.context
    }

    pub fn roster(&self) -> &Arc<RosterCache> {
        &self.context.roster
    }

    /// Whether sends currently run the resend protocol
    pub fn ack_enabled(&self) -> bool {
        self.engine.ack_enabled()
    }

    pub fn has_witness(&self) -> bool {
        self.witness.is_some()
    }

    /// Push `text` using the configured selector
    pub async fn push(&self, text: &str) -> usize {
        self.engine.push_configured(text).await
    }

    /// Stop the event loops and close both sessions
    ///
    /// Units of work already spawned are left to finish on their own.
    pub async fn shutdown(self) {
        self.primary_task.abort();
        if let Some(task) = self.witness_task {
            task.abort();
        }

        if let Err(e) = self.context.primary.close().await {
            warn!("Closing primary session failed: {}", e);
        }
        if let Some(witness) = self.witness {
            if let Err(e) = witness.session().close().await {
                warn!("Closing witness session failed: {}", e);
            }
        }
        info!("Relay stopped");
    }
}
