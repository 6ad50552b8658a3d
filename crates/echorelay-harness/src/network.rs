//! In-process chat network
//!
//! `LocalNetwork` keeps a set of channels and connected accounts. Every channel
//! message is fanned out to all other connected accounts that are present in the
//! channel, which is exactly what the witness session relies on. Loss, absence
//! and send failures can be switched on per account.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use tracing::{debug, trace};

use echorelay_core::{
    create_event_channel, ChatEvent, ChatSession, Destination, DestinationId, DestinationKind,
    EventReceiver, EventSender, InboundEvent, SessionError, SessionResult, UserId,
};

const EVENT_BUFFER_SIZE: usize = 256;

// ----------------------------------------------------------------------------
// Recorded Traffic
// ----------------------------------------------------------------------------

/// Where a transmission was addressed
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Target {
    Channel(DestinationKind, DestinationId),
    Direct(UserId),
}

/// One send accepted by the network
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transmission {
    pub from: UserId,
    pub target: Target,
    pub text: String,
}

// ----------------------------------------------------------------------------
// Network State
// ----------------------------------------------------------------------------

#[derive(Debug)]
struct ChannelState {
    destination: Destination,
    member_count: usize,
    absent: HashSet<UserId>,
}

#[derive(Debug, Default)]
struct NetworkState {
    channels: BTreeMap<(DestinationKind, DestinationId), ChannelState>,
    subscribers: HashMap<UserId, EventSender>,
    transmissions: Vec<Transmission>,
    muted: HashSet<UserId>,
    failing: HashSet<UserId>,
    list_calls: HashMap<DestinationKind, usize>,
}

impl NetworkState {
    /// Senders of every connected account that observes the channel, except `from`
    fn observers(&self, kind: DestinationKind, id: DestinationId, from: UserId) -> Vec<EventSender> {
        let absent = self
            .channels
            .get(&(kind, id))
            .map(|channel| channel.absent.clone())
            .unwrap_or_default();
        self.subscribers
            .iter()
            .filter(|(account, _)| **account != from && !absent.contains(account))
            .map(|(_, sender)| sender.clone())
            .collect()
    }
}

/// Shared handle to the simulated network
#[derive(Debug, Clone, Default)]
pub struct LocalNetwork {
    state: Arc<Mutex<NetworkState>>,
}

impl LocalNetwork {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, NetworkState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // ------------------------------------------------------------------------
    // Topology
    // ------------------------------------------------------------------------

    pub fn add_group(&self, id: u64, name: &str, member_count: usize) -> Destination {
        self.add_destination(Destination::group(id, name), member_count)
    }

    pub fn add_discuss(&self, id: u64, name: &str) -> Destination {
        self.add_destination(Destination::discuss(id, name), 0)
    }

    fn add_destination(&self, destination: Destination, member_count: usize) -> Destination {
        self.lock().channels.insert(
            (destination.kind, destination.id),
            ChannelState {
                destination: destination.clone(),
                member_count,
                absent: HashSet::new(),
            },
        );
        destination
    }

    pub fn remove_destination(&self, kind: DestinationKind, id: DestinationId) {
        self.lock().channels.remove(&(kind, id));
    }

    /// The account no longer observes messages in the channel
    pub fn set_absent(&self, account: UserId, kind: DestinationKind, id: DestinationId) {
        if let Some(channel) = self.lock().channels.get_mut(&(kind, id)) {
            channel.absent.insert(account);
        }
    }

    /// Sends from the account are accepted but silently never delivered
    pub fn mute(&self, account: UserId) {
        self.lock().muted.insert(account);
    }

    /// Sends from the account fail with a transport error
    pub fn fail_sends(&self, account: UserId, failing: bool) {
        let mut state = self.lock();
        if failing {
            state.failing.insert(account);
        } else {
            state.failing.remove(&account);
        }
    }

    /// Create a session for an account on this network
    pub fn session(&self, account: UserId, label: &str) -> LocalSession {
        LocalSession {
            network: self.clone(),
            account,
            label: label.to_string(),
            connected: AtomicBool::new(false),
        }
    }

    // ------------------------------------------------------------------------
    // Simulated human traffic
    // ------------------------------------------------------------------------

    /// A non-bot account posts in a channel
    pub async fn post(&self, kind: DestinationKind, id: DestinationId, sender: UserId, text: &str) {
        let observers = self.lock().observers(kind, id, sender);
        let event = ChatEvent::Channel(InboundEvent::new(id, kind, sender, text));
        for observer in observers {
            let _ = observer.send(event.clone()).await;
        }
    }

    /// A non-bot account sends a direct message to `account`
    pub async fn send_direct(&self, account: UserId, sender: UserId, text: &str) {
        let subscriber = self.lock().subscribers.get(&account).cloned();
        if let Some(subscriber) = subscriber {
            let _ = subscriber
                .send(ChatEvent::Direct {
                    sender_id: sender,
                    content: text.to_string(),
                })
                .await;
        }
    }

    // ------------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------------

    pub fn transmissions(&self) -> Vec<Transmission> {
        self.lock().transmissions.clone()
    }

    /// Texts sent into one channel, in order
    pub fn texts_in(&self, kind: DestinationKind, id: DestinationId) -> Vec<String> {
        self.lock()
            .transmissions
            .iter()
            .filter(|transmission| transmission.target == Target::Channel(kind, id))
            .map(|transmission| transmission.text.clone())
            .collect()
    }

    /// Texts sent directly to a user, in order
    pub fn texts_to(&self, user: UserId) -> Vec<String> {
        self.lock()
            .transmissions
            .iter()
            .filter(|transmission| transmission.target == Target::Direct(user))
            .map(|transmission| transmission.text.clone())
            .collect()
    }

    pub fn list_calls(&self, kind: DestinationKind) -> usize {
        self.lock().list_calls.get(&kind).copied().unwrap_or(0)
    }

    // ------------------------------------------------------------------------
    // Session plumbing
    // ------------------------------------------------------------------------

    fn subscribe(&self, account: UserId) -> EventReceiver {
        let (sender, receiver) = create_event_channel(EVENT_BUFFER_SIZE);
        self.lock().subscribers.insert(account, sender);
        receiver
    }

    fn unsubscribe(&self, account: UserId) {
        self.lock().subscribers.remove(&account);
    }

    fn list(&self, kind: DestinationKind) -> Vec<Destination> {
        let mut state = self.lock();
        *state.list_calls.entry(kind).or_insert(0) += 1;
        state
            .channels
            .values()
            .filter(|channel| channel.destination.kind == kind)
            .map(|channel| channel.destination.clone())
            .collect()
    }

    fn member_count(&self, id: DestinationId) -> Option<usize> {
        self.lock()
            .channels
            .get(&(DestinationKind::Group, id))
            .map(|channel| channel.member_count)
    }

    async fn transmit_to_channel(
        &self,
        from: UserId,
        kind: DestinationKind,
        id: DestinationId,
        text: &str,
    ) -> SessionResult<()> {
        let observers = {
            let mut state = self.lock();
            if state.failing.contains(&from) {
                return Err(SessionError::send_failed(
                    format!("{} {}", kind, id),
                    "simulated transport failure",
                ));
            }
            if !state.channels.contains_key(&(kind, id)) {
                return Err(SessionError::send_failed(
                    format!("{} {}", kind, id),
                    "no such channel",
                ));
            }
            state.transmissions.push(Transmission {
                from,
                target: Target::Channel(kind, id),
                text: text.to_string(),
            });
            if state.muted.contains(&from) {
                trace!(%from, "Dropping muted transmission");
                Vec::new()
            } else {
                state.observers(kind, id, from)
            }
        };

        let event = ChatEvent::Channel(InboundEvent::new(id, kind, from, text));
        for observer in observers {
            let _ = observer.send(event.clone()).await;
        }
        Ok(())
    }

    async fn transmit_direct(&self, from: UserId, to: UserId, text: &str) -> SessionResult<()> {
        let subscriber = {
            let mut state = self.lock();
            if state.failing.contains(&from) {
                return Err(SessionError::send_failed(
                    format!("user {}", to),
                    "simulated transport failure",
                ));
            }
            state.transmissions.push(Transmission {
                from,
                target: Target::Direct(to),
                text: text.to_string(),
            });
            if state.muted.contains(&from) {
                None
            } else {
                state.subscribers.get(&to).cloned()
            }
        };

        if let Some(subscriber) = subscriber {
            let _ = subscriber
                .send(ChatEvent::Direct {
                    sender_id: from,
                    content: text.to_string(),
                })
                .await;
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Local Session
// ----------------------------------------------------------------------------

/// `ChatSession` for one account on a `LocalNetwork`
#[derive(Debug)]
pub struct LocalSession {
    network: LocalNetwork,
    account: UserId,
    label: String,
    connected: AtomicBool,
}

impl LocalSession {
    pub fn account(&self) -> UserId {
        self.account
    }

    fn ensure_connected(&self) -> SessionResult<()> {
        if self.connected.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SessionError::NotConnected {
                session: self.label.clone(),
            })
        }
    }
}

#[async_trait]
impl ChatSession for LocalSession {
    fn label(&self) -> &str {
        &self.label
    }

    async fn connect(&self) -> SessionResult<EventReceiver> {
        let receiver = self.network.subscribe(self.account);
        self.connected.store(true, Ordering::SeqCst);
        debug!(session = %self.label, account = %self.account, "Local session connected");
        Ok(receiver)
    }

    async fn list_groups(&self) -> SessionResult<Vec<Destination>> {
        self.ensure_connected()?;
        Ok(self.network.list(DestinationKind::Group))
    }

    async fn list_discusses(&self) -> SessionResult<Vec<Destination>> {
        self.ensure_connected()?;
        Ok(self.network.list(DestinationKind::Discuss))
    }

    async fn send_to_group(&self, group: DestinationId, text: &str) -> SessionResult<()> {
        self.ensure_connected()?;
        self.network
            .transmit_to_channel(self.account, DestinationKind::Group, group, text)
            .await
    }

    async fn send_to_discuss(&self, discuss: DestinationId, text: &str) -> SessionResult<()> {
        self.ensure_connected()?;
        self.network
            .transmit_to_channel(self.account, DestinationKind::Discuss, discuss, text)
            .await
    }

    async fn send_direct(&self, user: UserId, text: &str) -> SessionResult<()> {
        self.ensure_connected()?;
        self.network.transmit_direct(self.account, user, text).await
    }

    async fn group_member_count(&self, group: DestinationId) -> SessionResult<usize> {
        self.ensure_connected()?;
        self.network
            .member_count(group)
            .ok_or(SessionError::UnknownGroup {
                group: group.value(),
            })
    }

    async fn close(&self) -> SessionResult<()> {
        self.network.unsubscribe(self.account);
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}
