//! End-to-end relay behaviour on the in-process network
//!
//! These run on tokio's paused clock: sleeping the test task lets every jitter
//! delay and retry interval elapse instantly and in order.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

use echorelay_core::{BackendAdapter, BackendError, JitterConfig, UserId};
use echorelay_harness::{LocalNetwork, LocalSession};
use echorelay_runtime::{ChatSession, DestinationKind, RelayConfig, RelayRuntime, RuntimeBuilder};

const PRIMARY: UserId = UserId::new(1);
const WITNESS: UserId = UserId::new(2);
const HUMAN: UserId = UserId::new(3);

struct FixedBackend(&'static str);

#[async_trait]
impl BackendAdapter for FixedBackend {
    fn name(&self) -> &str {
        "fixed"
    }

    async fn chat(&self, _user: UserId, _text: &str) -> Result<String, BackendError> {
        Ok(self.0.to_string())
    }
}

fn config() -> RelayConfig {
    RelayConfig {
        jitter: JitterConfig::default(),
        ..RelayConfig::testing()
    }
}

struct Relay {
    network: LocalNetwork,
    primary: Arc<LocalSession>,
    witness: Arc<LocalSession>,
    runtime: RelayRuntime,
}

async fn start(network: LocalNetwork, config: RelayConfig, with_witness: bool) -> Relay {
    let primary = Arc::new(network.session(PRIMARY, "primary"));
    let witness = Arc::new(network.session(WITNESS, "witness"));

    let mut builder = RuntimeBuilder::new(config)
        .primary(primary.clone())
        .backend(Arc::new(FixedBackend("我在")));
    if with_witness {
        builder = builder.witness(witness.clone());
    }
    let runtime = builder.build_and_start().await.expect("relay starts");

    Relay {
        network,
        primary,
        witness,
        runtime,
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_secs(60)).await;
}

#[tokio::test(start_paused = true)]
async fn test_witnessed_reply_is_sent_once() {
    let network = LocalNetwork::new();
    let group = network.add_group(1, "rust", 30);
    let relay = start(network, config(), true).await;
    assert!(relay.runtime.ack_enabled());

    relay
        .network
        .post(group.kind, group.id, HUMAN, "小薇 在吗")
        .await;
    settle().await;

    assert_eq!(relay.network.texts_in(group.kind, group.id), vec!["我在"]);
    assert!(relay.runtime.engine().pending().is_empty());
    assert_eq!(relay.runtime.engine().pending().acknowledged_count(), 1);
}

#[tokio::test(start_paused = true)]
async fn test_absent_witness_triggers_resends_and_notice() {
    let network = LocalNetwork::new();
    let group = network.add_group(1, "rust", 30);
    network.set_absent(WITNESS, DestinationKind::Group, group.id);
    let relay = start(network, config(), true).await;

    relay
        .network
        .post(group.kind, group.id, HUMAN, "小薇 在吗")
        .await;
    settle().await;

    let texts = relay.network.texts_in(group.kind, group.id);
    assert_eq!(texts.len(), 5);
    assert!(texts[..4].iter().all(|text| text == "我在"));
    assert_eq!(texts[4], config().delivery.fallback_notice);
}

#[tokio::test(start_paused = true)]
async fn test_missing_witness_turns_ack_off() {
    let network = LocalNetwork::new();
    let group = network.add_group(1, "rust", 30);
    let relay = start(network, config(), false).await;
    assert!(!relay.runtime.ack_enabled());
    assert!(!relay.runtime.has_witness());

    relay
        .network
        .post(group.kind, group.id, HUMAN, "小薇 在吗")
        .await;
    settle().await;

    assert_eq!(relay.network.texts_in(group.kind, group.id), vec!["我在"]);
}

#[tokio::test(start_paused = true)]
async fn test_direct_messages_to_both_sessions() {
    let network = LocalNetwork::new();
    let first = network.add_group(1, "rust", 30);
    let second = network.add_group(2, "go", 30);
    let discuss = network.add_discuss(3, "chat");
    let config = config();
    let relay = start(network, config.clone(), true).await;

    relay.network.send_direct(PRIMARY, HUMAN, "hello").await;
    relay.network.send_direct(WITNESS, HUMAN, "hello").await;
    settle().await;

    let mut replies = relay.network.texts_to(HUMAN);
    replies.sort();
    let mut expected = vec![config.primary_intro.clone(), config.witness_intro.clone()];
    expected.sort();
    assert_eq!(replies, expected);

    relay
        .network
        .send_direct(PRIMARY, HUMAN, "#broadcast 今晚升级")
        .await;
    settle().await;

    assert_eq!(relay.network.texts_in(first.kind, first.id), vec!["今晚升级"]);
    assert_eq!(relay.network.texts_in(second.kind, second.id), vec!["今晚升级"]);
    assert!(relay.network.texts_in(discuss.kind, discuss.id).is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_push_uses_configured_selector() {
    let network = LocalNetwork::new();
    let small = network.add_group(1, "small", 50);
    let large = network.add_group(2, "large", 150);
    let relay = start(network, config(), true).await;

    assert_eq!(relay.runtime.push("update").await, 1);
    assert!(relay.network.texts_in(small.kind, small.id).is_empty());
    assert_eq!(relay.network.texts_in(large.kind, large.id), vec!["update"]);
}

#[tokio::test(start_paused = true)]
async fn test_startup_loads_rosters_and_shutdown_closes_sessions() {
    let network = LocalNetwork::new();
    network.add_group(1, "rust", 30);
    network.add_discuss(2, "chat");
    let relay = start(network, config(), true).await;

    assert_eq!(relay.runtime.roster().count(DestinationKind::Group), 1);
    assert_eq!(relay.runtime.roster().count(DestinationKind::Discuss), 1);

    let Relay {
        primary,
        witness,
        runtime,
        ..
    } = relay;
    runtime.shutdown().await;

    assert!(primary.list_groups().await.is_err());
    assert!(witness.list_groups().await.is_err());
}
