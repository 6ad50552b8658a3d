//! Offline demo
//!
//! Runs the real relay (routing, ads, acknowledged delivery, pushes) against an
//! in-process network with a couple of seeded channels, then prints every
//! message the bot accounts sent.

use std::sync::Arc;
use std::time::Duration;
use tracing::info;

use echorelay_backends::{HttpForumRelay, QaBackend};
use echorelay_core::{DestinationId, DestinationKind, JitterConfig, UserId};
use echorelay_harness::{LocalNetwork, Target, Transmission};
use echorelay_runtime::RuntimeBuilder;

use crate::config::AppConfig;
use crate::error::Result;

const PRIMARY: UserId = UserId::new(10_001);
const WITNESS: UserId = UserId::new(10_002);
const MEMBER: UserId = UserId::new(20_001);
const ADMIN: UserId = UserId::new(20_002);

const SMALL_GROUP: u64 = 1_001;
const LARGE_GROUP: u64 = 1_002;
const DISCUSS: u64 = 2_001;

/// Shorten every delay so the demo finishes in a couple of seconds
fn make_fast(config: &mut AppConfig) {
    config.relay.jitter = JitterConfig {
        min_ms: 20,
        max_ms: 80,
    };
    config.relay.delivery.retry_interval_ms = 300;
    config.relay.push.pause_ms = 200;
}

/// Upper bound on how long the scripted traffic takes to settle
fn settle_time(config: &AppConfig) -> Duration {
    let relay = &config.relay;
    let one_send = relay.delivery.retry_interval() * (relay.delivery.max_resends + 1);
    Duration::from_millis(relay.jitter.max_ms) + one_send * 3 + Duration::from_millis(500)
}

pub async fn run(mut config: AppConfig, absent_witness: bool, fast: bool) -> Result<()> {
    if fast {
        make_fast(&mut config);
    }

    let network = LocalNetwork::new();
    network.add_group(SMALL_GROUP, "Rust 学习群", 50);
    network.add_group(LARGE_GROUP, "黑客派", 150);
    network.add_discuss(DISCUSS, "周末讨论组");
    if absent_witness {
        network.set_absent(WITNESS, DestinationKind::Group, DestinationId::new(SMALL_GROUP));
    }

    let backend = QaBackend::from_config(&config.backend, &config.relay.bot_name)?;
    let mut builder = RuntimeBuilder::new(config.relay.clone())
        .primary(Arc::new(network.session(PRIMARY, "primary")))
        .witness(Arc::new(network.session(WITNESS, "witness")))
        .backend(Arc::new(backend));
    if let Some(forum) = &config.forum {
        builder = builder.forum(Arc::new(HttpForumRelay::new(forum.clone())?));
    }
    let runtime = builder.build_and_start().await?;

    let bot_name = &config.relay.bot_name;
    let settle = settle_time(&config);
    info!(?settle, "Replaying demo traffic");

    network
        .post(
            DestinationKind::Group,
            DestinationId::new(LARGE_GROUP),
            MEMBER,
            &format!("{} 你好", bot_name),
        )
        .await;
    if let Some(keyword) = config.relay.keywords.first() {
        network
            .post(
                DestinationKind::Discuss,
                DestinationId::new(DISCUSS),
                MEMBER,
                &format!("{}，{}怎么样？", bot_name, keyword),
            )
            .await;
    }
    network
        .post(
            DestinationKind::Group,
            DestinationId::new(SMALL_GROUP),
            MEMBER,
            &format!("{}，有人在吗", bot_name),
        )
        .await;
    network.send_direct(PRIMARY, MEMBER, "你好").await;
    network.send_direct(WITNESS, MEMBER, "你好").await;
    tokio::time::sleep(settle).await;

    network
        .send_direct(
            PRIMARY,
            ADMIN,
            &format!("{}今晚八点服务器维护", config.relay.admin_prefix),
        )
        .await;
    tokio::time::sleep(settle).await;

    let pushed = runtime.push("新版本已发布").await;
    info!(pushed, "Push finished");

    runtime.shutdown().await;

    println!("{} message(s) sent by the bot accounts:", network.transmissions().len());
    for transmission in network.transmissions() {
        println!("{}", describe(&transmission));
    }
    Ok(())
}

fn describe(transmission: &Transmission) -> String {
    let from = if transmission.from == PRIMARY {
        "primary"
    } else if transmission.from == WITNESS {
        "witness"
    } else {
        "other"
    };
    let target = match &transmission.target {
        Target::Channel(kind, id) => format!("{} {}", kind, id),
        Target::Direct(user) => format!("user {}", user),
    };
    format!("[{} -> {}] {}", from, target, transmission.text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settle_time_covers_a_full_resend_cycle() {
        let config = AppConfig::default();
        assert!(settle_time(&config) >= Duration::from_millis(2_500 + 4 * 3_500));

        let mut fast = AppConfig::default();
        make_fast(&mut fast);
        assert!(settle_time(&fast) < Duration::from_secs(5));
    }

    #[test]
    fn test_describe_transmission() {
        let transmission = Transmission {
            from: PRIMARY,
            target: Target::Channel(DestinationKind::Group, DestinationId::new(SMALL_GROUP)),
            text: "hi".to_string(),
        };
        assert_eq!(describe(&transmission), "[primary -> group 1001] hi");
    }
}
