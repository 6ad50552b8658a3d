//! Primary-session event handling
//!
//! One inbound event is one unit of work: direct messages become admin
//! broadcasts or an auto-reply, channel messages go through routing, ad
//! injection and the forum relay before the reply is handed to the delivery
//! engine.

use std::sync::Arc;
use tracing::{debug, info, warn};

use echorelay_core::{
    AdPolicy, BackendAdapter, ChatEvent, ChatSession, Clock, ForumRelay, InboundEvent, Jitter,
    RelayConfig, RosterCache, Router, UserId,
};

use crate::delivery::{DeliveryEngine, DeliveryOutcome};

/// Everything a unit of work needs, owned by one relay instance
pub struct RelayContext {
    pub config: RelayConfig,
    pub primary: Arc<dyn ChatSession>,
    pub roster: Arc<RosterCache>,
    pub router: Router,
    pub ads: AdPolicy,
    pub jitter: Jitter,
    pub backend: Arc<dyn BackendAdapter>,
    pub forum: Option<Arc<dyn ForumRelay>>,
    pub engine: Arc<DeliveryEngine>,
    pub clock: Arc<dyn Clock>,
}

impl RelayContext {
    /// Handle one event received by the primary session
    pub async fn handle_primary_event(&self, event: ChatEvent) {
        match event {
            ChatEvent::Direct { sender_id, content } => {
                self.handle_direct(sender_id, &content).await;
            }
            ChatEvent::Channel(inbound) => {
                self.handle_channel(inbound).await;
            }
        }
    }

    async fn handle_direct(&self, sender: UserId, content: &str) {
        if let Some(command) = content.strip_prefix(self.config.admin_prefix.as_str()) {
            info!(%sender, "Admin broadcast requested");
            let outcomes = self.engine.broadcast_admin(command).await;
            let delivered = outcomes.iter().filter(|o| o.is_delivered()).count();
            info!(
                groups = outcomes.len(),
                delivered, "Admin broadcast finished"
            );
            return;
        }

        if let Err(e) = self
            .primary
            .send_direct(sender, &self.config.primary_intro)
            .await
        {
            warn!(%sender, "Auto-reply failed: {}", e);
        }
    }

    /// Route a channel message; returns the delivery outcome if a reply was sent
    pub async fn handle_channel(&self, inbound: InboundEvent) -> Option<DeliveryOutcome> {
        let decision = self.router.route(&inbound, self.backend.as_ref()).await;

        if let (Some(forum), Some(text)) = (&self.forum, decision.forum_text.as_deref()) {
            match forum.post(text, inbound.sender_id).await {
                Ok(status) => debug!(status, "Forwarded to forum"),
                Err(e) => warn!(sender = %inbound.sender_id, "Forum relay failed: {}", e),
            }
        }

        let reply = decision.reply?;
        let destination = match self
            .roster
            .lookup_or_reload(self.primary.as_ref(), inbound.destination_id, inbound.kind)
            .await
        {
            Some(destination) => destination,
            None => {
                warn!(
                    kind = %inbound.kind,
                    destination = %inbound.destination_id,
                    "Reply dropped, destination unknown"
                );
                return Some(DeliveryOutcome::Unresolvable);
            }
        };

        let reply = self
            .ads
            .apply(reply, &destination, &self.roster, self.clock.now());
        Some(
            self.engine
                .send(destination.id, destination.kind, &reply)
                .await,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use echorelay_core::{
        BackendError, DeliveryConfig, DestinationId, DestinationKind, ManualClock,
        PendingDeliveries, RelayError,
    };
    use echorelay_harness::{LocalNetwork, LocalSession};
    use std::sync::Mutex;

    const BOT: UserId = UserId::new(100);
    const HUMAN: UserId = UserId::new(7);

    struct EchoBackend;

    #[async_trait]
    impl BackendAdapter for EchoBackend {
        fn name(&self) -> &str {
            "echo"
        }

        async fn chat(&self, _user: UserId, text: &str) -> Result<String, BackendError> {
            Ok(format!("you said: {}", text))
        }
    }

    #[derive(Default)]
    struct RecordingForum {
        posts: Mutex<Vec<(String, UserId)>>,
        reject: bool,
    }

    #[async_trait]
    impl ForumRelay for RecordingForum {
        async fn post(&self, html_fragment: &str, user: UserId) -> Result<u16, RelayError> {
            self.posts
                .lock()
                .unwrap()
                .push((html_fragment.to_string(), user));
            if self.reject {
                Err(RelayError::Rejected { status: 500 })
            } else {
                Ok(200)
            }
        }
    }

    async fn context(
        network: &LocalNetwork,
        forum: Arc<RecordingForum>,
    ) -> (RelayContext, Arc<LocalSession>) {
        let config = RelayConfig {
            keywords: vec!["价格".to_string()],
            ..RelayConfig::testing()
        };
        let primary = Arc::new(network.session(BOT, "primary"));
        primary.connect().await.unwrap();
        let clock: Arc<dyn Clock> = Arc::new(ManualClock::new());
        let roster = Arc::new(RosterCache::new());
        let engine = Arc::new(DeliveryEngine::new(
            primary.clone(),
            roster.clone(),
            Arc::new(PendingDeliveries::new()),
            clock.clone(),
            DeliveryConfig {
                ack_enabled: false,
                ..DeliveryConfig::default()
            },
            config.push.clone(),
        ));

        let forum: Arc<dyn ForumRelay> = forum;
        let context = RelayContext {
            router: Router::new(&config),
            ads: AdPolicy::new(&config.ads, config.rng_seed),
            jitter: Jitter::new(&config.jitter, config.rng_seed),
            config,
            primary: primary.clone(),
            roster,
            backend: Arc::new(EchoBackend),
            forum: Some(forum),
            engine,
            clock,
        };
        (context, primary)
    }

    fn channel(id: u64, text: &str) -> InboundEvent {
        InboundEvent::new(DestinationId::new(id), DestinationKind::Group, HUMAN, text)
    }

    #[tokio::test]
    async fn test_mention_is_answered_and_forwarded() {
        let network = LocalNetwork::new();
        let group = network.add_group(1, "rust", 10);
        let forum = Arc::new(RecordingForum::default());
        let (context, _) = context(&network, forum.clone()).await;

        let outcome = context.handle_channel(channel(1, "小薇 在吗")).await;

        assert_eq!(outcome, Some(DeliveryOutcome::Sent));
        assert_eq!(
            network.texts_in(group.kind, group.id),
            vec!["you said: 小薇 在吗"]
        );
        assert_eq!(
            forum.posts.lock().unwrap().clone(),
            vec![("小薇 在吗".to_string(), HUMAN)]
        );
    }

    #[tokio::test]
    async fn test_unanswered_question_still_reaches_forum() {
        let network = LocalNetwork::new();
        let group = network.add_group(1, "rust", 10);
        let forum = Arc::new(RecordingForum::default());
        let (context, _) = context(&network, forum.clone()).await;

        let outcome = context
            .handle_channel(channel(1, r#"今天天气怎么样呢？["face",3]"#))
            .await;

        assert_eq!(outcome, None);
        assert!(network.texts_in(group.kind, group.id).is_empty());
        assert_eq!(forum.posts.lock().unwrap()[0].0, "今天天气怎么样呢？");
    }

    #[tokio::test]
    async fn test_forum_failure_does_not_block_reply() {
        let network = LocalNetwork::new();
        let group = network.add_group(1, "rust", 10);
        let forum = Arc::new(RecordingForum {
            reject: true,
            ..RecordingForum::default()
        });
        let (context, _) = context(&network, forum).await;

        let outcome = context.handle_channel(channel(1, "小薇价格多少")).await;

        assert_eq!(outcome, Some(DeliveryOutcome::Sent));
        let texts = network.texts_in(group.kind, group.id);
        assert_eq!(texts.len(), 1);
        assert!(texts[0].contains("%E4%BB%B7%E6%A0%BC"));
    }

    #[tokio::test]
    async fn test_unknown_channel_drops_reply_after_one_reload() {
        let network = LocalNetwork::new();
        let forum = Arc::new(RecordingForum::default());
        let (context, _) = context(&network, forum).await;

        let outcome = context.handle_channel(channel(9, "小薇 在吗")).await;

        assert_eq!(outcome, Some(DeliveryOutcome::Unresolvable));
        assert_eq!(context.roster.reload_count(DestinationKind::Group), 1);
        assert!(network.transmissions().is_empty());
    }

    #[tokio::test]
    async fn test_direct_messages() {
        let network = LocalNetwork::new();
        let group = network.add_group(1, "rust", 10);
        network.add_discuss(2, "chat");
        let forum = Arc::new(RecordingForum::default());
        let (context, primary) = context(&network, forum).await;
        context
            .roster
            .reload(primary.as_ref(), DestinationKind::Group)
            .await
            .unwrap();

        context
            .handle_primary_event(ChatEvent::Direct {
                sender_id: HUMAN,
                content: "hello".to_string(),
            })
            .await;
        assert_eq!(network.texts_to(HUMAN), vec![context.config.primary_intro.clone()]);

        context
            .handle_primary_event(ChatEvent::Direct {
                sender_id: HUMAN,
                content: "#broadcast 新版本发布".to_string(),
            })
            .await;
        assert_eq!(network.texts_in(group.kind, group.id), vec!["新版本发布"]);
        assert_eq!(network.transmissions().len(), 2);
    }
}
