//! Inbound message routing
//!
//! Decides whether a channel message deserves a chat reply and, if so, which
//! kind: a canned keyword answer or a delegated backend answer. Independently of
//! that, it prepares the cleaned text that is forwarded to the forum.

use regex::Regex;
use tracing::{debug, warn};

use crate::backend::BackendAdapter;
use crate::config::RelayConfig;
use crate::types::InboundEvent;

/// Characters that, in a long enough message, mark it as a question
const QUESTION_MARKERS: [&str; 3] = ["?", "？", "问"];

/// Minimum length (in characters, exclusive) for the question-marker rule
const QUESTION_MIN_CHARS: usize = 6;

// ----------------------------------------------------------------------------
// Classification
// ----------------------------------------------------------------------------

/// Reply class of an inbound channel message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classification {
    NoReply,
    /// A configured keyword matched; carries the keyword as configured
    KeywordHit(String),
    /// The bot was mentioned and no keyword matched
    MentionHit,
}

/// Everything the dispatcher needs to act on one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RouteDecision {
    pub classification: Classification,
    /// Chat reply, if any (never blank)
    pub reply: Option<String>,
    /// Emoticon-free text for the forum relay, if not blank
    pub forum_text: Option<String>,
}

// ----------------------------------------------------------------------------
// Router
// ----------------------------------------------------------------------------

pub struct Router {
    bot_name: String,
    keywords: Vec<String>,
    keyword_reply_template: String,
    filler_reply: String,
    emoticon: Regex,
}

impl Router {
    pub fn new(config: &RelayConfig) -> Self {
        let keywords = config
            .keywords
            .iter()
            .map(|keyword| keyword.trim().to_string())
            .filter(|keyword| !keyword.is_empty())
            .collect();

        Self {
            bot_name: config.bot_name.clone(),
            keywords,
            keyword_reply_template: config.keyword_reply_template.clone(),
            filler_reply: config.filler_reply.clone(),
            emoticon: Regex::new(r#"\["face",\d+\]"#).expect("emoticon pattern is valid"),
        }
    }

    pub fn bot_name(&self) -> &str {
        &self.bot_name
    }

    /// Whether a reply should be attempted at all
    pub fn is_eligible(&self, text: &str) -> bool {
        if text.contains(self.bot_name.as_str()) {
            return true;
        }
        text.chars().count() > QUESTION_MIN_CHARS
            && QUESTION_MARKERS.iter().any(|marker| text.contains(marker))
    }

    /// Classify a message; keyword hits take precedence over mentions
    pub fn classify(&self, text: &str) -> Classification {
        if !self.is_eligible(text) {
            return Classification::NoReply;
        }

        let lowered = text.to_lowercase();
        if let Some(keyword) = self
            .keywords
            .iter()
            .find(|keyword| lowered.contains(&keyword.to_lowercase()))
        {
            return Classification::KeywordHit(keyword.clone());
        }

        if text.contains(self.bot_name.as_str()) {
            Classification::MentionHit
        } else {
            Classification::NoReply
        }
    }

    pub fn keyword_reply(&self, keyword: &str) -> String {
        self.keyword_reply_template
            .replace("{keyword}", &urlencoding::encode(keyword))
    }

    /// Remove inline emoticon markup such as `["face",14]`
    pub fn strip_emoticons(&self, text: &str) -> String {
        self.emoticon.replace_all(text, "").into_owned()
    }

    /// Classify, produce the reply (consulting `backend` on a mention) and the
    /// forum text
    pub async fn route(&self, event: &InboundEvent, backend: &dyn BackendAdapter) -> RouteDecision {
        let classification = self.classify(&event.raw_text);

        let reply = match &classification {
            Classification::NoReply => None,
            Classification::KeywordHit(keyword) => Some(self.keyword_reply(keyword)),
            Classification::MentionHit => {
                let answer = match backend.chat(event.sender_id, &event.raw_text).await {
                    Ok(answer) => answer,
                    Err(e) => {
                        warn!(backend = backend.name(), "Backend failed: {}", e);
                        String::new()
                    }
                };
                if answer.trim().is_empty() {
                    Some(self.filler_reply.clone())
                } else {
                    Some(answer)
                }
            }
        };
        let reply = reply.filter(|text| !text.trim().is_empty());

        let cleaned = self.strip_emoticons(&event.raw_text);
        let forum_text = if cleaned.trim().is_empty() {
            None
        } else {
            Some(cleaned)
        };

        debug!(
            destination = %event.destination_id,
            ?classification,
            has_reply = reply.is_some(),
            "Routed inbound message"
        );

        RouteDecision {
            classification,
            reply,
            forum_text,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::BackendError;
    use crate::types::{DestinationId, DestinationKind, UserId};
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedBackend {
        answer: Result<String, BackendError>,
        calls: AtomicUsize,
    }

    impl CannedBackend {
        fn new(answer: Result<String, BackendError>) -> Self {
            Self {
                answer,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl BackendAdapter for CannedBackend {
        fn name(&self) -> &str {
            "canned"
        }

        async fn chat(&self, _user: UserId, _text: &str) -> Result<String, BackendError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.answer.clone()
        }
    }

    fn router(keywords: &[&str]) -> Router {
        let config = RelayConfig {
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
            ..RelayConfig::testing()
        };
        Router::new(&config)
    }

    fn event(text: &str) -> InboundEvent {
        InboundEvent::new(DestinationId::new(1), DestinationKind::Group, UserId::new(7), text)
    }

    #[test]
    fn test_keyword_beats_mention() {
        let router = router(&["价格"]);
        assert_eq!(
            router.classify("小薇价格多少"),
            Classification::KeywordHit("价格".to_string())
        );
    }

    #[test]
    fn test_keyword_match_is_case_insensitive_and_ordered() {
        let router = router(&["Rust", "rust 教程"]);
        assert_eq!(
            router.classify("有没有 RUST 教程推荐?"),
            Classification::KeywordHit("Rust".to_string())
        );
    }

    #[test]
    fn test_question_without_name_is_no_reply() {
        let router = router(&["价格"]);
        let text = "今天天气怎么样呢？";
        assert_eq!(text.chars().count(), 9);
        assert_eq!(router.classify(text), Classification::NoReply);
    }

    #[test]
    fn test_short_question_is_not_eligible() {
        let router = router(&["go"]);
        assert!(!router.is_eligible("go？"));
        assert_eq!(router.classify("go？"), Classification::NoReply);
    }

    #[test]
    fn test_mention_hit() {
        let router = router(&[]);
        assert_eq!(router.classify("小薇在吗"), Classification::MentionHit);
    }

    #[test]
    fn test_keyword_reply_is_percent_encoded() {
        let router = router(&["价格"]);
        let reply = router.keyword_reply("价格");
        assert!(reply.contains("%E4%BB%B7%E6%A0%BC"));
        assert!(!reply.contains("{keyword}"));
    }

    #[test]
    fn test_strip_emoticons() {
        let router = router(&[]);
        assert_eq!(
            router.strip_emoticons(r#"hi["face",14] there["face",2]"#),
            "hi there"
        );
        assert_eq!(router.strip_emoticons(r#"["face",1]"#), "");
    }

    #[tokio::test]
    async fn test_route_keyword_skips_backend() {
        let router = router(&["价格"]);
        let backend = CannedBackend::new(Ok("backend".to_string()));
        let decision = router.route(&event("小薇价格多少"), &backend).await;

        assert_eq!(decision.classification, Classification::KeywordHit("价格".to_string()));
        assert!(decision.reply.unwrap().contains("%E4%BB%B7%E6%A0%BC"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_route_mention_uses_backend_answer() {
        let router = router(&[]);
        let backend = CannedBackend::new(Ok("我很好".to_string()));
        let decision = router.route(&event("小薇你好吗"), &backend).await;
        assert_eq!(decision.reply.as_deref(), Some("我很好"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_route_blank_or_failed_backend_falls_back_to_filler() {
        let router = router(&[]);
        let filler = RelayConfig::testing().filler_reply;

        let blank = CannedBackend::new(Ok("   ".to_string()));
        let decision = router.route(&event("小薇你好吗"), &blank).await;
        assert_eq!(decision.reply.as_deref(), Some(filler.as_str()));

        let failing = CannedBackend::new(Err(BackendError::Http("down".to_string())));
        let decision = router.route(&event("小薇你好吗"), &failing).await;
        assert_eq!(decision.reply.as_deref(), Some(filler.as_str()));
    }

    #[tokio::test]
    async fn test_route_forwards_cleaned_text_without_reply() {
        let router = router(&["价格"]);
        let backend = CannedBackend::new(Ok("unused".to_string()));
        let decision = router
            .route(&event(r#"今天天气怎么样呢？["face",21]"#), &backend)
            .await;

        assert_eq!(decision.classification, Classification::NoReply);
        assert!(decision.reply.is_none());
        assert_eq!(decision.forum_text.as_deref(), Some("今天天气怎么样呢？"));
        assert_eq!(backend.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_route_emoticon_only_is_not_forwarded() {
        let router = router(&[]);
        let backend = CannedBackend::new(Ok(String::new()));
        let decision = router.route(&event(r#"["face",5]"#), &backend).await;
        assert!(decision.forum_text.is_none());
    }
}
