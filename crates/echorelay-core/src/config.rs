//! Relay configuration
//!
//! Every tunable of the relay lives here: bot identity texts, keyword routing,
//! the delivery-acknowledgment protocol, ad injection, jitter and push targeting.
//! All sections deserialize with `#[serde(default)]` so a configuration file only
//! needs to mention what it overrides.

use core::time::Duration;
use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

// ----------------------------------------------------------------------------
// Relay Configuration
// ----------------------------------------------------------------------------

/// Complete configuration for one relay instance
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Display name the bot answers to
    pub bot_name: String,
    /// Direct messages starting with this prefix are admin broadcasts
    pub admin_prefix: String,
    /// Keywords checked in order; the first case-insensitive hit wins
    pub keywords: Vec<String>,
    /// Reply for a keyword hit; `{keyword}` is replaced by the percent-encoded keyword
    pub keyword_reply_template: String,
    /// Reply used when the Q&A backend has nothing to say
    pub filler_reply: String,
    /// Auto-reply of the primary session to ordinary direct messages
    pub primary_intro: String,
    /// Auto-reply of the witness session to ordinary direct messages
    pub witness_intro: String,
    /// Seed for jitter and ad draws; entropy-seeded when absent
    pub rng_seed: Option<u64>,
    pub delivery: DeliveryConfig,
    pub ads: AdConfig,
    pub jitter: JitterConfig,
    pub push: PushConfig,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bot_name: "小薇".to_string(),
            admin_prefix: "#broadcast ".to_string(),
            keywords: Vec::new(),
            keyword_reply_template: "这里可能有该问题的答案： https://hacpai.com/search?key={keyword}"
                .to_string(),
            filler_reply: "嗯，让我想想……".to_string(),
            primary_intro: "你好，我是群聊问答机器人，在群里提到我的名字就可以和我聊天。"
                .to_string(),
            witness_intro: "你好，我是送达确认助手，只负责确认群消息已经送达。".to_string(),
            rng_seed: None,
            delivery: DeliveryConfig::default(),
            ads: AdConfig::default(),
            jitter: JitterConfig::default(),
            push: PushConfig::default(),
        }
    }
}

impl RelayConfig {
    /// Configuration tuned for deterministic tests: no jitter, no ads, fixed seed
    pub fn testing() -> Self {
        Self {
            rng_seed: Some(7),
            ads: AdConfig {
                probability: 0.0,
                ..AdConfig::default()
            },
            jitter: JitterConfig { min_ms: 0, max_ms: 0 },
            ..Self::default()
        }
    }

    /// Check invariants across all sections
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bot_name.trim().is_empty() {
            return Err(ConfigError::Missing {
                field: "bot_name".to_string(),
            });
        }
        if self.admin_prefix.is_empty() {
            return Err(ConfigError::Missing {
                field: "admin_prefix".to_string(),
            });
        }
        if !self.keyword_reply_template.contains("{keyword}") {
            return Err(ConfigError::invalid(
                "keyword_reply_template",
                "must contain the {keyword} placeholder",
            ));
        }
        self.delivery.validate()?;
        self.ads.validate()?;
        self.jitter.validate()?;
        self.push.validate()
    }
}

// ----------------------------------------------------------------------------
// Delivery Configuration
// ----------------------------------------------------------------------------

/// Send-with-acknowledgment protocol settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeliveryConfig {
    /// Run the witness session and the resend loop
    pub ack_enabled: bool,
    /// Resend attempts after the initial transmit
    pub max_resends: u32,
    /// Wait before each echo check
    pub retry_interval_ms: u64,
    /// Pending-set capacity per known destination
    pub pending_factor: usize,
    /// Sent to the destination when no echo was ever observed
    pub fallback_notice: String,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            ack_enabled: true,
            max_resends: 3,
            retry_interval_ms: 3_500,
            pending_factor: 5,
            fallback_notice: "【提示】送达确认助手不在本群，消息可能没有送达，请把确认账号拉进群。"
                .to_string(),
        }
    }
}

impl DeliveryConfig {
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_resends == 0 {
            return Err(ConfigError::invalid(
                "delivery.max_resends",
                "must be at least 1",
            ));
        }
        if self.pending_factor == 0 {
            return Err(ConfigError::invalid(
                "delivery.pending_factor",
                "must be at least 1",
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Ad Configuration
// ----------------------------------------------------------------------------

/// Promotional text injection settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdConfig {
    /// Chance that a reply is considered for an ad at all
    pub probability: f64,
    /// Minimum spacing between two ads in one destination
    pub window_secs: u64,
    /// Ordinary ad lines
    pub pool: Vec<String>,
    /// Self-promotion line, weighted above ordinary lines
    pub self_promotion: String,
    /// How many pool slots the self-promotion line occupies
    pub self_promotion_weight: usize,
    /// Inserted between the reply and the ad line
    pub separator: String,
}

impl Default for AdConfig {
    fn default() -> Self {
        Self {
            probability: 0.10,
            window_secs: 30 * 60,
            pool: vec![
                "黑客派社区：https://hacpai.com".to_string(),
                "Solo 博客系统：https://github.com/b3log/solo".to_string(),
            ],
            self_promotion: "想让我也加入你的群？欢迎私聊我～".to_string(),
            self_promotion_weight: 3,
            separator: "\n\n".to_string(),
        }
    }
}

impl AdConfig {
    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs)
    }

    /// Pool with the self-promotion line repeated by its weight
    pub fn weighted_pool(&self) -> Vec<String> {
        let mut pool = self.pool.clone();
        if !self.self_promotion.trim().is_empty() {
            for _ in 0..self.self_promotion_weight {
                pool.push(self.self_promotion.clone());
            }
        }
        pool
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.probability) {
            return Err(ConfigError::invalid(
                "ads.probability",
                "must be between 0 and 1",
            ));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Jitter Configuration
// ----------------------------------------------------------------------------

/// Random delay applied before each inbound unit of work
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct JitterConfig {
    pub min_ms: u64,
    pub max_ms: u64,
}

impl Default for JitterConfig {
    fn default() -> Self {
        Self {
            min_ms: 500,
            max_ms: 2_500,
        }
    }
}

impl JitterConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.min_ms > self.max_ms {
            return Err(ConfigError::invalid("jitter", "min_ms exceeds max_ms"));
        }
        Ok(())
    }
}

// ----------------------------------------------------------------------------
// Push Configuration
// ----------------------------------------------------------------------------

/// Targeting and pacing of externally triggered pushes
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PushConfig {
    /// `"*"` for every large group, or a comma-separated list of name fragments
    pub selector: String,
    /// Minimum member count for a group to be a `"*"` target
    pub member_threshold: usize,
    /// Pause between two pushed messages
    pub pause_ms: u64,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self {
            selector: "*".to_string(),
            member_threshold: 100,
            pause_ms: 10_000,
        }
    }
}

impl PushConfig {
    pub fn pause(&self) -> Duration {
        Duration::from_millis(self.pause_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        Ok(())
    }
}
