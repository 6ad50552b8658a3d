//! HTTP forum relay

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use echorelay_core::{ForumRelay, RelayError, UserId};

use crate::config::ForumConfig;

/// Posts channel traffic to the forum's chat-room endpoint as a form
pub struct HttpForumRelay {
    client: reqwest::Client,
    config: ForumConfig,
}

impl HttpForumRelay {
    pub fn new(config: ForumConfig) -> Result<Self, RelayError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| RelayError::Http(e.to_string()))?;
        Ok(Self { client, config })
    }
}

#[async_trait]
impl ForumRelay for HttpForumRelay {
    async fn post(&self, html_fragment: &str, user: UserId) -> Result<u16, RelayError> {
        let user = user.to_string();
        let form = [
            ("key", self.config.key.as_str()),
            ("msg", html_fragment),
            ("user", user.as_str()),
        ];
        let response = self
            .client
            .post(&self.config.url)
            .form(&form)
            .send()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            return Err(RelayError::Rejected { status });
        }
        debug!(status, "Forum accepted post");
        Ok(status)
    }
}
