//! ITPK robot adapter
//!
//! Plain form POST; the answer is the response body minus its first character,
//! which the service always prefixes with a byte-order mark.

use async_trait::async_trait;
use tracing::debug;

use echorelay_core::{strip_bot_prefix, BackendAdapter, BackendError, UserId};

use crate::config::ItpkConfig;
use crate::qa::{build_client, http_error};

/// Answers requested per question
const ANSWER_LIMIT: &str = "8";

pub struct ItpkBackend {
    client: reqwest::Client,
    config: ItpkConfig,
    bot_name: String,
}

impl ItpkBackend {
    pub fn new(config: ItpkConfig, bot_name: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            config,
            bot_name: bot_name.into(),
        })
    }
}

#[async_trait]
impl BackendAdapter for ItpkBackend {
    fn name(&self) -> &str {
        "itpk"
    }

    async fn chat(&self, _user: UserId, text: &str) -> Result<String, BackendError> {
        let question = strip_bot_prefix(text, &self.bot_name).trim();
        if question.is_empty() {
            return Ok(String::new());
        }

        let form = [
            ("api_key", self.config.api_key.as_str()),
            ("limit", ANSWER_LIMIT),
            ("api_secret", self.config.api_secret.as_str()),
            ("question", question),
        ];
        let response = self
            .client
            .post(&self.config.api_url)
            .form(&form)
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        let body = response.text().await.map_err(http_error)?;
        let answer: String = body.chars().skip(1).collect();
        debug!(answer_len = answer.len(), "ITPK answered");
        Ok(answer)
    }
}
