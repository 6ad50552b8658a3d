//! Turing robot adapter

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use echorelay_core::{strip_bot_prefix, BackendAdapter, BackendError, UserId};

use crate::config::TuringConfig;
use crate::qa::{build_client, http_error};

#[derive(Debug, Serialize)]
struct TuringRequest<'a> {
    key: &'a str,
    info: &'a str,
    userid: String,
}

#[derive(Debug, Deserialize)]
struct TuringResponse {
    #[serde(default)]
    text: String,
}

pub struct TuringBackend {
    client: reqwest::Client,
    config: TuringConfig,
    bot_name: String,
}

impl TuringBackend {
    pub fn new(config: TuringConfig, bot_name: impl Into<String>) -> Result<Self, BackendError> {
        if config.key.trim().is_empty() {
            return Err(BackendError::NotConfigured {
                reason: "turing key is empty".to_string(),
            });
        }
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            config,
            bot_name: bot_name.into(),
        })
    }
}

#[async_trait]
impl BackendAdapter for TuringBackend {
    fn name(&self) -> &str {
        "turing"
    }

    async fn chat(&self, user: UserId, text: &str) -> Result<String, BackendError> {
        let question = strip_bot_prefix(text, &self.bot_name).trim();
        if question.is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .post(&self.config.api_url)
            .json(&TuringRequest {
                key: &self.config.key,
                info: question,
                userid: user.to_string(),
            })
            .send()
            .await
            .map_err(http_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Status {
                status: status.as_u16(),
            });
        }

        let body: TuringResponse = response.json().await.map_err(|e| {
            BackendError::InvalidResponse {
                reason: e.to_string(),
            }
        })?;
        debug!(answer_len = body.text.len(), "Turing answered");
        Ok(body.text)
    }
}
