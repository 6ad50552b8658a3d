//! Baidu assistant adapter
//!
//! The answer is JSON nested inside a JSON string:
//! `result_list[0].result_content` holds a document whose `answer` field is the
//! reply text.

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use echorelay_core::{strip_bot_prefix, BackendAdapter, BackendError, UserId};

use crate::config::BaiduConfig;
use crate::qa::{build_client, http_error};

/// The service's own assistant name, replaced by ours in answers
const VENDOR_BOT_NAME: &str = "小度";

pub struct BaiduBackend {
    client: reqwest::Client,
    config: BaiduConfig,
    bot_name: String,
}

impl BaiduBackend {
    pub fn new(config: BaiduConfig, bot_name: impl Into<String>) -> Result<Self, BackendError> {
        Ok(Self {
            client: build_client(config.timeout_ms)?,
            config,
            bot_name: bot_name.into(),
        })
    }

    fn request_url(&self, question: &str) -> String {
        format!(
            "{}?sample_name=bear_brain&request_query={}&bear_type=2",
            self.config.api_url,
            urlencoding::encode(question)
        )
    }
}

/// Pull the answer text out of a raw response document
pub fn extract_answer(body: &str) -> Result<String, BackendError> {
    let invalid = |reason: &str| BackendError::InvalidResponse {
        reason: reason.to_string(),
    };

    let document: Value =
        serde_json::from_str(body).map_err(|e| invalid(&e.to_string()))?;
    let content = document["result_list"][0]["result_content"]
        .as_str()
        .ok_or_else(|| invalid("missing result_list[0].result_content"))?;
    let inner: Value = serde_json::from_str(content).map_err(|e| invalid(&e.to_string()))?;
    inner["answer"]
        .as_str()
        .map(str::to_string)
        .ok_or_else(|| invalid("missing answer"))
}

#[async_trait]
impl BackendAdapter for BaiduBackend {
    fn name(&self) -> &str {
        "baidu"
    }

    async fn chat(&self, _user: UserId, text: &str) -> Result<String, BackendError> {
        let question = strip_bot_prefix(text, &self.bot_name).trim();
        if question.is_empty() {
            return Ok(String::new());
        }

        let response = self
            .client
            .post(self.request_url(question))
            .header(reqwest::header::COOKIE, &self.config.cookie)
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
        let answer = extract_answer(&body)?.replace(VENDOR_BOT_NAME, &self.bot_name);
        debug!(answer_len = answer.len(), "Baidu answered");
        Ok(answer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_nested_answer() {
        let body = r#"{"result_list":[{"result_content":"{\"answer\":\"小度在这里\"}"}]}"#;
        assert_eq!(extract_answer(body).unwrap(), "小度在这里");
    }

    #[test]
    fn test_extract_rejects_empty_result_list() {
        let err = extract_answer(r#"{"result_list":[]}"#).unwrap_err();
        assert!(matches!(err, BackendError::InvalidResponse { .. }));
        assert!(extract_answer("not json").is_err());
    }
}
