//! Configured Q&A backend
//!
//! `QaBackend` is the closed set of adapters a deployment can pick from; the
//! variant is fixed at startup from `BackendConfig`.

use async_trait::async_trait;
use std::time::Duration;
use tracing::info;

use echorelay_core::{BackendAdapter, BackendError, UserId};

use crate::baidu::BaiduBackend;
use crate::config::BackendConfig;
use crate::itpk::ItpkBackend;
use crate::turing::TuringBackend;

pub(crate) fn build_client(timeout_ms: u64) -> Result<reqwest::Client, BackendError> {
    reqwest::Client::builder()
        .timeout(Duration::from_millis(timeout_ms))
        .build()
        .map_err(http_error)
}

pub(crate) fn http_error(error: reqwest::Error) -> BackendError {
    BackendError::Http(error.to_string())
}

pub enum QaBackend {
    None,
    Turing(TuringBackend),
    Baidu(BaiduBackend),
    Itpk(ItpkBackend),
}

impl QaBackend {
    /// Build the adapter selected by `config`; answers address the bot as `bot_name`
    pub fn from_config(config: &BackendConfig, bot_name: &str) -> Result<Self, BackendError> {
        let backend = match config {
            BackendConfig::None => QaBackend::None,
            BackendConfig::Turing(turing) => {
                QaBackend::Turing(TuringBackend::new(turing.clone(), bot_name)?)
            }
            BackendConfig::Baidu(baidu) => {
                QaBackend::Baidu(BaiduBackend::new(baidu.clone(), bot_name)?)
            }
            BackendConfig::Itpk(itpk) => QaBackend::Itpk(ItpkBackend::new(itpk.clone(), bot_name)?),
        };
        info!(backend = backend.name(), "Q&A backend selected");
        Ok(backend)
    }
}

#[async_trait]
impl BackendAdapter for QaBackend {
    fn name(&self) -> &str {
        match self {
            QaBackend::None => "none",
            QaBackend::Turing(backend) => backend.name(),
            QaBackend::Baidu(backend) => backend.name(),
            QaBackend::Itpk(backend) => backend.name(),
        }
    }

    async fn chat(&self, user: UserId, text: &str) -> Result<String, BackendError> {
        match self {
            QaBackend::None => Ok(String::new()),
            QaBackend::Turing(backend) => backend.chat(user, text).await,
            QaBackend::Baidu(backend) => backend.chat(user, text).await,
            QaBackend::Itpk(backend) => backend.chat(user, text).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TuringConfig;

    #[tokio::test]
    async fn test_none_backend_is_silent() {
        let backend = QaBackend::from_config(&BackendConfig::None, "小薇").unwrap();
        assert_eq!(backend.name(), "none");
        assert_eq!(backend.chat(UserId::new(1), "小薇 你好").await.unwrap(), "");
    }

    #[test]
    fn test_turing_requires_key() {
        let config = BackendConfig::Turing(TuringConfig {
            api_url: "http://localhost".to_string(),
            key: " ".to_string(),
            timeout_ms: 100,
        });
        assert!(matches!(
            QaBackend::from_config(&config, "小薇"),
            Err(BackendError::NotConfigured { .. })
        ));
    }
}
