//! Backend and forum configuration
//!
//! The active Q&A backend is chosen by the `kind` tag:
//!
//! ```toml
//! [backend]
//! kind = "itpk"
//! api_key = "..."
//! api_secret = "..."
//! ```

use serde::{Deserialize, Serialize};

/// Request timeout applied when a section does not set one
pub const DEFAULT_TIMEOUT_MS: u64 = 5_000;

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

/// Which Q&A service answers mentions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum BackendConfig {
    /// No backend: every mention gets the filler reply
    #[default]
    None,
    Turing(TuringConfig),
    Baidu(BaiduConfig),
    Itpk(ItpkConfig),
}

impl BackendConfig {
    pub fn kind(&self) -> &'static str {
        match self {
            BackendConfig::None => "none",
            BackendConfig::Turing(_) => "turing",
            BackendConfig::Baidu(_) => "baidu",
            BackendConfig::Itpk(_) => "itpk",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TuringConfig {
    #[serde(default = "TuringConfig::default_api_url")]
    pub api_url: String,
    pub key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl TuringConfig {
    fn default_api_url() -> String {
        "http://www.tuling123.com/openapi/api".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BaiduConfig {
    #[serde(default = "BaiduConfig::default_api_url")]
    pub api_url: String,
    /// Session cookie sent with every request
    pub cookie: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl BaiduConfig {
    fn default_api_url() -> String {
        "https://sp0.baidu.com/yLsHczq6KgQFm2e88IuM_a/s".to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItpkConfig {
    #[serde(default = "ItpkConfig::default_api_url")]
    pub api_url: String,
    pub api_key: String,
    pub api_secret: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

impl ItpkConfig {
    fn default_api_url() -> String {
        "http://i.itpk.cn/api.php".to_string()
    }
}

/// Where channel traffic is mirrored
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForumConfig {
    pub url: String,
    /// Shared secret sent as the `key` form field
    pub key: String,
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_tag() {
        let config: BackendConfig = serde_json::from_str(
            r#"{"kind":"itpk","api_key":"k","api_secret":"s"}"#,
        )
        .unwrap();
        match &config {
            BackendConfig::Itpk(itpk) => {
                assert_eq!(itpk.api_url, "http://i.itpk.cn/api.php");
                assert_eq!(itpk.timeout_ms, DEFAULT_TIMEOUT_MS);
            }
            other => panic!("unexpected backend {:?}", other),
        }
        assert_eq!(config.kind(), "itpk");

        let none: BackendConfig = serde_json::from_str(r#"{"kind":"none"}"#).unwrap();
        assert_eq!(none, BackendConfig::None);
    }

    #[test]
    fn test_backend_from_toml() {
        let config: BackendConfig = toml::from_str(
            r#"
            kind = "baidu"
            cookie = "BAIDUID=abc"
            "#,
        )
        .unwrap();
        assert_eq!(config.kind(), "baidu");
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        assert!(serde_json::from_str::<BackendConfig>(r#"{"kind":"oracle"}"#).is_err());
    }
}
