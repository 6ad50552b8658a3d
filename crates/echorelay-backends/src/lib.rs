//! Echorelay Backends
//!
//! HTTP collaborators of the relay: the closed set of question-answering
//! services the bot can delegate mentions to, and the forum relay that receives
//! a copy of channel traffic.

pub mod baidu;
pub mod config;
pub mod forum;
pub mod itpk;
pub mod qa;
pub mod turing;

pub use baidu::BaiduBackend;
pub use config::{BackendConfig, BaiduConfig, ForumConfig, ItpkConfig, TuringConfig};
pub use forum::HttpForumRelay;
pub use itpk::ItpkBackend;
pub use qa::QaBackend;
pub use turing::TuringBackend;
