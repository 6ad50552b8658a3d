//! Forum relay interface

use async_trait::async_trait;

use crate::errors::RelayError;
use crate::types::UserId;

/// One-way sink that republishes chat content on the discussion forum
#[async_trait]
pub trait ForumRelay: Send + Sync {
    /// Post a cleaned chat fragment; returns the HTTP status on success
    async fn post(&self, html_fragment: &str, user: UserId) -> Result<u16, RelayError>;
}
