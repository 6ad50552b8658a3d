//! Question-answering backend interface

use async_trait::async_trait;

use crate::errors::BackendError;
use crate::types::UserId;

/// A Q&A service asked when the bot is mentioned
///
/// Exactly one adapter is active per deployment. An empty answer is valid and
/// means "nothing to say"; the router replaces it with the filler reply.
#[async_trait]
pub trait BackendAdapter: Send + Sync {
    /// Adapter name for logs
    fn name(&self) -> &str;

    async fn chat(&self, user: UserId, text: &str) -> Result<String, BackendError>;
}

/// Remove a leading mention of the bot so the backend sees only the question
///
/// Handles the bare name and the name followed by a space, an ASCII comma or a
/// full-width comma.
pub fn strip_bot_prefix<'a>(text: &'a str, bot_name: &str) -> &'a str {
    if bot_name.is_empty() {
        return text;
    }
    match text.strip_prefix(bot_name) {
        Some(rest) => rest
            .strip_prefix(' ')
            .or_else(|| rest.strip_prefix('，'))
            .or_else(|| rest.strip_prefix(','))
            .unwrap_or(rest),
        None => text,
    }
}
