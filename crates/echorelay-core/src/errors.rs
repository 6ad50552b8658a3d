//! Error types for the echorelay relay
//!
//! Each collaborator boundary has its own error enum (chat transport, Q&A backend,
//! forum relay, configuration). `EchorelayError` unifies them for code that crosses
//! several boundaries, such as runtime startup.

// ----------------------------------------------------------------------------
// Specific Error Types
// ----------------------------------------------------------------------------

/// Failures reported by a chat-network session
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("Session {session} failed to connect: {reason}")]
    ConnectionFailed { session: String, reason: String },
    #[error("Session {session} is not connected")]
    NotConnected { session: String },
    #[error("Send to {target} failed: {reason}")]
    SendFailed { target: String, reason: String },
    #[error("Roster query failed: {reason}")]
    QueryFailed { reason: String },
    #[error("Unknown group {group}")]
    UnknownGroup { group: u64 },
    #[error("Session {session} is closed")]
    Closed { session: String },
}

/// Failures from a question-answering backend
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    #[error("Backend request failed: {0}")]
    Http(String),
    #[error("Backend returned status {status}")]
    Status { status: u16 },
    #[error("Backend response could not be parsed: {reason}")]
    InvalidResponse { reason: String },
    #[error("Backend is not configured: {reason}")]
    NotConfigured { reason: String },
}

/// Failures from the forum relay
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RelayError {
    #[error("Forum request failed: {0}")]
    Http(String),
    #[error("Forum rejected the post with status {status}")]
    Rejected { status: u16 },
}

/// Invalid configuration values
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: String, reason: String },
    #[error("Missing required value: {field}")]
    Missing { field: String },
}

// ----------------------------------------------------------------------------
// Unified Error
// ----------------------------------------------------------------------------

/// Top-level error type for the relay
#[derive(Debug, thiserror::Error)]
pub enum EchorelayError {
    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Backend error: {0}")]
    Backend(#[from] BackendError),

    #[error("Forum relay error: {0}")]
    Relay(#[from] RelayError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Runtime lifecycle misuse (double start, missing collaborator)
    #[error("Runtime error: {message}")]
    Runtime { message: String },
}

// ----------------------------------------------------------------------------
// Convenience Error Constructors
// ----------------------------------------------------------------------------

impl EchorelayError {
    /// Create a runtime lifecycle error
    pub fn runtime<T: Into<String>>(message: T) -> Self {
        EchorelayError::Runtime {
            message: message.into(),
        }
    }

    /// Create a configuration error for a field
    pub fn invalid_config<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        EchorelayError::Config(ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        })
    }
}

impl SessionError {
    /// Create a send failure for a target description
    pub fn send_failed<T: Into<String>, R: Into<String>>(target: T, reason: R) -> Self {
        SessionError::SendFailed {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl ConfigError {
    pub fn invalid<F: Into<String>, R: Into<String>>(field: F, reason: R) -> Self {
        ConfigError::InvalidValue {
            field: field.into(),
            reason: reason.into(),
        }
    }
}

// ----------------------------------------------------------------------------
// Type Aliases
// ----------------------------------------------------------------------------

pub type SessionResult<T> = core::result::Result<T, SessionError>;
pub type EchorelayResult<T> = core::result::Result<T, EchorelayError>;
