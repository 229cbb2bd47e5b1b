//! Error types for clearinghouse
//!
//! One crate-level enum with per-concern variants; module-local errors
//! (`GatewayError`, `StoreError`, ...) convert in via `From`.

use crate::audit::AuditError;
use crate::gateway::GatewayError;
use crate::notify::NotifyError;
use crate::risk::RiskError;
use crate::store::StoreError;

/// Main error type for clearinghouse operations
#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("Gateway error: {0}")]
    Gateway(#[from] GatewayError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Audit error: {0}")]
    Audit(#[from] AuditError),

    #[error("Notification error: {0}")]
    Notify(#[from] NotifyError),

    #[error("Risk assessment error: {0}")]
    Risk(#[from] RiskError),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type alias for clearinghouse operations
pub type Result<T> = std::result::Result<T, CoreError>;
