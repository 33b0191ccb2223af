//! Engine errors and user-facing notices.

use crate::assets::AssetError;
use crate::items::ItemId;
use crate::storage::StorageError;
use thiserror::Error;

/// Errors surfaced at the engine boundary.
#[derive(Debug, Error)]
pub enum EngineError {
    /// No authoritative identity; callers fall back to a local id.
    #[error("Identity unavailable: {0}")]
    IdentityUnavailable(String),
    /// A durable write failed; in-memory state is kept and stays dirty.
    #[error("Persistence write failed: {0}")]
    PersistenceWriteFailed(#[source] StorageError),
    #[error("Item not found: {0}")]
    ItemNotFound(ItemId),
    /// Asset upload failed; no item was created.
    #[error("Upload failed: {0}")]
    UploadFailed(#[source] AssetError),
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Severity of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

/// Non-blocking, user-visible message produced by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }

    pub fn is_error(&self) -> bool {
        self.level == NoticeLevel::Error
    }
}

impl From<&EngineError> for Notice {
    fn from(err: &EngineError) -> Self {
        Notice::error(err.to_string())
    }
}
