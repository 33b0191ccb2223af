//! Storage abstraction for board persistence.

mod autosave;
mod memory;

#[cfg(not(target_arch = "wasm32"))]
mod file;

pub use autosave::{Debouncer, PendingWrite, PersistenceScheduler, DEFAULT_AUTOSAVE_DELAY_SECS};
pub use memory::MemoryStorage;

#[cfg(not(target_arch = "wasm32"))]
pub use file::FileStorage;

use crate::actor::ActorId;
use crate::board::{Board, BoardFields, BoardId, BoardRef};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Storage errors.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Board not found: {0}")]
    NotFound(String),
    #[error("Serialization error: {0}")]
    Serialization(String),
    #[error("IO error: {0}")]
    Io(String),
    #[error("Storage error: {0}")]
    Other(String),
}

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Boxed future for async operations (compatible with WASM).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + 'a>>;

/// Durable board storage.
///
/// Single-row semantics without transactions: the last write wins.
///
/// Note: On native platforms, implementations must be Send + Sync.
/// On WASM, these bounds are relaxed since it's single-threaded.
#[cfg(not(target_arch = "wasm32"))]
pub trait BoardStorage: Send + Sync {
    /// Find the board answering `reference` for `actor`.
    fn find(&self, reference: &BoardRef, actor: &ActorId) -> BoxFuture<'_, StorageResult<Option<Board>>>;

    /// Insert a new board, returning the stored row.
    fn create(&self, board: &Board) -> BoxFuture<'_, StorageResult<Board>>;

    /// Overwrite the given columns of an existing board.
    fn write(&self, id: BoardId, fields: &BoardFields) -> BoxFuture<'_, StorageResult<()>>;
}

/// Durable board storage (WASM version without Send + Sync).
#[cfg(target_arch = "wasm32")]
pub trait BoardStorage {
    /// Find the board answering `reference` for `actor`.
    fn find(&self, reference: &BoardRef, actor: &ActorId) -> BoxFuture<'_, StorageResult<Option<Board>>>;

    /// Insert a new board, returning the stored row.
    fn create(&self, board: &Board) -> BoxFuture<'_, StorageResult<Board>>;

    /// Overwrite the given columns of an existing board.
    fn write(&self, id: BoardId, fields: &BoardFields) -> BoxFuture<'_, StorageResult<()>>;
}
