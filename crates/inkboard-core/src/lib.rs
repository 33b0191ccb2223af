//! Inkboard Core Library
//!
//! Platform-agnostic editing engine for shared whiteboards: the live item
//! collection, per-collaborator undo/redo, debounced persistence, arrow
//! drawing mode and the storage, asset and change-feed seams.

pub mod actor;
pub mod assets;
pub mod board;
pub mod config;
pub mod drawing;
pub mod error;
pub mod feed;
pub mod history;
pub mod items;
pub mod session;
pub mod storage;
pub mod store;

pub use actor::{ActorAuthority, ActorId, IdentityResolver, LocalIdStore};
pub use assets::{AssetError, AssetRef, AssetStore, DataUrlAssets, MemoryAssets};
pub use board::{Board, BoardFields, BoardId, BoardRef};
pub use config::EngineConfig;
pub use drawing::{DrawingController, DrawingState};
pub use error::{EngineError, EngineResult, Notice, NoticeLevel};
pub use feed::{FeedEvent, FeedRegistry, LiveFeed, MemoryFeed, board_channel};
pub use history::{HistoryManager, HistoryPhase, MAX_HISTORY_FRAMES};
pub use items::{ArrowStyle, Item, ItemBody, ItemId, ItemKind, ItemPatch};
pub use session::Session;
pub use storage::{BoardStorage, MemoryStorage, PersistenceScheduler, StorageError};
pub use store::ItemStore;

#[cfg(not(target_arch = "wasm32"))]
pub use storage::FileStorage;
