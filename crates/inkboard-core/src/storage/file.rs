//! File-based storage implementation for native platforms.

use super::{BoardStorage, BoxFuture, StorageError, StorageResult};
use crate::actor::ActorId;
use crate::board::{Board, BoardFields, BoardId, BoardRef};
use std::fs;
use std::path::{Path, PathBuf};

/// File-based storage for native platforms.
///
/// Stores each board as `<board-id>.json` in a directory.
pub struct FileStorage {
    /// Base directory for board files.
    base_path: PathBuf,
}

impl FileStorage {
    /// Create a new file storage with the given base directory.
    ///
    /// Creates the directory if it doesn't exist.
    pub fn new(base_path: PathBuf) -> StorageResult<Self> {
        if !base_path.exists() {
            fs::create_dir_all(&base_path).map_err(|e| {
                StorageError::Io(format!("Failed to create storage directory: {}", e))
            })?;
        }
        Ok(Self { base_path })
    }

    /// Create file storage in the default location.
    ///
    /// On Unix: `~/.local/share/<app_dir>/boards/`
    pub fn default_location(app_dir: &str) -> StorageResult<Self> {
        let base = dirs::data_local_dir()
            .or_else(dirs::home_dir)
            .ok_or_else(|| StorageError::Io("Could not determine home directory".to_string()))?;

        Self::new(base.join(app_dir).join("boards"))
    }

    fn board_path(&self, id: BoardId) -> PathBuf {
        self.base_path.join(format!("{}.json", id))
    }

    /// Get the base path.
    pub fn base_path(&self) -> &PathBuf {
        &self.base_path
    }

    fn read_board(path: &Path) -> StorageResult<Board> {
        let json = fs::read_to_string(path).map_err(|e| {
            StorageError::Io(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Board::from_json(&json).map_err(|e| {
            StorageError::Serialization(format!("Failed to parse {}: {}", path.display(), e))
        })
    }

    fn write_board(path: &Path, board: &Board) -> StorageResult<()> {
        let json = board
            .to_json()
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        fs::write(path, json).map_err(|e| {
            StorageError::Io(format!("Failed to write {}: {}", path.display(), e))
        })
    }

    fn scan(&self) -> StorageResult<Vec<Board>> {
        let entries = fs::read_dir(&self.base_path).map_err(|e| {
            StorageError::Io(format!("Failed to read directory: {}", e))
        })?;

        let mut boards = Vec::new();
        for entry in entries.flatten() {
            let path = entry.path();
            if path.extension().map(|e| e == "json").unwrap_or(false) {
                match Self::read_board(&path) {
                    Ok(board) => boards.push(board),
                    Err(e) => log::warn!("Skipping unreadable board file: {}", e),
                }
            }
        }
        Ok(boards)
    }
}

impl BoardStorage for FileStorage {
    fn find(&self, reference: &BoardRef, actor: &ActorId) -> BoxFuture<'_, StorageResult<Option<Board>>> {
        let reference = reference.clone();
        let actor = actor.clone();

        Box::pin(async move {
            if let BoardRef::Id(id) = reference {
                let path = self.board_path(id);
                if !path.exists() {
                    return Ok(None);
                }
                return Self::read_board(&path).map(Some);
            }

            let mut boards = self.scan()?;
            // Oldest first so repeated lookups resolve to the same board
            boards.sort_by_key(|b| b.created_at);
            Ok(boards.into_iter().find(|b| b.matches(&reference, &actor)))
        })
    }

    fn create(&self, board: &Board) -> BoxFuture<'_, StorageResult<Board>> {
        let board = board.clone();
        let path = self.board_path(board.id);

        Box::pin(async move {
            Self::write_board(&path, &board)?;
            Ok(board)
        })
    }

    fn write(&self, id: BoardId, fields: &BoardFields) -> BoxFuture<'_, StorageResult<()>> {
        let fields = fields.clone();
        let path = self.board_path(id);

        Box::pin(async move {
            if !path.exists() {
                return Err(StorageError::NotFound(id.to_string()));
            }
            let mut board = Self::read_board(&path)?;
            fields.apply_to(&mut board);
            Self::write_board(&path, &board)
        })
    }
}
