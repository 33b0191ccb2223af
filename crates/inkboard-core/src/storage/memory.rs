//! In-memory storage implementation.

use super::{BoardStorage, BoxFuture, StorageError, StorageResult};
use crate::actor::ActorId;
use crate::board::{Board, BoardFields, BoardId, BoardRef};
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// In-memory storage for testing and ephemeral use.
///
/// Writes can be made to fail on demand to exercise error paths.
#[derive(Default)]
pub struct MemoryStorage {
    boards: RwLock<HashMap<BoardId, Board>>,
    fail_writes: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStorage {
    /// Create a new empty memory storage.
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent `write` fail (or succeed again).
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    /// Number of successful writes so far.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Stored copy of a board.
    pub fn get(&self, id: BoardId) -> Option<Board> {
        self.boards.read().ok()?.get(&id).cloned()
    }

    /// Put a board directly, bypassing `create` (seeding, remote edits).
    pub fn insert(&self, board: Board) {
        if let Ok(mut boards) = self.boards.write() {
            boards.insert(board.id, board);
        }
    }

    /// Drop a board directly (deleted elsewhere).
    pub fn remove(&self, id: BoardId) -> Option<Board> {
        self.boards.write().ok()?.remove(&id)
    }
}

impl BoardStorage for MemoryStorage {
    fn find(&self, reference: &BoardRef, actor: &ActorId) -> BoxFuture<'_, StorageResult<Option<Board>>> {
        let reference = reference.clone();
        let actor = actor.clone();
        Box::pin(async move {
            let boards = self.boards.read().map_err(|e| {
                StorageError::Other(format!("Lock error: {}", e))
            })?;
            Ok(boards.values().find(|b| b.matches(&reference, &actor)).cloned())
        })
    }

    fn create(&self, board: &Board) -> BoxFuture<'_, StorageResult<Board>> {
        let board = board.clone();
        Box::pin(async move {
            let mut boards = self.boards.write().map_err(|e| {
                StorageError::Other(format!("Lock error: {}", e))
            })?;
            boards.insert(board.id, board.clone());
            Ok(board)
        })
    }

    fn write(&self, id: BoardId, fields: &BoardFields) -> BoxFuture<'_, StorageResult<()>> {
        let fields = fields.clone();
        Box::pin(async move {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(StorageError::Io("write rejected".to_string()));
            }
            let mut boards = self.boards.write().map_err(|e| {
                StorageError::Other(format!("Lock error: {}", e))
            })?;
            let board = boards
                .get_mut(&id)
                .ok_or_else(|| StorageError::NotFound(id.to_string()))?;
            fields.apply_to(board);
            self.writes.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::items::Item;
    use kurbo::Point;
    use pollster::block_on;

    fn alice() -> ActorId {
        ActorId::from("alice")
    }

    #[test]
    fn test_create_and_find() {
        let storage = MemoryStorage::new();
        let board = Board::new(alice(), None);

        block_on(storage.create(&board)).unwrap();
        let found = block_on(storage.find(&BoardRef::Personal, &alice())).unwrap();

        assert_eq!(found.map(|b| b.id), Some(board.id));
    }

    #[test]
    fn test_find_missing() {
        let storage = MemoryStorage::new();
        let found = block_on(storage.find(&BoardRef::Project("nope".into()), &alice())).unwrap();
        assert!(found.is_none());
    }

    #[test]
    fn test_write_updates_columns() {
        let storage = MemoryStorage::new();
        let board = Board::new(alice(), None);
        block_on(storage.create(&board)).unwrap();

        let fields = BoardFields::items(vec![Item::note(Point::ZERO, "saved")], false);
        block_on(storage.write(board.id, &fields)).unwrap();

        assert_eq!(storage.get(board.id).unwrap().len(), 1);
        assert_eq!(storage.write_count(), 1);
    }

    #[test]
    fn test_write_unknown_board() {
        let storage = MemoryStorage::new();
        let result = block_on(storage.write(BoardId::new_v4(), &BoardFields::favorite(true)));
        assert!(matches!(result, Err(StorageError::NotFound(_))));
    }

    #[test]
    fn test_injected_write_failure() {
        let storage = MemoryStorage::new();
        let board = Board::new(alice(), None);
        block_on(storage.create(&board)).unwrap();

        storage.set_fail_writes(true);
        assert!(block_on(storage.write(board.id, &BoardFields::favorite(true))).is_err());
        assert_eq!(storage.write_count(), 0);
        assert!(!storage.get(board.id).unwrap().is_favorite);
    }
}
