//! The live board and every mutation applied to it.

use crate::actor::ActorId;
use crate::board::Board;
use crate::config::EngineConfig;
use crate::history::HistoryManager;
use crate::items::{Item, ItemId, ItemPatch};
use crate::storage::{PendingWrite, PersistenceScheduler};
use kurbo::Point;

#[cfg(not(target_arch = "wasm32"))]
use std::time::Instant;

#[cfg(target_arch = "wasm32")]
use web_time::Instant;

/// Hit-test slack around item bounds, in canvas units.
pub const HIT_TOLERANCE: f64 = 4.0;

/// Sole owner of the live board.
///
/// Mutations are synchronous and immediately visible. Each one records a
/// history frame for the acting collaborator and re-arms autosave.
#[derive(Debug, Clone)]
pub struct ItemStore {
    board: Board,
    actor: ActorId,
    history: HistoryManager,
    persistence: PersistenceScheduler,
}

impl ItemStore {
    /// Take ownership of a freshly loaded board.
    pub fn new(board: Board, actor: ActorId, config: &EngineConfig) -> Self {
        let mut history = HistoryManager::new(config.history_depth());
        history.initialize(&actor, &board.items);

        let mut persistence = PersistenceScheduler::new(config.autosave_delay());
        persistence.mark_confirmed(&board.items);

        Self {
            board,
            actor,
            history,
            persistence,
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    /// Items in z-order (back to front).
    pub fn items(&self) -> &[Item] {
        &self.board.items
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.board.get_item(id)
    }

    pub fn actor(&self) -> &ActorId {
        &self.actor
    }

    pub fn history(&self) -> &HistoryManager {
        &self.history
    }

    pub fn persistence(&self) -> &PersistenceScheduler {
        &self.persistence
    }

    pub fn is_dirty(&self) -> bool {
        self.persistence.is_dirty()
    }

    /// Change the acting collaborator.
    pub fn switch_actor(&mut self, actor: ActorId) {
        if actor != self.actor {
            log::debug!("Acting collaborator changed to {}", actor);
            self.actor = actor;
        }
    }

    fn begin_mutation(&mut self) {
        self.history.ensure_actor(&self.actor, &self.board.items);
    }

    fn finish_mutation(&mut self) {
        self.history.record(&self.actor, &self.board.items);
        self.board.touch();
        self.persistence.mark_dirty(Instant::now());
    }

    /// Append an item on top of the board.
    pub fn add(&mut self, mut item: Item) -> ItemId {
        self.begin_mutation();

        if item.created_by.is_none() {
            item.created_by = Some(self.actor.clone());
        }
        if item.last_edited_by.is_none() {
            item.last_edited_by = Some(self.actor.clone());
        }
        let id = item.id();
        self.board.items.push(item);

        self.finish_mutation();
        id
    }

    /// Merge `patch` into an item. Returns false if the id is unknown.
    pub fn update(&mut self, id: ItemId, patch: &ItemPatch) -> bool {
        let Some(pos) = self.board.position_of(id) else {
            log::debug!("Update ignored: item {} not on board", id);
            return false;
        };
        self.begin_mutation();

        let item = &mut self.board.items[pos];
        item.apply(patch);
        item.last_edited_by = Some(self.actor.clone());

        self.finish_mutation();
        true
    }

    /// Delete an item. Returns the removed item, or `None` if the id is unknown.
    pub fn remove(&mut self, id: ItemId) -> Option<Item> {
        let Some(pos) = self.board.position_of(id) else {
            log::debug!("Remove ignored: item {} not on board", id);
            return None;
        };
        self.begin_mutation();
        let item = self.board.items.remove(pos);
        self.finish_mutation();
        Some(item)
    }

    /// Flip the favorite flag. Not part of history and not autosaved.
    pub fn toggle_favorite(&mut self) -> bool {
        self.board.is_favorite = !self.board.is_favorite;
        self.board.is_favorite
    }

    fn reorder(&mut self, id: ItemId, op: fn(&mut Board, ItemId) -> bool) -> bool {
        let before = self.board.items.clone();
        if !op(&mut self.board, id) {
            log::debug!("Reorder ignored for item {}", id);
            return false;
        }
        self.history.ensure_actor(&self.actor, &before);
        self.finish_mutation();
        true
    }

    /// Move an item to the front (topmost).
    pub fn bring_to_front(&mut self, id: ItemId) -> bool {
        self.reorder(id, Board::bring_to_front)
    }

    /// Move an item to the back (bottommost).
    pub fn send_to_back(&mut self, id: ItemId) -> bool {
        self.reorder(id, Board::send_to_back)
    }

    /// Move an item one layer forward (towards front).
    pub fn bring_forward(&mut self, id: ItemId) -> bool {
        self.reorder(id, Board::bring_forward)
    }

    /// Move an item one layer backward (towards back).
    pub fn send_backward(&mut self, id: ItemId) -> bool {
        self.reorder(id, Board::send_backward)
    }

    /// Items under a point, front to back.
    pub fn items_at_point(&self, point: Point) -> Vec<ItemId> {
        self.board.items_at_point(point, HIT_TOLERANCE)
    }

    /// Topmost item under a point.
    pub fn item_at_point(&self, point: Point) -> Option<ItemId> {
        self.items_at_point(point).into_iter().next()
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo(&self.actor)
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo(&self.actor)
    }

    /// Restore the acting collaborator's previous frame.
    /// Returns true if undo was performed, false if nothing to undo.
    pub fn undo(&mut self) -> bool {
        match self.history.begin_undo(&self.actor) {
            Some(items) => {
                self.apply_frame(items);
                true
            }
            None => false,
        }
    }

    /// Re-apply the acting collaborator's next frame.
    /// Returns true if redo was performed, false if nothing to redo.
    pub fn redo(&mut self) -> bool {
        match self.history.begin_redo(&self.actor) {
            Some(items) => {
                self.apply_frame(items);
                true
            }
            None => false,
        }
    }

    fn apply_frame(&mut self, items: Vec<Item>) {
        self.board.items = items;
        self.board.touch();
        self.persistence.mark_dirty(Instant::now());
        self.history.settle();
    }

    /// Swap in a board loaded from storage (remote change). History is kept.
    pub fn replace_board(&mut self, board: Board) {
        log::debug!("Replacing board {} with stored copy", board.id);
        self.persistence.mark_confirmed(&board.items);
        self.board = board;
    }

    /// The automatic write, once the autosave delay has elapsed.
    pub fn poll_autosave(&mut self, now: Instant) -> Option<PendingWrite> {
        self.persistence.poll_due(now, &self.board)
    }

    /// An immediate write of the current board, cancelling the timer.
    pub fn begin_save(&mut self) -> PendingWrite {
        self.persistence.flush_now(&self.board)
    }

    pub fn confirm_write(&mut self, write: &PendingWrite) {
        self.persistence.confirm(write, &self.board.items);
    }

    pub fn fail_write(&mut self, write: &PendingWrite) {
        self.persistence.fail(write);
    }

    pub fn cancel_autosave(&mut self) {
        self.persistence.cancel();
    }
}
