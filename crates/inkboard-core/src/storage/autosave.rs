//! Debounced persistence of the live board.
//!
//! Every dirty-marking mutation re-arms a fixed delay. When the delay expires
//! the serialized items are compared against the last confirmed write and at
//! most one durable write is produced. Writes are split into prepare
//! (`poll_due` / `flush_now`), the storage round trip, and `confirm` / `fail`,
//! so the board stays editable while a write is outstanding.

use crate::board::{Board, BoardFields, BoardId};
use crate::items::Item;

#[cfg(not(target_arch = "wasm32"))]
use std::time::{Duration, Instant};

#[cfg(target_arch = "wasm32")]
use web_time::{Duration, Instant};

/// Default quiet period before an automatic write, in seconds.
pub const DEFAULT_AUTOSAVE_DELAY_SECS: u64 = 10;

/// Cancellable fixed-delay timer.
#[derive(Debug, Clone)]
pub struct Debouncer {
    delay: Duration,
    deadline: Option<Instant>,
}

impl Debouncer {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            deadline: None,
        }
    }

    /// (Re)start the delay from `now`.
    pub fn arm(&mut self, now: Instant) {
        self.deadline = Some(now + self.delay);
    }

    pub fn cancel(&mut self) {
        self.deadline = None;
    }

    pub fn is_armed(&self) -> bool {
        self.deadline.is_some()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Disarm and return true if the deadline has passed.
    pub fn take_due(&mut self, now: Instant) -> bool {
        match self.deadline {
            Some(deadline) if now >= deadline => {
                self.deadline = None;
                true
            }
            _ => false,
        }
    }
}

/// A prepared durable write.
#[derive(Debug, Clone)]
pub struct PendingWrite {
    pub board_id: BoardId,
    pub fields: BoardFields,
    serialized: Option<String>,
}

impl PendingWrite {
    /// Serialized item list this write carries.
    pub fn serialized(&self) -> Option<&str> {
        self.serialized.as_deref()
    }
}

fn serialize_items(items: &[Item]) -> Option<String> {
    serde_json::to_string(items)
        .map_err(|e| log::warn!("Failed to serialize items: {}", e))
        .ok()
}

/// Tracks dirtiness and decides when the board must be written.
#[derive(Debug, Clone)]
pub struct PersistenceScheduler {
    debounce: Debouncer,
    dirty: bool,
    last_confirmed: Option<String>,
}

impl PersistenceScheduler {
    pub fn new(delay: Duration) -> Self {
        Self {
            debounce: Debouncer::new(delay),
            dirty: false,
            last_confirmed: None,
        }
    }

    /// Mark the live items as diverged and re-arm the delay.
    pub fn mark_dirty(&mut self, now: Instant) {
        self.dirty = true;
        self.debounce.arm(now);
    }

    /// Record `items` as what storage currently holds (after a load).
    pub fn mark_confirmed(&mut self, items: &[Item]) {
        self.last_confirmed = serialize_items(items);
        self.dirty = false;
        self.debounce.cancel();
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    pub fn is_armed(&self) -> bool {
        self.debounce.is_armed()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.debounce.deadline()
    }

    pub fn delay(&self) -> Duration {
        self.debounce.delay()
    }

    pub fn last_confirmed(&self) -> Option<&str> {
        self.last_confirmed.as_deref()
    }

    /// Cancel the pending automatic write (teardown, manual save).
    pub fn cancel(&mut self) {
        self.debounce.cancel();
    }

    /// Produce the automatic write once the delay has expired.
    ///
    /// Returns `None` before the deadline, when nothing is armed, or when the
    /// live items already match the last confirmed write.
    pub fn poll_due(&mut self, now: Instant, board: &Board) -> Option<PendingWrite> {
        if !self.debounce.take_due(now) {
            return None;
        }

        let serialized = serialize_items(&board.items);
        if serialized.is_some() && serialized == self.last_confirmed {
            log::debug!("Autosave skipped: board {} unchanged", board.id);
            self.dirty = false;
            return None;
        }

        Some(Self::prepare(board, serialized))
    }

    /// Produce an immediate write, cancelling any pending timer.
    pub fn flush_now(&mut self, board: &Board) -> PendingWrite {
        self.debounce.cancel();
        Self::prepare(board, serialize_items(&board.items))
    }

    fn prepare(board: &Board, serialized: Option<String>) -> PendingWrite {
        PendingWrite {
            board_id: board.id,
            fields: BoardFields::items(board.items.clone(), board.is_favorite),
            serialized,
        }
    }

    /// The write succeeded. Dirty stays set only if `live` moved on meanwhile.
    pub fn confirm(&mut self, write: &PendingWrite, live: &[Item]) {
        self.last_confirmed = write.serialized.clone();
        self.dirty = write.serialized.is_none() || serialize_items(live) != write.serialized;
    }

    /// The write failed. Dirty is kept; the next mutation or manual save retries.
    pub fn fail(&mut self, _write: &PendingWrite) {
        self.dirty = true;
    }
}

impl Default for PersistenceScheduler {
    fn default() -> Self {
        Self::new(Duration::from_secs(DEFAULT_AUTOSAVE_DELAY_SECS))
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::actor::ActorId;
    use kurbo::Point;

    fn board_with(texts: &[&str]) -> Board {
        let mut board = Board::new(ActorId::from("alice"), None);
        board.items = texts.iter().map(|t| Item::note(Point::ZERO, *t)).collect();
        board
    }

    fn secs(n: u64) -> Duration {
        Duration::from_secs(n)
    }

    #[test]
    fn test_debouncer_rearm_pushes_deadline() {
        let t0 = Instant::now();
        let mut debounce = Debouncer::new(secs(10));
        debounce.arm(t0);
        debounce.arm(t0 + secs(4));

        assert!(!debounce.take_due(t0 + secs(10)));
        assert!(debounce.take_due(t0 + secs(14)));
        assert!(!debounce.is_armed());
    }

    #[test]
    fn test_not_due_before_delay() {
        let t0 = Instant::now();
        let board = board_with(&["a"]);
        let mut scheduler = PersistenceScheduler::default();

        scheduler.mark_dirty(t0);
        assert!(scheduler.poll_due(t0 + secs(9), &board).is_none());
        assert!(scheduler.is_dirty());
        assert!(scheduler.is_armed());
    }

    #[test]
    fn test_one_write_per_idle_window() {
        let t0 = Instant::now();
        let board = board_with(&["a"]);
        let mut scheduler = PersistenceScheduler::default();

        scheduler.mark_dirty(t0);
        scheduler.mark_dirty(t0 + secs(6));

        assert!(scheduler.poll_due(t0 + secs(15), &board).is_none());
        let write = scheduler.poll_due(t0 + secs(16), &board);
        assert!(write.is_some());
        assert!(scheduler.poll_due(t0 + secs(30), &board).is_none());
    }

    #[test]
    fn test_unchanged_items_skip_write() {
        let t0 = Instant::now();
        let board = board_with(&["a"]);
        let mut scheduler = PersistenceScheduler::default();
        scheduler.mark_confirmed(&board.items);

        scheduler.mark_dirty(t0);
        assert!(scheduler.poll_due(t0 + secs(10), &board).is_none());
        assert!(!scheduler.is_dirty());
    }

    #[test]
    fn test_confirm_clears_dirty() {
        let t0 = Instant::now();
        let board = board_with(&["a"]);
        let mut scheduler = PersistenceScheduler::default();

        scheduler.mark_dirty(t0);
        let write = scheduler.poll_due(t0 + secs(10), &board).unwrap();
        scheduler.confirm(&write, &board.items);

        assert!(!scheduler.is_dirty());
        assert_eq!(scheduler.last_confirmed(), write.serialized());
    }

    #[test]
    fn test_confirm_keeps_dirty_when_live_moved_on() {
        let board = board_with(&["a"]);
        let mut scheduler = PersistenceScheduler::default();

        let write = scheduler.flush_now(&board);
        let moved_on = board_with(&["a", "b"]);
        scheduler.confirm(&write, &moved_on.items);

        assert!(scheduler.is_dirty());
    }

    #[test]
    fn test_failure_keeps_dirty_and_does_not_rearm() {
        let t0 = Instant::now();
        let board = board_with(&["a"]);
        let mut scheduler = PersistenceScheduler::default();

        scheduler.mark_dirty(t0);
        let write = scheduler.poll_due(t0 + secs(10), &board).unwrap();
        scheduler.fail(&write);

        assert!(scheduler.is_dirty());
        assert!(!scheduler.is_armed());
        assert_eq!(scheduler.last_confirmed(), None);
    }

    #[test]
    fn test_flush_now_cancels_timer() {
        let t0 = Instant::now();
        let board = board_with(&["a"]);
        let mut scheduler = PersistenceScheduler::default();
        scheduler.mark_confirmed(&board.items);

        scheduler.mark_dirty(t0);
        let write = scheduler.flush_now(&board);

        assert!(!scheduler.is_armed());
        assert_eq!(write.fields.items.as_ref().map(Vec::len), Some(1));
        assert!(scheduler.poll_due(t0 + secs(60), &board).is_none());
    }
}
