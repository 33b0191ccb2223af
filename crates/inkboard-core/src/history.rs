//! Per-actor undo/redo history.
//!
//! Each actor owns an independent stack of item snapshots, so one
//! collaborator's undo only ever walks back through their own edits.
//! Replaying a frame is bracketed by an explicit phase: while the live items
//! are being replaced (`HistoryPhase::Applying`) recording is suppressed.

use crate::actor::ActorId;
use crate::items::Item;
use std::collections::{HashMap, VecDeque};

/// Maximum number of frames kept per actor.
pub const MAX_HISTORY_FRAMES: usize = 50;

/// An immutable, independently owned copy of the item collection.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    items: Vec<Item>,
}

impl Snapshot {
    pub fn capture(items: &[Item]) -> Self {
        Self {
            items: items.to_vec(),
        }
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    /// Fresh copy of the snapshot's items.
    pub fn to_items(&self) -> Vec<Item> {
        self.items.clone()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Whether a history replay is currently replacing the live items.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HistoryPhase {
    #[default]
    Normal,
    Applying,
}

/// One actor's frames and cursor.
///
/// Invariant: `cursor < frames.len()` and `frames.len() >= 1`.
#[derive(Debug, Clone)]
pub struct ActorHistory {
    frames: VecDeque<Snapshot>,
    cursor: usize,
}

impl ActorHistory {
    fn seeded(snapshot: Snapshot) -> Self {
        Self {
            frames: VecDeque::from([snapshot]),
            cursor: 0,
        }
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn frames(&self) -> impl Iterator<Item = &Snapshot> {
        self.frames.iter()
    }

    /// Frame the cursor points at.
    pub fn current(&self) -> Option<&Snapshot> {
        self.frames.get(self.cursor)
    }

    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.frames.len()
    }

    fn push(&mut self, snapshot: Snapshot, max_frames: usize) {
        self.frames.truncate(self.cursor + 1);
        self.frames.push_back(snapshot);
        while self.frames.len() > max_frames {
            self.frames.pop_front();
        }
        self.cursor = self.frames.len() - 1;
    }

    fn step_back(&mut self) -> Option<&Snapshot> {
        if !self.can_undo() {
            return None;
        }
        self.cursor -= 1;
        self.frames.get(self.cursor)
    }

    fn step_forward(&mut self) -> Option<&Snapshot> {
        if !self.can_redo() {
            return None;
        }
        self.cursor += 1;
        self.frames.get(self.cursor)
    }
}

/// Undo/redo stacks keyed by actor.
#[derive(Debug, Clone)]
pub struct HistoryManager {
    histories: HashMap<ActorId, ActorHistory>,
    phase: HistoryPhase,
    max_frames: usize,
    initialized: bool,
}

impl Default for HistoryManager {
    fn default() -> Self {
        Self::new(MAX_HISTORY_FRAMES)
    }
}

impl HistoryManager {
    pub fn new(max_frames: usize) -> Self {
        Self {
            histories: HashMap::new(),
            phase: HistoryPhase::Normal,
            max_frames: max_frames.max(1),
            initialized: false,
        }
    }

    pub fn max_frames(&self) -> usize {
        self.max_frames
    }

    pub fn phase(&self) -> HistoryPhase {
        self.phase
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Seed `actor`'s history with the loaded items. Happens at most once;
    /// later calls (board reloads) are ignored and return false.
    pub fn initialize(&mut self, actor: &ActorId, items: &[Item]) -> bool {
        if self.initialized {
            return false;
        }
        self.histories
            .insert(actor.clone(), ActorHistory::seeded(Snapshot::capture(items)));
        self.initialized = true;
        true
    }

    /// Give an actor without history a base frame of `items`.
    ///
    /// Called with the pre-mutation items so the actor's first undo returns to
    /// the board they were looking at.
    pub fn ensure_actor(&mut self, actor: &ActorId, items: &[Item]) {
        if !self.histories.contains_key(actor) {
            self.histories
                .insert(actor.clone(), ActorHistory::seeded(Snapshot::capture(items)));
        }
    }

    /// Append a frame for `actor`, discarding any redo tail.
    ///
    /// No-op while a replay is applying. Returns whether a frame was recorded.
    pub fn record(&mut self, actor: &ActorId, items: &[Item]) -> bool {
        if self.phase == HistoryPhase::Applying {
            log::debug!("History record suppressed during replay");
            return false;
        }

        let snapshot = Snapshot::capture(items);
        match self.histories.get_mut(actor) {
            Some(history) => history.push(snapshot, self.max_frames),
            None => {
                self.histories
                    .insert(actor.clone(), ActorHistory::seeded(snapshot));
            }
        }
        true
    }

    /// Step `actor` back one frame and enter the applying phase.
    ///
    /// Returns a fresh copy of the target frame; the caller replaces the live
    /// items with it and then calls [`settle`](Self::settle).
    pub fn begin_undo(&mut self, actor: &ActorId) -> Option<Vec<Item>> {
        let items = self.histories.get_mut(actor)?.step_back()?.to_items();
        self.phase = HistoryPhase::Applying;
        Some(items)
    }

    /// Step `actor` forward one frame and enter the applying phase.
    pub fn begin_redo(&mut self, actor: &ActorId) -> Option<Vec<Item>> {
        let items = self.histories.get_mut(actor)?.step_forward()?.to_items();
        self.phase = HistoryPhase::Applying;
        Some(items)
    }

    /// The replacement has landed; recording resumes.
    pub fn settle(&mut self) {
        self.phase = HistoryPhase::Normal;
    }

    pub fn can_undo(&self, actor: &ActorId) -> bool {
        self.histories.get(actor).is_some_and(ActorHistory::can_undo)
    }

    pub fn can_redo(&self, actor: &ActorId) -> bool {
        self.histories.get(actor).is_some_and(ActorHistory::can_redo)
    }

    pub fn history(&self, actor: &ActorId) -> Option<&ActorHistory> {
        self.histories.get(actor)
    }

    /// Actors with a history, in no particular order.
    pub fn actors(&self) -> impl Iterator<Item = &ActorId> {
        self.histories.keys()
    }
}
