//! Arrow drawing mode.
//!
//! A two-point gesture: arm the mode with a style, anchor the start point,
//! track the pointer, then commit one arrow item to the store.

use crate::items::{ArrowStyle, Item, ItemId, arrow_item_from};
use crate::store::ItemStore;
use kurbo::Point;

/// State of an arrow gesture.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub enum DrawingState {
    /// Not drawing.
    #[default]
    Idle,
    /// Style chosen, waiting for the start point.
    Armed { style: ArrowStyle },
    /// Start point placed, following the pointer.
    Anchored {
        style: ArrowStyle,
        /// Starting point of the gesture.
        start: Point,
        /// Current pointer position.
        current: Point,
    },
}

/// Drives the arrow gesture. Transitions that don't apply to the current
/// state are ignored.
#[derive(Debug, Clone, Default)]
pub struct DrawingController {
    state: DrawingState,
}

impl DrawingController {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> DrawingState {
        self.state
    }

    pub fn is_idle(&self) -> bool {
        self.state == DrawingState::Idle
    }

    /// Arm drawing mode. Re-arming before the start point switches the style.
    pub fn start(&mut self, style: ArrowStyle) {
        match self.state {
            DrawingState::Idle | DrawingState::Armed { .. } => {
                self.state = DrawingState::Armed { style };
            }
            DrawingState::Anchored { .. } => {
                log::debug!("Arrow start ignored: gesture already anchored");
            }
        }
    }

    /// Place the start point.
    pub fn set_start(&mut self, point: Point) {
        if let DrawingState::Armed { style } = self.state {
            self.state = DrawingState::Anchored {
                style,
                start: point,
                current: point,
            };
        } else {
            log::debug!("Arrow anchor ignored in state {:?}", self.state);
        }
    }

    /// Follow the pointer.
    pub fn update_current(&mut self, point: Point) {
        if let DrawingState::Anchored { current, .. } = &mut self.state {
            *current = point;
        }
    }

    /// The arrow that `commit` would create right now.
    pub fn preview(&self) -> Option<Item> {
        match self.state {
            DrawingState::Anchored {
                style,
                start,
                current,
            } => Some(arrow_item_from(start, current, style)),
            _ => None,
        }
    }

    /// Finish the gesture, adding exactly one arrow item to `store`.
    ///
    /// Only valid once anchored; returns the new item's id.
    pub fn commit(&mut self, store: &mut ItemStore) -> Option<ItemId> {
        let item = self.preview()?;
        self.state = DrawingState::Idle;
        Some(store.add(item))
    }

    /// Abandon the gesture without touching the store.
    pub fn cancel(&mut self) {
        self.state = DrawingState::Idle;
    }
}
