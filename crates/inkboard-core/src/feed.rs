//! Change notifications for shared boards.
//!
//! A live feed tells a session that a board it has open was changed
//! elsewhere. Payloads are opaque: a notification only says *which* board
//! changed, and the session decides whether to reload it. Events are
//! collected by the backend and must be polled via `poll_events()`.

use crate::board::BoardId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashSet, VecDeque};
use std::sync::{Arc, Mutex};
use thiserror::Error;

/// Channel name for a board's change notifications.
pub fn board_channel(id: BoardId) -> String {
    format!("whiteboard:{}", id)
}

/// Events delivered by a live feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FeedEvent {
    /// Subscription to a channel confirmed
    Subscribed { channel: String },
    /// The board behind a channel changed remotely
    Changed { channel: String },
    /// Channel closed by the backend
    Closed { channel: String },
    /// Error message
    Error { message: String },
}

impl FeedEvent {
    /// Channel the event belongs to, if any.
    pub fn channel(&self) -> Option<&str> {
        match self {
            FeedEvent::Subscribed { channel }
            | FeedEvent::Changed { channel }
            | FeedEvent::Closed { channel } => Some(channel),
            FeedEvent::Error { .. } => None,
        }
    }
}

/// Live feed errors.
#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Feed disconnected")]
    Disconnected,
    #[error("Feed error: {0}")]
    Other(String),
}

/// Subscription transport.
#[cfg(not(target_arch = "wasm32"))]
pub trait LiveFeed: Send {
    fn join(&mut self, channel: &str) -> Result<(), FeedError>;
    fn leave(&mut self, channel: &str) -> Result<(), FeedError>;
    /// Drain events received since the last poll.
    fn poll_events(&mut self) -> Vec<FeedEvent>;
}

/// Subscription transport (WASM version without Send).
#[cfg(target_arch = "wasm32")]
pub trait LiveFeed {
    fn join(&mut self, channel: &str) -> Result<(), FeedError>;
    fn leave(&mut self, channel: &str) -> Result<(), FeedError>;
    /// Drain events received since the last poll.
    fn poll_events(&mut self) -> Vec<FeedEvent>;
}

/// Tracks which board channels are subscribed, one subscription per board.
pub struct FeedRegistry {
    feed: Box<dyn LiveFeed>,
    channels: BTreeSet<String>,
}

impl FeedRegistry {
    pub fn new(feed: Box<dyn LiveFeed>) -> Self {
        Self {
            feed,
            channels: BTreeSet::new(),
        }
    }

    /// Subscribe to a board's channel. Returns false if already subscribed.
    pub fn subscribe(&mut self, board: BoardId) -> Result<bool, FeedError> {
        let channel = board_channel(board);
        if self.channels.contains(&channel) {
            log::debug!("Already subscribed to {}", channel);
            return Ok(false);
        }
        self.feed.join(&channel)?;
        log::debug!("Subscribed to {}", channel);
        self.channels.insert(channel);
        Ok(true)
    }

    /// Drop a board's subscription. Returns false if there was none.
    pub fn unsubscribe(&mut self, board: BoardId) -> Result<bool, FeedError> {
        let channel = board_channel(board);
        if !self.channels.remove(&channel) {
            return Ok(false);
        }
        self.feed.leave(&channel)?;
        Ok(true)
    }

    /// Leave every channel. Errors are logged; the registry ends up empty.
    pub fn unsubscribe_all(&mut self) {
        for channel in std::mem::take(&mut self.channels) {
            if let Err(e) = self.feed.leave(&channel) {
                log::warn!("Failed to leave {}: {}", channel, e);
            }
        }
    }

    /// Subscribed channel names, sorted.
    pub fn active_channels(&self) -> Vec<String> {
        self.channels.iter().cloned().collect()
    }

    pub fn is_subscribed(&self, board: BoardId) -> bool {
        self.channels.contains(&board_channel(board))
    }

    /// Events for subscribed channels, plus feed-wide errors.
    pub fn poll(&mut self) -> Vec<FeedEvent> {
        let channels = &self.channels;
        self.feed
            .poll_events()
            .into_iter()
            .filter(|event| event.channel().is_none_or(|c| channels.contains(c)))
            .collect()
    }
}

#[derive(Debug, Default)]
struct MemoryFeedState {
    joined: HashSet<String>,
    events: VecDeque<FeedEvent>,
    joins: usize,
}

/// In-process feed. Clones share state, so a test (or a second session)
/// can publish changes that the subscribed side polls.
#[derive(Debug, Clone, Default)]
pub struct MemoryFeed {
    state: Arc<Mutex<MemoryFeedState>>,
}

impl MemoryFeed {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a change on a board's channel. Dropped if nobody joined it.
    pub fn push_change(&self, board: BoardId) {
        let channel = board_channel(board);
        if let Ok(mut state) = self.state.lock() {
            if state.joined.contains(&channel) {
                state.events.push_back(FeedEvent::Changed { channel });
            }
        }
    }

    /// Queue an arbitrary event.
    pub fn push_event(&self, event: FeedEvent) {
        if let Ok(mut state) = self.state.lock() {
            state.events.push_back(event);
        }
    }

    /// Total number of successful joins.
    pub fn join_count(&self) -> usize {
        self.state.lock().map(|s| s.joins).unwrap_or(0)
    }

    pub fn is_joined(&self, channel: &str) -> bool {
        self.state
            .lock()
            .map(|s| s.joined.contains(channel))
            .unwrap_or(false)
    }
}

impl LiveFeed for MemoryFeed {
    fn join(&mut self, channel: &str) -> Result<(), FeedError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| FeedError::Other(format!("Lock error: {}", e)))?;
        state.joined.insert(channel.to_string());
        state.joins += 1;
        state.events.push_back(FeedEvent::Subscribed {
            channel: channel.to_string(),
        });
        Ok(())
    }

    fn leave(&mut self, channel: &str) -> Result<(), FeedError> {
        let mut state = self
            .state
            .lock()
            .map_err(|e| FeedError::Other(format!("Lock error: {}", e)))?;
        state.joined.remove(channel);
        Ok(())
    }

    fn poll_events(&mut self) -> Vec<FeedEvent> {
        match self.state.lock() {
            Ok(mut state) => state.events.drain(..).collect(),
            Err(_) => vec![FeedEvent::Error {
                message: "feed state poisoned".to_string(),
            }],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_name() {
        let id = BoardId::nil();
        assert_eq!(board_channel(id), "whiteboard:00000000-0000-0000-0000-000000000000");
    }

    #[test]
    fn test_subscribe_deduplicates() {
        let feed = MemoryFeed::new();
        let mut registry = FeedRegistry::new(Box::new(feed.clone()));
        let board = BoardId::new_v4();

        assert!(registry.subscribe(board).unwrap());
        assert!(!registry.subscribe(board).unwrap());

        assert_eq!(feed.join_count(), 1);
        assert_eq!(registry.active_channels(), vec![board_channel(board)]);
    }

    #[test]
    fn test_unsubscribe_all() {
        let feed = MemoryFeed::new();
        let mut registry = FeedRegistry::new(Box::new(feed.clone()));
        let (a, b) = (BoardId::new_v4(), BoardId::new_v4());
        registry.subscribe(a).unwrap();
        registry.subscribe(b).unwrap();

        assert!(registry.unsubscribe(a).unwrap());
        assert!(!registry.unsubscribe(a).unwrap());
        registry.unsubscribe_all();

        assert!(registry.active_channels().is_empty());
        assert!(!feed.is_joined(&board_channel(b)));
    }

    #[test]
    fn test_poll_delivers_subscribed_changes() {
        let feed = MemoryFeed::new();
        let mut registry = FeedRegistry::new(Box::new(feed.clone()));
        let (mine, other) = (BoardId::new_v4(), BoardId::new_v4());
        registry.subscribe(mine).unwrap();

        feed.push_change(mine);
        feed.push_change(other);
        feed.push_event(FeedEvent::Changed {
            channel: board_channel(other),
        });
        feed.push_event(FeedEvent::Error {
            message: "hiccup".into(),
        });

        let events = registry.poll();
        assert_eq!(
            events,
            vec![
                FeedEvent::Subscribed { channel: board_channel(mine) },
                FeedEvent::Changed { channel: board_channel(mine) },
                FeedEvent::Error { message: "hiccup".into() },
            ]
        );
        assert!(registry.poll().is_empty());
    }

    #[test]
    fn test_event_wire_format() {
        let event = FeedEvent::Changed {
            channel: "whiteboard:x".into(),
        };
        let json = serde_json::to_string(&event).unwrap();
        assert_eq!(json, r#"{"type":"changed","channel":"whiteboard:x"}"#);
    }
}
