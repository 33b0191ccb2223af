//! Board aggregate and board references.

use crate::actor::ActorId;
use crate::items::{Item, ItemId};
use chrono::{DateTime, Utc};
use kurbo::Point;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for boards.
pub type BoardId = Uuid;

/// How a session asks for its board.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "by", content = "value", rename_all = "snake_case")]
pub enum BoardRef {
    /// A specific board.
    Id(BoardId),
    /// The board attached to a project.
    Project(String),
    /// The acting owner's personal board (no project).
    Personal,
}

impl fmt::Display for BoardRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BoardRef::Id(id) => write!(f, "board {}", id),
            BoardRef::Project(project) => write!(f, "project {}", project),
            BoardRef::Personal => f.write_str("personal board"),
        }
    }
}

/// A whiteboard: its items plus metadata.
///
/// Item order is z-order (back to front).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Board {
    pub id: BoardId,
    pub owner_id: ActorId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub collaborator_ids: Vec<ActorId>,
    #[serde(default)]
    pub items: Vec<Item>,
    #[serde(default)]
    pub is_favorite: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Board {
    /// Create an empty board owned by `owner`, who is also its first collaborator.
    pub fn new(owner: ActorId, project_id: Option<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            collaborator_ids: vec![owner.clone()],
            owner_id: owner,
            project_id,
            name: "Untitled".to_string(),
            items: Vec::new(),
            is_favorite: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Empty board satisfying `reference` for `owner`.
    pub fn for_ref(reference: &BoardRef, owner: ActorId) -> Self {
        let project = match reference {
            BoardRef::Project(project) => Some(project.clone()),
            _ => None,
        };
        Self::new(owner, project)
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether this board answers `reference` when opened by `actor`.
    pub fn matches(&self, reference: &BoardRef, actor: &ActorId) -> bool {
        match reference {
            BoardRef::Id(id) => self.id == *id,
            BoardRef::Project(project) => self.project_id.as_deref() == Some(project.as_str()),
            BoardRef::Personal => self.project_id.is_none() && self.owner_id == *actor,
        }
    }

    /// Bump `updated_at`.
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }

    pub fn add_collaborator(&mut self, actor: ActorId) -> bool {
        if self.collaborator_ids.contains(&actor) {
            return false;
        }
        self.collaborator_ids.push(actor);
        true
    }

    pub fn position_of(&self, id: ItemId) -> Option<usize> {
        self.items.iter().position(|item| item.id() == id)
    }

    pub fn get_item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id() == id)
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Move an item to the front (topmost). Returns false if absent or already there.
    pub fn bring_to_front(&mut self, id: ItemId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos + 1 < self.items.len() => {
                let item = self.items.remove(pos);
                self.items.push(item);
                true
            }
            _ => false,
        }
    }

    /// Move an item to the back (bottommost). Returns false if absent or already there.
    pub fn send_to_back(&mut self, id: ItemId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos > 0 => {
                let item = self.items.remove(pos);
                self.items.insert(0, item);
                true
            }
            _ => false,
        }
    }

    /// Move an item one layer forward.
    pub fn bring_forward(&mut self, id: ItemId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos + 1 < self.items.len() => {
                self.items.swap(pos, pos + 1);
                true
            }
            _ => false,
        }
    }

    /// Move an item one layer backward.
    pub fn send_backward(&mut self, id: ItemId) -> bool {
        match self.position_of(id) {
            Some(pos) if pos > 0 => {
                self.items.swap(pos, pos - 1);
                true
            }
            _ => false,
        }
    }

    /// Items under a point, front to back.
    pub fn items_at_point(&self, point: Point, tolerance: f64) -> Vec<ItemId> {
        self.items
            .iter()
            .rev()
            .filter(|item| item.hit_test(point, tolerance))
            .map(|item| item.id())
            .collect()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Columns written back to durable storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoardFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<Item>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_favorite: Option<bool>,
    pub updated_at: DateTime<Utc>,
}

impl BoardFields {
    /// Item write that also carries the current favorite flag.
    pub fn items(items: Vec<Item>, is_favorite: bool) -> Self {
        Self {
            items: Some(items),
            is_favorite: Some(is_favorite),
            updated_at: Utc::now(),
        }
    }

    pub fn favorite(is_favorite: bool) -> Self {
        Self {
            items: None,
            is_favorite: Some(is_favorite),
            updated_at: Utc::now(),
        }
    }

    /// Apply these fields onto a stored board.
    pub fn apply_to(&self, board: &mut Board) {
        if let Some(items) = &self.items {
            board.items = items.clone();
        }
        if let Some(is_favorite) = self.is_favorite {
            board.is_favorite = is_favorite;
        }
        board.updated_at = self.updated_at;
    }
}
