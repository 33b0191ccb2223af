//! Item definitions for the whiteboard.

mod arrow;
mod color;

pub use arrow::{ArrowHead, ArrowStyle, arrow_item_from};
pub use color::{NoteColor, SerializableColor, ShapeColor};

use crate::actor::ActorId;
use kurbo::{Point, Rect, Size};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for items.
pub type ItemId = Uuid;

/// Footprint used for items that carry no explicit size.
pub const DEFAULT_ITEM_SIZE: Size = Size::new(100.0, 50.0);

/// Default font size for text items.
pub const DEFAULT_FONT_SIZE: f64 = 16.0;

/// Default stroke width for arrows, lines and pen strokes.
pub const DEFAULT_STROKE_WIDTH: f64 = 2.0;

fn default_font_size() -> f64 {
    DEFAULT_FONT_SIZE
}

fn default_stroke_width() -> f64 {
    DEFAULT_STROKE_WIDTH
}

/// Discriminant of an item's body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemKind {
    Note,
    Text,
    Checkbox,
    Shape,
    Image,
    Arrow,
    Line,
    Pen,
    Goal,
    Action,
}

/// Geometric outline of a `shape` item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeKind {
    #[default]
    #[serde(rename = "box")]
    Rectangle,
    Circle,
    Triangle,
    Diamond,
    Hexagon,
    Star,
    Pentagon,
    Trapezoid,
    Cloud,
    Speech,
    Heart,
}

/// Pen stroke flavour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PenStyle {
    #[default]
    Pen,
    Marker,
}

/// Kind-specific content of an item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemBody {
    Note {
        text: String,
        #[serde(default)]
        color: NoteColor,
    },
    Text {
        content: String,
        #[serde(default = "default_font_size")]
        font_size: f64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_family: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        font_weight: Option<u16>,
    },
    Checkbox {
        label: String,
        #[serde(default)]
        checked: bool,
    },
    Shape {
        shape: ShapeKind,
        size: Size,
        #[serde(default)]
        color: ShapeColor,
        #[serde(default)]
        fill: bool,
    },
    Image {
        url: String,
        size: Size,
    },
    /// Points are relative to the item position.
    Arrow {
        points: Vec<Point>,
        #[serde(default)]
        style: ArrowStyle,
        #[serde(default)]
        head: ArrowHead,
        #[serde(default)]
        color: ShapeColor,
        #[serde(default = "default_stroke_width")]
        stroke_width: f64,
    },
    Line {
        points: Vec<Point>,
        #[serde(default)]
        color: ShapeColor,
        #[serde(default = "default_stroke_width")]
        stroke_width: f64,
    },
    Pen {
        points: Vec<Point>,
        #[serde(default)]
        pen_style: PenStyle,
        #[serde(default)]
        color: ShapeColor,
        #[serde(default = "default_stroke_width")]
        stroke_width: f64,
    },
    /// Goal marker ("meta" item).
    Goal {
        title: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        target: Option<String>,
        #[serde(default)]
        achieved: bool,
    },
    /// Action item with a completion flag.
    Action {
        label: String,
        #[serde(default)]
        done: bool,
    },
}

impl ItemBody {
    pub fn kind(&self) -> ItemKind {
        match self {
            ItemBody::Note { .. } => ItemKind::Note,
            ItemBody::Text { .. } => ItemKind::Text,
            ItemBody::Checkbox { .. } => ItemKind::Checkbox,
            ItemBody::Shape { .. } => ItemKind::Shape,
            ItemBody::Image { .. } => ItemKind::Image,
            ItemBody::Arrow { .. } => ItemKind::Arrow,
            ItemBody::Line { .. } => ItemKind::Line,
            ItemBody::Pen { .. } => ItemKind::Pen,
            ItemBody::Goal { .. } => ItemKind::Goal,
            ItemBody::Action { .. } => ItemKind::Action,
        }
    }

    fn points(&self) -> Option<&[Point]> {
        match self {
            ItemBody::Arrow { points, .. }
            | ItemBody::Line { points, .. }
            | ItemBody::Pen { points, .. } => Some(points),
            _ => None,
        }
    }

    fn stroke_width(&self) -> Option<f64> {
        match self {
            ItemBody::Arrow { stroke_width, .. }
            | ItemBody::Line { stroke_width, .. }
            | ItemBody::Pen { stroke_width, .. } => Some(*stroke_width),
            _ => None,
        }
    }
}

/// One placed element on a board.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub(crate) id: ItemId,
    /// Top-left anchor in board coordinates.
    pub position: Point,
    #[serde(flatten)]
    pub body: ItemBody,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub opacity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<ActorId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_edited_by: Option<ActorId>,
}

impl Item {
    /// Create an unattributed item with a fresh id.
    pub fn new(position: Point, body: ItemBody) -> Self {
        Self {
            id: Uuid::new_v4(),
            position,
            body,
            opacity: None,
            created_by: None,
            last_edited_by: None,
        }
    }

    pub fn note(position: Point, text: impl Into<String>) -> Self {
        Self::new(
            position,
            ItemBody::Note {
                text: text.into(),
                color: NoteColor::default(),
            },
        )
    }

    pub fn text(position: Point, content: impl Into<String>) -> Self {
        Self::new(
            position,
            ItemBody::Text {
                content: content.into(),
                font_size: DEFAULT_FONT_SIZE,
                font_family: None,
                font_weight: None,
            },
        )
    }

    pub fn checkbox(position: Point, label: impl Into<String>) -> Self {
        Self::new(
            position,
            ItemBody::Checkbox {
                label: label.into(),
                checked: false,
            },
        )
    }

    pub fn shape(shape: ShapeKind, position: Point, size: Size) -> Self {
        Self::new(
            position,
            ItemBody::Shape {
                shape,
                size,
                color: ShapeColor::default(),
                fill: false,
            },
        )
    }

    pub fn image(position: Point, url: impl Into<String>, size: Size) -> Self {
        Self::new(
            position,
            ItemBody::Image {
                url: url.into(),
                size,
            },
        )
    }

    /// Polyline from absolute board points; the first point becomes the anchor.
    pub fn line(points: &[Point]) -> Self {
        let (position, points) = relative_points(points);
        Self::new(
            position,
            ItemBody::Line {
                points,
                color: ShapeColor::default(),
                stroke_width: DEFAULT_STROKE_WIDTH,
            },
        )
    }

    /// Freehand stroke from absolute board points.
    pub fn pen(points: &[Point], pen_style: PenStyle) -> Self {
        let (position, points) = relative_points(points);
        Self::new(
            position,
            ItemBody::Pen {
                points,
                pen_style,
                color: ShapeColor::default(),
                stroke_width: DEFAULT_STROKE_WIDTH,
            },
        )
    }

    pub fn goal(position: Point, title: impl Into<String>) -> Self {
        Self::new(
            position,
            ItemBody::Goal {
                title: title.into(),
                target: None,
                achieved: false,
            },
        )
    }

    pub fn action(position: Point, label: impl Into<String>) -> Self {
        Self::new(
            position,
            ItemBody::Action {
                label: label.into(),
                done: false,
            },
        )
    }

    /// Copy of this item under a new id, without attribution.
    pub fn duplicate(&self) -> Self {
        Self {
            id: Uuid::new_v4(),
            created_by: None,
            last_edited_by: None,
            ..self.clone()
        }
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn kind(&self) -> ItemKind {
        self.body.kind()
    }

    /// Item points translated to board coordinates (empty for non-path items).
    pub fn absolute_points(&self) -> Vec<Point> {
        self.body
            .points()
            .map(|pts| {
                pts.iter()
                    .map(|p| Point::new(p.x + self.position.x, p.y + self.position.y))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Bounding box in board coordinates.
    pub fn bounds(&self) -> Rect {
        match &self.body {
            ItemBody::Shape { size, .. } | ItemBody::Image { size, .. } => {
                Rect::from_origin_size(self.position, *size)
            }
            ItemBody::Arrow { .. } | ItemBody::Line { .. } | ItemBody::Pen { .. } => {
                let points = self.absolute_points();
                let Some(first) = points.first() else {
                    return Rect::from_origin_size(self.position, Size::ZERO);
                };
                let rect = points
                    .iter()
                    .fold(Rect::from_points(*first, *first), |r, p| r.union_pt(*p));
                let pad = self.body.stroke_width().unwrap_or(DEFAULT_STROKE_WIDTH) / 2.0;
                rect.inflate(pad, pad)
            }
            _ => Rect::from_origin_size(self.position, DEFAULT_ITEM_SIZE),
        }
    }

    /// Check if a point (in board coordinates) hits this item.
    pub fn hit_test(&self, point: Point, tolerance: f64) -> bool {
        match &self.body {
            ItemBody::Arrow { .. } | ItemBody::Line { .. } | ItemBody::Pen { .. } => {
                let reach = self.body.stroke_width().unwrap_or(DEFAULT_STROKE_WIDTH) / 2.0 + tolerance;
                point_to_polyline_dist(point, &self.absolute_points()) <= reach
            }
            _ => self.bounds().inflate(tolerance, tolerance).contains(point),
        }
    }

    /// Merge a patch into this item. Fields that do not apply to the item's kind
    /// are ignored. Returns true if any field was written.
    pub fn apply(&mut self, patch: &ItemPatch) -> bool {
        let mut touched = false;

        if let Some(position) = patch.position {
            self.position = position;
            touched = true;
        }
        if let Some(opacity) = patch.opacity {
            self.opacity = Some(opacity.clamp(0.0, 1.0));
            touched = true;
        }

        match &mut self.body {
            ItemBody::Note { text, color } => {
                touched |= assign(text, &patch.text);
                touched |= assign(color, &patch.note_color);
            }
            ItemBody::Text { content, font_size, .. } => {
                touched |= assign(content, &patch.text);
                touched |= assign(font_size, &patch.font_size);
            }
            ItemBody::Checkbox { label, checked } => {
                touched |= assign(label, &patch.text);
                touched |= assign(checked, &patch.checked);
            }
            ItemBody::Shape { size, color, fill, .. } => {
                touched |= assign(size, &patch.size);
                touched |= assign(color, &patch.color);
                touched |= assign(fill, &patch.fill);
            }
            ItemBody::Image { size, .. } => {
                touched |= assign(size, &patch.size);
            }
            ItemBody::Arrow { points, color, stroke_width, .. }
            | ItemBody::Line { points, color, stroke_width }
            | ItemBody::Pen { points, color, stroke_width, .. } => {
                touched |= assign(points, &patch.points);
                touched |= assign(color, &patch.color);
                touched |= assign(stroke_width, &patch.stroke_width);
            }
            ItemBody::Goal { title, achieved, .. } => {
                touched |= assign(title, &patch.text);
                touched |= assign(achieved, &patch.checked);
            }
            ItemBody::Action { label, done } => {
                touched |= assign(label, &patch.text);
                touched |= assign(done, &patch.checked);
            }
        }

        touched
    }
}

fn assign<T: Clone>(slot: &mut T, value: &Option<T>) -> bool {
    match value {
        Some(v) => {
            *slot = v.clone();
            true
        }
        None => false,
    }
}

fn relative_points(points: &[Point]) -> (Point, Vec<Point>) {
    let origin = points.first().copied().unwrap_or(Point::ZERO);
    let relative = points
        .iter()
        .map(|p| Point::new(p.x - origin.x, p.y - origin.y))
        .collect();
    (origin, relative)
}

/// Partial update for an item. `None` leaves the field untouched.
///
/// `text` targets the primary text of the kind (note text, text content,
/// checkbox/action label, goal title); `checked` targets the completion flag
/// (checkbox, action, goal).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ItemPatch {
    pub position: Option<Point>,
    pub size: Option<Size>,
    pub text: Option<String>,
    pub font_size: Option<f64>,
    pub checked: Option<bool>,
    pub color: Option<ShapeColor>,
    pub note_color: Option<NoteColor>,
    pub fill: Option<bool>,
    pub points: Option<Vec<Point>>,
    pub stroke_width: Option<f64>,
    pub opacity: Option<f64>,
}

impl ItemPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn position(mut self, position: Point) -> Self {
        self.position = Some(position);
        self
    }

    pub fn size(mut self, size: Size) -> Self {
        self.size = Some(size);
        self
    }

    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    pub fn checked(mut self, checked: bool) -> Self {
        self.checked = Some(checked);
        self
    }

    pub fn color(mut self, color: ShapeColor) -> Self {
        self.color = Some(color);
        self
    }

    pub fn points(mut self, points: Vec<Point>) -> Self {
        self.points = Some(points);
        self
    }

    pub fn stroke_width(mut self, width: f64) -> Self {
        self.stroke_width = Some(width);
        self
    }

    pub fn opacity(mut self, opacity: f64) -> Self {
        self.opacity = Some(opacity);
        self
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Distance from a point to a line segment (a→b).
pub fn point_to_segment_dist(point: Point, a: Point, b: Point) -> f64 {
    let seg = kurbo::Vec2::new(b.x - a.x, b.y - a.y);
    let pv = kurbo::Vec2::new(point.x - a.x, point.y - a.y);
    let len_sq = seg.hypot2();
    if len_sq < f64::EPSILON {
        return pv.hypot();
    }
    let t = (pv.dot(seg) / len_sq).clamp(0.0, 1.0);
    let proj = Point::new(a.x + t * seg.x, a.y + t * seg.y);
    ((point.x - proj.x).powi(2) + (point.y - proj.y).powi(2)).sqrt()
}

/// Minimum distance from a point to a polyline.
pub fn point_to_polyline_dist(point: Point, points: &[Point]) -> f64 {
    match points {
        [] => f64::INFINITY,
        [only] => only.distance(point),
        _ => points
            .windows(2)
            .map(|w| point_to_segment_dist(point, w[0], w[1]))
            .fold(f64::INFINITY, f64::min),
    }
}
