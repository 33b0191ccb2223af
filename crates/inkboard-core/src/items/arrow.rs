//! Arrow styles and arrow item construction.

use super::{Item, ItemBody, ShapeColor, DEFAULT_STROKE_WIDTH};
use kurbo::{Point, Vec2};
use serde::{Deserialize, Serialize};

/// Stroke width used by the `Thick` arrow style.
pub const THICK_STROKE_WIDTH: f64 = 4.0;

/// Drawing style picked when an arrow gesture starts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowStyle {
    #[default]
    Straight,
    Curved,
    /// Heads on both ends.
    Double,
    Dashed,
    Thick,
}

impl ArrowStyle {
    pub fn stroke_width(self) -> f64 {
        match self {
            ArrowStyle::Thick => THICK_STROKE_WIDTH,
            _ => DEFAULT_STROKE_WIDTH,
        }
    }

    /// Cycle to the next style.
    pub fn next(self) -> Self {
        match self {
            ArrowStyle::Straight => ArrowStyle::Curved,
            ArrowStyle::Curved => ArrowStyle::Double,
            ArrowStyle::Double => ArrowStyle::Dashed,
            ArrowStyle::Dashed => ArrowStyle::Thick,
            ArrowStyle::Thick => ArrowStyle::Straight,
        }
    }
}

/// Arrowhead decoration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrowHead {
    #[default]
    Triangle,
    Bar,
    Diamond,
    /// No head.
    Line,
}

/// Build an arrow item from a gesture's start and end points (board coordinates).
///
/// The item is anchored at `start`; its points are stored relative to it.
pub fn arrow_item_from(start: Point, end: Point, style: ArrowStyle) -> Item {
    Item::new(
        start,
        ItemBody::Arrow {
            points: vec![Point::ZERO, Point::new(end.x - start.x, end.y - start.y)],
            style,
            head: ArrowHead::default(),
            color: ShapeColor::default(),
            stroke_width: style.stroke_width(),
        },
    )
}

impl Item {
    /// Length of an arrow's path, `None` for other kinds.
    pub fn arrow_length(&self) -> Option<f64> {
        match &self.body {
            ItemBody::Arrow { points, .. } => Some(
                points
                    .windows(2)
                    .map(|w| w[0].distance(w[1]))
                    .sum(),
            ),
            _ => None,
        }
    }

    /// Unit direction of an arrow's last segment, `None` for other kinds.
    pub fn arrow_direction(&self) -> Option<Vec2> {
        let ItemBody::Arrow { points, .. } = &self.body else {
            return None;
        };
        let [.., prev, last] = points.as_slice() else {
            return Some(Vec2::new(1.0, 0.0));
        };
        let delta = *last - *prev;
        let len = delta.hypot();
        if len < f64::EPSILON {
            Some(Vec2::new(1.0, 0.0))
        } else {
            Some(delta / len)
        }
    }
}
