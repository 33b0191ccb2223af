//! Named color palettes for board items.

use peniko::Color;
use serde::{Deserialize, Serialize};

/// Serializable color representation (RGBA8).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SerializableColor {
    pub r: u8,
    pub g: u8,
    pub b: u8,
    pub a: u8,
}

impl SerializableColor {
    pub const fn new(r: u8, g: u8, b: u8, a: u8) -> Self {
        Self { r, g, b, a }
    }

    /// Build an opaque color from a `0xRRGGBB` value.
    pub const fn from_rgb_hex(hex: u32) -> Self {
        Self::new((hex >> 16) as u8, (hex >> 8) as u8, hex as u8, 255)
    }

    /// Format as `#rrggbb`.
    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

impl From<Color> for SerializableColor {
    fn from(color: Color) -> Self {
        let rgba = color.to_rgba8();
        Self {
            r: rgba.r,
            g: rgba.g,
            b: rgba.b,
            a: rgba.a,
        }
    }
}

impl From<SerializableColor> for Color {
    fn from(color: SerializableColor) -> Self {
        Color::from_rgba8(color.r, color.g, color.b, color.a)
    }
}

/// Stroke/fill palette for shapes, arrows, lines and pen strokes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeColor {
    #[default]
    Blue,
    Green,
    Purple,
    Pink,
    Orange,
    Red,
    Yellow,
    Cyan,
    Gray,
}

impl ShapeColor {
    pub const ALL: [ShapeColor; 9] = [
        ShapeColor::Blue,
        ShapeColor::Green,
        ShapeColor::Purple,
        ShapeColor::Pink,
        ShapeColor::Orange,
        ShapeColor::Red,
        ShapeColor::Yellow,
        ShapeColor::Cyan,
        ShapeColor::Gray,
    ];

    pub fn rgba(self) -> SerializableColor {
        match self {
            ShapeColor::Blue => SerializableColor::from_rgb_hex(0x3b82f6),
            ShapeColor::Green => SerializableColor::from_rgb_hex(0x10b981),
            ShapeColor::Purple => SerializableColor::from_rgb_hex(0x8b5cf6),
            ShapeColor::Pink => SerializableColor::from_rgb_hex(0xec4899),
            ShapeColor::Orange => SerializableColor::from_rgb_hex(0xf97316),
            ShapeColor::Red => SerializableColor::from_rgb_hex(0xef4444),
            ShapeColor::Yellow => SerializableColor::from_rgb_hex(0xeab308),
            ShapeColor::Cyan => SerializableColor::from_rgb_hex(0x06b6d4),
            ShapeColor::Gray => SerializableColor::from_rgb_hex(0x6b7280),
        }
    }

    /// Cycle to the next palette entry.
    pub fn next(self) -> Self {
        let idx = Self::ALL.iter().position(|&c| c == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

impl From<ShapeColor> for Color {
    fn from(color: ShapeColor) -> Self {
        color.rgba().into()
    }
}

/// Background palette for sticky notes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoteColor {
    #[default]
    Yellow,
    Pink,
    Blue,
    Green,
}

impl NoteColor {
    pub fn rgba(self) -> SerializableColor {
        match self {
            NoteColor::Yellow => SerializableColor::from_rgb_hex(0xfef08a),
            NoteColor::Pink => SerializableColor::from_rgb_hex(0xfbcfe8),
            NoteColor::Blue => SerializableColor::from_rgb_hex(0xbfdbfe),
            NoteColor::Green => SerializableColor::from_rgb_hex(0xbbf7d0),
        }
    }
}

impl From<NoteColor> for Color {
    fn from(color: NoteColor) -> Self {
        color.rgba().into()
    }
}
