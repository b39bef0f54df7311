//! Grid-unit geometry used by instance records.

use serde::{Deserialize, Serialize};

/// Point in fixed-point grid units
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: i64,
    pub y: i64,
}

impl Point {
    pub const ORIGIN: Point = Point { x: 0, y: 0 };

    pub const fn new(x: i64, y: i64) -> Self {
        Self { x, y }
    }
}

/// Manhattan orientation (rotation, optionally mirrored about X first)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Orientation {
    #[default]
    R0,
    R90,
    R180,
    R270,
    XR0,
    XR90,
    XR180,
    XR270,
}

impl Orientation {
    const ALL: [Orientation; 8] = [
        Orientation::R0,
        Orientation::R90,
        Orientation::R180,
        Orientation::R270,
        Orientation::XR0,
        Orientation::XR90,
        Orientation::XR180,
        Orientation::XR270,
    ];

    /// Stable wire code
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn from_code(code: u8) -> Option<Self> {
        Self::ALL.get(code as usize).copied()
    }

    /// True when width and height swap (90° / 270°)
    pub fn swaps_axes(self) -> bool {
        matches!(
            self,
            Orientation::R90 | Orientation::R270 | Orientation::XR90 | Orientation::XR270
        )
    }
}

/// Axis-aligned rectangle, `lo` inclusive and `hi` inclusive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rect {
    pub lo: Point,
    pub hi: Point,
}

impl Rect {
    /// Rectangle centred on `center` with full extents `w` x `h`
    pub fn centered(center: Point, w: i64, h: i64) -> Self {
        let (hw, hh) = (w / 2, h / 2);
        Self {
            lo: Point::new(center.x - hw, center.y - hh),
            hi: Point::new(center.x + (w - hw), center.y + (h - hh)),
        }
    }

    pub fn union(&self, other: &Rect) -> Rect {
        Rect {
            lo: Point::new(self.lo.x.min(other.lo.x), self.lo.y.min(other.lo.y)),
            hi: Point::new(self.hi.x.max(other.hi.x), self.hi.y.max(other.hi.y)),
        }
    }

    pub fn width(&self) -> i64 {
        self.hi.x - self.lo.x
    }

    pub fn height(&self) -> i64 {
        self.hi.y - self.lo.y
    }
}
