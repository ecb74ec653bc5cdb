//! # Geometry
//!
//! Plain value types shared by the model, the layout engine and the
//! backends. Every length is in millimetres; backends convert to their own
//! device units.

use serde::{Deserialize, Serialize};

/// Tolerance used when comparing measured sizes against available space.
pub const EPSILON: f64 = 1e-6;

/// A point in millimetres, origin at the top-left of the page.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const ZERO: Point = Point { x: 0.0, y: 0.0 };

    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub fn offset(self, dx: f64, dy: f64) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
        }
    }
}

/// A width/height pair in millimetres.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Size {
    pub width: f64,
    pub height: f64,
}

impl Size {
    pub const ZERO: Size = Size {
        width: 0.0,
        height: 0.0,
    };

    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    /// Whether `self` fits inside `other` on both axes.
    pub fn fits_within(&self, other: Size) -> bool {
        self.width <= other.width + EPSILON && self.height <= other.height + EPSILON
    }

    /// Grow by a spacing on every side.
    pub fn grow(&self, spacing: Spacing) -> Size {
        Size {
            width: self.width + spacing.horizontal(),
            height: self.height + spacing.vertical(),
        }
    }

    /// Shrink by a spacing on every side, clamped at zero.
    pub fn shrink(&self, spacing: Spacing) -> Size {
        Size {
            width: (self.width - spacing.horizontal()).max(0.0),
            height: (self.height - spacing.vertical()).max(0.0),
        }
    }
}

/// Spacing around a node (top, right, bottom, left).
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Spacing {
    #[serde(default)]
    pub top: f64,
    #[serde(default)]
    pub right: f64,
    #[serde(default)]
    pub bottom: f64,
    #[serde(default)]
    pub left: f64,
}

impl Spacing {
    pub const ZERO: Spacing = Spacing {
        top: 0.0,
        right: 0.0,
        bottom: 0.0,
        left: 0.0,
    };

    pub fn uniform(v: f64) -> Self {
        Self {
            top: v,
            right: v,
            bottom: v,
            left: v,
        }
    }

    pub fn bottom(v: f64) -> Self {
        Self {
            bottom: v,
            ..Self::ZERO
        }
    }

    pub fn horizontal(&self) -> f64 {
        self.left + self.right
    }

    pub fn vertical(&self) -> f64 {
        self.top + self.bottom
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fits_within_tolerates_rounding() {
        let a = Size::new(10.0 + 1e-9, 5.0);
        assert!(a.fits_within(Size::new(10.0, 5.0)));
        assert!(!Size::new(10.1, 5.0).fits_within(Size::new(10.0, 5.0)));
    }

    #[test]
    fn grow_and_shrink_are_symmetric() {
        let s = Size::new(20.0, 10.0);
        let pad = Spacing::uniform(2.0);
        assert_eq!(s.grow(pad).shrink(pad), s);
        assert_eq!(Size::new(1.0, 1.0).shrink(pad), Size::ZERO);
    }
}
