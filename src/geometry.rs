//! Normalized-box arithmetic.
//!
//! Every rectangle in the system is a [`NormBox`]: `[yMin, xMin, yMax, xMax]`
//! on a 0–1000 scale per axis, independent of pixel resolution. The same
//! convention is the wire contract between recognition, the pipeline, and any
//! downstream renderer, so the serde representation is exactly that 4-array.
//!
//! All operations here are pure. Inputs are assumed to be well-formed
//! (`min < max` on both axes) — that invariant is enforced where blocks enter
//! the system, at the recognition boundary and the editing boundary.

use serde::{Deserialize, Serialize};

/// Upper bound of the normalized coordinate scale.
pub const NORM_SCALE: f32 = 1000.0;

/// A rectangle in normalized page coordinates.
///
/// Serialized as `[y_min, x_min, y_max, x_max]` — note the y-first order,
/// which matches what vision models emit for `box_2d` fields.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f32; 4]", into = "[f32; 4]")]
pub struct NormBox {
    pub y_min: f32,
    pub x_min: f32,
    pub y_max: f32,
    pub x_max: f32,
}

impl From<[f32; 4]> for NormBox {
    fn from(v: [f32; 4]) -> Self {
        Self {
            y_min: v[0],
            x_min: v[1],
            y_max: v[2],
            x_max: v[3],
        }
    }
}

impl From<NormBox> for [f32; 4] {
    fn from(b: NormBox) -> Self {
        [b.y_min, b.x_min, b.y_max, b.x_max]
    }
}

impl NormBox {
    pub fn new(y_min: f32, x_min: f32, y_max: f32, x_max: f32) -> Self {
        Self {
            y_min,
            x_min,
            y_max,
            x_max,
        }
    }

    pub fn width(&self) -> f32 {
        self.x_max - self.x_min
    }

    pub fn height(&self) -> f32 {
        self.y_max - self.y_min
    }

    /// True when `other` lies entirely inside `self`.
    pub fn contains(&self, other: &NormBox) -> bool {
        other.y_min >= self.y_min
            && other.y_max <= self.y_max
            && other.x_min >= self.x_min
            && other.x_max <= self.x_max
    }

    /// Adjacency relation used for merging.
    ///
    /// True if the vertical gap between the boxes is below `threshold` and
    /// their horizontal spans overlap within `threshold`, or if either box is
    /// fully contained in the other. `other` is expected to sort at or below
    /// `self` (the consolidation sweep visits boxes in y order).
    pub fn intersects_or_near(&self, other: &NormBox, threshold: f32) -> bool {
        let vertical_close = other.y_min < self.y_max + threshold;
        let horizontal_close =
            other.x_min < self.x_max + threshold && other.x_max > self.x_min - threshold;

        (vertical_close && horizontal_close) || self.contains(other) || other.contains(self)
    }

    /// Smallest box containing both `self` and `other`.
    pub fn union(&self, other: &NormBox) -> NormBox {
        NormBox {
            y_min: self.y_min.min(other.y_min),
            x_min: self.x_min.min(other.x_min),
            y_max: self.y_max.max(other.y_max),
            x_max: self.x_max.max(other.x_max),
        }
    }

    /// Grow the box by per-axis normalized padding, clamped to [0, 1000].
    ///
    /// Mins are floored and maxes are ceiled so the expanded box never loses
    /// a pixel of the original to rounding.
    pub fn expand(&self, pad_x: f32, pad_y: f32) -> NormBox {
        NormBox {
            y_min: (self.y_min - pad_y).floor().max(0.0),
            x_min: (self.x_min - pad_x).floor().max(0.0),
            y_max: (self.y_max + pad_y).ceil().min(NORM_SCALE),
            x_max: (self.x_max + pad_x).ceil().min(NORM_SCALE),
        }
    }

    /// Convert to a pixel rectangle `(x, y, w, h)` against actual dimensions.
    pub fn to_pixel_rect(&self, width: u32, height: u32) -> (f32, f32, f32, f32) {
        let x = self.x_min / NORM_SCALE * width as f32;
        let y = self.y_min / NORM_SCALE * height as f32;
        let w = self.width() / NORM_SCALE * width as f32;
        let h = self.height() / NORM_SCALE * height as f32;
        (x, y, w, h)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn union_covers_both() {
        let a = NormBox::new(100.0, 100.0, 150.0, 400.0);
        let b = NormBox::new(160.0, 100.0, 210.0, 400.0);
        let u = a.union(&b);
        assert_eq!(u, NormBox::new(100.0, 100.0, 210.0, 400.0));
        assert!(u.contains(&a));
        assert!(u.contains(&b));
    }

    #[test]
    fn near_boxes_within_threshold() {
        let a = NormBox::new(100.0, 100.0, 150.0, 400.0);
        let b = NormBox::new(160.0, 100.0, 210.0, 400.0);
        // Gap of 10 on the y axis.
        assert!(a.intersects_or_near(&b, 15.0));
        assert!(!a.intersects_or_near(&b, 5.0));
    }

    #[test]
    fn horizontally_disjoint_boxes_do_not_merge() {
        let a = NormBox::new(100.0, 100.0, 150.0, 200.0);
        let b = NormBox::new(110.0, 400.0, 160.0, 500.0);
        assert!(!a.intersects_or_near(&b, 15.0));
    }

    #[test]
    fn containment_merges_either_way() {
        let outer = NormBox::new(100.0, 100.0, 400.0, 400.0);
        let inner = NormBox::new(200.0, 200.0, 300.0, 300.0);
        assert!(outer.intersects_or_near(&inner, 0.0));
        assert!(inner.intersects_or_near(&outer, 0.0));
    }

    #[test]
    fn expand_clamps_to_scale() {
        let b = NormBox::new(5.0, 5.0, 995.0, 995.0);
        let e = b.expand(20.0, 20.0);
        assert_eq!(e, NormBox::new(0.0, 0.0, 1000.0, 1000.0));
    }

    #[test]
    fn expand_is_exact_on_integral_input() {
        let b = NormBox::new(100.0, 100.0, 210.0, 400.0);
        let e = b.expand(15.0, 15.0);
        assert_eq!(e, NormBox::new(85.0, 85.0, 225.0, 415.0));
    }

    #[test]
    fn serde_round_trips_as_4_array() {
        let b = NormBox::new(1.0, 2.0, 3.0, 4.0);
        let json = serde_json::to_string(&b).unwrap();
        assert_eq!(json, "[1.0,2.0,3.0,4.0]");
        let back: NormBox = serde_json::from_str(&json).unwrap();
        assert_eq!(back, b);
    }

    #[test]
    fn pixel_rect_scales_per_axis() {
        let b = NormBox::new(0.0, 0.0, 500.0, 250.0);
        let (x, y, w, h) = b.to_pixel_rect(2000, 1000);
        assert_eq!((x, y), (0.0, 0.0));
        assert_eq!(w, 500.0);
        assert_eq!(h, 500.0);
    }
}
