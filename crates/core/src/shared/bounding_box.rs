/// Axis-aligned pixel box, half-open on the right and bottom edges.
///
/// Boxes built through [`BoundingBox::from_normalized`] always satisfy
/// `0 <= left <= right <= width` and `0 <= top <= bottom <= height`.
/// A zero-area box is a legal value; callers decide whether to use it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BoundingBox {
    pub left: u32,
    pub top: u32,
    pub right: u32,
    pub bottom: u32,
}

impl BoundingBox {
    pub fn new(left: u32, top: u32, right: u32, bottom: u32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Scales a normalized `[min_x, min_y, max_x, max_y]` box to pixels.
    ///
    /// Coordinates are floored, then every edge is clamped independently,
    /// which keeps the ordering invariant even for points outside `[0, 1]`.
    pub fn from_normalized(extent: [f32; 4], width: u32, height: u32) -> Self {
        let [min_x, min_y, max_x, max_y] = extent;
        let to_px = |v: f32, limit: u32| -> u32 {
            let px = (v as f64 * limit as f64).floor();
            px.clamp(0.0, limit as f64) as u32
        };
        Self {
            left: to_px(min_x, width),
            top: to_px(min_y, height),
            right: to_px(max_x, width),
            bottom: to_px(max_y, height),
        }
    }

    pub fn width(&self) -> u32 {
        self.right.saturating_sub(self.left)
    }

    pub fn height(&self) -> u32 {
        self.bottom.saturating_sub(self.top)
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() == 0 || self.height() == 0
    }
}
