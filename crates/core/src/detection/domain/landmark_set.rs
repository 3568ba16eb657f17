//! Normalized facial landmarks for a single subject.
//!
//! Points are indexed by the landmark model's anatomical numbering and use
//! image-relative coordinates, nominally in `[0, 1]` on both axes. Models can
//! place points slightly outside the frame, so values are not clamped here.

#[derive(Clone, Debug, Default, PartialEq)]
pub struct LandmarkSet {
    points: Vec<(f32, f32)>,
}

impl LandmarkSet {
    pub fn new(points: Vec<(f32, f32)>) -> Self {
        Self { points }
    }

    /// The "no subject found" result.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn points(&self) -> &[(f32, f32)] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<(f32, f32)> {
        self.points.get(index).copied()
    }

    /// Normalized `[min_x, min_y, max_x, max_y]` over the selected points.
    ///
    /// Returns `None` if `indices` is empty or any index is out of range.
    pub fn extent(&self, indices: &[usize]) -> Option<[f32; 4]> {
        if indices.is_empty() {
            return None;
        }

        let mut min_x = f32::INFINITY;
        let mut min_y = f32::INFINITY;
        let mut max_x = f32::NEG_INFINITY;
        let mut max_y = f32::NEG_INFINITY;

        for &i in indices {
            let (x, y) = self.get(i)?;
            min_x = min_x.min(x);
            min_y = min_y.min(y);
            max_x = max_x.max(x);
            max_y = max_y.max(y);
        }

        Some([min_x, min_y, max_x, max_y])
    }
}
