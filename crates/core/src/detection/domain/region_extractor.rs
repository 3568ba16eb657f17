use serde::{Deserialize, Serialize};

use crate::shared::bounding_box::BoundingBox;
use crate::shared::constants::MOUTH_PERIMETER;
use crate::shared::frame::Frame;

use super::landmark_set::LandmarkSet;

/// The landmark indices whose bounding box defines the region of interest.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LandmarkIndexSet(Vec<usize>);

impl LandmarkIndexSet {
    pub fn new(indices: Vec<usize>) -> Self {
        Self(indices)
    }

    /// Outer and inner lip contour of the 468-point face mesh.
    pub fn mouth_perimeter() -> Self {
        Self(MOUTH_PERIMETER.to_vec())
    }

    pub fn indices(&self) -> &[usize] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Crops the region spanned by a fixed landmark subset out of a frame.
pub struct RegionExtractor {
    indices: LandmarkIndexSet,
}

impl RegionExtractor {
    pub fn new(indices: LandmarkIndexSet) -> Self {
        Self { indices }
    }

    pub fn indices(&self) -> &LandmarkIndexSet {
        &self.indices
    }

    /// Pixel-space box around the selected landmarks, clamped to the frame.
    ///
    /// `None` when the set is empty or lacks one of the selected indices.
    /// The box may be degenerate.
    pub fn bounding_box(
        &self,
        landmarks: &LandmarkSet,
        width: u32,
        height: u32,
    ) -> Option<BoundingBox> {
        if landmarks.is_empty() {
            return None;
        }
        let Some(extent) = landmarks.extent(self.indices.indices()) else {
            log::debug!(
                "Landmark set of {} points lacks a required index",
                landmarks.len()
            );
            return None;
        };
        Some(BoundingBox::from_normalized(extent, width, height))
    }

    /// Crops the region, or returns `None` when no usable region exists.
    pub fn extract(&self, landmarks: &LandmarkSet, frame: &Frame) -> Option<Frame> {
        let bbox = self.bounding_box(landmarks, frame.width(), frame.height())?;
        if bbox.is_degenerate() {
            return None;
        }
        Some(frame.crop(&bbox))
    }
}

impl Default for RegionExtractor {
    fn default() -> Self {
        Self::new(LandmarkIndexSet::mouth_perimeter())
    }
}
