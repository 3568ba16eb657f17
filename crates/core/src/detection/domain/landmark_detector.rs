use crate::shared::frame::Frame;

use super::landmark_set::LandmarkSet;

/// Domain interface for facial landmark detection.
///
/// Returns landmarks for at most one subject; an empty set means nobody was
/// found. Implementations may keep state across frames, hence `&mut self`.
pub trait LandmarkDetector: Send {
    fn detect(&mut self, frame: &Frame) -> Result<LandmarkSet, Box<dyn std::error::Error>>;
}
