use std::path::PathBuf;

/// Stream properties reported by a [`FrameSource`](crate::video::domain::frame_source::FrameSource).
#[derive(Clone, Debug, PartialEq)]
pub struct VideoMetadata {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
    pub total_frames: usize,
    pub source_path: Option<PathBuf>,
}

impl VideoMetadata {
    /// Wall-clock spacing between frames, if the stream reports a rate.
    pub fn frame_interval(&self) -> Option<std::time::Duration> {
        if self.fps > 0.0 && self.fps.is_finite() {
            Some(std::time::Duration::from_secs_f64(1.0 / self.fps))
        } else {
            None
        }
    }
}
