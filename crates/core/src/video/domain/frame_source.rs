use std::path::Path;

use crate::shared::raw_frame::RawFrame;
use crate::shared::video_metadata::VideoMetadata;

/// Produces raw YUV frames, standing in for a camera feed.
///
/// Implementations handle container and codec details; the pipeline only
/// ever sees [`RawFrame`]s.
pub trait FrameSource: Send {
    /// Opens a source and returns its metadata.
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>>;

    /// Returns an iterator over frames in presentation order.
    fn frames(
        &mut self,
    ) -> Box<dyn Iterator<Item = Result<RawFrame, Box<dyn std::error::Error>>> + '_>;

    /// Releases any resources held by the source.
    fn close(&mut self);
}
