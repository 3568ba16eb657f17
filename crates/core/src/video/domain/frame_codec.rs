use serde::{Deserialize, Serialize};

use crate::shared::error::DecodeError;
use crate::shared::frame::Frame;
use crate::shared::raw_frame::RawFrame;

/// How a raw YUV frame is turned into RGB.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CodecMode {
    /// Arithmetic BT.601 conversion straight from the NV21 buffer.
    Direct,
    /// Converts, then encodes to JPEG at quality 100 and decodes again.
    /// Reproduces the compression artefacts models trained on the camera
    /// app's bitmaps have seen.
    JpegRoundTrip,
}

impl std::fmt::Display for CodecMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CodecMode::Direct => write!(f, "direct"),
            CodecMode::JpegRoundTrip => write!(f, "jpeg"),
        }
    }
}

/// Domain interface for raw camera frame decoding.
pub trait FrameCodec: Send {
    /// Decodes `raw` into a full-resolution RGB frame with the same index.
    fn decode(&self, raw: &RawFrame) -> Result<Frame, DecodeError>;
}
