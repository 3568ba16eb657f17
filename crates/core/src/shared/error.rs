use thiserror::Error;

/// Which plane of a raw frame failed validation.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaneKind {
    Luma,
    ChromaU,
    ChromaV,
}

impl std::fmt::Display for PlaneKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaneKind::Luma => write!(f, "luma"),
            PlaneKind::ChromaU => write!(f, "chroma U"),
            PlaneKind::ChromaV => write!(f, "chroma V"),
        }
    }
}

/// A raw frame could not be turned into an RGB image.
#[derive(Error, Debug)]
pub enum DecodeError {
    #[error("frame has zero dimensions ({width}x{height})")]
    EmptyFrame { width: u32, height: u32 },
    #[error("{plane} plane too short: {len} bytes, need at least {required}")]
    PlaneTooShort {
        plane: PlaneKind,
        len: usize,
        required: usize,
    },
    #[error("{plane} plane has invalid stride (row {row_stride}, pixel {pixel_stride})")]
    InvalidStride {
        plane: PlaneKind,
        row_stride: usize,
        pixel_stride: usize,
    },
    #[error("jpeg round trip failed: {0}")]
    Codec(#[from] image::ImageError),
}

/// Failures surfaced by a pipeline tick or by the controller.
///
/// "No region this tick" is not an error; see `TickOutcome::NoRegion`.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("frame decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("landmark detection failed: {0}")]
    Detection(String),
    #[error("classifier returned {scores} scores for {labels} labels")]
    ClassifierPrecondition { scores: usize, labels: usize },
    #[error("classification failed: {0}")]
    ClassifierFailure(String),
}
