/// Tiles per classification window.
pub const DEFAULT_WINDOW_LENGTH: usize = 30;

/// Tile resolution expected by the sequence classifier.
pub const DEFAULT_TILE_WIDTH: u32 = 64;
pub const DEFAULT_TILE_HEIGHT: u32 = 64;

/// Classifier output order.
pub const DEFAULT_LABELS: &[&str] = &["HELLO", "BYE", "THANKS", "A", "E", "I", "O", "U"];

/// Face-mesh indices tracing the outer and inner lip contours.
pub const MOUTH_PERIMETER: &[usize] = &[
    61, 146, 91, 181, 84, 17, 314, 405, 321, 375, 291, 308, 324, 318, 402, 317, 14, 87, 178, 88,
];

/// Points emitted by the face-mesh landmark model.
pub const FACE_MESH_POINTS: usize = 468;

/// Minimum face-presence probability before landmarks are trusted.
pub const DEFAULT_FACE_PRESENCE_THRESHOLD: f32 = 0.5;

pub const FACE_MESH_MODEL_NAME: &str = "face_landmark.onnx";
pub const CLASSIFIER_MODEL_NAME: &str = "lip_reading_model.onnx";

pub const VIDEO_EXTENSIONS: &[&str] = &["mp4", "mov", "mkv", "avi", "webm"];
