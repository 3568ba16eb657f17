//! Face-mesh landmark detector using ONNX Runtime via `ort`.
//!
//! Expects a MediaPipe-style face landmark model: NHWC float input of shape
//! `[1, S, S, 3]`, a first output holding 468 `(x, y, z)` triples in input
//! pixel space and a second output holding a single face-presence logit.

use std::path::Path;

use crate::detection::domain::landmark_detector::LandmarkDetector;
use crate::detection::domain::landmark_set::LandmarkSet;
use crate::shared::constants::{DEFAULT_FACE_PRESENCE_THRESHOLD, FACE_MESH_POINTS};
use crate::shared::frame::Frame;

use super::execution_provider::load_session;

/// Input resolution used when the model does not declare a static one.
const FALLBACK_INPUT_SIZE: u32 = 192;

/// Values per landmark in the model output (x, y, z).
const LANDMARK_STRIDE: usize = 3;

pub struct OnnxFaceMeshDetector {
    session: ort::session::Session,
    input_size: u32,
    presence_threshold: f32,
}

impl OnnxFaceMeshDetector {
    pub fn new(model_path: &Path, presence_threshold: f32) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_size = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    // NHWC: H sits at index 1
                    if shape.len() == 4 && shape[1] > 0 {
                        Some(shape[1] as u32)
                    } else {
                        None
                    }
                } else {
                    None
                }
            })
            .unwrap_or(FALLBACK_INPUT_SIZE);

        log::debug!("Face mesh model input size: {input_size}x{input_size}");

        Ok(Self {
            session,
            input_size,
            presence_threshold,
        })
    }

    pub fn with_default_threshold(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        Self::new(model_path, DEFAULT_FACE_PRESENCE_THRESHOLD)
    }

    pub fn input_size(&self) -> u32 {
        self.input_size
    }
}

impl LandmarkDetector for OnnxFaceMeshDetector {
    fn detect(&mut self, frame: &Frame) -> Result<LandmarkSet, Box<dyn std::error::Error>> {
        if frame.width() == 0 || frame.height() == 0 {
            return Ok(LandmarkSet::empty());
        }

        let input = preprocess(frame, self.input_size);
        let input_value = ort::value::Tensor::from_array(input)?;
        let outputs = self.session.run(ort::inputs![input_value])?;

        if outputs.len() < 2 {
            return Err(format!("Face mesh model expected 2 outputs, got {}", outputs.len()).into());
        }

        let presence = outputs[1].try_extract_array::<f32>()?;
        let logit = presence
            .iter()
            .next()
            .copied()
            .ok_or("Face mesh presence output is empty")?;
        let probability = sigmoid(logit);
        if probability < self.presence_threshold {
            log::debug!(
                "Frame {}: face presence {probability:.3} below {:.3}",
                frame.index(),
                self.presence_threshold
            );
            return Ok(LandmarkSet::empty());
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flat: Vec<f32> = coords.iter().copied().collect();
        parse_landmarks(&flat, self.input_size)
    }
}

/// Resize the whole frame to `size × size` (nearest neighbour) as NHWC in [0, 1].
fn preprocess(frame: &Frame, size: u32) -> ndarray::Array4<f32> {
    let src = frame.as_ndarray();
    let src_h = frame.height() as usize;
    let src_w = frame.width() as usize;
    let s = size as usize;

    let mut tensor = ndarray::Array4::<f32>::zeros((1, s, s, 3));

    for y in 0..s {
        let src_y = (((y as f64 + 0.5) * src_h as f64 / s as f64) as usize).min(src_h - 1);
        for x in 0..s {
            let src_x = (((x as f64 + 0.5) * src_w as f64 / s as f64) as usize).min(src_w - 1);
            for c in 0..3 {
                tensor[[0, y, x, c]] = src[[src_y, src_x, c]] as f32 / 255.0;
            }
        }
    }

    tensor
}

/// Turn raw `(x, y, z)` triples in input pixels into normalized `(x, y)` points.
fn parse_landmarks(raw: &[f32], input_size: u32) -> Result<LandmarkSet, Box<dyn std::error::Error>> {
    let needed = FACE_MESH_POINTS * LANDMARK_STRIDE;
    if raw.len() < needed {
        return Err(format!(
            "Face mesh output has {} values, expected at least {needed}",
            raw.len()
        )
        .into());
    }

    let scale = input_size as f32;
    let points = raw[..needed]
        .chunks_exact(LANDMARK_STRIDE)
        .map(|p| (p[0] / scale, p[1] / scale))
        .collect();
    Ok(LandmarkSet::new(points))
}

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}
