use std::path::Path;

use ndarray::ArrayView5;

use crate::classification::domain::sequence_classifier::SequenceClassifier;
use crate::detection::infrastructure::execution_provider::load_session;

/// Sequence classifier backed by an ONNX Runtime session.
///
/// The model takes the `(1, N, H, W, 1)` window tensor and produces one
/// score per label in its first output.
pub struct OnnxSequenceClassifier {
    session: ort::session::Session,
    /// Declared input dims; `None` where the model leaves a dimension dynamic.
    input_dims: Vec<Option<usize>>,
}

impl OnnxSequenceClassifier {
    pub fn new(model_path: &Path) -> Result<Self, Box<dyn std::error::Error>> {
        let session = load_session(model_path)?;

        let input_dims: Vec<Option<usize>> = session
            .inputs()
            .first()
            .and_then(|input| {
                if let ort::value::ValueType::Tensor { ref shape, .. } = input.dtype() {
                    Some(
                        shape
                            .iter()
                            .map(|&d| if d > 0 { Some(d as usize) } else { None })
                            .collect(),
                    )
                } else {
                    None
                }
            })
            .unwrap_or_default();

        log::debug!("Classifier input dims: {}", describe_dims(&input_dims));

        Ok(Self {
            session,
            input_dims,
        })
    }

    /// Window length the model was exported with, if it is static.
    pub fn window_length(&self) -> Option<usize> {
        self.input_dims.get(1).copied().flatten()
    }
}

impl SequenceClassifier for OnnxSequenceClassifier {
    fn infer(&mut self, input: ArrayView5<'_, f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        check_shape(&self.input_dims, input.shape())?;

        let input_value = ort::value::Tensor::from_array(input.to_owned())?;
        let outputs = self.session.run(ort::inputs![input_value])?;
        if outputs.len() == 0 {
            return Err("Classifier model produced no outputs".into());
        }

        let scores = outputs[0].try_extract_array::<f32>()?;
        Ok(scores.iter().copied().collect())
    }
}

/// Rejects tensors that disagree with a static model dimension.
///
/// An empty `expected` means the model declared nothing and anything goes.
fn check_shape(expected: &[Option<usize>], actual: &[usize]) -> Result<(), String> {
    if expected.is_empty() {
        return Ok(());
    }
    if expected.len() != actual.len() {
        return Err(format!(
            "Classifier expects a rank-{} input, got rank {}",
            expected.len(),
            actual.len()
        ));
    }
    for (axis, (want, &got)) in expected.iter().zip(actual).enumerate() {
        if let Some(want) = want {
            if *want != got {
                return Err(format!(
                    "Classifier input axis {axis} must be {want}, got {got} (model expects {})",
                    describe_dims(expected)
                ));
            }
        }
    }
    Ok(())
}

fn describe_dims(dims: &[Option<usize>]) -> String {
    let parts: Vec<String> = dims
        .iter()
        .map(|d| d.map_or_else(|| "?".to_string(), |v| v.to_string()))
        .collect();
    format!("[{}]", parts.join(", "))
}
