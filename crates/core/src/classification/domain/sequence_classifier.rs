use ndarray::ArrayView5;

/// Domain interface for the pretrained sequence classifier.
///
/// `input` has shape `(1, time, height, width, 1)` with intensities in
/// `[0, 1]`. Returns one score per label, in label order.
pub trait SequenceClassifier: Send {
    fn infer(&mut self, input: ArrayView5<'_, f32>) -> Result<Vec<f32>, Box<dyn std::error::Error>>;
}
