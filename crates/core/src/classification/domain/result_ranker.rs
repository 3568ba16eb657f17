use super::classification_result::{ClassificationResult, Prediction};

/// Pairs classifier scores with their labels and picks the winner.
///
/// Scores are taken as-is: no softmax, no renormalization, no check that
/// they sum to one.
pub struct ResultRanker;

impl ResultRanker {
    /// Ranks `scores` against `labels`.
    ///
    /// # Panics
    ///
    /// If the lengths differ or there are no scores. Both indicate a model
    /// and label set that do not belong together.
    pub fn rank<S: AsRef<str>>(scores: &[f32], labels: &[S]) -> ClassificationResult {
        assert_eq!(
            scores.len(),
            labels.len(),
            "scores and labels must have equal length"
        );
        assert!(!scores.is_empty(), "cannot rank an empty score vector");

        // Strictly greater: the first of several equal maxima wins.
        let mut best = 0;
        for (i, &score) in scores.iter().enumerate().skip(1) {
            if score > scores[best] {
                best = i;
            }
        }

        let pairs: Vec<Prediction> = scores
            .iter()
            .zip(labels)
            .map(|(&probability, label)| Prediction {
                label: AsRef::<str>::as_ref(label).to_string(),
                probability,
            })
            .collect();

        let mut ranked = pairs.clone();
        ranked.sort_by(|a, b| b.probability.total_cmp(&a.probability));

        ClassificationResult::new(pairs[best].clone(), pairs, ranked)
    }
}
