/// One label paired with the classifier's score for it.
#[derive(Clone, Debug, PartialEq)]
pub struct Prediction {
    pub label: String,
    pub probability: f32,
}

impl std::fmt::Display for Prediction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({:.2}%)", self.label, self.probability * 100.0)
    }
}

/// Outcome of classifying one window.
///
/// `scores` keeps the classifier's label order; `ranked` is sorted by
/// descending probability with ties kept in label order.
#[derive(Clone, Debug, PartialEq)]
pub struct ClassificationResult {
    top: Prediction,
    scores: Vec<Prediction>,
    ranked: Vec<Prediction>,
}

impl ClassificationResult {
    pub(crate) fn new(top: Prediction, scores: Vec<Prediction>, ranked: Vec<Prediction>) -> Self {
        Self { top, scores, ranked }
    }

    pub fn top(&self) -> &Prediction {
        &self.top
    }

    pub fn scores(&self) -> &[Prediction] {
        &self.scores
    }

    pub fn ranked(&self) -> &[Prediction] {
        &self.ranked
    }

    /// `LABEL: p%, ...` in label order.
    pub fn probabilities_summary(&self) -> String {
        self.scores
            .iter()
            .map(|p| format!("{}: {:.2}%", p.label, p.probability * 100.0))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl std::fmt::Display for ClassificationResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        std::fmt::Display::fmt(&self.top, f)
    }
}
