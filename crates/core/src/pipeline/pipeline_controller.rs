use std::sync::{Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};

use crate::classification::domain::classification_result::ClassificationResult;
use crate::classification::domain::result_ranker::ResultRanker;
use crate::classification::domain::sequence_classifier::SequenceClassifier;
use crate::shared::error::PipelineError;
use crate::shared::tile::Tile;

use super::sequence_window::SequenceWindow;

/// Where the controller is in its collect/classify cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerState {
    /// Not collecting; tiles are dropped.
    Idle,
    /// Accepting tiles into the window.
    Collecting,
    /// Window is full and being classified. Only observable from inside
    /// the controller's critical section.
    Ready,
}

/// What happens after a successful classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassificationPolicy {
    /// Clear the window and keep collecting: one prediction per window.
    Continuous,
    /// Stop after the first successful prediction until `start` is called again.
    SingleShot,
}

impl std::fmt::Display for ClassificationPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ClassificationPolicy::Continuous => write!(f, "continuous"),
            ClassificationPolicy::SingleShot => write!(f, "single-shot"),
        }
    }
}

/// Result of handing one tile to the controller.
#[derive(Debug, Clone, PartialEq)]
pub enum TileOutcome {
    /// The controller was not collecting; the tile was dropped.
    Ignored,
    /// The tile was appended; `filled` tiles are now buffered.
    Buffered { filled: usize },
    /// The tile completed the window and the window was classified.
    Classified(ClassificationResult),
}

struct Inner {
    state: ControllerState,
    window: SequenceWindow,
    classifier: Box<dyn SequenceClassifier>,
    classifications: usize,
}

/// Marks the window as being classified for the lifetime of the guard.
///
/// Dropping it, normally or while unwinding, clears the window and moves a
/// still-`Ready` controller back to `Collecting`.
struct AttemptGuard<'a> {
    inner: &'a mut Inner,
}

impl<'a> AttemptGuard<'a> {
    fn begin(inner: &'a mut Inner) -> Self {
        inner.state = ControllerState::Ready;
        Self { inner }
    }
}

impl Drop for AttemptGuard<'_> {
    fn drop(&mut self) {
        self.inner.window.clear();
        if self.inner.state == ControllerState::Ready {
            self.inner.state = ControllerState::Collecting;
        }
    }
}

/// Owns the sequence window and the classifier, and decides when to classify.
///
/// `start`, `stop` and `on_tile` may be called from different threads. They
/// serialize on one lock that covers state, window and classifier, and the
/// classifier runs while that lock is held, so at most one classification is
/// ever in flight.
pub struct PipelineController {
    inner: Mutex<Inner>,
    labels: Vec<String>,
    policy: ClassificationPolicy,
}

impl PipelineController {
    /// Starts in `Idle`; call `start` to begin collecting.
    ///
    /// # Panics
    ///
    /// If `labels` is empty.
    pub fn new(
        classifier: Box<dyn SequenceClassifier>,
        labels: Vec<String>,
        window: SequenceWindow,
        policy: ClassificationPolicy,
    ) -> Self {
        assert!(!labels.is_empty(), "label set must not be empty");
        Self {
            inner: Mutex::new(Inner {
                state: ControllerState::Idle,
                window,
                classifier,
                classifications: 0,
            }),
            labels,
            policy,
        }
    }

    /// Discards any buffered tiles and begins collecting. Idempotent.
    pub fn start(&self) {
        let mut inner = self.lock();
        inner.window.clear();
        inner.state = ControllerState::Collecting;
        log::debug!("Controller started ({} policy)", self.policy);
    }

    /// Discards any buffered tiles and stops collecting. Idempotent.
    pub fn stop(&self) {
        let mut inner = self.lock();
        if !inner.window.is_empty() {
            log::debug!("Controller stopped, discarding {} tiles", inner.window.len());
        }
        inner.window.clear();
        inner.state = ControllerState::Idle;
    }

    /// Appends `tile` while collecting, classifying once the window is full.
    ///
    /// Any classification attempt clears the window, successful or not.
    /// On failure the controller goes back to `Collecting` and the error is
    /// returned; there is no retry.
    pub fn on_tile(&self, tile: Tile) -> Result<TileOutcome, PipelineError> {
        let mut inner = self.lock();
        if inner.state != ControllerState::Collecting {
            return Ok(TileOutcome::Ignored);
        }

        let filled = inner.window.push(tile);
        if filled < inner.window.capacity() {
            return Ok(TileOutcome::Buffered { filled });
        }

        let attempt = AttemptGuard::begin(&mut *inner);
        match self.classify(&mut *attempt.inner) {
            Ok(result) => {
                attempt.inner.classifications += 1;
                attempt.inner.state = match self.policy {
                    ClassificationPolicy::Continuous => ControllerState::Collecting,
                    ClassificationPolicy::SingleShot => ControllerState::Idle,
                };
                log::info!("Prediction: {result}");
                log::info!("Probabilities: {}", result.probabilities_summary());
                Ok(TileOutcome::Classified(result))
            }
            Err(e) => {
                log::error!("Classification attempt abandoned: {e}");
                Err(e)
            }
        }
    }

    pub fn state(&self) -> ControllerState {
        self.lock().state
    }

    pub fn is_collecting(&self) -> bool {
        self.state() == ControllerState::Collecting
    }

    /// Number of tiles currently buffered.
    pub fn filled(&self) -> usize {
        self.lock().window.len()
    }

    pub fn window_length(&self) -> usize {
        self.lock().window.capacity()
    }

    /// Successful classifications since construction.
    pub fn classifications(&self) -> usize {
        self.lock().classifications
    }

    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    pub fn policy(&self) -> ClassificationPolicy {
        self.policy
    }

    fn classify(&self, inner: &mut Inner) -> Result<ClassificationResult, PipelineError> {
        let tensor = inner.window.to_tensor();
        let scores = inner
            .classifier
            .infer(tensor.view())
            .map_err(|e| PipelineError::ClassifierFailure(e.to_string()))?;

        if scores.is_empty() || scores.len() != self.labels.len() {
            return Err(PipelineError::ClassifierPrecondition {
                scores: scores.len(),
                labels: self.labels.len(),
            });
        }
        Ok(ResultRanker::rank(&scores, &self.labels))
    }

    // A panic inside a classification attempt poisons the lock, but
    // `AttemptGuard` has already reset the window and state by then.
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
