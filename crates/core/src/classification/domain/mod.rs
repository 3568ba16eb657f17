pub mod classification_result;
pub mod result_ranker;
pub mod sequence_classifier;
