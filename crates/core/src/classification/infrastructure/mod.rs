pub mod onnx_sequence_classifier;
