pub mod frame_normalizer;
