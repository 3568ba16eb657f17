pub mod infrastructure;
pub mod lip_reading_pipeline;
pub mod pipeline_controller;
pub mod pipeline_logger;
pub mod sequence_window;
