pub mod classification;
pub mod detection;
pub mod normalization;
pub mod pipeline;
pub mod shared;
pub mod video;
