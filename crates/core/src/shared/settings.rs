use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::detection::domain::region_extractor::LandmarkIndexSet;
use crate::pipeline::pipeline_controller::ClassificationPolicy;
use crate::video::domain::frame_codec::CodecMode;

use super::constants::{
    DEFAULT_FACE_PRESENCE_THRESHOLD, DEFAULT_LABELS, DEFAULT_TILE_HEIGHT, DEFAULT_TILE_WIDTH,
    DEFAULT_WINDOW_LENGTH,
};

#[derive(Error, Debug)]
pub enum SettingsError {
    #[error("failed to read settings from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write settings to {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("invalid setting `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Deployment-time knobs for the frame pipeline.
///
/// Every field has a default so partial JSON files are accepted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineSettings {
    pub window_length: usize,
    pub tile_width: u32,
    pub tile_height: u32,
    pub policy: ClassificationPolicy,
    pub codec: CodecMode,
    pub landmark_indices: LandmarkIndexSet,
    pub labels: Vec<String>,
    pub face_presence_threshold: f32,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            window_length: DEFAULT_WINDOW_LENGTH,
            tile_width: DEFAULT_TILE_WIDTH,
            tile_height: DEFAULT_TILE_HEIGHT,
            policy: ClassificationPolicy::Continuous,
            codec: CodecMode::Direct,
            landmark_indices: LandmarkIndexSet::mouth_perimeter(),
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            face_presence_threshold: DEFAULT_FACE_PRESENCE_THRESHOLD,
        }
    }
}

impl PipelineSettings {
    pub fn from_json(json: &str) -> Result<Self, SettingsError> {
        let settings: Self = serde_json::from_str(json)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn load(path: &Path) -> Result<Self, SettingsError> {
        let json = fs::read_to_string(path).map_err(|e| SettingsError::Read {
            path: path.to_path_buf(),
            source: e,
        })?;
        Self::from_json(&json)
    }

    pub fn save(&self, path: &Path) -> Result<(), SettingsError> {
        let json = serde_json::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| SettingsError::Write {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        fs::write(path, json).map_err(|e| SettingsError::Write {
            path: path.to_path_buf(),
            source: e,
        })
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.window_length == 0 {
            return Err(invalid("window_length", "must be at least 1"));
        }
        if self.tile_width == 0 || self.tile_height == 0 {
            return Err(invalid(
                "tile_width/tile_height",
                format!("must be positive, got {}x{}", self.tile_width, self.tile_height),
            ));
        }
        if self.labels.is_empty() {
            return Err(invalid("labels", "at least one label is required"));
        }
        if self.landmark_indices.is_empty() {
            return Err(invalid("landmark_indices", "at least one index is required"));
        }
        if !(0.0..=1.0).contains(&self.face_presence_threshold) {
            return Err(invalid(
                "face_presence_threshold",
                format!("must be between 0.0 and 1.0, got {}", self.face_presence_threshold),
            ));
        }
        Ok(())
    }
}

fn invalid(field: &'static str, reason: impl Into<String>) -> SettingsError {
    SettingsError::Invalid {
        field,
        reason: reason.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use tempfile::TempDir;

    #[test]
    fn test_defaults_match_reference_model() {
        let s = PipelineSettings::default();
        assert_eq!(s.window_length, 30);
        assert_eq!((s.tile_width, s.tile_height), (64, 64));
        assert_eq!(s.labels.len(), 8);
        assert_eq!(s.labels[0], "HELLO");
        assert_eq!(s.landmark_indices.len(), 20);
        assert!(s.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let s = PipelineSettings::from_json(r#"{"window_length": 12, "policy": "single-shot"}"#)
            .unwrap();
        assert_eq!(s.window_length, 12);
        assert_eq!(s.policy, ClassificationPolicy::SingleShot);
        assert_eq!(s.codec, CodecMode::Direct);
        assert_eq!(s.tile_width, 64);
    }

    #[test]
    fn test_landmark_indices_from_plain_array() {
        let s = PipelineSettings::from_json(r#"{"landmark_indices": [1, 2, 3]}"#).unwrap();
        assert_eq!(s.landmark_indices.indices(), &[1, 2, 3]);
    }

    #[test]
    fn test_malformed_json_is_parse_error() {
        let err = PipelineSettings::from_json("{not json").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }

    #[rstest]
    #[case::zero_window(r#"{"window_length": 0}"#, "window_length")]
    #[case::zero_tile(r#"{"tile_width": 0}"#, "tile_width/tile_height")]
    #[case::no_labels(r#"{"labels": []}"#, "labels")]
    #[case::no_indices(r#"{"landmark_indices": []}"#, "landmark_indices")]
    #[case::threshold(r#"{"face_presence_threshold": 1.5}"#, "face_presence_threshold")]
    fn test_validation_rejects(#[case] json: &str, #[case] expected_field: &str) {
        match PipelineSettings::from_json(json) {
            Err(SettingsError::Invalid { field, .. }) => assert_eq!(field, expected_field),
            other => panic!("expected Invalid, got {other:?}"),
        }
    }

    #[test]
    fn test_save_then_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested").join("settings.json");
        let mut settings = PipelineSettings::default();
        settings.codec = CodecMode::JpegRoundTrip;
        settings.labels = vec!["YES".into(), "NO".into()];

        settings.save(&path).unwrap();
        let loaded = PipelineSettings::load(&path).unwrap();

        assert_eq!(loaded, settings);
    }

    #[test]
    fn test_load_missing_file() {
        let tmp = TempDir::new().unwrap();
        let err = PipelineSettings::load(&tmp.path().join("absent.json")).unwrap_err();
        assert!(matches!(err, SettingsError::Read { .. }));
    }
}
