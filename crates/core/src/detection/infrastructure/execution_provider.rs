use std::path::Path;

use ort::execution_providers::ExecutionProviderDispatch;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;

/// Hardware-accelerated providers for the current platform, most preferred first.
///
/// ONNX Runtime falls back to its CPU provider when none of these register.
pub fn preferred_execution_providers() -> Vec<ExecutionProviderDispatch> {
    #[cfg(target_os = "macos")]
    {
        vec![ort::execution_providers::CoreMLExecutionProvider::default().build()]
    }
    #[cfg(target_os = "windows")]
    {
        vec![ort::execution_providers::DirectMLExecutionProvider::default().build()]
    }
    #[cfg(not(any(target_os = "macos", target_os = "windows")))]
    {
        vec![]
    }
}

/// Short name of the accelerator requested on this platform, for logs.
pub fn preferred_provider_name() -> &'static str {
    if cfg!(target_os = "macos") {
        "CoreML"
    } else if cfg!(target_os = "windows") {
        "DirectML"
    } else {
        "CPU"
    }
}

/// Loads an ONNX model with the platform providers and full graph optimization.
///
/// Both the landmark detector and the sequence classifier run one inference
/// per call from a single worker, so inter-op parallelism is pinned to one.
pub fn load_session(model_path: &Path) -> Result<Session, Box<dyn std::error::Error>> {
    let intra_threads = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    let session = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_inter_threads(1)?
        .with_intra_threads(intra_threads)?
        .with_execution_providers(preferred_execution_providers())?
        .commit_from_file(model_path)?;
    log::debug!(
        "Loaded {} (requested provider: {})",
        model_path.display(),
        preferred_provider_name()
    );
    Ok(session)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_list_matches_platform() {
        let providers = preferred_execution_providers();
        if cfg!(any(target_os = "macos", target_os = "windows")) {
            assert_eq!(providers.len(), 1);
        } else {
            assert!(providers.is_empty());
        }
    }

    #[test]
    fn test_provider_name_is_known() {
        assert!(["CoreML", "DirectML", "CPU"].contains(&preferred_provider_name()));
    }

    #[test]
    fn test_load_session_missing_file_fails() {
        assert!(load_session(Path::new("/nonexistent/model.onnx")).is_err());
    }
}
