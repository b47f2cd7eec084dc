use std::path::PathBuf;

use derive_builder::Builder;

use crate::Error;

/// Release page the Kokoro v1.0 assets are fetched from.
pub const ASSET_BASE_URL: &str =
    "https://github.com/thewh1teagle/kokoro-onnx/releases/download/model-files-v1.0";

pub const MODEL_FILE: &str = "kokoro-v1.0.onnx";
pub const VOICES_FILE: &str = "voices-v1.0.bin";

/// Local paths of the two assets an engine is built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetPaths {
    pub model: PathBuf,
    pub voices: PathBuf,
}

/// Process configuration.
///
/// Every field has a default, so `AppConfigBuilder::default().build()` yields
/// the stock setup: assets in the working directory, output in the OS temp dir.
///
/// ```
/// use tts_frontend::config::AppConfigBuilder;
///
/// let config = AppConfigBuilder::default()
///     .output_dir("/tmp/speech")
///     .build()
///     .unwrap();
/// assert_eq!(config.file_prefix, "kokoro");
/// ```
#[derive(Debug, Clone, Builder)]
#[builder(default, setter(into), build_fn(error = "Error"))]
pub struct AppConfig {
    /// Local path of the ONNX model.
    pub model_path: PathBuf,
    /// Local path of the `.npz` voice-embedding archive.
    pub voices_path: PathBuf,
    pub model_url: String,
    pub voices_url: String,
    /// Directory generated audio files are written to.
    pub output_dir: PathBuf,
    /// Leading segment of generated file names.
    pub file_prefix: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from(MODEL_FILE),
            voices_path: PathBuf::from(VOICES_FILE),
            model_url: format!("{ASSET_BASE_URL}/{MODEL_FILE}"),
            voices_url: format!("{ASSET_BASE_URL}/{VOICES_FILE}"),
            output_dir: std::env::temp_dir(),
            file_prefix: "kokoro".to_string(),
        }
    }
}

impl AppConfig {
    pub fn assets(&self) -> AssetPaths {
        AssetPaths {
            model: self.model_path.clone(),
            voices: self.voices_path.clone(),
        }
    }
}

impl From<derive_builder::UninitializedFieldError> for Error {
    fn from(e: derive_builder::UninitializedFieldError) -> Self {
        Error::Config(e.to_string())
    }
}
