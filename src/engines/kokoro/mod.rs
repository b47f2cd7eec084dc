//! Kokoro-82M text-to-speech engine implementation.
//!
//! This module provides a Kokoro-based synthesis engine that uses the
//! Kokoro-82M ONNX model for text-to-speech conversion. The engine uses
//! espeak-ng for phonemization.
//!
//! # System Requirements
//!
//! **espeak-ng** must be installed on your system:
//! - **Linux**: `sudo apt-get install espeak-ng`
//! - **macOS**: `brew install espeak-ng`
//! - **Windows**: Download installer from <https://espeak-ng.org/download>
//!
//! # Assets
//!
//! The engine is built from the two files the front end provisions:
//!
//! ```text
//! kokoro-v1.0.onnx   # ONNX model
//! voices-v1.0.bin    # Voice data archive (.npz format)
//! config.json        # Optional, next to the model: vocabulary override
//! ```
//!
//! # Language Support
//!
//! | Locale tag | espeak-ng code |
//! |---|---|
//! | `en-us` | `en-us` |
//! | `en-gb` | `en-gb` |
//! | `ja-jp` | `ja` |
//! | `zh-cn` | `cmn` |
//! | `de-de` | `de` |
//! | `es-es` | `es` |
//! | `fr-fr` | `fr-fr` |
//! | `it-it` | `it` |
//! | `ko-kr` | `ko` |
//! | `pt-br` | `pt-br` |
//! | `ru-ru` | `ru` |
//!
//! Any other tag is rejected with [`KokoroError::UnsupportedLanguage`].
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::PathBuf;
//! use tts_frontend::config::AssetPaths;
//! use tts_frontend::engines::kokoro::{KokoroEngine, KokoroModelParams};
//! use tts_frontend::{SynthesisEngine, SynthesisRequest};
//!
//! let assets = AssetPaths {
//!     model: PathBuf::from("kokoro-v1.0.onnx"),
//!     voices: PathBuf::from("voices-v1.0.bin"),
//! };
//! let mut engine = KokoroEngine::load(&assets, KokoroModelParams::default())?;
//!
//! let audio = engine.synthesize(&SynthesisRequest {
//!     text: "Hello from British Emma!",
//!     voice: "bf_emma",
//!     speed: 0.9,
//!     language: "en-gb",
//! })?;
//! audio.write_wav(&PathBuf::from("out.wav"))?;
//! # Ok::<(), Box<dyn std::error::Error + Send + Sync>>(())
//! ```

pub mod engine;
pub mod model;
pub mod phonemizer;
pub mod vocab;

pub use engine::{KokoroEngine, KokoroLoader, KokoroModelParams};
pub use model::KokoroError;
pub use phonemizer::EspeakConfig;
