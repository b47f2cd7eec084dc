//! Speech synthesis engines.
//!
//! Backends implement [`SynthesisEngine`](crate::SynthesisEngine) and are
//! plugged into the coordinator through an
//! [`EngineLoader`](crate::coordinator::EngineLoader).
//!
//! # Available Engines
//!
//! Enable engines via Cargo features:
//! - `kokoro` - Kokoro TTS (ONNX format, espeak-ng required)

#[cfg(feature = "kokoro")]
pub mod kokoro;
