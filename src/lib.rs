//! # tts-frontend
//!
//! A minimal text-to-speech front end built around the Kokoro engine.
//!
//! ## Features
//!
//! - **Asset provisioning**: fetches the model and voice archive on first start
//! - **Voice catalog**: discovers usable voices and groups them by language
//! - **Lazy engine initialization**: a failed startup load is retried per request
//! - **WAV artifacts**: every request produces a uniquely named file in the temp directory
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! tts-frontend = { version = "2026.2", features = ["kokoro"] }
//! ```
//!
//! ```ignore
//! use tts_frontend::{app::App, config::AppConfig, engines::kokoro::KokoroLoader};
//!
//! let app = App::bootstrap(&AppConfig::default(), KokoroLoader::default())?;
//! let result = app.coordinator.generate("Hello, world!", "af_sarah", 1.0, "en-us");
//! println!("{} -> {:?}", result.status, result.audio_path);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod app;
pub mod assets;
pub mod catalog;
pub mod config;
pub mod coordinator;
pub mod engines;
pub mod error;
pub mod voices;

#[cfg(test)]
pub(crate) mod test_support;

use std::io::{Seek, Write};
use std::path::Path;

pub use error::Error;
use voices::VoiceStore;

/// Boxed error returned across the engine seam.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Audio produced by a synthesis engine.
///
/// Contains raw f32 audio samples and the sample rate of the output audio.
#[derive(Debug, Clone)]
pub struct SynthesizedAudio {
    /// Raw audio samples as f32 values
    pub samples: Vec<f32>,
    /// Sample rate of the audio (24000 for Kokoro)
    pub sample_rate: u32,
}

impl SynthesizedAudio {
    /// hound divides by the sample rate while writing the header, so a zero
    /// rate is rejected up front.
    fn wav_spec(&self) -> Result<hound::WavSpec, hound::Error> {
        if self.sample_rate == 0 {
            return Err(hound::Error::Unsupported);
        }
        Ok(hound::WavSpec {
            channels: 1,
            sample_rate: self.sample_rate,
            bits_per_sample: 32,
            sample_format: hound::SampleFormat::Float,
        })
    }

    /// Write the audio to a 32-bit float WAV file, replacing any existing file.
    pub fn write_wav(&self, path: &Path) -> Result<(), hound::Error> {
        let writer = hound::WavWriter::create(path, self.wav_spec()?)?;
        self.write_samples(writer)
    }

    /// Write the audio as WAV into an already opened writer.
    pub fn write_wav_to<W: Write + Seek>(&self, writer: W) -> Result<(), hound::Error> {
        let writer = hound::WavWriter::new(writer, self.wav_spec()?)?;
        self.write_samples(writer)
    }

    fn write_samples<W: Write + Seek>(
        &self,
        mut writer: hound::WavWriter<W>,
    ) -> Result<(), hound::Error> {
        for &sample in &self.samples {
            writer.write_sample(sample)?;
        }
        writer.finalize()
    }

    /// Duration of the audio in seconds.
    pub fn duration_secs(&self) -> f64 {
        self.samples.len() as f64 / self.sample_rate as f64
    }
}

/// One synthesis call, built per user action.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynthesisRequest<'a> {
    pub text: &'a str,
    /// Voice identifier, e.g. `"af_sarah"`.
    pub voice: &'a str,
    /// Speech speed multiplier, passed to the engine as given.
    pub speed: f32,
    /// Locale tag, e.g. `"en-us"`.
    pub language: &'a str,
}

/// Common interface for text-to-speech synthesis engines.
///
/// Engines are built from the provisioned assets by an
/// [`EngineLoader`](coordinator::EngineLoader). Voice and language validation
/// is the engine's job: an unknown voice or language must come back as an
/// error, never as a panic.
pub trait SynthesisEngine: Send {
    /// Synthesize speech for the given request.
    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<SynthesizedAudio, BoxError>;

    /// Enumerate the voices this engine accepts, if it can.
    fn list_voices(&self) -> Option<Vec<String>> {
        None
    }

    /// The engine's voice-embedding table, if it holds one.
    fn voice_table(&self) -> Option<&VoiceStore> {
        None
    }
}
