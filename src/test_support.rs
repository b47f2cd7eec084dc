//! Stub engines and fixture writers shared by the unit tests.

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::AssetPaths;
use crate::coordinator::EngineLoader;
use crate::voices::STYLE_DIM;
use crate::{BoxError, SynthesisEngine, SynthesisRequest, SynthesizedAudio};

pub const STUB_SAMPLE_RATE: u32 = 22050;

/// `(text, voice, speed, language)` as seen by the engine.
pub type Call = (String, String, f32, String);

/// Engine returning one second of silence; rejects the voice `"bogus"`.
#[derive(Default)]
pub struct StubEngine {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub voices: Option<Vec<String>>,
}

impl SynthesisEngine for StubEngine {
    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<SynthesizedAudio, BoxError> {
        self.calls.lock().push((
            request.text.to_string(),
            request.voice.to_string(),
            request.speed,
            request.language.to_string(),
        ));
        if request.voice == "bogus" {
            return Err(format!("Voice '{}' not found", request.voice).into());
        }
        Ok(SynthesizedAudio {
            samples: vec![0.0; STUB_SAMPLE_RATE as usize],
            sample_rate: STUB_SAMPLE_RATE,
        })
    }

    fn list_voices(&self) -> Option<Vec<String>> {
        self.voices.clone()
    }
}

/// Loader building [`StubEngine`]s after `failures` failed attempts.
#[derive(Default, Clone)]
pub struct StubLoader {
    pub calls: Arc<Mutex<Vec<Call>>>,
    pub loads: Arc<AtomicUsize>,
    pub failures: usize,
}

impl StubLoader {
    pub fn failing(failures: usize) -> Self {
        Self {
            failures,
            ..Self::default()
        }
    }

    pub fn loads(&self) -> usize {
        self.loads.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }
}

impl EngineLoader for StubLoader {
    fn load(&self, _assets: &AssetPaths) -> Result<Box<dyn SynthesisEngine>, BoxError> {
        let attempt = self.loads.fetch_add(1, Ordering::SeqCst);
        if attempt < self.failures {
            return Err("model file is corrupt".into());
        }
        Ok(Box::new(StubEngine {
            calls: Arc::clone(&self.calls),
            voices: None,
        }))
    }
}

/// Encode one `.npy` file holding `[rows.len() / 256, 256]` float32 values.
pub fn npy_bytes(rows: &[f32]) -> Vec<u8> {
    let header = format!(
        "{{'descr': '<f4', 'fortran_order': False, 'shape': ({}, {STYLE_DIM}), }}\n",
        rows.len() / STYLE_DIM
    );
    let mut out = b"\x93NUMPY\x01\x00".to_vec();
    out.extend_from_slice(&(header.len() as u16).to_le_bytes());
    out.extend_from_slice(header.as_bytes());
    for value in rows {
        out.extend_from_slice(&value.to_le_bytes());
    }
    out
}

/// Write an `.npz` archive with two style rows (all 0.0, then all 1.0) per voice.
pub fn write_voice_archive(path: &Path, voices: &[&str]) {
    let mut rows = vec![0.0f32; STYLE_DIM];
    rows.extend(std::iter::repeat(1.0f32).take(STYLE_DIM));
    let npy = npy_bytes(&rows);

    let mut zip = zip::ZipWriter::new(File::create(path).unwrap());
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for voice in voices {
        zip.start_file(format!("{voice}.npy"), options).unwrap();
        zip.write_all(&npy).unwrap();
    }
    zip.finish().unwrap();
}
