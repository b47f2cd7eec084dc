use std::collections::HashMap;
use std::path::Path;

use ndarray::Array2;
use ort::execution_providers::CPUExecutionProvider;
use ort::inputs;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::TensorRef;

use super::phonemizer::{phonemize, EspeakConfig};
use crate::voices::{VoiceParseError, VoiceStore, STYLE_DIM};

/// Maximum number of phoneme tokens per chunk (before padding).
pub const MAX_PHONEME_LEN: usize = 510;

/// Output sample rate from the Kokoro model.
pub const SAMPLE_RATE: u32 = 24000;

/// 10 ms crossfade between chunks.
const CHUNK_CROSSFADE_SAMPLES: usize = 240;

#[derive(thiserror::Error, Debug)]
pub enum KokoroError {
    #[error("ONNX runtime error: {0}")]
    Ort(#[from] ort::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Array shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
    #[error(
        "espeak-ng not found. Install: Linux: `sudo apt-get install espeak-ng`, \
         macOS: `brew install espeak-ng`, Windows: https://espeak-ng.org/download"
    )]
    EspeakNotFound,
    #[error("Phonemization failed: {0}")]
    PhonemizerFailed(String),
    #[error("Voice '{0}' not found")]
    VoiceNotFound(String),
    #[error("Language '{0}' is not supported")]
    UnsupportedLanguage(String),
    #[error("Invalid config.json: {0}")]
    Config(String),
    #[error("Failed to parse voice file: {0}")]
    VoiceParse(#[from] VoiceParseError),
}

/// A loaded Kokoro session with its voices and vocabulary.
pub struct KokoroModel {
    session: Session,
    voice_store: VoiceStore,
    vocab: HashMap<char, i64>,
    /// `"input_ids"` in most exports, `"tokens"` in some.
    tokens_input: String,
    speed_is_int32: bool,
}

impl KokoroModel {
    /// Load the ONNX graph and the voice archive.
    ///
    /// A `config.json` beside the model overrides the built-in vocabulary.
    pub fn load(
        onnx_path: &Path,
        voices_path: &Path,
        num_threads: Option<usize>,
        optimized_cache_path: Option<&Path>,
    ) -> Result<Self, KokoroError> {
        log::info!("Loading Kokoro model from {}", onnx_path.display());
        let session = init_session(onnx_path, num_threads, optimized_cache_path)?;
        let tokens_input = tokens_input_name(&session);
        let speed_is_int32 = speed_is_int32(&session);
        log::debug!("Kokoro inputs: tokens={tokens_input}, int32 speed={speed_is_int32}");

        let voice_store = VoiceStore::load(voices_path)?;

        let config_path = onnx_path.with_file_name("config.json");
        let vocab = if config_path.exists() {
            log::info!("Loading vocab from {}", config_path.display());
            super::vocab::load_vocab(&config_path)?
        } else {
            super::vocab::hardcoded_vocab()
        };

        Ok(Self {
            session,
            voice_store,
            vocab,
            tokens_input,
            speed_is_int32,
        })
    }

    /// Speak `text` with `voice_name`; `lang` is an espeak-ng language.
    ///
    /// One style row, picked by the total token count, is used for every
    /// chunk of the request.
    pub fn synthesize_text(
        &mut self,
        text: &str,
        voice_name: &str,
        speed: f32,
        lang: &str,
        espeak: &EspeakConfig,
    ) -> Result<Vec<f32>, KokoroError> {
        if !self.voice_store.contains(voice_name) {
            return Err(KokoroError::VoiceNotFound(voice_name.to_string()));
        }

        let ids = phonemize(text, lang, &self.vocab, espeak)?;
        if ids.is_empty() {
            log::warn!("No phoneme tokens produced for text: {text:?}");
            return Ok(Vec::new());
        }

        let style = *self
            .voice_store
            .get_style(voice_name, ids.len())
            .ok_or_else(|| KokoroError::VoiceNotFound(voice_name.to_string()))?;

        let mut audio = Vec::with_capacity(ids.len() * 300);
        for chunk in split_chunks(&ids) {
            let piece = self.run_chunk(&chunk, &style, speed)?;
            append_with_crossfade(&mut audio, &piece, CHUNK_CROSSFADE_SAMPLES);
        }
        Ok(audio)
    }

    fn run_chunk(
        &mut self,
        tokens: &[i64],
        style: &[f32; STYLE_DIM],
        speed: f32,
    ) -> Result<Vec<f32>, KokoroError> {
        // The model expects a 0 pad token on both ends.
        let mut padded = Vec::with_capacity(tokens.len() + 2);
        padded.push(0);
        padded.extend_from_slice(tokens);
        padded.push(0);
        let tokens = Array2::from_shape_vec((1, padded.len()), padded)?;
        let style = ndarray::ArrayView2::from_shape((1, STYLE_DIM), style.as_slice())?;

        let tokens = TensorRef::from_array_view(tokens.view())?;
        let style = TensorRef::from_array_view(style)?;
        let name = self.tokens_input.as_str();
        let outputs = if self.speed_is_int32 {
            let speed = ndarray::arr1(&[speed as i32]);
            self.session.run(inputs![
                name => tokens,
                "style" => style,
                "speed" => TensorRef::from_array_view(speed.view())?,
            ])?
        } else {
            let speed = ndarray::arr1(&[speed]);
            self.session.run(inputs![
                name => tokens,
                "style" => style,
                "speed" => TensorRef::from_array_view(speed.view())?,
            ])?
        };

        let (_, waveform) = outputs
            .iter()
            .next()
            .ok_or_else(|| KokoroError::Ort(ort::Error::new("model produced no output")))?;
        let waveform = waveform.try_extract_array::<f32>()?;
        Ok(waveform.iter().copied().collect())
    }

    pub fn voices(&self) -> &VoiceStore {
        &self.voice_store
    }
}

/// Build the session. With a cache path, the first load optimizes the graph
/// and saves it there; later loads read the saved graph unoptimized.
fn init_session(
    onnx_path: &Path,
    num_threads: Option<usize>,
    optimized_cache_path: Option<&Path>,
) -> Result<Session, KokoroError> {
    let cached = optimized_cache_path.filter(|p| p.exists());
    let level = if cached.is_some() {
        GraphOptimizationLevel::Disable
    } else {
        GraphOptimizationLevel::Level3
    };

    let mut builder = Session::builder()?
        .with_optimization_level(level)?
        .with_execution_providers(vec![CPUExecutionProvider::default().build()])?
        .with_parallel_execution(true)?;
    if let Some(threads) = num_threads {
        builder = builder
            .with_intra_threads(threads)?
            .with_inter_threads(threads)?;
    }

    let source = match (cached, optimized_cache_path) {
        (Some(cache), _) => {
            log::info!("Using optimized graph {}", cache.display());
            cache
        }
        (None, Some(cache)) => {
            log::info!("Optimizing graph, saving to {}", cache.display());
            builder = builder.with_optimized_model_path(cache)?;
            onnx_path
        }
        (None, None) => onnx_path,
    };

    Ok(builder.commit_from_file(source)?)
}

fn tokens_input_name(session: &Session) -> String {
    session
        .inputs()
        .iter()
        .map(|input| input.name())
        .find(|name| matches!(*name, "input_ids" | "tokens"))
        .unwrap_or("input_ids")
        .to_string()
}

/// Kokoro v1.0 exports take an int32 speed; older ones take float32.
fn speed_is_int32(session: &Session) -> bool {
    session
        .inputs()
        .iter()
        .find(|input| input.name() == "speed")
        .map_or(true, |input| {
            format!("{:?}", input.dtype())
                .to_ascii_lowercase()
                .contains("int32")
        })
}

/// Token ids of `; : , . ! ?` in the Kokoro vocabulary.
const BREAK_IDS: [i64; 6] = [1, 2, 3, 4, 5, 6];

/// Cut `ids` into pieces of at most [`MAX_PHONEME_LEN`], each ending after
/// the last punctuation token in its window when there is one.
fn split_chunks(ids: &[i64]) -> Vec<Vec<i64>> {
    let mut chunks = Vec::new();
    let mut rest = ids;
    while rest.len() > MAX_PHONEME_LEN {
        let window = &rest[..MAX_PHONEME_LEN];
        let cut = window
            .iter()
            .rposition(|id| BREAK_IDS.contains(id))
            .map_or(MAX_PHONEME_LEN, |i| i + 1);
        chunks.push(rest[..cut].to_vec());
        rest = &rest[cut..];
    }
    if !rest.is_empty() {
        chunks.push(rest.to_vec());
    }
    chunks
}

/// Append `src` to `dst`, blending the first `crossfade` samples of `src`
/// linearly into the tail of `dst`.
fn append_with_crossfade(dst: &mut Vec<f32>, src: &[f32], crossfade: usize) {
    let overlap = crossfade.min(dst.len()).min(src.len());
    let tail = dst.len() - overlap;
    for (i, (d, s)) in dst[tail..].iter_mut().zip(&src[..overlap]).enumerate() {
        let t = (i + 1) as f32 / (overlap + 1) as f32;
        *d = *d * (1.0 - t) + s * t;
    }
    dst.extend_from_slice(&src[overlap..]);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_sequences_are_a_single_chunk() {
        let ids: Vec<i64> = (10..20).collect();
        assert_eq!(split_chunks(&ids), vec![ids.clone()]);
    }

    #[test]
    fn long_sequences_split_after_punctuation() {
        let mut ids = vec![50i64; 400];
        ids.push(4); // '.'
        ids.extend(vec![50i64; 300]);

        let chunks = split_chunks(&ids);
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 401);
        assert_eq!(chunks[0].last(), Some(&4));
        assert_eq!(chunks[1].len(), 300);
        assert!(chunks.iter().all(|c| c.len() <= MAX_PHONEME_LEN));
    }

    #[test]
    fn sequences_without_punctuation_split_at_limit() {
        let ids = vec![50i64; MAX_PHONEME_LEN * 2 + 3];
        let lens: Vec<usize> = split_chunks(&ids).iter().map(Vec::len).collect();
        assert_eq!(lens, [MAX_PHONEME_LEN, MAX_PHONEME_LEN, 3]);
    }

    #[test]
    fn crossfade_blends_overlap() {
        let mut dst = vec![1.0f32; 4];
        append_with_crossfade(&mut dst, &[0.0; 4], 2);

        assert_eq!(dst.len(), 6);
        assert!(dst[2] < 1.0 && dst[2] > dst[3]);
        assert_eq!(&dst[4..], &[0.0, 0.0]);
    }

    #[test]
    fn crossfade_with_empty_destination_appends() {
        let mut dst = Vec::new();
        append_with_crossfade(&mut dst, &[0.5, 0.5], CHUNK_CROSSFADE_SAMPLES);
        assert_eq!(dst, [0.5, 0.5]);
    }
}
