use std::path::PathBuf;

use crate::config::AssetPaths;
use crate::coordinator::EngineLoader;
use crate::voices::VoiceStore;
use crate::{BoxError, SynthesisEngine, SynthesisRequest, SynthesizedAudio};

use super::model::{KokoroError, KokoroModel, SAMPLE_RATE};
use super::phonemizer::{espeak_language, EspeakConfig};

/// Parameters for configuring Kokoro model loading.
#[derive(Debug, Clone, Default)]
pub struct KokoroModelParams {
    /// Number of CPU threads to use for inference.
    /// `None` uses the ORT default (typically all available cores).
    pub num_threads: Option<usize>,
    /// Path for caching the Level3-optimized ONNX graph.
    ///
    /// - First load: ORT runs Level3 optimization and serialises the result here.
    /// - Subsequent loads: the pre-built graph is loaded at `Disable` optimization,
    ///   skipping the expensive 5–10 s re-optimization step entirely.
    pub optimized_model_cache_path: Option<PathBuf>,
    /// espeak-ng binary and data location.
    pub espeak: EspeakConfig,
}

/// Kokoro text-to-speech engine.
///
/// Uses the Kokoro-82M ONNX model. Requires espeak-ng for phonemization.
pub struct KokoroEngine {
    model: KokoroModel,
    espeak: EspeakConfig,
}

impl KokoroEngine {
    /// Build the engine from the model and voice archive.
    pub fn load(assets: &AssetPaths, params: KokoroModelParams) -> Result<Self, KokoroError> {
        let model = KokoroModel::load(
            &assets.model,
            &assets.voices,
            params.num_threads,
            params.optimized_model_cache_path.as_deref(),
        )?;
        Ok(Self {
            model,
            espeak: params.espeak,
        })
    }
}

impl SynthesisEngine for KokoroEngine {
    fn synthesize(&mut self, request: &SynthesisRequest<'_>) -> Result<SynthesizedAudio, BoxError> {
        let lang = espeak_language(request.language)
            .ok_or_else(|| KokoroError::UnsupportedLanguage(request.language.to_string()))?;

        let samples =
            self.model
                .synthesize_text(request.text, request.voice, request.speed, lang, &self.espeak)?;

        Ok(SynthesizedAudio {
            samples,
            sample_rate: SAMPLE_RATE,
        })
    }

    fn list_voices(&self) -> Option<Vec<String>> {
        Some(self.model.voices().names().to_vec())
    }

    fn voice_table(&self) -> Option<&VoiceStore> {
        Some(self.model.voices())
    }
}

/// [`EngineLoader`] building [`KokoroEngine`]s.
#[derive(Debug, Clone, Default)]
pub struct KokoroLoader {
    pub params: KokoroModelParams,
}

impl EngineLoader for KokoroLoader {
    fn load(&self, assets: &AssetPaths) -> Result<Box<dyn SynthesisEngine>, BoxError> {
        Ok(Box::new(KokoroEngine::load(assets, self.params.clone())?))
    }
}
