//! Request handling: validation, lazy engine initialization, WAV artifacts.

use std::fs::{self, File, OpenOptions};
use std::io::{BufWriter, ErrorKind};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;

use crate::config::{AppConfig, AssetPaths};
use crate::{BoxError, Error, SynthesisEngine, SynthesisRequest, SynthesizedAudio};

/// Fresh random suffixes tried when a generated name already exists.
const MAX_NAME_ATTEMPTS: usize = 8;

/// Builds an engine from the provisioned assets.
pub trait EngineLoader: Send + Sync {
    fn load(&self, assets: &AssetPaths) -> Result<Box<dyn SynthesisEngine>, BoxError>;
}

impl<F> EngineLoader for F
where
    F: Fn(&AssetPaths) -> Result<Box<dyn SynthesisEngine>, BoxError> + Send + Sync,
{
    fn load(&self, assets: &AssetPaths) -> Result<Box<dyn SynthesisEngine>, BoxError> {
        self(assets)
    }
}

enum EngineState {
    Uninitialized,
    Ready(Box<dyn SynthesisEngine>),
    Failed(String),
}

/// Observable state of the engine handle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineStatus {
    Uninitialized,
    Ready,
    Failed(String),
}

/// Outcome of one request. `audio_path` is `None` on failure, in which case
/// `status` carries the error message.
///
/// Files are never deleted by this crate; the caller (or the OS temp-dir
/// policy) owns them once returned.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisResult {
    pub audio_path: Option<PathBuf>,
    pub status: String,
}

impl SynthesisResult {
    fn failed(error: Error) -> Self {
        Self {
            audio_path: None,
            status: error.to_string(),
        }
    }

    pub fn is_success(&self) -> bool {
        self.audio_path.is_some()
    }
}

/// Where and under which prefix audio files are written.
#[derive(Debug, Clone)]
pub struct OutputSettings {
    pub dir: PathBuf,
    pub prefix: String,
}

impl From<&AppConfig> for OutputSettings {
    fn from(config: &AppConfig) -> Self {
        Self {
            dir: config.output_dir.clone(),
            prefix: config.file_prefix.clone(),
        }
    }
}

/// Turns user requests into audio files.
///
/// The engine lives behind a mutex: initialization is single-flight and
/// engine calls are serialized.
pub struct SynthesisCoordinator {
    engine: Mutex<EngineState>,
    loader: Box<dyn EngineLoader>,
    assets: AssetPaths,
    output: OutputSettings,
}

impl SynthesisCoordinator {
    pub fn new(
        loader: impl EngineLoader + 'static,
        assets: AssetPaths,
        output: OutputSettings,
    ) -> Self {
        Self {
            engine: Mutex::new(EngineState::Uninitialized),
            loader: Box::new(loader),
            assets,
            output,
        }
    }

    /// Load the engine now unless it is already ready.
    pub fn initialize(&self) -> Result<(), Error> {
        let mut state = self.engine.lock();
        self.ensure_ready(&mut state).map(|_| ())
    }

    pub fn status(&self) -> EngineStatus {
        match &*self.engine.lock() {
            EngineState::Uninitialized => EngineStatus::Uninitialized,
            EngineState::Ready(_) => EngineStatus::Ready,
            EngineState::Failed(reason) => EngineStatus::Failed(reason.clone()),
        }
    }

    /// Run `f` with the engine if it is ready, `None` otherwise.
    pub fn with_engine<R>(&self, f: impl FnOnce(Option<&dyn SynthesisEngine>) -> R) -> R {
        match &*self.engine.lock() {
            EngineState::Ready(engine) => f(Some(&**engine)),
            _ => f(None),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output.dir
    }

    /// Synthesize `text` and write it to a new WAV file.
    ///
    /// Only the text is validated; voice, speed and language go to the engine
    /// as given.
    pub fn generate(&self, text: &str, voice: &str, speed: f32, language: &str) -> SynthesisResult {
        let request = SynthesisRequest {
            text,
            voice,
            speed,
            language,
        };
        match self.try_generate(&request) {
            Ok(path) => {
                log::info!("Wrote {}", path.display());
                SynthesisResult {
                    audio_path: Some(path),
                    status: format!(
                        "Generated audio with voice: {voice}, speed: {speed:?}, language: {language}"
                    ),
                }
            }
            Err(e) => {
                log::warn!("{e}");
                SynthesisResult::failed(e)
            }
        }
    }

    fn try_generate(&self, request: &SynthesisRequest<'_>) -> Result<PathBuf, Error> {
        if request.text.trim().is_empty() {
            return Err(Error::EmptyInput);
        }

        let audio = {
            let mut state = self.engine.lock();
            let engine = self.ensure_ready(&mut state)?;
            engine
                .synthesize(request)
                .map_err(|e| Error::Synthesis(e.to_string()))?
        };

        if audio.sample_rate == 0 {
            return Err(Error::Synthesis(
                "engine returned audio with a zero sample rate".to_string(),
            ));
        }

        self.write_artifact(&audio, request.voice)
            .map_err(|e| Error::Synthesis(e.to_string()))
    }

    fn ensure_ready<'s>(
        &self,
        state: &'s mut EngineState,
    ) -> Result<&'s mut Box<dyn SynthesisEngine>, Error> {
        if !matches!(state, EngineState::Ready(_)) {
            log::info!("Loading synthesis engine from {}", self.assets.model.display());
            let engine = self.loader.load(&self.assets).map_err(|e| {
                let reason = e.to_string();
                *state = EngineState::Failed(reason.clone());
                Error::EngineInit(reason)
            })?;
            log::info!("Synthesis engine ready");
            *state = EngineState::Ready(engine);
        }
        match state {
            EngineState::Ready(engine) => Ok(engine),
            EngineState::Uninitialized | EngineState::Failed(_) => {
                Err(Error::EngineInit("engine is not loaded".to_string()))
            }
        }
    }

    fn write_artifact(&self, audio: &SynthesizedAudio, voice: &str) -> Result<PathBuf, Error> {
        create_unique(
            &self.output.dir,
            || artifact_name(&self.output.prefix, voice),
            |file| audio.write_wav_to(BufWriter::new(file)),
        )
    }
}

/// Create a fresh file in `dir` under a name from `next_name` and fill it with
/// `write`. A name that already exists is replaced by the next one, up to
/// [`MAX_NAME_ATTEMPTS`] names. A failed write removes the file.
fn create_unique(
    dir: &Path,
    mut next_name: impl FnMut() -> String,
    write: impl FnOnce(File) -> Result<(), hound::Error>,
) -> Result<PathBuf, Error> {
    for _ in 0..MAX_NAME_ATTEMPTS {
        let path = dir.join(next_name());
        let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
            Ok(file) => file,
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                log::debug!("{} exists, drawing another name", path.display());
                continue;
            }
            Err(e) => return Err(e.into()),
        };
        if let Err(e) = write(file) {
            let _ = fs::remove_file(&path);
            return Err(e.into());
        }
        return Ok(path);
    }
    Err(Error::Io(std::io::Error::new(
        ErrorKind::AlreadyExists,
        "could not find a free audio file name",
    )))
}

/// `{prefix}_{voice}_{YYYYMMDD_HHMMSS}_{8 hex}.wav`
fn artifact_name(prefix: &str, voice: &str) -> String {
    let voice: String = voice
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let id: u32 = rand::random();
    format!("{prefix}_{voice}_{timestamp}_{id:08x}.wav")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{StubLoader, STUB_SAMPLE_RATE};
    use regex::Regex;

    fn files_in(dir: &Path) -> Vec<PathBuf> {
        fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .collect()
    }

    fn coordinator(loader: StubLoader, dir: &Path) -> SynthesisCoordinator {
        SynthesisCoordinator::new(
            loader,
            AssetPaths {
                model: dir.join("kokoro-v1.0.onnx"),
                voices: dir.join("voices-v1.0.bin"),
            },
            OutputSettings {
                dir: dir.to_path_buf(),
                prefix: "kokoro".to_string(),
            },
        )
    }

    #[test]
    fn blank_text_is_rejected_without_engine_call() {
        let dir = tempfile::tempdir().unwrap();
        let loader = StubLoader::default();
        let coord = coordinator(loader.clone(), dir.path());

        for text in ["", "   ", "\n\t"] {
            let result = coord.generate(text, "af_sarah", 1.0, "en-us");
            assert_eq!(result.audio_path, None);
            assert_eq!(result.status, "Please enter some text to generate speech.");
        }
        assert_eq!(loader.loads(), 0);
        assert!(loader.calls().is_empty());
    }

    #[test]
    fn writes_readable_wav() {
        let dir = tempfile::tempdir().unwrap();
        let loader = StubLoader::default();
        let coord = coordinator(loader.clone(), dir.path());

        let result = coord.generate("Hello", "af_sarah", 1.0, "en-us");
        assert!(result.is_success(), "{}", result.status);
        assert_eq!(
            result.status,
            "Generated audio with voice: af_sarah, speed: 1.0, language: en-us"
        );

        let path = result.audio_path.unwrap();
        assert!(path.starts_with(dir.path()));
        let reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, STUB_SAMPLE_RATE);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.duration(), STUB_SAMPLE_RATE);

        assert_eq!(
            loader.calls(),
            vec![(
                "Hello".to_string(),
                "af_sarah".to_string(),
                1.0,
                "en-us".to_string()
            )]
        );
    }

    #[test]
    fn file_names_follow_pattern() {
        let name = artifact_name("kokoro", "af_sarah");
        let pattern = Regex::new(r"^kokoro_af_sarah_\d{8}_\d{6}_[0-9a-f]{8}\.wav$").unwrap();
        assert!(pattern.is_match(&name), "{name}");

        let name = artifact_name("kokoro", "../etc/passwd");
        assert!(name.starts_with("kokoro____etc_passwd_"), "{name}");
        assert!(!name.contains('/'));
    }

    #[test]
    fn identical_requests_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(StubLoader::default(), dir.path());

        let first = coord.generate("Hello", "af_sarah", 1.0, "en-us");
        let second = coord.generate("Hello", "af_sarah", 1.0, "en-us");
        assert!(first.is_success() && second.is_success());
        assert_ne!(first.audio_path, second.audio_path);
    }

    #[test]
    fn concurrent_requests_get_distinct_files() {
        let dir = tempfile::tempdir().unwrap();
        let loader = StubLoader::default();
        let coord = coordinator(loader.clone(), dir.path());

        let coord = &coord;
        let paths: Vec<PathBuf> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..4)
                .map(|_| s.spawn(move || coord.generate("Hello", "af_sarah", 1.0, "en-us")))
                .collect();
            handles
                .into_iter()
                .map(|h| h.join().unwrap().audio_path.unwrap())
                .collect()
        });

        let mut unique = paths.clone();
        unique.sort();
        unique.dedup();
        assert_eq!(unique.len(), 4);
        assert_eq!(loader.loads(), 1, "engine must be loaded once");
    }

    #[test]
    fn engine_errors_are_reported_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let coord = coordinator(StubLoader::default(), dir.path());

        let result = coord.generate("Hello", "bogus", 1.0, "en-us");
        assert_eq!(result.audio_path, None);
        assert!(result.status.contains("Voice 'bogus' not found"), "{}", result.status);
        assert!(result.status.starts_with("Error generating speech:"));

        // The coordinator keeps serving after a failure.
        assert!(coord.generate("Hello", "af_sarah", 1.0, "en-us").is_success());
    }

    #[test]
    fn failed_initialization_is_retried_per_request() {
        let dir = tempfile::tempdir().unwrap();
        let loader = StubLoader::failing(2);
        let coord = coordinator(loader.clone(), dir.path());

        assert!(coord.initialize().is_err());
        assert_eq!(
            coord.status(),
            EngineStatus::Failed("model file is corrupt".to_string())
        );

        let result = coord.generate("Hello", "af_sarah", 1.0, "en-us");
        assert_eq!(result.audio_path, None);
        assert_eq!(
            result.status,
            "Error initializing Kokoro TTS: model file is corrupt"
        );

        assert!(coord.generate("Hello", "af_sarah", 1.0, "en-us").is_success());
        assert_eq!(coord.status(), EngineStatus::Ready);

        assert!(coord.generate("Again", "af_sarah", 1.0, "en-us").is_success());
        assert_eq!(loader.loads(), 3, "a ready engine is reused");
    }

    #[test]
    fn speed_is_passed_through_unclamped() {
        let dir = tempfile::tempdir().unwrap();
        let loader = StubLoader::default();
        let coord = coordinator(loader.clone(), dir.path());

        assert!(coord.generate("Fast", "af_sarah", 3.0, "en-us").is_success());
        assert!(coord.generate("Slow", "af_sarah", 0.1, "xx-yy").is_success());

        let calls = loader.calls();
        assert_eq!(calls[0].2, 3.0);
        assert_eq!(calls[1].2, 0.1);
        assert_eq!(calls[1].3, "xx-yy");
    }

    #[test]
    fn unwritable_output_is_a_synthesis_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mut coord = coordinator(StubLoader::default(), dir.path());
        coord.output.dir = dir.path().join("missing");

        let result = coord.generate("Hello", "af_sarah", 1.0, "en-us");
        assert_eq!(result.audio_path, None);
        assert!(result.status.starts_with("Error generating speech:"));
    }

    #[test]
    fn closures_can_load_engines() {
        let dir = tempfile::tempdir().unwrap();
        let coord = SynthesisCoordinator::new(
            |_: &AssetPaths| -> Result<Box<dyn SynthesisEngine>, BoxError> {
                Err("no backend compiled in".into())
            },
            AssetPaths {
                model: dir.path().join("m"),
                voices: dir.path().join("v"),
            },
            OutputSettings {
                dir: dir.path().to_path_buf(),
                prefix: "kokoro".to_string(),
            },
        );

        assert_eq!(coord.status(), EngineStatus::Uninitialized);
        let result = coord.generate("Hello", "af_sarah", 1.0, "en-us");
        assert_eq!(result.status, "Error initializing Kokoro TTS: no backend compiled in");
        assert!(coord.with_engine(|engine| engine.is_none()));
    }

    struct ZeroRateEngine;

    impl SynthesisEngine for ZeroRateEngine {
        fn synthesize(
            &mut self,
            _request: &SynthesisRequest<'_>,
        ) -> Result<SynthesizedAudio, BoxError> {
            Ok(SynthesizedAudio {
                samples: vec![0.0; 10],
                sample_rate: 0,
            })
        }
    }

    #[test]
    fn zero_sample_rate_fails_without_leaving_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let coord = SynthesisCoordinator::new(
            |_: &AssetPaths| -> Result<Box<dyn SynthesisEngine>, BoxError> {
                Ok(Box::new(ZeroRateEngine))
            },
            AssetPaths {
                model: dir.path().join("m"),
                voices: dir.path().join("v"),
            },
            OutputSettings {
                dir: dir.path().to_path_buf(),
                prefix: "kokoro".to_string(),
            },
        );

        let result = coord.generate("Hello", "af_sarah", 1.0, "en-us");
        assert_eq!(result.audio_path, None);
        assert!(result.status.starts_with("Error generating speech:"), "{}", result.status);
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn failed_write_removes_the_file() {
        let dir = tempfile::tempdir().unwrap();

        let err = create_unique(
            dir.path(),
            || "kokoro_af_sarah.wav".to_string(),
            |_| Err(hound::Error::Unsupported),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Wav(hound::Error::Unsupported)), "{err:?}");
        assert!(files_in(dir.path()).is_empty());
    }

    #[test]
    fn taken_names_are_skipped() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("taken.wav"), b"keep").unwrap();

        let mut names = ["taken.wav", "taken.wav", "free.wav"].into_iter();
        let mut drawn = 0;
        let path = create_unique(
            dir.path(),
            || {
                drawn += 1;
                names.next().unwrap().to_string()
            },
            |_| Ok(()),
        )
        .unwrap();

        assert_eq!(path, dir.path().join("free.wav"));
        assert_eq!(drawn, 3);
        assert_eq!(fs::read(dir.path().join("taken.wav")).unwrap(), b"keep");
    }

    #[test]
    fn gives_up_after_eight_taken_names() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("taken.wav"), b"keep").unwrap();

        let mut drawn = 0;
        let err = create_unique(
            dir.path(),
            || {
                drawn += 1;
                "taken.wav".to_string()
            },
            |_| Ok(()),
        )
        .unwrap_err();

        assert_eq!(drawn, MAX_NAME_ATTEMPTS);
        assert_eq!(MAX_NAME_ATTEMPTS, 8);
        match err {
            Error::Io(e) => assert_eq!(e.kind(), ErrorKind::AlreadyExists),
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(files_in(dir.path()).len(), 1);
    }
}
