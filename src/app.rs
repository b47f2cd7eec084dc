//! Process-wide wiring and the bindings a presentation layer renders.

use crate::assets;
use crate::catalog::VoiceCatalog;
use crate::config::AppConfig;
use crate::coordinator::{EngineLoader, OutputSettings, SynthesisCoordinator};
use crate::Error;

/// Locale tags offered by the language selector.
pub const LANGUAGE_OPTIONS: [&str; 11] = [
    "en-us", "ja-jp", "en-gb", "zh-cn", "de-de", "es-es", "fr-fr", "it-it", "ko-kr", "pt-br",
    "ru-ru",
];

pub const DEFAULT_VOICE: &str = "af_sarah";
pub const DEFAULT_LANGUAGE: &str = "en-us";

/// Continuous speed slider.
///
/// This control is where the speed bound is enforced; the coordinator and
/// engines take whatever value they are given.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SpeedControl {
    pub min: f32,
    pub max: f32,
    pub step: f32,
    pub default: f32,
}

impl Default for SpeedControl {
    fn default() -> Self {
        Self {
            min: 0.5,
            max: 2.0,
            step: 0.1,
            default: 1.0,
        }
    }
}

impl SpeedControl {
    pub fn accepts(&self, speed: f32) -> bool {
        (self.min..=self.max).contains(&speed)
    }
}

/// Everything the presentation layer binds its controls to.
#[derive(Debug, Clone)]
pub struct Form<'a> {
    pub voices: &'a [String],
    pub default_voice: &'static str,
    pub languages: &'static [&'static str],
    pub default_language: &'static str,
    pub speed: SpeedControl,
}

/// Startup state shared by every request.
pub struct App {
    pub catalog: VoiceCatalog,
    pub coordinator: SynthesisCoordinator,
}

impl App {
    /// Provision assets, try to load the engine once, and build the catalog.
    ///
    /// Missing assets that cannot be downloaded abort startup. A failed engine
    /// load does not: the coordinator retries on the first request.
    pub fn bootstrap(config: &AppConfig, loader: impl EngineLoader + 'static) -> Result<Self, Error> {
        let assets = assets::provision(config)?;
        let coordinator = SynthesisCoordinator::new(loader, assets, OutputSettings::from(config));

        match coordinator.initialize() {
            Ok(()) => log::info!("Successfully loaded synthesis engine"),
            Err(e) => log::error!("{e}"),
        }

        let catalog =
            coordinator.with_engine(|engine| VoiceCatalog::build(engine, &config.voices_path));
        log::info!(
            "Voice catalog: {} voices in {} languages (from {})",
            catalog.len(),
            catalog.groups().len(),
            catalog.source()
        );

        Ok(Self {
            catalog,
            coordinator,
        })
    }

    pub fn form(&self) -> Form<'_> {
        Form {
            voices: self.catalog.voices(),
            default_voice: DEFAULT_VOICE,
            languages: &LANGUAGE_OPTIONS,
            default_language: DEFAULT_LANGUAGE,
            speed: SpeedControl::default(),
        }
    }
}
