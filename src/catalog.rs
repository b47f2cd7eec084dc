//! Voice discovery and language grouping.
//!
//! The catalog is resolved once at startup from a prioritized list of
//! [`VoiceSource`]s. A source that fails or comes back empty is logged at
//! debug level and the next one is tried; the built-in list at the end always
//! answers, so building a catalog never fails.

use std::borrow::Cow;
use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::voices::list_archive_voices;
use crate::{BoxError, SynthesisEngine};

/// Group key for identifiers without a two-letter language prefix.
pub const OTHER_GROUP: &str = "other";

/// Used when no other source yields any voice.
pub const BUILTIN_VOICES: [&str; 14] = [
    "af_sarah",
    "en_erin",
    "en_daniel",
    "en_vicki",
    "en_brandon",
    "ja_akira",
    "ja_naomi",
    "de_anna",
    "fr_elise",
    "es_carlos",
    "it_marco",
    "zh_mei",
    "ru_ivan",
    "ko_mina",
];

static VOICE_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([a-z]{2})_(.+)$").expect("valid regex"));

/// One way of finding out which voices exist.
pub trait VoiceSource {
    /// Short name used in log lines.
    fn name(&self) -> &'static str;

    /// `Ok(None)` when the capability is absent.
    fn discover(&self) -> Result<Option<Vec<String>>, BoxError>;
}

/// Ask the engine to enumerate its voices.
pub struct EngineEnumeration<'a>(pub Option<&'a dyn SynthesisEngine>);

impl VoiceSource for EngineEnumeration<'_> {
    fn name(&self) -> &'static str {
        "engine enumeration"
    }

    fn discover(&self) -> Result<Option<Vec<String>>, BoxError> {
        Ok(self.0.and_then(|engine| engine.list_voices()))
    }
}

/// Read the keys of the engine's voice-embedding table.
pub struct EngineVoiceTable<'a>(pub Option<&'a dyn SynthesisEngine>);

impl VoiceSource for EngineVoiceTable<'_> {
    fn name(&self) -> &'static str {
        "engine voice table"
    }

    fn discover(&self) -> Result<Option<Vec<String>>, BoxError> {
        Ok(self
            .0
            .and_then(|engine| engine.voice_table())
            .map(|table| table.names().to_vec()))
    }
}

/// Read entry names straight from the voice archive on disk.
pub struct VoiceArchive<'a>(pub &'a Path);

impl VoiceSource for VoiceArchive<'_> {
    fn name(&self) -> &'static str {
        "voice archive"
    }

    fn discover(&self) -> Result<Option<Vec<String>>, BoxError> {
        if !self.0.exists() {
            return Ok(None);
        }
        Ok(Some(list_archive_voices(self.0)?))
    }
}

pub struct BuiltInVoices;

impl VoiceSource for BuiltInVoices {
    fn name(&self) -> &'static str {
        "built-in list"
    }

    fn discover(&self) -> Result<Option<Vec<String>>, BoxError> {
        Ok(Some(BUILTIN_VOICES.iter().map(|v| v.to_string()).collect()))
    }
}

/// Voices sharing a language prefix, in discovery order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VoiceGroup {
    pub code: String,
    pub voices: Vec<String>,
}

impl VoiceGroup {
    pub fn label(&self) -> Cow<'static, str> {
        language_label(&self.code)
    }
}

/// Immutable voice catalog.
#[derive(Debug, Clone)]
pub struct VoiceCatalog {
    groups: Vec<VoiceGroup>,
    voices: Vec<String>,
    source: &'static str,
}

impl VoiceCatalog {
    /// Resolve the catalog from the standard source chain:
    /// engine enumeration, engine voice table, voice archive, built-in list.
    pub fn build(engine: Option<&dyn SynthesisEngine>, voices_path: &Path) -> Self {
        Self::resolve(&[
            &EngineEnumeration(engine),
            &EngineVoiceTable(engine),
            &VoiceArchive(voices_path),
            &BuiltInVoices,
        ])
    }

    /// Take the first source yielding a non-empty list.
    pub fn resolve(sources: &[&dyn VoiceSource]) -> Self {
        for source in sources {
            match source.discover() {
                Ok(Some(voices)) if !voices.is_empty() => {
                    log::info!("Found {} voices via {}", voices.len(), source.name());
                    return Self::from_voices(voices, source.name());
                }
                Ok(Some(_)) => log::debug!("{} returned no voices", source.name()),
                Ok(None) => log::debug!("{} not available", source.name()),
                Err(e) => log::debug!("{} failed: {e}", source.name()),
            }
        }
        log::warn!("No voice source answered, using built-in list");
        Self::from_voices(
            BUILTIN_VOICES.iter().map(|v| v.to_string()).collect(),
            BuiltInVoices.name(),
        )
    }

    /// Group discovered identifiers; duplicates keep their first position.
    pub fn from_voices(discovered: Vec<String>, source: &'static str) -> Self {
        let mut groups: Vec<VoiceGroup> = Vec::new();
        for voice in discovered {
            if groups.iter().any(|g| g.voices.contains(&voice)) {
                continue;
            }
            let code = language_code(&voice).to_string();
            match groups.iter_mut().find(|g| g.code == code) {
                Some(group) => group.voices.push(voice),
                None => groups.push(VoiceGroup {
                    code,
                    voices: vec![voice],
                }),
            }
        }

        let voices = groups.iter().flat_map(|g| g.voices.iter().cloned()).collect();
        Self {
            groups,
            voices,
            source,
        }
    }

    /// Flattened list for UI binding, ordered group by group.
    pub fn voices(&self) -> &[String] {
        &self.voices
    }

    pub fn groups(&self) -> &[VoiceGroup] {
        &self.groups
    }

    pub fn group(&self, code: &str) -> Option<&VoiceGroup> {
        self.groups.iter().find(|g| g.code == code)
    }

    pub fn contains(&self, voice: &str) -> bool {
        self.voices.iter().any(|v| v == voice)
    }

    pub fn len(&self) -> usize {
        self.voices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.voices.is_empty()
    }

    /// Name of the source the catalog was built from.
    pub fn source(&self) -> &'static str {
        self.source
    }
}

/// Two-letter language prefix of a voice identifier, or [`OTHER_GROUP`].
pub fn language_code(voice: &str) -> &str {
    VOICE_ID_RE
        .captures(voice)
        .and_then(|c| c.get(1))
        .map_or(OTHER_GROUP, |m| m.as_str())
}

/// English display name for a language code.
pub fn language_label(code: &str) -> Cow<'static, str> {
    let name = match code {
        "af" => "Afrikaans",
        "en" => "English",
        "ja" => "Japanese",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "it" => "Italian",
        "zh" => "Chinese",
        "ru" => "Russian",
        "ko" => "Korean",
        OTHER_GROUP => "Other",
        _ => return Cow::Owned(code.to_uppercase()),
    };
    Cow::Borrowed(name)
}
