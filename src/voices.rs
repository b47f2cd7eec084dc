//! Reader for the `.npz` voice-embedding archive.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// Style vector dimension for Kokoro.
pub const STYLE_DIM: usize = 256;

#[derive(thiserror::Error, Debug)]
pub enum VoiceParseError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to read zip archive: {0}")]
    Archive(#[from] zip::result::ZipError),
    #[error("{name}: {reason}")]
    Npy { name: String, reason: String },
}

fn npy_error(name: &str, reason: impl Into<String>) -> VoiceParseError {
    VoiceParseError::Npy {
        name: name.to_string(),
        reason: reason.into(),
    }
}

/// Storage for all loaded voice style vectors.
///
/// Each voice is stored as a flat list of style vectors, where each vector
/// has 256 floats. The index into the list corresponds to the phoneme token
/// count, enabling prosody-consistent synthesis. Voice names keep the order
/// in which they appear in the archive.
pub struct VoiceStore {
    names: Vec<String>,
    voices: HashMap<String, Vec<[f32; STYLE_DIM]>>,
}

impl VoiceStore {
    /// Load all voices from a .npz (numpy zip) file.
    ///
    /// The file should be a standard .npz archive where each entry is a
    /// .npy file named after the voice (e.g., `af_heart.npy`).
    pub fn load(path: &Path) -> Result<Self, VoiceParseError> {
        let mut zip = zip::ZipArchive::new(File::open(path)?)?;

        let mut names = Vec::new();
        let mut voices = HashMap::new();

        for i in 0..zip.len() {
            let mut entry = zip.by_index(i)?;
            let Some(voice_name) = voice_name(entry.name()) else {
                continue;
            };

            let mut data = Vec::new();
            entry.read_to_end(&mut data)?;

            let style_vectors = parse_npy(&data, entry.name())?;
            if voices.insert(voice_name.clone(), style_vectors).is_none() {
                names.push(voice_name);
            }
        }

        log::info!("Loaded {} voices", names.len());
        Ok(Self { names, voices })
    }

    /// Get the style vector for a voice at the given index.
    ///
    /// The index is clamped to the valid range, so any index is safe.
    pub fn get_style(&self, voice: &str, idx: usize) -> Option<&[f32; STYLE_DIM]> {
        let styles = self.voices.get(voice)?;
        styles.get(idx.min(styles.len().saturating_sub(1)))
    }

    pub fn contains(&self, voice: &str) -> bool {
        self.voices.contains_key(voice)
    }

    /// All voice names in archive order.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// List voice names from an archive without decoding any embeddings.
pub fn list_archive_voices(path: &Path) -> Result<Vec<String>, VoiceParseError> {
    let mut zip = zip::ZipArchive::new(File::open(path)?)?;
    let mut names: Vec<String> = Vec::with_capacity(zip.len());
    for i in 0..zip.len() {
        let entry = zip.by_index_raw(i)?;
        if let Some(name) = voice_name(entry.name()) {
            if !names.contains(&name) {
                names.push(name);
            }
        }
    }
    Ok(names)
}

/// Voice name is the entry name without the .npy extension; directories are skipped.
fn voice_name(raw_name: &str) -> Option<String> {
    if raw_name.ends_with('/') {
        return None;
    }
    let name = raw_name.trim_end_matches(".npy");
    (!name.is_empty()).then(|| name.to_string())
}

/// Parse a numpy .npy file into a list of style vectors.
///
/// Expects a 2D float32 array of shape `[N, 256]` in little-endian format.
fn parse_npy(data: &[u8], name: &str) -> Result<Vec<[f32; STYLE_DIM]>, VoiceParseError> {
    if data.len() < 10 {
        return Err(npy_error(
            name,
            format!("file too short ({} bytes)", data.len()),
        ));
    }

    if &data[0..6] != b"\x93NUMPY" {
        return Err(npy_error(name, "invalid numpy magic bytes"));
    }

    // major version at [6], minor at [7], header_len at [8..10] (little-endian u16)
    let header_len = u16::from_le_bytes([data[8], data[9]]) as usize;
    let data_offset = 10 + header_len;

    if data.len() < data_offset {
        return Err(npy_error(
            name,
            format!(
                "header truncated (need {data_offset} bytes, got {})",
                data.len()
            ),
        ));
    }

    let float_data = &data[data_offset..];
    if float_data.len() % 4 != 0 {
        return Err(npy_error(
            name,
            format!(
                "float data length {} is not a multiple of 4",
                float_data.len()
            ),
        ));
    }

    let n_floats = float_data.len() / 4;
    if n_floats % STYLE_DIM != 0 {
        return Err(npy_error(
            name,
            format!("float count {n_floats} is not a multiple of {STYLE_DIM} (style vector dim)"),
        ));
    }

    let result = float_data
        .chunks_exact(STYLE_DIM * 4)
        .map(|row| {
            let mut vec = [0f32; STYLE_DIM];
            for (dst, bytes) in vec.iter_mut().zip(row.chunks_exact(4)) {
                *dst = f32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]);
            }
            vec
        })
        .collect();

    Ok(result)
}
