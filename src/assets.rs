//! Startup download of the model and voice assets.

use std::fs::{self, File};
use std::io;
use std::path::{Path, PathBuf};

use crate::config::{AppConfig, AssetPaths};
use crate::Error;

/// Make sure `local_path` exists, downloading it from `url` if it does not.
///
/// The body is streamed into a `.part` sibling and renamed into place once
/// complete, so `local_path` never holds a truncated download.
pub fn ensure_asset(name: &str, url: &str, local_path: &Path) -> Result<(), Error> {
    if local_path.exists() {
        log::debug!("{name} already present at {}", local_path.display());
        return Ok(());
    }

    log::info!("Downloading {name} from {url}...");
    download(url, local_path).map_err(|reason| Error::AssetAcquisition {
        name: name.to_string(),
        reason,
    })?;
    log::info!("Saved {name} to {}", local_path.display());
    Ok(())
}

/// Fetch both assets named by the configuration.
pub fn provision(config: &AppConfig) -> Result<AssetPaths, Error> {
    ensure_asset("Kokoro model", &config.model_url, &config.model_path)?;
    ensure_asset("voice archive", &config.voices_url, &config.voices_path)?;
    Ok(config.assets())
}

fn download(url: &str, local_path: &Path) -> Result<(), String> {
    let mut resp = reqwest::blocking::get(url)
        .and_then(|r| r.error_for_status())
        .map_err(|e| e.to_string())?;

    if let Some(parent) = local_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| e.to_string())?;
    }

    let part = part_path(local_path);
    let copied = File::create(&part).and_then(|mut file| {
        io::copy(&mut resp, &mut file)?;
        file.sync_all()
    });
    if let Err(e) = copied {
        let _ = fs::remove_file(&part);
        return Err(e.to_string());
    }

    fs::rename(&part, local_path).map_err(|e| e.to_string())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().unwrap_or_default().to_os_string();
    name.push(".part");
    path.with_file_name(name)
}
