use std::{
    fs, io,
    path::{Path, PathBuf},
};

use crate::LoadError;

/// Join a base directory and an asset file name the way the loader reports it.
pub fn asset_location(base: &Path, file: &str) -> PathBuf {
    base.join(file)
}

/// Read the raw bytes of `file` under `base`.
///
/// A missing file maps to `LoadError::NotFound` so callers can tell a bad
/// path apart from a corrupt asset.
pub fn read_asset(base: &Path, file: &str) -> Result<Vec<u8>, LoadError> {
    let path = asset_location(base, file);
    let location = path.display().to_string();
    if file.trim().is_empty() {
        return Err(LoadError::NotFound { location });
    }
    match fs::read(&path) {
        Ok(bytes) => Ok(bytes),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Err(LoadError::NotFound { location }),
        Err(source) => Err(LoadError::Io { location, source }),
    }
}
