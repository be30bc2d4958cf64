//! A directory-backed `KeyValueStore`: one file per key.
//!
//! File names are the lowercase SHA-256 hex of the key, so any key (case
//! titles included) maps to a safe, fixed-length name. Writes go to a
//! temporary file first and are renamed into place.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use pharmsim_contracts::error::{SimError, SimResult};
use pharmsim_core::traits::KeyValueStore;

/// The file name a key is stored under.
///
/// Returns a lowercase 64-character hex string.
pub fn key_file_name(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) a store rooted at `dir`.
    pub fn open(dir: impl Into<PathBuf>) -> SimResult<Self> {
        let dir = dir.into();
        fs::create_dir_all(&dir).map_err(|e| storage_error(&dir, e))?;
        debug!(dir = %dir.display(), "file store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(key_file_name(key))
    }
}

fn storage_error(path: &Path, e: std::io::Error) -> SimError {
    SimError::Storage {
        reason: format!("{}: {e}", path.display()),
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> SimResult<Option<String>> {
        let path = self.path_for(key);
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(storage_error(&path, e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> SimResult<()> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, value).map_err(|e| storage_error(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| storage_error(&path, e))
    }

    fn remove(&self, key: &str) -> SimResult<()> {
        let path = self.path_for(key);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(storage_error(&path, e)),
        }
    }
}
