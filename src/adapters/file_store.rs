//! JSON file adapter for the desired-state record.
//!
//! Implements [`ConfigPort`] on a single file at a well-known path.
//!
//! - Atomic writes: the record goes to a sibling `*.tmp` file, is synced,
//!   then renamed over the target.  A crash leaves either the old or the
//!   new record, never a torn one.
//! - A record that is not a JSON object reads as [`ConfigError::Corrupted`].

use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use log::{debug, warn};
use serde_json::Value;

use crate::app::ports::{ConfigError, ConfigPort};

pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.file_name().unwrap_or_default().to_os_string();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl ConfigPort for FileConfigStore {
    fn load(&self) -> Result<Value, ConfigError> {
        let text = fs::read_to_string(&self.path).map_err(|e| {
            if e.kind() == ErrorKind::NotFound {
                ConfigError::NotFound
            } else {
                warn!("FileStore: read {}: {}", self.path.display(), e);
                ConfigError::IoError
            }
        })?;
        match serde_json::from_str::<Value>(&text) {
            Ok(value) if value.is_object() => Ok(value),
            Ok(_) | Err(_) => {
                warn!("FileStore: {} is not a JSON object", self.path.display());
                Err(ConfigError::Corrupted)
            }
        }
    }

    fn save(&self, record: &Value) -> Result<(), ConfigError> {
        let bytes = serde_json::to_vec_pretty(record).map_err(|_| ConfigError::Corrupted)?;
        let tmp = self.tmp_path();
        let write = || -> std::io::Result<()> {
            let mut file = File::create(&tmp)?;
            file.write_all(&bytes)?;
            file.sync_all()?;
            fs::rename(&tmp, &self.path)
        };
        write().map_err(|e| {
            warn!("FileStore: write {}: {}", self.path.display(), e);
            let _ = fs::remove_file(&tmp);
            ConfigError::IoError
        })?;
        debug!("FileStore: saved {} bytes to {}", bytes.len(), self.path.display());
        Ok(())
    }
}
