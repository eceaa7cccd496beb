//! Storage and clock seams for the counter catalog cache

use crate::error::CatalogError;
use crate::models::ProviderKind;
use chrono::{DateTime, Utc};
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Persistent backing for the cached counter list
pub trait CacheStore: Send + Sync {
    /// Last modification time, `None` when nothing is stored
    fn modified(&self) -> Result<Option<DateTime<Utc>>, CatalogError>;

    fn read(&self) -> Result<String, CatalogError>;

    /// Replace the stored contents
    fn write(&self, contents: &str) -> Result<(), CatalogError>;
}

/// Cache kept in a flat file
#[derive(Debug, Clone)]
pub struct FileCacheStore {
    path: PathBuf,
}

impl FileCacheStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Cache file for `kind` inside `dir`
    pub fn for_provider(dir: &Path, kind: ProviderKind) -> Self {
        Self::new(dir.join(kind.cache_file_name()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> CatalogError {
        CatalogError::Io {
            path: self.path.display().to_string(),
            source,
        }
    }
}

impl CacheStore for FileCacheStore {
    fn modified(&self) -> Result<Option<DateTime<Utc>>, CatalogError> {
        match fs::metadata(&self.path) {
            Ok(metadata) => {
                let modified = metadata.modified().map_err(|e| self.io_error(e))?;
                Ok(Some(DateTime::<Utc>::from(modified)))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(self.io_error(e)),
        }
    }

    fn read(&self) -> Result<String, CatalogError> {
        fs::read_to_string(&self.path).map_err(|e| self.io_error(e))
    }

    fn write(&self, contents: &str) -> Result<(), CatalogError> {
        replace_file(&self.path, contents).map_err(|e| self.io_error(e))
    }
}

/// Write to a temporary sibling, then rename over `path` so concurrent
/// readers never see a truncated file
pub(crate) fn replace_file(path: &Path, contents: &str) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }

    let temp_path = path.with_extension(format!("tmp.{}", std::process::id()));
    let mut file = File::create(&temp_path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;

    fs::rename(&temp_path, path).map_err(|e| {
        let _ = fs::remove_file(&temp_path);
        e
    })
}
