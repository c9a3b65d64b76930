//! On-disk snapshot of remote zip archives.
//!
//! A [`DataCache`] keeps one downloaded archive on disk and its decoded
//! contents in memory. The snapshot is re-downloaded when
//!
//! - no local file exists,
//! - the local file is empty,
//! - the local file predates today and the remote copy is newer.
//!
//! The freshness check and download run under a single async mutex, so
//! concurrent callers on a cold cache share one download.
//!
//! # Cache Structure
//!
//! ```text
//! ~/.cache/nist-resolver/
//!   pubs-export.zip
//!   index-v1.zip
//! ```

mod archive;

pub use archive::{HttpArchive, RemoteArchive};

use chrono::{DateTime, Local, NaiveDate, Utc};
use serde::de::DeserializeOwned;
use std::fs;
use std::io::{Cursor, Read, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::sources::SourceError;

/// Encoding of the first entry inside the archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Payload {
    Json,
    Yaml,
}

#[derive(Debug)]
struct Loaded<T> {
    data: Arc<T>,
    loaded_on: NaiveDate,
}

/// Memoized, mutex-guarded archive snapshot
#[derive(Debug)]
pub struct DataCache<T> {
    path: PathBuf,
    remote: Arc<dyn RemoteArchive>,
    payload: Payload,
    state: Mutex<Option<Loaded<T>>>,
}

/// Snapshot of the on-disk state, for status reporting
#[derive(Debug, Clone)]
pub struct CacheStatus {
    pub path: PathBuf,
    pub exists: bool,
    pub size_bytes: u64,
    pub modified: Option<DateTime<Utc>>,
}

impl<T> DataCache<T>
where
    T: DeserializeOwned + Send + Sync,
{
    pub fn new(path: impl Into<PathBuf>, remote: Arc<dyn RemoteArchive>, payload: Payload) -> Self {
        Self {
            path: path.into(),
            remote,
            payload,
            state: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current data, downloading a fresh snapshot when stale
    pub async fn get(&self) -> Result<Arc<T>, SourceError> {
        let mut state = self.state.lock().await;
        let today = Local::now().date_naive();

        if let Some(loaded) = state.as_ref() {
            if loaded.loaded_on == today {
                tracing::debug!(path = %self.path.display(), "cache hit");
                return Ok(Arc::clone(&loaded.data));
            }
        }

        let local = local_modified(&self.path);
        let stale = local.map_or(true, |m| m.with_timezone(&Local).date_naive() < today);
        if stale {
            self.refresh(local).await?;
        }

        let bytes = tokio::fs::read(&self.path).await?;
        let data = Arc::new(self.decode(&bytes)?);
        *state = Some(Loaded {
            data: Arc::clone(&data),
            loaded_on: today,
        });
        Ok(data)
    }

    /// Drop the in-memory copy and the file on disk
    pub async fn clear(&self) -> Result<(), SourceError> {
        let mut state = self.state.lock().await;
        *state = None;
        match fs::remove_file(&self.path) {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "cache cleared");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    pub fn status(&self) -> CacheStatus {
        let metadata = fs::metadata(&self.path).ok();
        CacheStatus {
            path: self.path.clone(),
            exists: metadata.is_some(),
            size_bytes: metadata.as_ref().map_or(0, |m| m.len()),
            modified: metadata
                .and_then(|m| m.modified().ok())
                .map(DateTime::<Utc>::from),
        }
    }

    async fn refresh(&self, local: Option<DateTime<Utc>>) -> Result<(), SourceError> {
        if let Some(local) = local {
            match self.remote.last_modified().await {
                Ok(Some(remote)) if remote <= local => {
                    tracing::debug!(
                        path = %self.path.display(),
                        "remote unchanged, keeping snapshot"
                    );
                    return Ok(());
                }
                Ok(Some(_)) => {}
                Ok(None) => {
                    tracing::warn!(path = %self.path.display(), "remote last-modified unavailable")
                }
                Err(e) => {
                    tracing::warn!(
                        path = %self.path.display(),
                        error = %e,
                        "failed to read remote last-modified"
                    )
                }
            }
        }

        let bytes = self.remote.download().await?;
        if bytes.is_empty() {
            return Err(SourceError::Archive(format!(
                "empty download for {}",
                self.path.display()
            )));
        }
        write_atomically(&self.path, &bytes)?;
        tracing::info!(path = %self.path.display(), size = bytes.len(), "cache updated");
        Ok(())
    }

    fn decode(&self, bytes: &[u8]) -> Result<T, SourceError> {
        let content = unzip_first(bytes)?;
        let data = match self.payload {
            Payload::Json => serde_json::from_str(&content)?,
            Payload::Yaml => serde_yaml::from_str(&content)?,
        };
        Ok(data)
    }
}

/// Modification time of a non-empty file
fn local_modified(path: &Path) -> Option<DateTime<Utc>> {
    let metadata = fs::metadata(path).ok()?;
    if metadata.len() == 0 {
        return None;
    }
    metadata.modified().ok().map(DateTime::<Utc>::from)
}

fn write_atomically(path: &Path, bytes: &[u8]) -> Result<(), SourceError> {
    let dir = path.parent().unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)?;
    let mut file = tempfile::NamedTempFile::new_in(dir)?;
    file.write_all(bytes)?;
    file.persist(path).map_err(|e| SourceError::Io(e.error))?;
    Ok(())
}

/// Read the first entry of a zip archive as UTF-8
pub fn unzip_first(bytes: &[u8]) -> Result<String, SourceError> {
    let mut archive = zip::ZipArchive::new(Cursor::new(bytes))?;
    if archive.is_empty() {
        return Err(SourceError::Archive("archive has no entries".to_string()));
    }
    let mut entry = archive.by_index(0)?;
    let mut content = String::new();
    entry.read_to_string(&mut content)?;
    Ok(content)
}
