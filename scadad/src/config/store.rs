//! YAML document storage
//!
//! Each document is a single YAML file. Reads never fail: a missing, empty or
//! corrupt file yields the document's default and the cause is logged.
//! Writers are serialized per document, and every write goes to a temp file
//! that is then renamed over the original, so readers never see a partial file.

use chrono::{DateTime, Utc};
use scada_core::{api::FileStats, Result, ScadaError};
use serde::{de::DeserializeOwned, Serialize};
use std::io::ErrorKind;
use std::marker::PhantomData;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

/// A YAML file holding one document of type `T`.
pub(crate) struct YamlDocument<T> {
    path: PathBuf,
    /// Short name used in log messages ("inventory", "config", ...)
    label: &'static str,
    /// Held for the whole read-modify-write cycle
    writer: Mutex<()>,
    _doc: PhantomData<fn() -> T>,
}

impl<T> YamlDocument<T>
where
    T: Serialize + DeserializeOwned + Default,
{
    pub fn new(path: impl Into<PathBuf>, label: &'static str) -> Self {
        Self {
            path: path.into(),
            label,
            writer: Mutex::new(()),
            _doc: PhantomData,
        }
    }

    /// Path of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the document, falling back to its default on any failure.
    pub async fn load(&self) -> T {
        let content = match fs::read_to_string(&self.path).await {
            Ok(content) => content,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(
                    "{} file not found at {}, using defaults",
                    self.label,
                    self.path.display()
                );
                return T::default();
            }
            Err(e) => {
                error!(
                    "Error reading {} file {}: {}",
                    self.label,
                    self.path.display(),
                    e
                );
                return T::default();
            }
        };

        if content.trim().is_empty() {
            debug!("{} file is empty, using defaults", self.label);
            return T::default();
        }

        match serde_yaml::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                error!(
                    "Error parsing {} file {}: {}. Using defaults.",
                    self.label,
                    self.path.display(),
                    e
                );
                T::default()
            }
        }
    }

    /// Replace the document.
    pub async fn save(&self, doc: &T) -> Result<()> {
        let _guard = self.writer.lock().await;
        self.write(doc).await
    }

    /// Read-modify-write under the document's writer lock.
    pub async fn update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> R,
    {
        self.try_update(|doc| Ok(f(doc))).await
    }

    /// Like [`update`](Self::update), but the change is only written if `f`
    /// succeeds.
    pub async fn try_update<F, R>(&self, f: F) -> Result<R>
    where
        F: FnOnce(&mut T) -> Result<R>,
    {
        let _guard = self.writer.lock().await;
        let mut doc = self.load().await;
        let result = f(&mut doc)?;
        self.write(&doc).await?;
        Ok(result)
    }

    /// Write the default document if the file does not exist yet.
    pub async fn ensure_exists(&self) -> Result<()> {
        if fs::try_exists(&self.path).await.unwrap_or(false) {
            return Ok(());
        }
        debug!("{} file not found. Creating with defaults.", self.label);
        self.save(&T::default()).await
    }

    /// Size and modification time of the backing file, if it exists.
    pub async fn metadata(&self) -> Option<FileStats> {
        let meta = fs::metadata(&self.path).await.ok()?;
        Some(FileStats {
            size: meta.len(),
            modified: meta.modified().ok().map(DateTime::<Utc>::from),
        })
    }

    async fn write(&self, doc: &T) -> Result<()> {
        let content = serde_yaml::to_string(doc).map_err(|e| {
            ScadaError::Config(format!("Failed to serialize {}: {}", self.label, e))
        })?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ScadaError::Config(format!(
                    "Failed to create directory '{}': {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let temp_path = self.path.with_extension("yaml.tmp");

        fs::write(&temp_path, content)
            .await
            .map_err(|e| ScadaError::Config(format!("Failed to write temp file: {}", e)))?;

        fs::rename(&temp_path, &self.path)
            .await
            .map_err(|e| ScadaError::Config(format!("Failed to rename temp file: {}", e)))?;

        debug!("Saved {} to {}", self.label, self.path.display());
        Ok(())
    }
}
