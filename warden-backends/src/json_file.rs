//! A JSON document persisted to one file, cached in memory.

use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::{Path, PathBuf};

use warden_core::BackendError;

/// The file is read once on first access and rewritten after every mutation.
/// It does not need to exist; it is created on the first write.
pub struct JsonFile<T> {
    path: PathBuf,
    cache: RwLock<Option<T>>,
}

impl<T> JsonFile<T>
where
    T: Default + Serialize + DeserializeOwned,
{
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the file into the cache if not already loaded.
    fn ensure_loaded(&self) -> Result<(), BackendError> {
        let mut cache = self.cache.write();
        if cache.is_some() {
            return Ok(());
        }

        let document = if self.path.exists() {
            let contents = std::fs::read_to_string(&self.path)?;
            if contents.trim().is_empty() {
                T::default()
            } else {
                serde_json::from_str(&contents)?
            }
        } else {
            T::default()
        };

        *cache = Some(document);
        Ok(())
    }

    fn flush(&self, document: &T) -> Result<(), BackendError> {
        if let Some(parent) = self.path.parent() {
            if !parent.exists() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let json = serde_json::to_string_pretty(document)?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Run `f` against the current document.
    pub fn read<R>(&self, f: impl FnOnce(&T) -> R) -> Result<R, BackendError> {
        self.ensure_loaded()?;
        let cache = self.cache.read();
        match cache.as_ref() {
            Some(document) => Ok(f(document)),
            None => Err(BackendError::Other(format!(
                "{} was not loaded",
                self.path.display()
            ))),
        }
    }

    /// Mutate the document with `f` and persist it.
    ///
    /// `f` returns whether anything changed; the file is only rewritten if so.
    pub fn update<R>(&self, f: impl FnOnce(&mut T) -> (R, bool)) -> Result<R, BackendError> {
        self.ensure_loaded()?;
        let mut cache = self.cache.write();
        let document = cache.get_or_insert_with(T::default);
        let (result, changed) = f(document);
        if changed {
            self.flush(document)?;
        }
        Ok(result)
    }

    /// Forget the cached document; the next access re-reads the file.
    pub fn invalidate(&self) {
        *self.cache.write() = None;
    }
}
