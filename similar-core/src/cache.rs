use std::{collections::BTreeMap, fs::{self, File}, io::{BufWriter, ErrorKind, Write}, path};

use camino::{Utf8Path, Utf8PathBuf};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use normalize_path::NormalizePath;
use serde::{Deserialize, Serialize};

use crate::{embedding::{EmbeddingError, ImageEmbedder}, image_loader, similarity::l2_normalize};

/// A previously computed embedding along with the modification time of the file it was
/// computed from.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct CacheEntry {
    pub modified: DateTime<Utc>,
    pub embedding: Vec<f32>,
}

/// When the cache store is written back to its file.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum WritePolicy {
    /// Rewrite the whole file after every cache miss.
    #[default]
    Immediate,
    /// Only write when [`EmbeddingCache::flush`] is called (or the cache is dropped).
    Deferred,
}

/// Memoizes embeddings by file identity (absolute path + modification time) in a single JSON
/// file.
///
/// Entries are never evicted. A file rewritten without its modification time changing will
/// keep returning the old embedding. There is no locking around the backing file; two
/// processes sharing it will overwrite each other's additions.
pub struct EmbeddingCache<E: ImageEmbedder> {
    embedder: E,
    cache_file: Utf8PathBuf,
    store: BTreeMap<Utf8PathBuf, CacheEntry>,
    write_policy: WritePolicy,
    dirty: bool,
}

impl<E: ImageEmbedder> EmbeddingCache<E> {
    /// Opens the cache backed by `cache_file`. A missing file starts an empty cache, as does an
    /// unreadable or corrupt one (after logging a warning); the file is only created on the
    /// first write.
    pub fn open(cache_file: impl Into<Utf8PathBuf>, embedder: E) -> Self {
        let cache_file = cache_file.into();
        let store = load_store(&cache_file).unwrap_or_else(|e| {
            warn!("EmbeddingCache: Starting with an empty cache, could not load existing one: {}", e);
            BTreeMap::new()
        });
        debug!("EmbeddingCache: Opened cache file {} with {} entries", cache_file, store.len());

        EmbeddingCache {
            embedder,
            cache_file,
            store,
            write_policy: WritePolicy::default(),
            dirty: false,
        }
    }

    pub fn with_write_policy(mut self, write_policy: WritePolicy) -> Self {
        self.write_policy = write_policy;
        self
    }

    pub fn set_write_policy(&mut self, write_policy: WritePolicy) {
        self.write_policy = write_policy;
    }

    /// Returns the L2-normalized embedding for the image at `path`, computing it only if there
    /// is no entry for the path or the file's modification time differs from the stored one.
    ///
    /// A failure to persist the store after computing a new embedding is logged and does not
    /// fail the call.
    pub fn get_embedding(&mut self, path: &Utf8Path) -> Result<Vec<f32>, CacheError> {
        let key = absolute_path(path)?;
        let modified = modified_time(&key)?;

        if let Some(entry) = self.store.get(&key) {
            if entry.modified == modified {
                debug!("EmbeddingCache: Hit for {}", key);
                return Ok(entry.embedding.clone());
            }
            debug!("EmbeddingCache: Stale entry for {} (stored {}, current {})", key, entry.modified, modified);
        } else {
            debug!("EmbeddingCache: Miss for {}", key);
        }

        let image = image_loader::load_and_normalize(&key)
            .map_err(|e| CacheError::UnreadableImage { path: key.to_string(), source: e.into() })?;
        let embedding = self.embedder.embed(&image)
            .map_err(|e| CacheError::Embedding { path: key.to_string(), source: e })?;
        // NaN and infinities serialize as null and would make the whole cache file unreadable
        if !embedding.iter().all(|v| v.is_finite()) {
            return Err(CacheError::Embedding {
                path: key.to_string(),
                source: EmbeddingError::Output { msg: "embedding contains non-finite values".to_owned() },
            });
        }
        let embedding = l2_normalize(embedding);

        self.store.insert(key, CacheEntry { modified, embedding: embedding.clone() });
        self.dirty = true;

        if self.write_policy == WritePolicy::Immediate {
            if let Err(e) = self.flush() {
                warn!("EmbeddingCache: Failed to persist cache, keeping computed embedding in memory: {}", e);
            }
        }

        Ok(embedding)
    }

    /// Writes the store to the backing file if anything changed since the last write.
    ///
    /// The store is written to a sibling temp file which is then renamed over the cache file, so
    /// a crash mid-write leaves the previous version intact.
    pub fn flush(&mut self) -> Result<(), CacheError> {
        if !self.dirty {
            return Ok(());
        }
        debug!("EmbeddingCache: Writing {} entries to {}", self.store.len(), self.cache_file);

        let io_err = |operation: &'static str, e: anyhow::Error| CacheError::CacheIO {
            path: self.cache_file.to_string(),
            operation,
            source: e,
        };

        if let Some(parent) = self.cache_file.parent().filter(|p| !p.as_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| io_err("create directory", e.into()))?;
        }

        let tmp_file = Utf8PathBuf::from(format!("{}.tmp", self.cache_file));
        let file = File::create(&tmp_file).map_err(|e| io_err("create", e.into()))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &self.store).map_err(|e| io_err("serialize", e.into()))?;
        writer.flush().map_err(|e| io_err("write", e.into()))?;
        drop(writer);
        fs::rename(&tmp_file, &self.cache_file).map_err(|e| io_err("rename", e.into()))?;

        self.dirty = false;
        Ok(())
    }

    /// Discards in-memory state and reloads the store from the backing file. Unflushed entries
    /// are lost.
    pub fn reload(&mut self) -> Result<(), CacheError> {
        self.store = load_store(&self.cache_file)?;
        self.dirty = false;
        Ok(())
    }

    pub fn get_entry(&self, path: &Utf8Path) -> Option<&CacheEntry> {
        let key = absolute_path(path).ok()?;
        self.store.get(&key)
    }

    pub fn cache_file(&self) -> &Utf8Path {
        &self.cache_file
    }

    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    pub fn embedder(&self) -> &E {
        &self.embedder
    }
}

impl<E: ImageEmbedder> Drop for EmbeddingCache<E> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            warn!("EmbeddingCache: Failed to persist cache on drop: {}", e);
        }
    }
}

pub use error::*;

// Private functions and modules

fn load_store(cache_file: &Utf8Path) -> Result<BTreeMap<Utf8PathBuf, CacheEntry>, CacheError> {
    let bytes = match fs::read(cache_file) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(BTreeMap::new()),
        Err(e) => return Err(CacheError::CacheIO {
            path: cache_file.to_string(),
            operation: "read",
            source: e.into(),
        }),
    };

    serde_json::from_slice(&bytes).map_err(|e| CacheError::CacheIO {
        path: cache_file.to_string(),
        operation: "parse",
        source: e.into(),
    })
}

/// Cache keys are absolute and lexically normalized so "./a.png" and "a.png" share an entry
fn absolute_path(path: &Utf8Path) -> Result<Utf8PathBuf, CacheError> {
    let unreadable = |source: anyhow::Error| CacheError::UnreadableImage { path: path.to_string(), source };

    let absolute = path::absolute(path).map_err(|e| unreadable(e.into()))?.normalize();
    Utf8PathBuf::from_path_buf(absolute)
        .map_err(|p| unreadable(anyhow::anyhow!("absolute path is not valid UTF-8: {}", p.display())))
}

fn modified_time(path: &Utf8Path) -> Result<DateTime<Utc>, CacheError> {
    let unreadable = |source: anyhow::Error| CacheError::UnreadableImage { path: path.to_string(), source };

    let metadata = fs::metadata(path).map_err(|e| unreadable(e.into()))?;
    let modified = metadata.modified().map_err(|e| unreadable(e.into()))?;
    Ok(DateTime::from(modified))
}

mod error;
