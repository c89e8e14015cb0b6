//! Block storage abstraction used as the external source and sink of datasets.
//!
//! The engine sees storage as a flat namespace of line-oriented text objects.
//! [`ObjectStoreBlockStore`] implements it on top of the `object_store` crate,
//! so the same code path serves the in-memory backend used in tests and the
//! local filesystem backend used by the command-line driver.

use futures::TryStreamExt;
use object_store::{ObjectStore, PutPayload, local::LocalFileSystem, memory::InMemory, path::Path as ObjectPath};
use serde::Serialize;
use std::fmt::Debug;
use std::future::Future;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

use crate::error::{CommonError, Result};

/// Synchronous block storage interface.
///
/// Implementations must be safe to call from many worker threads at once.
pub trait BlockStore: Send + Sync + Debug {
    /// List the object paths stored under `prefix`, sorted.
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Read an object as a sequence of lines.
    fn read(&self, path: &str) -> Result<Vec<String>>;

    /// Replace an object with the given lines.
    fn write(&self, path: &str, lines: &[String]) -> Result<()>;

    /// Check if an object exists.
    fn exists(&self, path: &str) -> Result<bool>;

    /// Remove an object. Removing a missing object is not an error.
    fn remove(&self, path: &str) -> Result<()>;

    /// Get storage statistics.
    fn stats(&self) -> StorageStats;
}

/// Storage statistics.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StorageStats {
    pub read_count: u64,
    pub write_count: u64,
    pub delete_count: u64,
    pub exists_count: u64,
    pub error_count: u64,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Default)]
pub enum StorageBackend {
    /// In-memory storage for testing and development.
    #[default]
    Memory,
    /// Local filesystem storage rooted at `root_path`.
    LocalFileSystem { root_path: String },
}

/// Builder for creating storage instances.
#[derive(Debug, Default)]
pub struct StorageBuilder {
    backend: StorageBackend,
}

impl StorageBuilder {
    /// Create a new storage builder with the in-memory backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the storage backend.
    pub fn backend(mut self, backend: StorageBackend) -> Self {
        self.backend = backend;
        self
    }

    /// Build a storage instance with the specified configuration.
    pub fn build(self) -> Result<Arc<dyn BlockStore>> {
        let store: Arc<dyn ObjectStore> = match &self.backend {
            StorageBackend::Memory => Arc::new(InMemory::new()),
            StorageBackend::LocalFileSystem { root_path } => {
                let fs = LocalFileSystem::new_with_prefix(root_path).map_err(|e| {
                    CommonError::configuration_error_with_source(
                        format!("cannot open local storage root '{root_path}'"),
                        e,
                    )
                })?;
                Arc::new(fs)
            }
        };
        Ok(Arc::new(ObjectStoreBlockStore::new(store)?))
    }
}

/// Internal statistics tracker for storage operations.
#[derive(Debug, Default)]
struct InternalStorageStats {
    reads: AtomicU64,
    writes: AtomicU64,
    deletes: AtomicU64,
    exists: AtomicU64,
    errors: AtomicU64,
}

impl InternalStorageStats {
    fn snapshot(&self) -> StorageStats {
        StorageStats {
            read_count: self.reads.load(Ordering::Relaxed),
            write_count: self.writes.load(Ordering::Relaxed),
            delete_count: self.deletes.load(Ordering::Relaxed),
            exists_count: self.exists.load(Ordering::Relaxed),
            error_count: self.errors.load(Ordering::Relaxed),
        }
    }
}

/// [`BlockStore`] adapter over any `object_store` implementation.
///
/// The object store API is async; calls are driven to completion on a
/// private runtime so the store can be used from rayon worker threads.
pub struct ObjectStoreBlockStore {
    inner: Arc<dyn ObjectStore>,
    runtime: tokio::runtime::Runtime,
    stats: InternalStorageStats,
}

impl Debug for ObjectStoreBlockStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ObjectStoreBlockStore")
            .field("inner", &self.inner.to_string())
            .field("stats", &self.stats.snapshot())
            .finish()
    }
}

impl ObjectStoreBlockStore {
    /// Wrap an existing object store.
    pub fn new(inner: Arc<dyn ObjectStore>) -> Result<Self> {
        let runtime = tokio::runtime::Builder::new_multi_thread()
            .worker_threads(1)
            .thread_name("sparklet-storage")
            .enable_all()
            .build()
            .map_err(|e| CommonError::io_error_with_source("cannot start storage runtime", e))?;
        Ok(Self {
            inner,
            runtime,
            stats: InternalStorageStats::default(),
        })
    }

    /// Shorthand for an in-memory store.
    pub fn in_memory() -> Result<Self> {
        Self::new(Arc::new(InMemory::new()))
    }

    fn object_path(path: &str) -> Result<ObjectPath> {
        ObjectPath::parse(path).map_err(|e| {
            CommonError::storage_error_with_source(format!("invalid object path '{path}'"), e)
        })
    }

    fn block_on<F, T>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, object_store::Error>>,
    {
        self.runtime.block_on(fut).map_err(|e| {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
            CommonError::from(e)
        })
    }
}

impl BlockStore for ObjectStoreBlockStore {
    fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let prefix = Self::object_path(prefix)?;
        let metas: Vec<_> = self.block_on(self.inner.list(Some(&prefix)).try_collect())?;
        let mut paths: Vec<String> = metas.into_iter().map(|m| m.location.to_string()).collect();
        paths.sort();
        Ok(paths)
    }

    fn read(&self, path: &str) -> Result<Vec<String>> {
        let location = Self::object_path(path)?;
        let bytes = self.block_on(async {
            let result = self.inner.get(&location).await?;
            result.bytes().await
        })?;
        self.stats.reads.fetch_add(1, Ordering::Relaxed);

        let text = String::from_utf8(bytes.to_vec()).map_err(|e| {
            CommonError::storage_error_with_source(format!("object '{path}' is not valid UTF-8"), e)
        })?;
        let lines: Vec<String> = text.lines().map(str::to_owned).collect();
        debug!(path, lines = lines.len(), "read object");
        Ok(lines)
    }

    fn write(&self, path: &str, lines: &[String]) -> Result<()> {
        let location = Self::object_path(path)?;
        let mut body = String::with_capacity(lines.iter().map(|l| l.len() + 1).sum());
        for line in lines {
            body.push_str(line);
            body.push('\n');
        }
        self.block_on(self.inner.put(&location, PutPayload::from(body.into_bytes())))?;
        self.stats.writes.fetch_add(1, Ordering::Relaxed);
        debug!(path, lines = lines.len(), "wrote object");
        Ok(())
    }

    fn exists(&self, path: &str) -> Result<bool> {
        let location = Self::object_path(path)?;
        self.stats.exists.fetch_add(1, Ordering::Relaxed);
        match self.runtime.block_on(self.inner.head(&location)) {
            Ok(_) => Ok(true),
            Err(object_store::Error::NotFound { .. }) => Ok(false),
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    fn remove(&self, path: &str) -> Result<()> {
        let location = Self::object_path(path)?;
        match self.runtime.block_on(self.inner.delete(&location)) {
            Ok(()) | Err(object_store::Error::NotFound { .. }) => {
                self.stats.deletes.fetch_add(1, Ordering::Relaxed);
                Ok(())
            }
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                Err(e.into())
            }
        }
    }

    fn stats(&self) -> StorageStats {
        self.stats.snapshot()
    }
}
