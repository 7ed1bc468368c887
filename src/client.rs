// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replica storage clients.
//!
//! A [`ReplicaClient`] is the write/read capability a replica task uses to
//! reach its destination. Two kinds ship with this crate:
//!
//! - [`FileReplicaClient`]: a local directory, driven through `tokio::fs`.
//! - [`ObjectStoreReplicaClient`]: S3-compatible storage. The client holds
//!   the validated bucket coordinates; the actual wire protocol lives behind
//!   an injected [`ObjectStoreTransport`], so construction never touches the
//!   network and connectivity problems surface on first use.
//!
//! Segment keys are replica-relative, `/`-separated, and may not escape the
//! replica root.

use crate::resolver::ObjectStoreParams;
use std::future::Future;
use std::path::{Component, Path, PathBuf};
use std::pin::Pin;
use std::sync::{Arc, OnceLock};

/// Result type for replica storage operations.
pub type StorageResult<T> = std::result::Result<T, StorageError>;

/// Type alias for boxed async futures (reduces trait signature complexity).
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = StorageResult<T>> + Send + 'a>>;

/// Simplified error for replica storage operations.
#[derive(Debug, Clone)]
pub struct StorageError(pub String);

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::error::Error for StorageError {}

/// A stored segment as reported by [`ReplicaClient::list_entries`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplicaEntry {
    /// Replica-relative key.
    pub key: String,
    /// Size in bytes.
    pub size: u64,
}

/// Capability handle for one replica destination.
///
/// Replica tasks write segments through this trait and the retention
/// enforcer lists and deletes through it. Implementations must be cheap to
/// share behind an `Arc` and safe to call concurrently.
pub trait ReplicaClient: Send + Sync + 'static {
    /// Canonical kind string, e.g. `"file"`.
    fn kind(&self) -> &'static str;

    /// Human-readable destination for logs, e.g. `file:///var/backups`
    /// or `s3://bucket/prefix`.
    fn target(&self) -> String;

    /// Write one segment, creating any intermediate structure.
    fn store_segment(
        &self,
        key: &str,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + '_>>;

    /// Read one segment back. Fails if the key does not exist.
    fn fetch_segment(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = StorageResult<Vec<u8>>> + Send + '_>>;

    /// List all stored segments, keys sorted ascending.
    fn list_entries(&self) -> BoxFuture<'_, Vec<ReplicaEntry>>;

    /// Delete one segment. Deleting a missing key is not an error.
    fn delete_entry(&self, key: &str) -> BoxFuture<'_, ()>;
}

// ═══════════════════════════════════════════════════════════════════════════
// File replica
// ═══════════════════════════════════════════════════════════════════════════

/// Replica client backed by a local directory.
pub struct FileReplicaClient {
    root: PathBuf,
}

impl FileReplicaClient {
    /// Wrap an existing directory. The factory has already created `root`
    /// and resolved it to an absolute path.
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The replica root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Map a segment key to a path under the root, rejecting absolute keys
    /// and keys with `..` components.
    fn segment_path(&self, key: &str) -> StorageResult<PathBuf> {
        if key.is_empty() {
            return Err(StorageError("segment key must not be empty".to_string()));
        }
        let relative = Path::new(key);
        if relative.is_absolute()
            || relative
                .components()
                .any(|c| !matches!(c, Component::Normal(_)))
        {
            return Err(StorageError(format!("invalid segment key: {key}")));
        }
        Ok(self.root.join(relative))
    }
}

impl ReplicaClient for FileReplicaClient {
    fn kind(&self) -> &'static str {
        "file"
    }

    fn target(&self) -> String {
        format!("file://{}", self.root.display())
    }

    fn store_segment(
        &self,
        key: &str,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + '_>> {
        let path = self.segment_path(key);
        Box::pin(async move {
            let path = path?;
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .map_err(|e| StorageError(format!("mkdir {}: {e}", parent.display())))?;
            }
            tokio::fs::write(&path, &data)
                .await
                .map_err(|e| StorageError(format!("write {}: {e}", path.display())))
        })
    }

    fn fetch_segment(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = StorageResult<Vec<u8>>> + Send + '_>> {
        let path = self.segment_path(key);
        let key = key.to_string();
        Box::pin(async move {
            let path = path?;
            match tokio::fs::read(&path).await {
                Ok(data) => Ok(data),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    Err(StorageError(format!("segment not found: {key}")))
                }
                Err(e) => Err(StorageError(format!("read {}: {e}", path.display()))),
            }
        })
    }

    fn list_entries(&self) -> BoxFuture<'_, Vec<ReplicaEntry>> {
        Box::pin(async move {
            let mut entries = Vec::new();
            let mut pending = vec![self.root.clone()];

            while let Some(dir) = pending.pop() {
                let mut read_dir = match tokio::fs::read_dir(&dir).await {
                    Ok(rd) => rd,
                    // A root that was never written to lists as empty.
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                    Err(e) => {
                        return Err(StorageError(format!("list {}: {e}", dir.display())))
                    }
                };
                while let Some(entry) = read_dir
                    .next_entry()
                    .await
                    .map_err(|e| StorageError(format!("list {}: {e}", dir.display())))?
                {
                    let meta = entry.metadata().await.map_err(|e| {
                        StorageError(format!("stat {}: {e}", entry.path().display()))
                    })?;
                    if meta.is_dir() {
                        pending.push(entry.path());
                    } else if let Ok(relative) = entry.path().strip_prefix(&self.root) {
                        entries.push(ReplicaEntry {
                            key: relative.to_string_lossy().into_owned(),
                            size: meta.len(),
                        });
                    }
                }
            }

            entries.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(entries)
        })
    }

    fn delete_entry(&self, key: &str) -> BoxFuture<'_, ()> {
        let path = self.segment_path(key);
        Box::pin(async move {
            let path = path?;
            match tokio::fs::remove_file(&path).await {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(StorageError(format!("delete {}: {e}", path.display()))),
            }
        })
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// Object-store replica
// ═══════════════════════════════════════════════════════════════════════════

/// Wire-level operations against an S3-compatible store.
///
/// The daemon injects an implementation (an SDK wrapper in production, an
/// in-memory map in tests). Keys arriving here are full object keys, prefix
/// already applied.
pub trait ObjectStoreTransport: Send + Sync + 'static {
    fn put(&self, key: &str, data: Vec<u8>) -> BoxFuture<'_, ()>;

    fn get(&self, key: &str) -> BoxFuture<'_, Vec<u8>>;

    /// List objects under a key prefix.
    fn list(&self, prefix: &str) -> BoxFuture<'_, Vec<ReplicaEntry>>;

    fn delete(&self, key: &str) -> BoxFuture<'_, ()>;
}

/// Replica client for S3-compatible object storage.
///
/// Construction only records the validated parameters. Every operation goes
/// through the injected transport; until [`connect_transport`] is called,
/// operations fail with a connectivity-shaped error.
///
/// [`connect_transport`]: ObjectStoreReplicaClient::connect_transport
pub struct ObjectStoreReplicaClient {
    params: ObjectStoreParams,
    transport: OnceLock<Arc<dyn ObjectStoreTransport>>,
}

impl ObjectStoreReplicaClient {
    pub fn new(params: ObjectStoreParams) -> Self {
        Self {
            params,
            transport: OnceLock::new(),
        }
    }

    /// Install the transport that carries this client's requests.
    /// The first transport wins; later calls are ignored.
    pub fn connect_transport(&self, transport: Arc<dyn ObjectStoreTransport>) {
        let _ = self.transport.set(transport);
    }

    pub fn bucket(&self) -> &str {
        &self.params.bucket
    }

    pub fn region(&self) -> &str {
        &self.params.region
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.params.endpoint.as_deref()
    }

    fn transport(&self) -> StorageResult<&Arc<dyn ObjectStoreTransport>> {
        self.transport.get().ok_or_else(|| {
            StorageError(format!(
                "{}: no object store transport connected",
                self.target()
            ))
        })
    }

    /// Full object key under the configured prefix.
    fn object_key(&self, key: &str) -> String {
        match self.params.path_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("{}/{}", prefix.trim_end_matches('/'), key)
            }
            _ => key.to_string(),
        }
    }
}

impl ReplicaClient for ObjectStoreReplicaClient {
    fn kind(&self) -> &'static str {
        "object-store"
    }

    fn target(&self) -> String {
        match self.params.path_prefix.as_deref() {
            Some(prefix) if !prefix.is_empty() => {
                format!("s3://{}/{}", self.params.bucket, prefix.trim_matches('/'))
            }
            _ => format!("s3://{}", self.params.bucket),
        }
    }

    fn store_segment(
        &self,
        key: &str,
        data: Vec<u8>,
    ) -> Pin<Box<dyn Future<Output = StorageResult<()>> + Send + '_>> {
        let key = self.object_key(key);
        Box::pin(async move { self.transport()?.put(&key, data).await })
    }

    fn fetch_segment(
        &self,
        key: &str,
    ) -> Pin<Box<dyn Future<Output = StorageResult<Vec<u8>>> + Send + '_>> {
        let key = self.object_key(key);
        Box::pin(async move { self.transport()?.get(&key).await })
    }

    fn list_entries(&self) -> BoxFuture<'_, Vec<ReplicaEntry>> {
        Box::pin(async move {
            let prefix = self.object_key("");
            let mut entries = self.transport()?.list(&prefix).await?;
            // Report keys replica-relative, same as the file client.
            if !prefix.is_empty() {
                for entry in &mut entries {
                    if let Some(stripped) = entry.key.strip_prefix(&prefix) {
                        entry.key = stripped.to_string();
                    }
                }
            }
            entries.sort_by(|a, b| a.key.cmp(&b.key));
            Ok(entries)
        })
    }

    fn delete_entry(&self, key: &str) -> BoxFuture<'_, ()> {
        let key = self.object_key(key);
        Box::pin(async move { self.transport()?.delete(&key).await })
    }
}
