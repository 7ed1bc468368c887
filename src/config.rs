//! Configuration for the backup engine.
//!
//! This module defines the declarative configuration for one source database
//! and its replicas. Configuration is passed to
//! [`BackupEngine::new()`](crate::BackupEngine::new) and can be constructed
//! programmatically or deserialized from YAML/JSON; parsing the serialized
//! bytes (and any decryption of stored config) is the host's responsibility.
//!
//! A config is immutable once handed to the coordinator. When configuration
//! changes, the host builds a fresh config and constructs a fresh
//! coordinator; there is no live mutation.
//!
//! # Quick Start
//!
//! ```rust
//! use backup_engine::config::{BackupConfig, ReplicaSpec};
//!
//! let config = BackupConfig {
//!     replicas: vec![
//!         ReplicaSpec::file("local", "/var/backups/app-db"),
//!     ],
//!     ..Default::default()
//! };
//! ```
//!
//! # Configuration Structure
//!
//! ```text
//! BackupConfig
//! ├── monitor_interval: Option<String>     # source change-log polling cadence
//! ├── checkpoint_interval: Option<String>  # source checkpoint cadence
//! └── replicas: Vec<ReplicaSpec>           # ordered backup destinations
//!     ├── name, kind                       # identity + factory branch
//!     ├── path | bucket/region/...         # kind-specific target
//!     └── sync_interval, retention, ...    # per-replica timing policy
//! ```
//!
//! # YAML Example
//!
//! ```yaml
//! monitor_interval: "1s"
//!
//! replicas:
//!   - name: "local"
//!     kind: "file"
//!     path: "/var/backups/app-db"
//!
//!   - name: "offsite"
//!     kind: "object-store"
//!     bucket: "prod-backups"
//!     region: "eu-west-2"
//!     path_prefix: "app-db"
//!     sync_interval: "10s"
//!     retention: "72h"
//! ```
//!
//! Durations are humantime strings ("500ms", "10s", "1m", "72h"). Absent
//! means "use the engine default"; a retention of zero or absent means
//! "retain forever". Replica-level strings are validated and normalized by
//! [`resolver::resolve`](crate::resolver::resolve); the config-level
//! accessors here parse leniently and fall back to `None`.

use serde::{Deserialize, Serialize};
use std::time::Duration;

// ═══════════════════════════════════════════════════════════════════════════════
// Top-level config: the declarative unit for one source database
// ═══════════════════════════════════════════════════════════════════════════════

/// The whole declarative unit for one source database.
///
/// # Fields
///
/// - `monitor_interval`: how often the engine polls the source change log.
/// - `checkpoint_interval`: how often the engine checkpoints the source.
/// - `replicas`: ordered backup destinations; startup order is declaration
///   order and stop order is the reverse.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BackupConfig {
    /// Source-level change-log polling cadence. Absent = engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub monitor_interval: Option<String>,

    /// Source-level checkpoint cadence. Absent = engine default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint_interval: Option<String>,

    /// The ordered list of backup destinations. Must be non-empty.
    pub replicas: Vec<ReplicaSpec>,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self {
            monitor_interval: None,
            checkpoint_interval: None,
            replicas: Vec::new(),
        }
    }
}

impl BackupConfig {
    /// Create a minimal single-replica config for testing, backed by a
    /// filesystem directory.
    pub fn for_testing(path: &str) -> Self {
        Self {
            monitor_interval: None,
            checkpoint_interval: None,
            replicas: vec![ReplicaSpec::file("local", path)],
        }
    }

    /// Parse `monitor_interval`, falling back to `None` when absent or
    /// unparseable.
    pub fn monitor_interval_duration(&self) -> Option<Duration> {
        parse_optional_duration(self.monitor_interval.as_deref())
    }

    /// Parse `checkpoint_interval`, falling back to `None` when absent or
    /// unparseable.
    pub fn checkpoint_interval_duration(&self) -> Option<Duration> {
        parse_optional_duration(self.checkpoint_interval.as_deref())
    }
}

fn parse_optional_duration(raw: Option<&str>) -> Option<Duration> {
    raw.and_then(|s| humantime::parse_duration(s).ok())
}

// ═══════════════════════════════════════════════════════════════════════════════
// ReplicaSpec: one entry per backup destination
// ═══════════════════════════════════════════════════════════════════════════════

/// Configuration for a single backup destination.
///
/// The `kind` field selects the client factory branch and determines which
/// of the optional fields are mandatory: `"file"` requires `path`,
/// `"object-store"` (alias `"s3"`) requires `bucket` and `region`. The kind
/// string is carried raw so that unrecognized kinds reach the factory, which
/// rejects them with a descriptive error.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplicaSpec {
    /// Unique identifier within a config. Required, non-empty.
    pub name: String,

    /// Backend kind: `"file"`, `"object-store"` (alias `"s3"`).
    pub kind: String,

    /// Filesystem directory for `file` replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    /// Bucket name for `object-store` replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bucket: Option<String>,

    /// Bucket region for `object-store` replicas.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,

    /// Optional alternative endpoint for S3-compatible object stores.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint: Option<String>,

    /// Static credentials for `object-store` replicas. Absent means the
    /// engine's ambient credential chain is used.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_key_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub secret_access_key: Option<String>,

    /// Key prefix inside the bucket under which this source's entries live.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_prefix: Option<String>,

    /// Use path-style addressing (`endpoint/bucket/key`) instead of
    /// virtual-hosted style. Needed by most S3-compatible alternatives.
    #[serde(default)]
    pub force_path_style: bool,

    /// How often the engine ships accumulated segments. Absent = default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sync_interval: Option<String>,

    /// How often the engine takes a full snapshot. Absent = default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_interval: Option<String>,

    /// How long entries are kept. Zero or absent = retain forever.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention: Option<String>,

    /// How often retention is enforced. Absent = default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub retention_check_interval: Option<String>,
}

impl ReplicaSpec {
    /// Create a filesystem replica spec with default timing.
    pub fn file(name: &str, path: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: "file".to_string(),
            path: Some(path.to_string()),
            ..Self::empty(name)
        }
    }

    /// Create an object-store replica spec with default timing.
    pub fn object_store(name: &str, bucket: &str, region: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: "object-store".to_string(),
            bucket: Some(bucket.to_string()),
            region: Some(region.to_string()),
            ..Self::empty(name)
        }
    }

    fn empty(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: String::new(),
            path: None,
            bucket: None,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            path_prefix: None,
            force_path_style: false,
            sync_interval: None,
            snapshot_interval: None,
            retention: None,
            retention_check_interval: None,
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════════════════════════
