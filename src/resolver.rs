// Copyright (c) 2025-2026 Adrian Robinson. Licensed under the AGPL-3.0.
// See LICENSE file in the project root for full license text.

//! Replica spec resolution.
//!
//! Validates and normalizes the declarative [`ReplicaSpec`] list of a
//! [`BackupConfig`] into constructible [`ReplicaDescriptor`]s: names checked
//! for presence and uniqueness, kind-required fields checked, duration
//! strings parsed, retention normalized (zero means forever).
//!
//! Resolution is pure. It performs no I/O and never constructs a client;
//! that is the factory's job. Unrecognized kinds pass through resolution
//! carrying their raw kind string and are rejected by the factory, so that
//! "this config is inconsistent" and "this build does not ship that
//! backend" stay distinct errors.

use crate::config::{BackupConfig, ReplicaSpec};
use crate::error::{EngineError, Result};
use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

/// Replica backend kind, parsed from the raw config string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaKind {
    /// Local filesystem directory.
    File,
    /// S3-compatible object storage.
    ObjectStore,
    /// Anything this build does not recognize. Carried through resolution;
    /// rejected by the client factory.
    Other(String),
}

impl ReplicaKind {
    /// Parse a raw kind string. Accepts `"file"` and `"object-store"`
    /// (alias `"s3"`); everything else becomes [`ReplicaKind::Other`].
    pub fn parse(raw: &str) -> Self {
        match raw {
            "file" => Self::File,
            "object-store" | "s3" => Self::ObjectStore,
            other => Self::Other(other.to_string()),
        }
    }

    /// Canonical string form.
    pub fn as_str(&self) -> &str {
        match self {
            Self::File => "file",
            Self::ObjectStore => "object-store",
            Self::Other(raw) => raw,
        }
    }
}

impl std::fmt::Display for ReplicaKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Normalized per-replica timing policy.
///
/// All fields are `None` when the engine default applies. Retention has
/// already been normalized: zero collapses to `None` (retain forever).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReplicaTiming {
    pub sync_interval: Option<Duration>,
    pub snapshot_interval: Option<Duration>,
    pub retention: Option<Duration>,
    pub retention_check_interval: Option<Duration>,
}

/// Validated parameters for an S3-compatible object-store replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectStoreParams {
    pub bucket: String,
    pub region: String,
    pub endpoint: Option<String>,
    pub path_prefix: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub force_path_style: bool,
}

/// Kind-specific, validated construction parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicaParams {
    File {
        path: PathBuf,
    },
    ObjectStore(ObjectStoreParams),
    /// Unrecognized kind; the factory turns this into an error naming the
    /// replica and the kind.
    Other {
        kind: String,
    },
}

impl ReplicaParams {
    /// The kind these parameters belong to.
    pub fn kind(&self) -> ReplicaKind {
        match self {
            Self::File { .. } => ReplicaKind::File,
            Self::ObjectStore(_) => ReplicaKind::ObjectStore,
            Self::Other { kind } => ReplicaKind::Other(kind.clone()),
        }
    }
}

/// A validated, normalized replica definition, ready for the client factory.
#[derive(Debug, Clone, PartialEq)]
pub struct ReplicaDescriptor {
    /// Unique name within the config.
    pub name: String,
    /// Validated kind-specific parameters.
    pub params: ReplicaParams,
    /// Normalized timing policy.
    pub timing: ReplicaTiming,
}

impl ReplicaDescriptor {
    /// The replica's backend kind.
    pub fn kind(&self) -> ReplicaKind {
        self.params.kind()
    }
}

/// Validate and normalize a config's replica list, in declared order.
///
/// Fails with [`EngineError::Validation`] on an empty replica list, empty or
/// duplicate names, missing kind-required fields (file path; object-store
/// bucket and region), or unparseable duration strings.
pub fn resolve(config: &BackupConfig) -> Result<Vec<ReplicaDescriptor>> {
    if config.replicas.is_empty() {
        return Err(EngineError::validation("no replicas configured"));
    }

    let mut seen: HashSet<&str> = HashSet::with_capacity(config.replicas.len());
    let mut descriptors = Vec::with_capacity(config.replicas.len());

    for (index, spec) in config.replicas.iter().enumerate() {
        if spec.name.is_empty() {
            return Err(EngineError::validation(format!(
                "replica at index {index} has an empty name"
            )));
        }
        if !seen.insert(spec.name.as_str()) {
            return Err(EngineError::validation(format!(
                "duplicate replica name: {}",
                spec.name
            )));
        }

        let params = resolve_params(spec)?;
        let timing = resolve_timing(spec)?;

        descriptors.push(ReplicaDescriptor {
            name: spec.name.clone(),
            params,
            timing,
        });
    }

    Ok(descriptors)
}

fn resolve_params(spec: &ReplicaSpec) -> Result<ReplicaParams> {
    if spec.kind.is_empty() {
        return Err(EngineError::validation(format!(
            "replica '{}': kind must not be empty",
            spec.name
        )));
    }

    match ReplicaKind::parse(&spec.kind) {
        ReplicaKind::File => {
            let path = spec.path.as_deref().filter(|p| !p.is_empty()).ok_or_else(|| {
                EngineError::validation(format!(
                    "replica '{}': file replicas require a path",
                    spec.name
                ))
            })?;
            Ok(ReplicaParams::File {
                path: PathBuf::from(path),
            })
        }
        ReplicaKind::ObjectStore => {
            let bucket = spec
                .bucket
                .as_deref()
                .filter(|b| !b.is_empty())
                .ok_or_else(|| {
                    EngineError::validation(format!(
                        "replica '{}': object-store replicas require a bucket",
                        spec.name
                    ))
                })?;
            let region = spec
                .region
                .as_deref()
                .filter(|r| !r.is_empty())
                .ok_or_else(|| {
                    EngineError::validation(format!(
                        "replica '{}': object-store replicas require a region",
                        spec.name
                    ))
                })?;
            Ok(ReplicaParams::ObjectStore(ObjectStoreParams {
                bucket: bucket.to_string(),
                region: region.to_string(),
                endpoint: spec.endpoint.clone(),
                path_prefix: spec.path_prefix.clone(),
                access_key_id: spec.access_key_id.clone(),
                secret_access_key: spec.secret_access_key.clone(),
                force_path_style: spec.force_path_style,
            }))
        }
        ReplicaKind::Other(kind) => Ok(ReplicaParams::Other { kind }),
    }
}

fn resolve_timing(spec: &ReplicaSpec) -> Result<ReplicaTiming> {
    let retention = parse_duration_field(&spec.name, "retention", spec.retention.as_deref())?;

    Ok(ReplicaTiming {
        sync_interval: parse_duration_field(
            &spec.name,
            "sync_interval",
            spec.sync_interval.as_deref(),
        )?,
        snapshot_interval: parse_duration_field(
            &spec.name,
            "snapshot_interval",
            spec.snapshot_interval.as_deref(),
        )?,
        // Retention of zero means "retain forever", same as absent.
        retention: retention.filter(|d| !d.is_zero()),
        retention_check_interval: parse_duration_field(
            &spec.name,
            "retention_check_interval",
            spec.retention_check_interval.as_deref(),
        )?,
    })
}

fn parse_duration_field(
    replica: &str,
    field: &str,
    raw: Option<&str>,
) -> Result<Option<Duration>> {
    match raw {
        None => Ok(None),
        Some(value) => humantime::parse_duration(value).map(Some).map_err(|e| {
            EngineError::validation(format!(
                "replica '{replica}': invalid {field} '{value}': {e}"
            ))
        }),
    }
}
