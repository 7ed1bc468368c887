//! Replica client construction.
//!
//! Turns validated [`ReplicaDescriptor`]s into live clients. File replicas
//! get their directory created and resolved to an absolute path here, so
//! later writes never depend on the daemon's working directory. Object-store
//! replicas are parameter-only and touch nothing outside process memory;
//! bad credentials or an unreachable endpoint surface on first use, not at
//! startup.

use crate::client::{FileReplicaClient, ObjectStoreReplicaClient, ReplicaClient};
use crate::error::{EngineError, Result};
use crate::resolver::{ReplicaDescriptor, ReplicaParams, ReplicaTiming};
use std::path::Path;
use std::sync::Arc;

/// A constructed replica: its name, a live client, and the timing policy
/// its task runs under.
#[derive(Clone)]
pub struct ReplicaHandle {
    pub name: String,
    pub client: Arc<dyn ReplicaClient>,
    pub timing: ReplicaTiming,
}

impl std::fmt::Debug for ReplicaHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReplicaHandle")
            .field("name", &self.name)
            .field("kind", &self.client.kind())
            .field("target", &self.client.target())
            .field("timing", &self.timing)
            .finish()
    }
}

/// Construct the client for one resolved replica.
///
/// Fails with [`EngineError::Io`] when a file replica's directory cannot be
/// created or resolved, and with [`EngineError::UnsupportedKind`] when the
/// descriptor carries a kind this build does not ship.
pub fn build(descriptor: &ReplicaDescriptor) -> Result<ReplicaHandle> {
    let client: Arc<dyn ReplicaClient> = match &descriptor.params {
        ReplicaParams::File { path } => Arc::new(build_file_client(&descriptor.name, path)?),
        ReplicaParams::ObjectStore(params) => {
            Arc::new(ObjectStoreReplicaClient::new(params.clone()))
        }
        ReplicaParams::Other { kind } => {
            return Err(EngineError::unsupported_kind(&descriptor.name, kind));
        }
    };

    Ok(ReplicaHandle {
        name: descriptor.name.clone(),
        client,
        timing: descriptor.timing.clone(),
    })
}

fn build_file_client(name: &str, path: &Path) -> Result<FileReplicaClient> {
    // The error context names the replica, not just the path, so a failure
    // among many configured replicas points back to the config entry.
    let context = || format!("replica '{name}' at {}", path.display());
    std::fs::create_dir_all(path).map_err(|e| EngineError::io(context(), e))?;
    // The directory exists now, so canonicalize cannot race its creation.
    let absolute = path
        .canonicalize()
        .map_err(|e| EngineError::io(context(), e))?;
    Ok(FileReplicaClient::new(absolute))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ObjectStoreParams;
    use std::path::PathBuf;
    use std::time::Duration;

    fn file_descriptor(name: &str, path: PathBuf) -> ReplicaDescriptor {
        ReplicaDescriptor {
            name: name.to_string(),
            params: ReplicaParams::File { path },
            timing: ReplicaTiming::default(),
        }
    }

    fn object_store_descriptor(name: &str) -> ReplicaDescriptor {
        ReplicaDescriptor {
            name: name.to_string(),
            params: ReplicaParams::ObjectStore(ObjectStoreParams {
                bucket: "backups".to_string(),
                region: "eu-west-2".to_string(),
                endpoint: None,
                path_prefix: None,
                access_key_id: None,
                secret_access_key: None,
                force_path_style: false,
            }),
            timing: ReplicaTiming::default(),
        }
    }

    #[test]
    fn test_build_file_replica_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backups").join("db");
        assert!(!path.exists());

        let handle = build(&file_descriptor("local", path.clone())).unwrap();

        assert!(path.is_dir());
        assert_eq!(handle.name, "local");
        assert_eq!(handle.client.kind(), "file");
        assert!(handle.client.target().starts_with("file:///"));
    }

    #[test]
    fn test_build_file_replica_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        // Building against a directory that already exists is fine.
        let handle = build(&file_descriptor("local", dir.path().to_path_buf())).unwrap();
        assert_eq!(handle.client.kind(), "file");
    }

    #[test]
    fn test_build_file_replica_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        std::fs::write(&blocker, b"not a directory").unwrap();

        let err = build(&file_descriptor("local", blocker.clone())).unwrap_err();
        assert!(matches!(err, EngineError::Io { .. }));
        // The message carries both the replica name and the failing path.
        assert!(err.to_string().contains("'local'"));
        assert!(err.to_string().contains("blocker"));
    }

    #[test]
    fn test_build_object_store_replica_without_io() {
        let handle = build(&object_store_descriptor("offsite")).unwrap();
        assert_eq!(handle.client.kind(), "object-store");
        assert_eq!(handle.client.target(), "s3://backups");
    }

    #[test]
    fn test_build_unknown_kind_rejected() {
        let descriptor = ReplicaDescriptor {
            name: "vault".to_string(),
            params: ReplicaParams::Other {
                kind: "tape".to_string(),
            },
            timing: ReplicaTiming::default(),
        };

        let err = build(&descriptor).unwrap_err();
        assert!(matches!(err, EngineError::UnsupportedKind { .. }));
        let msg = err.to_string();
        assert!(msg.contains("vault"));
        assert!(msg.contains("tape"));
    }

    #[test]
    fn test_build_carries_timing() {
        let dir = tempfile::tempdir().unwrap();
        let mut descriptor = file_descriptor("local", dir.path().to_path_buf());
        descriptor.timing.sync_interval = Some(Duration::from_secs(10));

        let handle = build(&descriptor).unwrap();
        assert_eq!(handle.timing.sync_interval, Some(Duration::from_secs(10)));
    }

    #[test]
    fn test_handle_clone_shares_client() {
        let handle = build(&object_store_descriptor("offsite")).unwrap();
        let cloned = handle.clone();
        assert!(Arc::ptr_eq(&handle.client, &cloned.client));
    }

    #[test]
    fn test_handle_debug_names_target() {
        let handle = build(&object_store_descriptor("offsite")).unwrap();
        let debug = format!("{:?}", handle);
        assert!(debug.contains("offsite"));
        assert!(debug.contains("s3://backups"));
    }
}
