//! Fuzz target for replica kind parsing.
//!
//! `ReplicaKind::parse` must never panic and must be idempotent through its
//! canonical string form.

#![no_main]

use backup_engine::resolver::ReplicaKind;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let kind = ReplicaKind::parse(data);
    let _ = kind.to_string();
    assert_eq!(ReplicaKind::parse(kind.as_str()), kind);
});
