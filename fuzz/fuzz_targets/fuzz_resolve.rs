//! Fuzz target for config resolution.
//!
//! Feeds arbitrary bytes through JSON decoding into `BackupConfig` and then
//! `resolve`, which must reject or accept but never panic.

#![no_main]

use backup_engine::{resolve, BackupConfig};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<BackupConfig>(data) {
        // Should never panic
        let _ = resolve(&config);
        let _ = config.monitor_interval_duration();
        let _ = config.checkpoint_interval_duration();
    }
});
