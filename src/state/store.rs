//! Snapshot persistence for cross-restart memory

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use super::SharedState;
use crate::common::errors::{ClientError, Result};
use crate::common::types::{
    is_valid_address, AlertHistoryEntry, AlertRecord, RecentNewPosition, TrackedPosition,
};

/// Serializable union of everything worth surviving a restart
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PersistedSnapshot {
    pub saved_at_ms: i64,
    pub known_accounts: Vec<String>,
    pub known_positions: Vec<(String, i64)>,
    pub tracked_positions: Vec<TrackedPosition>,
    pub alert_records: Vec<(String, AlertRecord)>,
    #[serde(default)]
    pub recent_alerts: Vec<AlertHistoryEntry>,
    #[serde(default)]
    pub recent_new_positions: Vec<RecentNewPosition>,
}

/// Reads the snapshot once at boot, overwrites it on a fixed interval
#[derive(Debug, Clone)]
pub struct StateStore {
    path: PathBuf,
    stale_after_ms: i64,
}

impl StateStore {
    pub fn new(path: impl AsRef<Path>, stale_after_minutes: i64) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            stale_after_ms: stale_after_minutes * 60 * 1000,
        }
    }

    /// Load the snapshot from disk, if present
    ///
    /// Tracked positions are discarded from stale snapshots: resuming
    /// close/liquidation monitoring on outdated price context would fire
    /// false alerts. The discovery and dedup ledgers are monotonic and safe
    /// to load at any age.
    pub fn load(&self) -> Result<Option<PersistedSnapshot>> {
        if !self.path.exists() {
            return Ok(None);
        }

        let raw = std::fs::read_to_string(&self.path)?;
        let mut snapshot: PersistedSnapshot =
            serde_json::from_str(&raw).map_err(|e| ClientError::Persistence(e.to_string()))?;

        let age_ms = Utc::now().timestamp_millis() - snapshot.saved_at_ms;
        if age_ms > self.stale_after_ms {
            warn!(
                age_minutes = age_ms / 60_000,
                "Snapshot is stale, discarding tracked positions"
            );
            snapshot.tracked_positions.clear();
        }

        // Junk addresses from old data must not poison the ledgers
        snapshot.known_accounts.retain(|a| is_valid_address(a));
        snapshot
            .tracked_positions
            .retain(|p| is_valid_address(&p.position.account));

        Ok(Some(snapshot))
    }

    /// Full-snapshot overwrite; not incremental
    pub fn save(&self, snapshot: &PersistedSnapshot) -> Result<()> {
        let json = serde_json::to_string_pretty(snapshot)
            .map_err(|e| ClientError::Persistence(e.to_string()))?;
        std::fs::write(&self.path, json)?;
        Ok(())
    }

    /// Load from disk into the shared state; a successful load ends warm-up
    pub fn restore_into(&self, state: &SharedState) {
        match self.load() {
            Ok(Some(snapshot)) => {
                apply_snapshot(&snapshot, state);
                state.end_warmup();
                info!(
                    known_accounts = snapshot.known_accounts.len(),
                    known_positions = snapshot.known_positions.len(),
                    tracked = snapshot.tracked_positions.len(),
                    "State restored from disk"
                );
            }
            Ok(None) => info!("No snapshot on disk, starting fresh"),
            Err(e) => warn!("Failed to load snapshot, starting fresh: {}", e),
        }
    }

    /// Capture and persist the current state; errors are logged, the next
    /// interval retries
    pub fn persist(&self, state: &SharedState) {
        let snapshot = capture_snapshot(state);
        if let Err(e) = self.save(&snapshot) {
            warn!("Failed to save snapshot: {}", e);
        }
    }
}

/// Point-in-time copy of the shared state
pub fn capture_snapshot(state: &SharedState) -> PersistedSnapshot {
    PersistedSnapshot {
        saved_at_ms: Utc::now().timestamp_millis(),
        known_accounts: state
            .known_accounts
            .lock()
            .expect("known_accounts poisoned")
            .iter()
            .cloned()
            .collect(),
        known_positions: state
            .known_positions
            .lock()
            .expect("known_positions poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
        tracked_positions: state
            .tracked_positions
            .lock()
            .expect("tracked_positions poisoned")
            .clone(),
        alert_records: state
            .alert_records
            .lock()
            .expect("alert_records poisoned")
            .iter()
            .map(|(k, v)| (k.clone(), *v))
            .collect(),
        recent_alerts: state
            .recent_alerts
            .lock()
            .expect("recent_alerts poisoned")
            .clone(),
        recent_new_positions: state
            .recent_new_positions
            .lock()
            .expect("recent_new_positions poisoned")
            .clone(),
    }
}

/// Replace the shared state's collections with the snapshot's contents
pub fn apply_snapshot(snapshot: &PersistedSnapshot, state: &SharedState) {
    *state.known_accounts.lock().expect("known_accounts poisoned") =
        snapshot.known_accounts.iter().cloned().collect();
    *state
        .known_positions
        .lock()
        .expect("known_positions poisoned") = snapshot.known_positions.iter().cloned().collect();
    *state
        .tracked_positions
        .lock()
        .expect("tracked_positions poisoned") = snapshot.tracked_positions.clone();
    *state.alert_records.lock().expect("alert_records poisoned") =
        snapshot.alert_records.iter().cloned().collect();
    *state.recent_alerts.lock().expect("recent_alerts poisoned") = snapshot.recent_alerts.clone();
    *state
        .recent_new_positions
        .lock()
        .expect("recent_new_positions poisoned") = snapshot.recent_new_positions.clone();
}
