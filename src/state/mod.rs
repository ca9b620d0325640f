//! Shared state context for the surveillance pipeline
//!
//! All cross-component memory lives in one `SharedState` constructed at boot
//! and passed by `Arc` into each component. Collections are guarded by plain
//! mutexes; critical sections are short and never span an await.

pub mod store;

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use crate::common::types::{
    AlertHistoryEntry, AlertRecord, RecentNewPosition, TrackedPosition,
};

pub use store::{PersistedSnapshot, StateStore};

/// Cap on the bounded history lists
pub const HISTORY_LIMIT: usize = 100;

/// Cross-component process memory
#[derive(Debug, Default)]
pub struct SharedState {
    /// Accounts observed at any point, to tell "new" from "seen before"
    pub known_accounts: Mutex<HashSet<String>>,
    /// `(account, coin)` discovery ledger; value is first-seen unix ms
    pub known_positions: Mutex<HashMap<String, i64>>,
    /// Positions under active close/liquidation monitoring
    pub tracked_positions: Mutex<Vec<TrackedPosition>>,
    /// Per-alert-key dedup records
    pub alert_records: Mutex<HashMap<String, AlertRecord>>,
    /// Bounded history of fired alerts
    pub recent_alerts: Mutex<Vec<AlertHistoryEntry>>,
    /// Bounded history of discovered new whales
    pub recent_new_positions: Mutex<Vec<RecentNewPosition>>,
    /// During warm-up, discoveries are recorded without alerting
    warming_up: AtomicBool,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            warming_up: AtomicBool::new(true),
            ..Self::default()
        }
    }

    /// Ledger key for a position
    pub fn position_key(account: &str, coin: &str) -> String {
        format!("{account}-{coin}")
    }

    pub fn is_warming_up(&self) -> bool {
        self.warming_up.load(Ordering::SeqCst)
    }

    pub fn end_warmup(&self) {
        self.warming_up.store(false, Ordering::SeqCst);
    }

    /// Record an account/position pair into the discovery ledgers
    pub fn record_discovery(&self, account: &str, coin: &str, now_ms: i64) {
        self.known_positions
            .lock()
            .expect("known_positions poisoned")
            .entry(Self::position_key(account, coin))
            .or_insert(now_ms);
        self.known_accounts
            .lock()
            .expect("known_accounts poisoned")
            .insert(account.to_string());
    }

    pub fn is_known_position(&self, account: &str, coin: &str) -> bool {
        self.known_positions
            .lock()
            .expect("known_positions poisoned")
            .contains_key(&Self::position_key(account, coin))
    }

    pub fn is_known_account(&self, account: &str) -> bool {
        self.known_accounts
            .lock()
            .expect("known_accounts poisoned")
            .contains(account)
    }

    /// Insert or replace the tracked entry for `(account, coin)`
    pub fn upsert_tracked(&self, tracked: TrackedPosition) {
        let mut positions = self
            .tracked_positions
            .lock()
            .expect("tracked_positions poisoned");
        match positions.iter_mut().find(|p| {
            p.position.account == tracked.position.account && p.position.coin == tracked.position.coin
        }) {
            Some(existing) => *existing = tracked,
            None => positions.push(tracked),
        }
    }

    /// Drop the tracked entry for `(account, coin)`, if any
    pub fn remove_tracked(&self, account: &str, coin: &str) {
        self.tracked_positions
            .lock()
            .expect("tracked_positions poisoned")
            .retain(|p| !(p.position.account == account && p.position.coin == coin));
    }

    /// Accounts that currently have tracked positions
    pub fn tracked_accounts(&self) -> Vec<String> {
        let positions = self
            .tracked_positions
            .lock()
            .expect("tracked_positions poisoned");
        let mut accounts: Vec<String> = Vec::new();
        for p in positions.iter() {
            if !accounts.contains(&p.position.account) {
                accounts.push(p.position.account.clone());
            }
        }
        accounts
    }

    pub fn push_recent_alert(&self, entry: AlertHistoryEntry) {
        let mut alerts = self.recent_alerts.lock().expect("recent_alerts poisoned");
        alerts.insert(0, entry);
        alerts.truncate(HISTORY_LIMIT);
    }

    pub fn push_recent_new_position(&self, entry: RecentNewPosition) {
        let mut recent = self
            .recent_new_positions
            .lock()
            .expect("recent_new_positions poisoned");
        recent.insert(0, entry);
        recent.truncate(HISTORY_LIMIT);
    }
}
