//! Alert deduplication and escalation
//!
//! Decides, per alert key, whether a detected condition is worth surfacing.
//! Danger alerts use a hybrid cooldown: within the cooldown window only a
//! materially worse severity re-fires; after it, any hit re-fires as a
//! recurring alert. New-whale and insider alerts fire once per key for
//! their lifetime.

use chrono::Utc;
use rust_decimal::Decimal;
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::debug;

use crate::common::types::AlertRecord;
use crate::state::SharedState;

/// Legacy records without a stored severity compare as maximally distant,
/// so the next evaluation fires
const FALLBACK_SEVERITY: i64 = 100;

/// Alert classes, each with its own key namespace
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertKind {
    Danger,
    Insider,
    InsiderProfit,
    NewWhale,
}

impl AlertKind {
    fn prefix(&self) -> &'static str {
        match self {
            AlertKind::Danger => "DANGER",
            AlertKind::Insider => "INSIDER",
            AlertKind::InsiderProfit => "INSIDER-PROFIT",
            AlertKind::NewWhale => "NEW",
        }
    }

    /// Deterministic key: kind, normalized account, instrument
    pub fn key(&self, account: &str, coin: &str) -> String {
        format!("{}-{}-{}", self.prefix(), account.trim().to_lowercase(), coin)
    }
}

/// Outcome of a danger-class evaluation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireDecision {
    /// First sighting for this key
    First,
    /// Fired again after cooldown expiry or a worsened severity
    Recurring,
    /// Within cooldown and not meaningfully worse
    Suppressed,
}

impl FireDecision {
    pub fn should_fire(&self) -> bool {
        !matches!(self, FireDecision::Suppressed)
    }

    pub fn is_recurring(&self) -> bool {
        matches!(self, FireDecision::Recurring)
    }
}

/// Removes its key from the in-flight set when dropped
pub struct InFlightGuard {
    set: Arc<Mutex<HashSet<String>>>,
    key: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set.lock().expect("in_flight poisoned").remove(&self.key);
    }
}

/// Stateful gatekeeper for alert candidates
#[derive(Clone)]
pub struct AlertDeduper {
    state: Arc<SharedState>,
    in_flight: Arc<Mutex<HashSet<String>>>,
    cooldown_ms: i64,
    worsen_step: Decimal,
}

impl AlertDeduper {
    pub fn new(state: Arc<SharedState>, cooldown_ms: i64, worsen_step: Decimal) -> Self {
        Self {
            state,
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            cooldown_ms,
            worsen_step,
        }
    }

    /// Claim a key for evaluation; `None` means another evaluation of the
    /// same key is already in flight and this one must be dropped.
    ///
    /// The membership test and the insert happen under one lock, with no
    /// await point in between.
    pub fn begin(&self, key: &str) -> Option<InFlightGuard> {
        let mut set = self.in_flight.lock().expect("in_flight poisoned");
        if !set.insert(key.to_string()) {
            debug!(key, "Evaluation already in flight, dropping");
            return None;
        }
        Some(InFlightGuard {
            set: Arc::clone(&self.in_flight),
            key: key.to_string(),
        })
    }

    /// Hybrid cooldown decision for the danger class
    ///
    /// `severity` is the distance-to-liquidation percent; smaller is worse.
    /// The record is updated inside the same critical section as the
    /// decision, so a concurrent evaluation of the same key observes it.
    pub fn evaluate_danger(&self, key: &str, severity: Decimal) -> FireDecision {
        self.evaluate_danger_at(key, severity, Utc::now().timestamp_millis())
    }

    pub fn evaluate_danger_at(&self, key: &str, severity: Decimal, now_ms: i64) -> FireDecision {
        let mut records = self
            .state
            .alert_records
            .lock()
            .expect("alert_records poisoned");

        let decision = match records.get(key) {
            None => FireDecision::First,
            Some(record) => {
                if now_ms - record.last_fired_ms < self.cooldown_ms {
                    let last = record
                        .last_severity
                        .unwrap_or_else(|| Decimal::from(FALLBACK_SEVERITY));
                    if severity > last - self.worsen_step {
                        return FireDecision::Suppressed;
                    }
                }
                FireDecision::Recurring
            }
        };

        records.insert(
            key.to_string(),
            AlertRecord {
                last_fired_ms: now_ms,
                last_severity: Some(severity),
            },
        );
        decision
    }

    /// Once-per-lifetime decision for new-whale and insider classes
    pub fn fire_once(&self, key: &str) -> bool {
        self.fire_once_at(key, Utc::now().timestamp_millis())
    }

    pub fn fire_once_at(&self, key: &str, now_ms: i64) -> bool {
        let mut records = self
            .state
            .alert_records
            .lock()
            .expect("alert_records poisoned");
        if records.contains_key(key) {
            return false;
        }
        records.insert(
            key.to_string(),
            AlertRecord {
                last_fired_ms: now_ms,
                last_severity: None,
            },
        );
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    const HOUR_MS: i64 = 60 * 60 * 1000;

    fn deduper() -> AlertDeduper {
        AlertDeduper::new(Arc::new(SharedState::new()), 3 * HOUR_MS, dec!(0.5))
    }

    #[test]
    fn test_alert_key_normalization() {
        assert_eq!(
            AlertKind::Danger.key(" 0xABCdefABCdefABCdef ", "BTC"),
            "DANGER-0xabcdefabcdefabcdef-BTC"
        );
        assert_eq!(
            AlertKind::InsiderProfit.key("0xabc", "ETH"),
            "INSIDER-PROFIT-0xabc-ETH"
        );
    }

    #[test]
    fn test_first_call_always_fires() {
        let deduper = deduper();
        let decision = deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.5), 1000);
        assert_eq!(decision, FireDecision::First);
    }

    #[test]
    fn test_not_worsened_within_cooldown_suppressed() {
        let deduper = deduper();
        deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.5), 0);
        // 10 minutes later, slightly better: suppressed
        let decision = deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.6), 10 * 60 * 1000);
        assert_eq!(decision, FireDecision::Suppressed);
        // Suppression must not overwrite the recorded severity
        let decision = deduper.evaluate_danger_at("DANGER-x-BTC", dec!(0.9), 20 * 60 * 1000);
        assert_eq!(decision, FireDecision::Recurring);
    }

    #[test]
    fn test_worsened_bypasses_cooldown() {
        let deduper = deduper();
        deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.5), 0);
        let decision = deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.0), 10 * 60 * 1000);
        assert_eq!(decision, FireDecision::Recurring);
        assert!(decision.should_fire());
        assert!(decision.is_recurring());
    }

    #[test]
    fn test_worsened_by_less_than_step_suppressed() {
        let deduper = deduper();
        deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.5), 0);
        // Worse, but by under 0.5
        let decision = deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.2), 10 * 60 * 1000);
        assert_eq!(decision, FireDecision::Suppressed);
    }

    #[test]
    fn test_cooldown_expiry_fires_recurring() {
        let deduper = deduper();
        deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.5), 0);
        let decision = deduper.evaluate_danger_at("DANGER-x-BTC", dec!(1.5), 3 * HOUR_MS);
        assert_eq!(decision, FireDecision::Recurring);
    }

    #[test]
    fn test_fire_once_per_lifetime() {
        let deduper = deduper();
        assert!(deduper.fire_once_at("NEW-x-SOL", 0));
        assert!(!deduper.fire_once_at("NEW-x-SOL", 100 * HOUR_MS));
        // A distinct key is independent
        assert!(deduper.fire_once_at("INSIDER-PROFIT-x-SOL", 0));
    }

    #[test]
    fn test_in_flight_guard_drops_reentrant() {
        let deduper = deduper();
        let guard = deduper.begin("DANGER-x-BTC");
        assert!(guard.is_some());
        assert!(deduper.begin("DANGER-x-BTC").is_none());
        drop(guard);
        assert!(deduper.begin("DANGER-x-BTC").is_some());
    }
}
