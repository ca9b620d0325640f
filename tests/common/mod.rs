//! Shared fixtures for integration tests: canned exchange responses and a
//! recording notifier

#![allow(dead_code)]

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{json, Value};
use std::sync::Mutex;

use whale_watch::common::types::{CloseReason, EnrichedPosition, NewWhaleAlert, TrackedPosition};
use whale_watch::config::types::HyperliquidConfig;
use whale_watch::notify::Notifier;

/// Mock-server config with fast pacing so tests stay quick
pub fn test_hyperliquid_config(server_uri: &str) -> HyperliquidConfig {
    HyperliquidConfig {
        api_url: format!("{}/info", server_uri),
        request_spacing_ms: 2,
        rate_limit_pause_ms: 30,
        ..HyperliquidConfig::default()
    }
}

/// One raw position as the exchange serializes it
pub fn position_json(
    coin: &str,
    szi: &str,
    entry_px: &str,
    liquidation_px: Option<&str>,
    leverage: u32,
) -> Value {
    json!({
        "position": {
            "coin": coin,
            "szi": szi,
            "entryPx": entry_px,
            "leverage": {"type": "cross", "value": leverage},
            "liquidationPx": liquidation_px,
            "marginUsed": "100000",
            "positionValue": "0",
            "unrealizedPnl": "50000"
        },
        "type": "oneWay"
    })
}

/// `clearinghouseState` response wrapping the given positions
pub fn clearinghouse_state_json(positions: Vec<Value>, account_value: &str) -> Value {
    json!({
        "assetPositions": positions,
        "marginSummary": {
            "accountValue": account_value,
            "totalMarginUsed": "100000",
            "totalNtlPos": "0",
            "totalRawUsd": "0"
        }
    })
}

/// `metaAndAssetCtxs` response: universe paired with mark prices
pub fn meta_and_ctxs_json(coins: &[(&str, &str)]) -> Value {
    let universe: Vec<Value> = coins
        .iter()
        .map(|(name, _)| json!({"name": name, "szDecimals": 4}))
        .collect();
    let ctxs: Vec<Value> = coins
        .iter()
        .map(|(_, mark)| json!({"markPx": mark, "midPx": mark, "prevDayPx": mark}))
        .collect();
    json!([{"universe": universe}, ctxs])
}

/// `userFills` response with one fill per timestamp
pub fn user_fills_json(coin: &str, times_ms: &[u64]) -> Value {
    let fills: Vec<Value> = times_ms
        .iter()
        .map(|t| {
            json!({
                "coin": coin,
                "px": "100",
                "sz": "1",
                "side": "B",
                "time": t,
                "closedPnl": "0"
            })
        })
        .collect();
    json!(fills)
}

/// Everything a [`Notifier`] was asked to deliver
#[derive(Debug, Clone, PartialEq)]
pub enum RecordedAlert {
    Danger(TrackedPosition),
    NewPosition(NewWhaleAlert),
    Insider {
        position: EnrichedPosition,
        profit_percent: Decimal,
        is_taking_profit: bool,
    },
    Close {
        position: TrackedPosition,
        reason: CloseReason,
        last_pnl: Decimal,
    },
}

/// Notifier that records every call for later assertions
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub alerts: Mutex<Vec<RecordedAlert>>,
}

impl RecordingNotifier {
    pub fn recorded(&self) -> Vec<RecordedAlert> {
        self.alerts.lock().expect("alerts poisoned").clone()
    }

    pub fn count(&self) -> usize {
        self.alerts.lock().expect("alerts poisoned").len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_danger_alert(&self, position: &TrackedPosition) {
        self.alerts
            .lock()
            .expect("alerts poisoned")
            .push(RecordedAlert::Danger(position.clone()));
    }

    async fn send_new_position_alert(&self, alert: &NewWhaleAlert) {
        self.alerts
            .lock()
            .expect("alerts poisoned")
            .push(RecordedAlert::NewPosition(alert.clone()));
    }

    async fn send_insider_alert(
        &self,
        position: &EnrichedPosition,
        profit_percent: Decimal,
        is_taking_profit: bool,
    ) {
        self.alerts
            .lock()
            .expect("alerts poisoned")
            .push(RecordedAlert::Insider {
                position: position.clone(),
                profit_percent,
                is_taking_profit,
            });
    }

    async fn send_position_close_alert(
        &self,
        position: &TrackedPosition,
        reason: CloseReason,
        last_pnl: Decimal,
    ) {
        self.alerts
            .lock()
            .expect("alerts poisoned")
            .push(RecordedAlert::Close {
                position: position.clone(),
                reason,
                last_pnl,
            });
    }
}
