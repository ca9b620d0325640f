//! Hyperliquid wire types for the info API and the public trade feed

use serde::{Deserialize, Serialize};

// ============================================================================
// Info API requests
// ============================================================================

/// Request body for the info endpoint; every query is a POST with a `type` tag
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum InfoRequest {
    #[serde(rename_all = "camelCase")]
    ClearinghouseState { user: String },
    #[serde(rename_all = "camelCase")]
    UserFills { user: String },
    Meta,
    MetaAndAssetCtxs,
}

// ============================================================================
// Info API responses
// ============================================================================

/// Account margin and open positions (`clearinghouseState`)
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearinghouseState {
    pub asset_positions: Vec<AssetPosition>,
    pub margin_summary: MarginSummary,
}

/// Position wrapper with type metadata
#[derive(Debug, Clone, Deserialize)]
pub struct AssetPosition {
    pub position: PositionData,
    #[serde(rename = "type")]
    pub type_string: String,
}

/// Raw exchange position; numeric fields arrive as strings
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PositionData {
    pub coin: String,
    pub szi: String,
    pub entry_px: Option<String>,
    pub leverage: Leverage,
    pub liquidation_px: Option<String>,
    pub margin_used: String,
    pub position_value: String,
    pub unrealized_pnl: String,
}

/// Leverage descriptor on a position
#[derive(Debug, Clone, Deserialize)]
pub struct Leverage {
    #[serde(rename = "type")]
    pub type_string: String,
    pub value: u32,
}

/// Account margin summary
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarginSummary {
    pub account_value: String,
    pub total_margin_used: String,
    pub total_ntl_pos: String,
    pub total_raw_usd: String,
}

/// Instrument universe (`meta`)
#[derive(Debug, Clone, Deserialize)]
pub struct Meta {
    pub universe: Vec<AssetMeta>,
}

/// One instrument's metadata
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetMeta {
    pub name: String,
    #[serde(default)]
    pub sz_decimals: u32,
}

/// Live per-instrument context; index-aligned with the universe
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCtx {
    pub mark_px: String,
    #[serde(default)]
    pub mid_px: Option<String>,
    #[serde(default)]
    pub prev_day_px: Option<String>,
}

/// `metaAndAssetCtxs` returns a two-element array pairing universe and contexts
pub type MetaAndAssetCtxs = (Meta, Vec<AssetCtx>);

/// A single fill from `userFills`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserFill {
    pub coin: String,
    pub px: String,
    pub sz: String,
    pub side: String,
    pub time: u64,
    #[serde(default)]
    pub closed_pnl: Option<String>,
}

// ============================================================================
// WebSocket messages
// ============================================================================

/// Outgoing subscription request
#[derive(Debug, Clone, Serialize)]
pub struct WsSubscribeMessage {
    pub method: &'static str,
    pub subscription: WsSubscription,
}

#[derive(Debug, Clone, Serialize)]
pub struct WsSubscription {
    #[serde(rename = "type")]
    pub channel: &'static str,
    pub coin: String,
}

impl WsSubscribeMessage {
    /// Subscribe to the public trade stream for one coin
    pub fn trades(coin: impl Into<String>) -> Self {
        Self {
            method: "subscribe",
            subscription: WsSubscription {
                channel: "trades",
                coin: coin.into(),
            },
        }
    }
}

/// Outgoing keep-alive
#[derive(Debug, Clone, Serialize)]
pub struct WsPing {
    pub method: &'static str,
}

impl Default for WsPing {
    fn default() -> Self {
        Self { method: "ping" }
    }
}

/// Incoming message envelope; `data` is decoded per channel
#[derive(Debug, Clone, Deserialize)]
pub struct WsEnvelope {
    pub channel: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

/// Public trade from the feed; `users` pairs the maker and taker addresses
#[derive(Debug, Clone, Deserialize)]
pub struct WsTrade {
    pub coin: String,
    pub side: String,
    pub px: String,
    pub sz: String,
    pub time: u64,
    pub hash: String,
    pub tid: u64,
    pub users: (String, String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_info_request_serialization() {
        let req = InfoRequest::ClearinghouseState {
            user: "0xabc".to_string(),
        };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"type": "clearinghouseState", "user": "0xabc"})
        );

        let meta = serde_json::to_value(InfoRequest::MetaAndAssetCtxs).unwrap();
        assert_eq!(meta, serde_json::json!({"type": "metaAndAssetCtxs"}));
    }

    #[test]
    fn test_parse_clearinghouse_state() {
        let json = r#"{
            "assetPositions": [{
                "position": {
                    "coin": "BTC",
                    "szi": "1.5",
                    "entryPx": "95000.0",
                    "leverage": {"type": "cross", "value": 20},
                    "liquidationPx": "91000.0",
                    "marginUsed": "7125.0",
                    "positionValue": "142500.0",
                    "unrealizedPnl": "1234.5",
                    "returnOnEquity": "0.17"
                },
                "type": "oneWay"
            }],
            "marginSummary": {
                "accountValue": "500000.0",
                "totalMarginUsed": "7125.0",
                "totalNtlPos": "142500.0",
                "totalRawUsd": "492875.0"
            },
            "withdrawable": "480000.0"
        }"#;

        let state: ClearinghouseState = serde_json::from_str(json).unwrap();
        assert_eq!(state.asset_positions.len(), 1);
        let pos = &state.asset_positions[0].position;
        assert_eq!(pos.coin, "BTC");
        assert_eq!(pos.liquidation_px.as_deref(), Some("91000.0"));
        assert_eq!(pos.leverage.value, 20);
        assert_eq!(state.margin_summary.account_value, "500000.0");
    }

    #[test]
    fn test_parse_meta_and_asset_ctxs() {
        let json = r#"[
            {"universe": [{"name": "BTC", "szDecimals": 5}, {"name": "ETH", "szDecimals": 4}]},
            [{"markPx": "95000.0", "midPx": "95001.0", "prevDayPx": "94000.0"},
             {"markPx": "3300.0"}]
        ]"#;

        let (meta, ctxs): MetaAndAssetCtxs = serde_json::from_str(json).unwrap();
        assert_eq!(meta.universe.len(), 2);
        assert_eq!(meta.universe[1].name, "ETH");
        assert_eq!(ctxs[0].mark_px, "95000.0");
        assert!(ctxs[1].mid_px.is_none());
    }

    #[test]
    fn test_parse_ws_trade_envelope() {
        let json = r#"{
            "channel": "trades",
            "data": [{
                "coin": "ETH",
                "side": "B",
                "px": "3300.5",
                "sz": "12.0",
                "time": 1704067200000,
                "hash": "0xdeadbeef",
                "tid": 42,
                "users": ["0xmakermakermakermaker", "0xtakertakertakertaker"]
            }]
        }"#;

        let envelope: WsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.channel, "trades");
        let trades: Vec<WsTrade> = serde_json::from_value(envelope.data).unwrap();
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].coin, "ETH");
        assert_eq!(trades[0].users.1, "0xtakertakertakertaker");
    }

    #[test]
    fn test_subscribe_message_shape() {
        let msg = WsSubscribeMessage::trades("BTC");
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "method": "subscribe",
                "subscription": {"type": "trades", "coin": "BTC"}
            })
        );
    }
}
