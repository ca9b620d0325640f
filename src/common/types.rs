//! Unified types used across the surveillance pipeline

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Position direction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Direction {
    Long,
    Short,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::Long => write!(f, "LONG"),
            Direction::Short => write!(f, "SHORT"),
        }
    }
}

/// Taker side of a trade from the public feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TradeSide {
    Buy,
    Sell,
}

impl TradeSide {
    /// The feed encodes side as "B" (bid/buy) or "A" (ask/sell)
    pub fn from_feed_code(code: &str) -> Self {
        if code.eq_ignore_ascii_case("b") {
            TradeSide::Buy
        } else {
            TradeSide::Sell
        }
    }
}

/// Severity of a liquidation-danger alert
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum DangerLevel {
    Warning,
    Critical,
}

impl std::fmt::Display for DangerLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DangerLevel::Warning => write!(f, "WARNING"),
            DangerLevel::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// Why a tracked position disappeared from account state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum CloseReason {
    Closed,
    Liquidated,
}

impl std::fmt::Display for CloseReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CloseReason::Closed => write!(f, "CLOSED"),
            CloseReason::Liquidated => write!(f, "LIQUIDATED"),
        }
    }
}

/// What put a position under active monitoring
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum TrackedKind {
    Danger,
    New,
}

/// A single trade from the public feed, after participant fan-out
#[derive(Debug, Clone, PartialEq)]
pub struct TradeEvent {
    pub coin: String,
    pub side: TradeSide,
    pub price: Decimal,
    pub size: Decimal,
    /// Participant addresses (maker and taker), pre-filtered for validity
    pub accounts: Vec<String>,
}

impl TradeEvent {
    /// USD notional of this trade
    pub fn notional_usd(&self) -> Decimal {
        self.price * self.size
    }
}

/// The trade that triggered an account check, carried through to
/// classification so profit-taking can be detected
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeTrigger {
    pub coin: String,
    pub side: TradeSide,
    pub price: Decimal,
    pub size: Decimal,
}

/// A request to inspect one account's positions
#[derive(Debug, Clone, PartialEq)]
pub struct CheckRequest {
    pub account: String,
    pub trigger: Option<TradeTrigger>,
}

/// A raw exchange position enriched with market context
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnrichedPosition {
    pub account: String,
    pub coin: String,
    pub direction: Direction,
    /// Absolute position size in coin units
    pub position_size: Decimal,
    /// `|size| * mark_price`
    pub notional_usd: Decimal,
    pub entry_price: Decimal,
    pub mark_price: Decimal,
    pub liquidation_price: Option<Decimal>,
    /// `|mark - liq| / mark * 100`; present only when the liquidation
    /// price is known
    pub distance_percent: Option<Decimal>,
    pub leverage: u32,
    pub unrealized_pnl: Decimal,
    pub account_equity: Decimal,
}

/// A position under active close/liquidation monitoring
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedPosition {
    #[serde(flatten)]
    pub position: EnrichedPosition,
    pub account_short: String,
    pub kind: TrackedKind,
    #[serde(default)]
    pub danger_level: Option<DangerLevel>,
    pub first_tracked_ms: i64,
    #[serde(default)]
    pub is_recurring: bool,
}

/// Account age derived from fill history
///
/// The age is a lower bound: fill history may be truncated upstream, in
/// which case the oldest visible fill is newer than the wallet itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WalletStats {
    pub age_days: i64,
    pub is_fresh: bool,
}

/// Payload for a new-whale alert
#[derive(Debug, Clone, PartialEq)]
pub struct NewWhaleAlert {
    pub position: EnrichedPosition,
    pub wallet: WalletStats,
    pub is_treasury_attack: bool,
}

/// Dedup record for one alert key; overwritten on every fire
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AlertRecord {
    pub last_fired_ms: i64,
    /// Severity metric at the last fire (distance percent for danger
    /// alerts); absent for once-per-lifetime alert classes
    #[serde(default)]
    pub last_severity: Option<Decimal>,
}

/// Bounded history entry for fired alerts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertHistoryEntry {
    pub key: String,
    pub fired_at_ms: i64,
}

/// Bounded history entry for discovered new-whale positions
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecentNewPosition {
    pub position: EnrichedPosition,
    pub account_short: String,
    pub wallet: WalletStats,
    pub is_treasury_attack: bool,
    pub at_ms: i64,
}

/// Shorten an address for display: `0xdfc2...f303`
pub fn short_address(addr: &str) -> String {
    if addr.len() <= 10 {
        return addr.to_string();
    }
    format!("{}...{}", &addr[..6], &addr[addr.len() - 4..])
}

/// Addresses shorter than this are junk from the feed
pub const MIN_ADDRESS_LEN: usize = 11;

/// Participant identifiers from the feed are only usable if they look
/// like real addresses
pub fn is_valid_address(addr: &str) -> bool {
    addr.len() >= MIN_ADDRESS_LEN
}
