//! Configuration types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppConfig {
    /// Exchange endpoints and request pacing
    #[serde(default)]
    pub hyperliquid: HyperliquidConfig,
    /// Detection thresholds
    #[serde(default)]
    pub tracker: TrackerConfig,
    /// General application settings
    #[serde(default)]
    pub settings: AppSettings,
}

/// Hyperliquid endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HyperliquidConfig {
    /// Info API endpoint (all queries are POSTed here)
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Public WebSocket endpoint for the trade feed
    #[serde(default = "default_ws_url")]
    pub ws_url: String,
    /// Minimum spacing between successful info requests in milliseconds
    #[serde(default = "default_request_spacing")]
    pub request_spacing_ms: u64,
    /// How long the dispatcher pauses after a 429, in milliseconds
    #[serde(default = "default_rate_limit_pause")]
    pub rate_limit_pause_ms: u64,
    /// How many coins to subscribe per batch on connect
    #[serde(default = "default_subscribe_batch_size")]
    pub subscribe_batch_size: usize,
    /// Delay between subscription batches in milliseconds
    #[serde(default = "default_subscribe_batch_delay")]
    pub subscribe_batch_delay_ms: u64,
}

impl Default for HyperliquidConfig {
    fn default() -> Self {
        Self {
            api_url: default_api_url(),
            ws_url: default_ws_url(),
            request_spacing_ms: default_request_spacing(),
            rate_limit_pause_ms: default_rate_limit_pause(),
            subscribe_batch_size: default_subscribe_batch_size(),
            subscribe_batch_delay_ms: default_subscribe_batch_delay(),
        }
    }
}

fn default_api_url() -> String {
    "https://api.hyperliquid.xyz/info".to_string()
}

fn default_ws_url() -> String {
    "wss://api.hyperliquid.xyz/ws".to_string()
}

fn default_request_spacing() -> u64 {
    100
}

fn default_rate_limit_pause() -> u64 {
    5000
}

fn default_subscribe_batch_size() -> usize {
    10
}

fn default_subscribe_batch_delay() -> u64 {
    1000
}

/// Detection thresholds for the tracker pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerConfig {
    /// Protocol treasury address watched for off-list positions
    #[serde(default = "default_treasury_address")]
    pub treasury_address: String,
    /// Lower-volatility allow-list; stricter thresholds apply off-list
    #[serde(default = "default_safe_coins")]
    pub safe_coins: Vec<String>,
    /// Floor for danger tracking in USD
    #[serde(default = "default_min_position_usd")]
    pub min_position_usd: Decimal,
    /// Trades below this notional are ignored entirely
    #[serde(default = "default_trade_noise_floor_usd")]
    pub trade_noise_floor_usd: Decimal,
    /// Aggregated (or single-fill) notional that makes an account worth checking
    #[serde(default = "default_whale_volume_usd")]
    pub whale_volume_usd: Decimal,
    /// Silence period before an aggregate is evaluated, in milliseconds
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
    /// Distance to liquidation (percent) at or under which a position is in danger
    #[serde(default = "default_danger_distance_pct")]
    pub danger_distance_pct: Decimal,
    /// How much the distance must shrink to bypass the alert cooldown
    #[serde(default = "default_worsen_step_pct")]
    pub worsen_step_pct: Decimal,
    /// Danger alert cooldown in milliseconds
    #[serde(default = "default_cooldown_ms")]
    pub cooldown_ms: i64,
    /// Insider detection floor in USD
    #[serde(default = "default_insider_min_usd")]
    pub insider_min_usd: Decimal,
    /// Favorable move (percent) that flags an insider on safe coins
    #[serde(default = "default_insider_profit_safe_pct")]
    pub insider_profit_safe_pct: Decimal,
    /// Favorable move (percent) that flags an insider off-list
    #[serde(default = "default_insider_profit_other_pct")]
    pub insider_profit_other_pct: Decimal,
    /// New-whale size floor for safe coins in USD
    #[serde(default = "default_new_whale_min_safe_usd")]
    pub new_whale_min_safe_usd: Decimal,
    /// New-whale size floor off-list in USD
    #[serde(default = "default_new_whale_min_other_usd")]
    pub new_whale_min_other_usd: Decimal,
    /// Treasury-attack notional floor in USD
    #[serde(default = "default_treasury_attack_min_usd")]
    pub treasury_attack_min_usd: Decimal,
    /// New-whale liquidation-distance ceiling (percent) for safe coins
    #[serde(default = "default_max_liq_distance_safe_pct")]
    pub max_liq_distance_safe_pct: Decimal,
    /// New-whale liquidation-distance ceiling (percent) off-list
    #[serde(default = "default_max_liq_distance_other_pct")]
    pub max_liq_distance_other_pct: Decimal,
    /// Wallets younger than this many days are "fresh"
    #[serde(default = "default_fresh_wallet_max_age_days")]
    pub fresh_wallet_max_age_days: i64,
    /// Entry price may drift this fraction from mark before a position is
    /// considered pre-existing
    #[serde(default = "default_entry_drift_max")]
    pub entry_drift_max: Decimal,
    /// Interval between re-scans of tracked positions, in milliseconds
    #[serde(default = "default_refresh_interval_ms")]
    pub refresh_interval_ms: u64,
    /// Warm-up after boot during which discoveries are recorded silently
    #[serde(default = "default_warmup_ms")]
    pub warmup_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            treasury_address: default_treasury_address(),
            safe_coins: default_safe_coins(),
            min_position_usd: default_min_position_usd(),
            trade_noise_floor_usd: default_trade_noise_floor_usd(),
            whale_volume_usd: default_whale_volume_usd(),
            debounce_ms: default_debounce_ms(),
            danger_distance_pct: default_danger_distance_pct(),
            worsen_step_pct: default_worsen_step_pct(),
            cooldown_ms: default_cooldown_ms(),
            insider_min_usd: default_insider_min_usd(),
            insider_profit_safe_pct: default_insider_profit_safe_pct(),
            insider_profit_other_pct: default_insider_profit_other_pct(),
            new_whale_min_safe_usd: default_new_whale_min_safe_usd(),
            new_whale_min_other_usd: default_new_whale_min_other_usd(),
            treasury_attack_min_usd: default_treasury_attack_min_usd(),
            max_liq_distance_safe_pct: default_max_liq_distance_safe_pct(),
            max_liq_distance_other_pct: default_max_liq_distance_other_pct(),
            fresh_wallet_max_age_days: default_fresh_wallet_max_age_days(),
            entry_drift_max: default_entry_drift_max(),
            refresh_interval_ms: default_refresh_interval_ms(),
            warmup_ms: default_warmup_ms(),
        }
    }
}

impl TrackerConfig {
    /// Whether a coin is on the lower-volatility allow-list
    pub fn is_safe_coin(&self, coin: &str) -> bool {
        self.safe_coins.iter().any(|c| c == coin)
    }
}

fn default_treasury_address() -> String {
    "0xdfc24b077bc1425ad1dea75bcb6f8158e10df303".to_string()
}

fn default_safe_coins() -> Vec<String> {
    [
        "BTC", "ETH", "SOL", "BNB", "XRP", "DOGE", "ADA", "AVAX", "TRX", "LINK", "MATIC", "DOT",
        "LTC", "UNI", "ATOM", "NEAR", "ARB", "OP", "SUI", "APT",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect()
}

fn default_min_position_usd() -> Decimal {
    Decimal::from(2_000_000)
}

fn default_trade_noise_floor_usd() -> Decimal {
    Decimal::from(1_000)
}

fn default_whale_volume_usd() -> Decimal {
    Decimal::from(200_000)
}

fn default_debounce_ms() -> u64 {
    5000
}

fn default_danger_distance_pct() -> Decimal {
    Decimal::from(2)
}

fn default_worsen_step_pct() -> Decimal {
    // 0.5
    Decimal::new(5, 1)
}

fn default_cooldown_ms() -> i64 {
    3 * 60 * 60 * 1000
}

fn default_insider_min_usd() -> Decimal {
    Decimal::from(10_000_000)
}

fn default_insider_profit_safe_pct() -> Decimal {
    Decimal::from(7)
}

fn default_insider_profit_other_pct() -> Decimal {
    Decimal::from(15)
}

fn default_new_whale_min_safe_usd() -> Decimal {
    Decimal::from(10_000_000)
}

fn default_new_whale_min_other_usd() -> Decimal {
    Decimal::from(3_000_000)
}

fn default_treasury_attack_min_usd() -> Decimal {
    Decimal::from(500_000)
}

fn default_max_liq_distance_safe_pct() -> Decimal {
    Decimal::from(5)
}

fn default_max_liq_distance_other_pct() -> Decimal {
    Decimal::from(10)
}

fn default_fresh_wallet_max_age_days() -> i64 {
    7
}

fn default_entry_drift_max() -> Decimal {
    // 0.05
    Decimal::new(5, 2)
}

fn default_refresh_interval_ms() -> u64 {
    60_000
}

fn default_warmup_ms() -> u64 {
    10_000
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppSettings {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Delay between reconnection attempts in milliseconds
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay_ms: u64,
    /// WebSocket keep-alive ping interval in seconds
    #[serde(default = "default_ping_interval")]
    pub ping_interval_seconds: u64,
    /// Request timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
    /// Where the state snapshot is written
    #[serde(default = "default_state_file")]
    pub state_file: String,
    /// Interval between snapshot saves in milliseconds
    #[serde(default = "default_save_interval_ms")]
    pub save_interval_ms: u64,
    /// Snapshots older than this many minutes lose their tracked positions
    #[serde(default = "default_stale_after_minutes")]
    pub stale_after_minutes: i64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            reconnect_delay_ms: default_reconnect_delay(),
            ping_interval_seconds: default_ping_interval(),
            request_timeout_seconds: default_request_timeout(),
            state_file: default_state_file(),
            save_interval_ms: default_save_interval_ms(),
            stale_after_minutes: default_stale_after_minutes(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_reconnect_delay() -> u64 {
    5000
}

fn default_ping_interval() -> u64 {
    30
}

fn default_request_timeout() -> u64 {
    30
}

fn default_state_file() -> String {
    "data.json".to_string()
}

fn default_save_interval_ms() -> u64 {
    60_000
}

fn default_stale_after_minutes() -> i64 {
    30
}
