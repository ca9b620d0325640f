//! Hyperliquid Whale Watch Library
//!
//! A Rust library for surveilling large Hyperliquid positions in real time:
//! a trade feed drives position checks, and classified whales are tracked
//! and alerted on.

pub mod common;
pub mod config;
pub mod hyperliquid;
pub mod notify;
pub mod state;
pub mod tracker;

// Re-export commonly used types
pub use common::errors::{ClientError, Result};
pub use common::types::{
    CheckRequest, CloseReason, DangerLevel, Direction, EnrichedPosition, NewWhaleAlert,
    TradeEvent, TradeSide, TradeTrigger, TrackedKind, TrackedPosition,
};
pub use config::types::AppConfig;
pub use hyperliquid::client::InfoClient;
pub use hyperliquid::dispatcher::RequestDispatcher;
pub use hyperliquid::websocket::TradeFeedClient;
pub use notify::{LogNotifier, Notifier};
pub use state::store::StateStore;
pub use state::SharedState;
pub use tracker::{AlertDeduper, PositionTracker, TradeAggregator};
