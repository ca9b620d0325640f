//! Channel type definitions for inter-task communication

use tokio::sync::mpsc;

use super::types::{CheckRequest, TradeEvent};

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new trade event channel with the default buffer size
pub fn create_trade_channel() -> (mpsc::Sender<TradeEvent>, mpsc::Receiver<TradeEvent>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}

/// Create a new account check channel with the default buffer size
pub fn create_check_channel() -> (mpsc::Sender<CheckRequest>, mpsc::Receiver<CheckRequest>) {
    mpsc::channel(DEFAULT_CHANNEL_SIZE)
}
