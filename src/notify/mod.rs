//! Outbound notification boundary
//!
//! The pipeline hands approved alerts to a [`Notifier`] and moves on; it
//! never depends on delivery completing or succeeding. Message rendering and
//! the chat/social delivery plumbing live behind this trait.

use async_trait::async_trait;
use rust_decimal::Decimal;
use tracing::info;

use crate::common::types::{CloseReason, EnrichedPosition, NewWhaleAlert, TrackedPosition};

/// Delivery seam for approved alerts
#[async_trait]
pub trait Notifier: Send + Sync {
    /// A position is close to liquidation
    async fn send_danger_alert(&self, position: &TrackedPosition);

    /// A fresh wallet (or the treasury) opened a large position
    async fn send_new_position_alert(&self, alert: &NewWhaleAlert);

    /// A very large position is deep in profit
    async fn send_insider_alert(
        &self,
        position: &EnrichedPosition,
        profit_percent: Decimal,
        is_taking_profit: bool,
    );

    /// A tracked position disappeared from account state
    async fn send_position_close_alert(
        &self,
        position: &TrackedPosition,
        reason: CloseReason,
        last_pnl: Decimal,
    );
}

/// Default notifier that writes alerts to the log
#[derive(Debug, Default, Clone)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send_danger_alert(&self, position: &TrackedPosition) {
        info!(
            account = %position.account_short,
            coin = %position.position.coin,
            direction = %position.position.direction,
            notional_usd = %position.position.notional_usd,
            distance_percent = ?position.position.distance_percent,
            recurring = position.is_recurring,
            "DANGER alert"
        );
    }

    async fn send_new_position_alert(&self, alert: &NewWhaleAlert) {
        info!(
            account = %alert.position.account,
            coin = %alert.position.coin,
            notional_usd = %alert.position.notional_usd,
            wallet_age_days = alert.wallet.age_days,
            treasury_attack = alert.is_treasury_attack,
            "NEW WHALE alert"
        );
    }

    async fn send_insider_alert(
        &self,
        position: &EnrichedPosition,
        profit_percent: Decimal,
        is_taking_profit: bool,
    ) {
        info!(
            account = %position.account,
            coin = %position.coin,
            profit_percent = %profit_percent,
            taking_profit = is_taking_profit,
            "INSIDER alert"
        );
    }

    async fn send_position_close_alert(
        &self,
        position: &TrackedPosition,
        reason: CloseReason,
        last_pnl: Decimal,
    ) {
        info!(
            account = %position.account_short,
            coin = %position.position.coin,
            reason = %reason,
            last_pnl = %last_pnl,
            "POSITION CLOSE alert"
        );
    }
}
