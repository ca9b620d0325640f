//! Position enrichment, risk classification, and tracked-position re-scans

use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use super::alerts::{AlertDeduper, AlertKind};
use crate::common::types::{
    is_valid_address, short_address, AlertHistoryEntry, CheckRequest, CloseReason, DangerLevel,
    Direction, EnrichedPosition, NewWhaleAlert, RecentNewPosition, TradeSide, TradeTrigger,
    TrackedKind, TrackedPosition, WalletStats,
};
use crate::config::types::TrackerConfig;
use crate::hyperliquid::client::InfoClient;
use crate::hyperliquid::messages::{AssetCtx, AssetMeta, ClearinghouseState, PositionData};
use crate::notify::Notifier;
use crate::state::SharedState;

const MS_PER_DAY: i64 = 24 * 60 * 60 * 1000;

/// Watches whale accounts: enriches raw positions into risk-scored ones and
/// routes alert candidates through the deduper to the notifier
pub struct PositionTracker {
    client: InfoClient,
    state: Arc<SharedState>,
    deduper: AlertDeduper,
    notifier: Arc<dyn Notifier>,
    config: TrackerConfig,
}

impl PositionTracker {
    pub fn new(
        client: InfoClient,
        state: Arc<SharedState>,
        notifier: Arc<dyn Notifier>,
        config: TrackerConfig,
    ) -> Self {
        let deduper = AlertDeduper::new(
            Arc::clone(&state),
            config.cooldown_ms,
            config.worsen_step_pct,
        );
        Self {
            client,
            state,
            deduper,
            notifier,
            config,
        }
    }

    /// Drain account-check requests from the aggregator
    pub async fn run(&self, mut check_rx: tokio::sync::mpsc::Receiver<CheckRequest>) {
        while let Some(request) = check_rx.recv().await {
            self.check_account(&request.account, request.trigger.as_ref())
                .await;
        }
        debug!("Check channel closed, tracker stopping");
    }

    /// Fetch an account's state and classify every open position
    #[instrument(skip(self, trigger))]
    pub async fn check_account(&self, account: &str, trigger: Option<&TradeTrigger>) {
        let (user_state, market) = tokio::join!(
            self.client.user_state(account),
            self.client.meta_and_asset_ctxs()
        );
        let (Some(user_state), Some((meta, asset_ctxs))) = (user_state, market) else {
            // No data this cycle; the next trigger or re-scan will retry
            return;
        };

        self.classify_account(account, &user_state, &meta.universe, &asset_ctxs, trigger)
            .await;
    }

    /// Run every classifier over an account's open positions
    async fn classify_account(
        &self,
        account: &str,
        user_state: &ClearinghouseState,
        universe: &[AssetMeta],
        asset_ctxs: &[AssetCtx],
        trigger: Option<&TradeTrigger>,
    ) {
        let account_equity = parse_or_zero(&user_state.margin_summary.account_value);

        for asset_position in &user_state.asset_positions {
            let raw = &asset_position.position;
            let Some(position) =
                enrich_position(raw, universe, asset_ctxs, account, account_equity)
            else {
                continue;
            };

            self.process_insider(&position, trigger).await;
            self.process_danger(&position).await;
            self.process_new_whale(&position).await;
        }
    }

    /// Danger classification: large position within the liquidation band
    async fn process_danger(&self, position: &EnrichedPosition) {
        if position.notional_usd < self.config.min_position_usd {
            return;
        }
        let Some(distance) = position.distance_percent else {
            return;
        };
        if distance > self.config.danger_distance_pct {
            return;
        }

        let key = AlertKind::Danger.key(&position.account, &position.coin);
        // Drop re-entrant evaluations of the same key outright
        let Some(_guard) = self.deduper.begin(&key) else {
            return;
        };

        let decision = self.deduper.evaluate_danger(&key, distance);
        if !decision.should_fire() {
            debug!(key, %distance, "Danger alert suppressed by cooldown");
            return;
        }

        // The outer distance gate is tighter than this branch, so today the
        // level is always Critical; the Warning arm mirrors the alert
        // contract as shipped
        let danger_level = if distance <= Decimal::from(3) {
            DangerLevel::Critical
        } else {
            DangerLevel::Warning
        };

        let now_ms = Utc::now().timestamp_millis();
        let tracked = TrackedPosition {
            position: position.clone(),
            account_short: short_address(&position.account),
            kind: TrackedKind::Danger,
            danger_level: Some(danger_level),
            first_tracked_ms: now_ms,
            is_recurring: decision.is_recurring(),
        };

        self.state.upsert_tracked(tracked.clone());
        self.state.push_recent_alert(AlertHistoryEntry {
            key,
            fired_at_ms: now_ms,
        });

        info!(
            account = %tracked.account_short,
            coin = %position.coin,
            %distance,
            level = %danger_level,
            recurring = tracked.is_recurring,
            "Position in liquidation danger"
        );
        self.notifier.send_danger_alert(&tracked).await;
    }

    /// Insider classification: outsized position deep in profit
    async fn process_insider(&self, position: &EnrichedPosition, trigger: Option<&TradeTrigger>) {
        if position.notional_usd <= self.config.insider_min_usd {
            return;
        }
        if position.entry_price.is_zero() {
            return;
        }

        let profit_percent = match position.direction {
            Direction::Long => {
                (position.mark_price - position.entry_price) / position.entry_price
                    * Decimal::from(100)
            }
            Direction::Short => {
                (position.entry_price - position.mark_price) / position.entry_price
                    * Decimal::from(100)
            }
        };

        let threshold = if self.config.is_safe_coin(&position.coin) {
            self.config.insider_profit_safe_pct
        } else {
            self.config.insider_profit_other_pct
        };
        if profit_percent <= threshold {
            return;
        }

        // A trade against the position's direction means profit is being
        // realized, which is its own signal with its own key
        let is_taking_profit = trigger.is_some_and(|t| {
            t.coin == position.coin
                && match position.direction {
                    Direction::Long => t.side == TradeSide::Sell,
                    Direction::Short => t.side == TradeSide::Buy,
                }
        });

        let kind = if is_taking_profit {
            AlertKind::InsiderProfit
        } else {
            AlertKind::Insider
        };
        let key = kind.key(&position.account, &position.coin);
        if !self.deduper.fire_once(&key) {
            return;
        }

        self.state.push_recent_alert(AlertHistoryEntry {
            key,
            fired_at_ms: Utc::now().timestamp_millis(),
        });
        info!(
            account = %short_address(&position.account),
            coin = %position.coin,
            %profit_percent,
            taking_profit = is_taking_profit,
            "Informed-trading pattern"
        );
        self.notifier
            .send_insider_alert(position, profit_percent.round_dp(2), is_taking_profit)
            .await;
    }

    /// New-whale classification: unseen position from a fresh wallet, or the
    /// treasury stepping off the allow-list
    async fn process_new_whale(&self, position: &EnrichedPosition) {
        let account = &position.account;
        let is_safe = self.config.is_safe_coin(&position.coin);
        let is_treasury = account.eq_ignore_ascii_case(&self.config.treasury_address);

        let is_treasury_attack =
            is_treasury && !is_safe && position.notional_usd > self.config.treasury_attack_min_usd;

        if !is_treasury {
            let min_size = if is_safe {
                self.config.new_whale_min_safe_usd
            } else {
                self.config.new_whale_min_other_usd
            };
            if position.notional_usd < min_size {
                return;
            }
        }

        if self.state.is_known_position(account, &position.coin) {
            return;
        }

        let now_ms = Utc::now().timestamp_millis();

        // Warm-up: pre-existing positions are recorded silently so boot does
        // not flood the channel with "new" whales
        if self.state.is_warming_up() {
            self.state.record_discovery(account, &position.coin, now_ms);
            return;
        }

        let already_known_account = self.state.is_known_account(account);
        let wallet = self.wallet_stats(account).await;
        let is_fresh_wallet = !already_known_account && wallet.is_fresh;

        // A mark price that drifted away from entry means the position has
        // been open for a while; we only just discovered it
        let mut is_old_position = false;
        if !is_treasury_attack && !position.entry_price.is_zero() {
            let drift =
                ((position.mark_price - position.entry_price) / position.entry_price).abs();
            if drift > self.config.entry_drift_max {
                is_old_position = true;
            }
        }

        // Only risky entries are interesting; comfortable ones are recorded
        // and skipped. An unknown distance does not disqualify.
        if !is_treasury_attack {
            let ceiling = if is_safe {
                self.config.max_liq_distance_safe_pct
            } else {
                self.config.max_liq_distance_other_pct
            };
            if let Some(distance) = position.distance_percent {
                if distance > ceiling {
                    debug!(
                        account = %short_address(account),
                        coin = %position.coin,
                        %distance,
                        "Skipped comfortable new whale"
                    );
                    self.state.record_discovery(account, &position.coin, now_ms);
                    return;
                }
            }
        }

        self.state.record_discovery(account, &position.coin, now_ms);

        if !(is_treasury_attack || (is_fresh_wallet && !is_old_position)) {
            debug!(
                account = %short_address(account),
                age_days = wallet.age_days,
                is_old_position,
                "Skipped new-position alert"
            );
            return;
        }

        let key = AlertKind::NewWhale.key(account, &position.coin);
        if !self.deduper.fire_once(&key) {
            return;
        }

        let alert = NewWhaleAlert {
            position: position.clone(),
            wallet,
            is_treasury_attack,
        };
        self.state.push_recent_new_position(RecentNewPosition {
            position: position.clone(),
            account_short: short_address(account),
            wallet,
            is_treasury_attack,
            at_ms: now_ms,
        });
        self.state.push_recent_alert(AlertHistoryEntry {
            key,
            fired_at_ms: now_ms,
        });

        if is_valid_address(account) {
            self.state.upsert_tracked(TrackedPosition {
                position: position.clone(),
                account_short: short_address(account),
                kind: TrackedKind::New,
                danger_level: None,
                first_tracked_ms: now_ms,
                is_recurring: false,
            });
        }

        info!(
            account = %short_address(account),
            coin = %position.coin,
            notional_usd = %position.notional_usd,
            treasury_attack = is_treasury_attack,
            "New whale position"
        );
        self.notifier.send_new_position_alert(&alert).await;
    }

    /// Wallet age from the oldest visible fill
    ///
    /// Fill history may be truncated upstream, so the age is a lower bound.
    /// No fills at all reads as a brand-new wallet.
    async fn wallet_stats(&self, account: &str) -> WalletStats {
        let fills = self.client.user_fills(account).await.unwrap_or_default();
        let now_ms = Utc::now().timestamp_millis();

        let oldest_ms = fills
            .iter()
            .map(|f| f.time as i64)
            .min()
            .unwrap_or(now_ms);

        let age_days = (now_ms - oldest_ms) / MS_PER_DAY;
        WalletStats {
            age_days,
            is_fresh: age_days < self.config.fresh_wallet_max_age_days,
        }
    }

    /// Re-scan every tracked position: refresh survivors, raise close alerts
    /// for the ones that disappeared, then run the classifiers over the
    /// refreshed state so a position that deteriorates in a quiet market
    /// still escalates
    #[instrument(skip(self))]
    pub async fn check_tracked_positions(&self) {
        let accounts: Vec<String> = self
            .state
            .tracked_accounts()
            .into_iter()
            .filter(|a| is_valid_address(a))
            .collect();
        if accounts.is_empty() {
            return;
        }

        let Some((meta, asset_ctxs)) = self.client.meta_and_asset_ctxs().await else {
            return;
        };

        for account in accounts {
            let Some(user_state) = self.client.user_state(&account).await else {
                continue;
            };
            self.rescan_account(&account, &user_state, &meta.universe, &asset_ctxs)
                .await;
            self.classify_account(&account, &user_state, &meta.universe, &asset_ctxs, None)
                .await;
        }
    }

    async fn rescan_account(
        &self,
        account: &str,
        user_state: &ClearinghouseState,
        universe: &[AssetMeta],
        asset_ctxs: &[AssetCtx],
    ) {
        let tracked_for_account: Vec<TrackedPosition> = {
            let positions = self
                .state
                .tracked_positions
                .lock()
                .expect("tracked_positions poisoned");
            positions
                .iter()
                .filter(|p| p.position.account == account)
                .cloned()
                .collect()
        };

        let account_equity = parse_or_zero(&user_state.margin_summary.account_value);

        for tracked in tracked_for_account {
            let coin = &tracked.position.coin;
            let current = user_state.asset_positions.iter().find(|p| {
                p.position.coin == *coin && parse_or_zero(&p.position.szi) != Decimal::ZERO
            });

            match current {
                Some(raw) => {
                    // Still open: refresh the stored risk metrics in place
                    if let Some(refreshed) = enrich_position(
                        &raw.position,
                        universe,
                        asset_ctxs,
                        account,
                        account_equity,
                    ) {
                        let mut updated = tracked.clone();
                        updated.position = refreshed;
                        self.state.upsert_tracked(updated);
                    }
                }
                None => {
                    let reason = close_reason(&tracked, universe, asset_ctxs);
                    let last_pnl = tracked.position.unrealized_pnl;
                    info!(
                        account = %tracked.account_short,
                        coin = %coin,
                        reason = %reason,
                        "Tracked position gone"
                    );
                    self.notifier
                        .send_position_close_alert(&tracked, reason, last_pnl)
                        .await;
                    self.state.remove_tracked(account, coin);
                }
            }
        }
    }
}

/// Did the mark cross the recorded liquidation price while we were away?
fn close_reason(
    tracked: &TrackedPosition,
    universe: &[AssetMeta],
    asset_ctxs: &[AssetCtx],
) -> CloseReason {
    let Some(liquidation_price) = tracked.position.liquidation_price else {
        return CloseReason::Closed;
    };
    let Some(mark) = mark_price_for(&tracked.position.coin, universe, asset_ctxs) else {
        return CloseReason::Closed;
    };

    let crossed = match tracked.position.direction {
        Direction::Long => mark <= liquidation_price,
        Direction::Short => mark >= liquidation_price,
    };
    if crossed {
        CloseReason::Liquidated
    } else {
        CloseReason::Closed
    }
}

/// Mark price for a coin via its universe index
fn mark_price_for(coin: &str, universe: &[AssetMeta], asset_ctxs: &[AssetCtx]) -> Option<Decimal> {
    let index = universe.iter().position(|a| a.name == coin)?;
    let ctx = asset_ctxs.get(index)?;
    ctx.mark_px.parse().ok()
}

/// Build an [`EnrichedPosition`] from raw exchange data and market context
///
/// Returns `None` for zero-size positions and for coins missing from the
/// universe or its context (malformed upstream data is skipped, not fatal).
pub fn enrich_position(
    raw: &PositionData,
    universe: &[AssetMeta],
    asset_ctxs: &[AssetCtx],
    account: &str,
    account_equity: Decimal,
) -> Option<EnrichedPosition> {
    let szi: Decimal = raw.szi.parse().ok()?;
    if szi.is_zero() {
        return None;
    }
    let mark_price = mark_price_for(&raw.coin, universe, asset_ctxs)?;

    let position_size = szi.abs();
    let notional_usd = position_size * mark_price;
    let direction = if szi > Decimal::ZERO {
        Direction::Long
    } else {
        Direction::Short
    };

    // Entry is occasionally absent; falling back to mark reads as a
    // just-opened position (zero drift, zero paper move)
    let entry_price = raw
        .entry_px
        .as_deref()
        .and_then(|p| p.parse().ok())
        .unwrap_or(mark_price);

    let liquidation_price: Option<Decimal> =
        raw.liquidation_px.as_deref().and_then(|p| p.parse().ok());
    let distance_percent = liquidation_price.map(|liq| {
        ((mark_price - liq) / mark_price).abs() * Decimal::from(100)
    });

    let leverage = if raw.leverage.value > 0 {
        raw.leverage.value
    } else {
        // Rough fallback when the exchange omits leverage
        let margin_used = parse_or_zero(&raw.margin_used);
        if margin_used.is_zero() {
            0
        } else {
            (notional_usd / margin_used).round().to_u32().unwrap_or(0)
        }
    };

    Some(EnrichedPosition {
        account: account.to_string(),
        coin: raw.coin.clone(),
        direction,
        position_size,
        notional_usd,
        entry_price,
        mark_price,
        liquidation_price,
        distance_percent,
        leverage,
        unrealized_pnl: parse_or_zero(&raw.unrealized_pnl),
        account_equity,
    })
}

fn parse_or_zero(value: &str) -> Decimal {
    value.parse().unwrap_or_else(|_| {
        if !value.is_empty() {
            warn!("Unparseable numeric field: {:?}", value);
        }
        Decimal::ZERO
    })
}
