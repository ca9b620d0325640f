//! Streaming trade aggregation with per-key debounce
//!
//! Feed trades are bucketed per `(account, coin)`. Each qualifying trade
//! resets that key's silence timer; when the timer survives the full window
//! the accumulated notional is evaluated once and the key is cleared. A
//! single fill large enough on its own triggers an immediate check without
//! waiting, and without clearing the window, so late-arriving split orders
//! are still caught.

use rust_decimal::Decimal;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::common::types::{CheckRequest, TradeEvent, TradeTrigger};
use crate::config::types::TrackerConfig;

/// Accumulator for one `(account, coin)` key
#[derive(Debug, Clone)]
struct Aggregate {
    notional_usd: Decimal,
    last_trigger: TradeTrigger,
    /// Bumped on every event; a debounce timer only acts if its epoch is
    /// still current, which makes cancel-and-reschedule atomic under the
    /// map lock
    epoch: u64,
}

/// Buffers and debounces the live trade feed
#[derive(Clone)]
pub struct TradeAggregator {
    buckets: Arc<Mutex<HashMap<String, Aggregate>>>,
    check_tx: mpsc::Sender<CheckRequest>,
    noise_floor_usd: Decimal,
    whale_volume_usd: Decimal,
    debounce: Duration,
}

impl TradeAggregator {
    pub fn new(config: &TrackerConfig, check_tx: mpsc::Sender<CheckRequest>) -> Self {
        Self {
            buckets: Arc::new(Mutex::new(HashMap::new())),
            check_tx,
            noise_floor_usd: config.trade_noise_floor_usd,
            whale_volume_usd: config.whale_volume_usd,
            debounce: Duration::from_millis(config.debounce_ms),
        }
    }

    /// Consume trade events until the feed channel closes
    pub async fn run(&self, mut trade_rx: mpsc::Receiver<TradeEvent>) {
        while let Some(event) = trade_rx.recv().await {
            self.on_trade(&event).await;
        }
        debug!("Trade channel closed, aggregator stopping");
    }

    /// Fold one feed trade into the per-participant buckets
    pub async fn on_trade(&self, event: &TradeEvent) {
        let notional = event.notional_usd();
        if notional < self.noise_floor_usd {
            return;
        }

        let trigger = TradeTrigger {
            coin: event.coin.clone(),
            side: event.side,
            price: event.price,
            size: event.size,
        };

        for account in &event.accounts {
            self.accumulate(account, &event.coin, notional, &trigger);

            // Instant path: a huge single fill is worth checking right away.
            // The windowed aggregate keeps accumulating independently.
            if notional >= self.whale_volume_usd {
                info!(
                    account = %account,
                    coin = %event.coin,
                    notional_usd = %notional,
                    "Whale trade (instant)"
                );
                self.emit(account, None).await;
            }
        }
    }

    fn accumulate(&self, account: &str, coin: &str, notional: Decimal, trigger: &TradeTrigger) {
        let key = format!("{account}-{coin}");
        let epoch;
        {
            let mut buckets = self.buckets.lock().expect("buckets poisoned");
            let entry = buckets.entry(key.clone()).or_insert_with(|| Aggregate {
                notional_usd: Decimal::ZERO,
                last_trigger: trigger.clone(),
                epoch: 0,
            });
            entry.notional_usd += notional;
            entry.last_trigger = trigger.clone();
            entry.epoch += 1;
            epoch = entry.epoch;
        }

        // Reschedule the silence timer: the previous one is cancelled by the
        // epoch bump above
        let aggregator = self.clone();
        let account = account.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(aggregator.debounce).await;
            aggregator.flush_if_current(&key, epoch, &account).await;
        });
    }

    /// Evaluate and clear the key, but only if no newer event rescheduled it
    async fn flush_if_current(&self, key: &str, epoch: u64, account: &str) {
        let fired = {
            let mut buckets = self.buckets.lock().expect("buckets poisoned");
            match buckets.get(key) {
                Some(aggregate) if aggregate.epoch == epoch => {
                    let aggregate = buckets.remove(key).expect("checked above");
                    if aggregate.notional_usd >= self.whale_volume_usd {
                        Some(aggregate)
                    } else {
                        None
                    }
                }
                // A newer event owns the timer now
                _ => return,
            }
        };

        if let Some(aggregate) = fired {
            info!(
                account = %account,
                key = %key,
                notional_usd = %aggregate.notional_usd,
                "Aggregated whale volume"
            );
            self.emit(account, Some(aggregate.last_trigger)).await;
        }
    }

    async fn emit(&self, account: &str, trigger: Option<TradeTrigger>) {
        let request = CheckRequest {
            account: account.to_string(),
            trigger,
        };
        if self.check_tx.send(request).await.is_err() {
            warn!("Check channel closed, dropping whale signal");
        }
    }

    /// Current accumulated notional for a key, if any (test hook)
    #[cfg(test)]
    fn pending_notional(&self, account: &str, coin: &str) -> Option<Decimal> {
        self.buckets
            .lock()
            .expect("buckets poisoned")
            .get(&format!("{account}-{coin}"))
            .map(|a| a.notional_usd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::types::TradeSide;
    use rust_decimal_macros::dec;
    use tokio::time::{advance, timeout};

    const ACCOUNT: &str = "0xwhalewhalewhalewhale";

    /// Let spawned debounce tasks run before asserting on channel contents
    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn trade(price: Decimal, size: Decimal) -> TradeEvent {
        TradeEvent {
            coin: "ETH".to_string(),
            side: TradeSide::Buy,
            price,
            size,
            accounts: vec![ACCOUNT.to_string()],
        }
    }

    fn aggregator() -> (TradeAggregator, mpsc::Receiver<CheckRequest>) {
        let (tx, rx) = mpsc::channel(16);
        (TradeAggregator::new(&TrackerConfig::default(), tx), rx)
    }

    #[tokio::test(start_paused = true)]
    async fn test_noise_floor_ignored_entirely() {
        let (aggregator, mut rx) = aggregator();
        aggregator.on_trade(&trade(dec!(100), dec!(5))).await; // $500
        assert!(aggregator.pending_notional(ACCOUNT, "ETH").is_none());

        advance(Duration::from_secs(10)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test(start_paused = true)]
    async fn test_debounce_accumulates_and_fires_once() {
        let (aggregator, mut rx) = aggregator();

        // 6 trades of $40k within 3 seconds: $240k total
        for _ in 0..6 {
            aggregator.on_trade(&trade(dec!(4000), dec!(10))).await;
            advance(Duration::from_millis(500)).await;
        }
        assert_eq!(
            aggregator.pending_notional(ACCOUNT, "ETH"),
            Some(dec!(240000))
        );
        // Nothing fires until 5s of silence
        settle().await;
        assert!(rx.try_recv().is_err());

        advance(Duration::from_secs(5)).await;
        let request = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("debounce should fire")
            .expect("channel open");
        assert_eq!(request.account, ACCOUNT);
        let trigger = request.trigger.expect("aggregated fire carries trigger");
        assert_eq!(trigger.coin, "ETH");

        // Fired exactly once, and the key is cleared
        assert!(rx.try_recv().is_err());
        assert!(aggregator.pending_notional(ACCOUNT, "ETH").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_below_threshold_clears_silently() {
        let (aggregator, mut rx) = aggregator();
        aggregator.on_trade(&trade(dec!(4000), dec!(10))).await; // $40k
        settle().await;
        advance(Duration::from_secs(6)).await;
        settle().await;

        assert!(rx.try_recv().is_err());
        assert!(aggregator.pending_notional(ACCOUNT, "ETH").is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn test_event_mid_debounce_resets_timer() {
        let (aggregator, mut rx) = aggregator();
        aggregator.on_trade(&trade(dec!(30000), dec!(5))).await; // $150k
        settle().await;
        advance(Duration::from_secs(4)).await;
        aggregator.on_trade(&trade(dec!(30000), dec!(4))).await; // +$120k
        settle().await;

        // 4s after the second event the original timer would have fired;
        // the reset means nothing has
        advance(Duration::from_secs(4)).await;
        settle().await;
        assert!(rx.try_recv().is_err());
        assert_eq!(
            aggregator.pending_notional(ACCOUNT, "ETH"),
            Some(dec!(270000))
        );

        advance(Duration::from_secs(1)).await;
        let request = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("fires after full silence window")
            .expect("channel open");
        assert_eq!(request.account, ACCOUNT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_instant_path_keeps_aggregate() {
        let (aggregator, mut rx) = aggregator();
        aggregator.on_trade(&trade(dec!(50000), dec!(5))).await; // $250k single fill
        settle().await;

        let request = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("instant check")
            .expect("channel open");
        assert_eq!(request.account, ACCOUNT);
        assert!(request.trigger.is_none(), "instant path has no trigger");

        // The windowed aggregate is still accumulating
        assert_eq!(
            aggregator.pending_notional(ACCOUNT, "ETH"),
            Some(dec!(250000))
        );

        // And fires again after the silence window
        advance(Duration::from_secs(6)).await;
        let request = timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("debounced fire")
            .expect("channel open");
        assert!(request.trigger.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_both_participants_bucketed() {
        let (aggregator, _rx) = aggregator();
        let mut event = trade(dec!(4000), dec!(10));
        event.accounts = vec![
            "0xmakermakermakermaker".to_string(),
            "0xtakertakertakertaker".to_string(),
        ];
        aggregator.on_trade(&event).await;

        assert_eq!(
            aggregator.pending_notional("0xmakermakermakermaker", "ETH"),
            Some(dec!(40000))
        );
        assert_eq!(
            aggregator.pending_notional("0xtakertakertakertaker", "ETH"),
            Some(dec!(40000))
        );
    }
}
