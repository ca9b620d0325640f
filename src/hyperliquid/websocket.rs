//! WebSocket client for the Hyperliquid public trade feed

use futures_util::{SinkExt, StreamExt};
use rust_decimal::Decimal;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::interval;
use tokio_tungstenite::{connect_async, tungstenite::protocol::Message};
use tracing::{debug, error, info, instrument, warn};

use super::client::InfoClient;
use super::messages::{WsEnvelope, WsPing, WsSubscribeMessage, WsTrade};
use crate::common::errors::{ClientError, Result};
use crate::common::types::{is_valid_address, TradeEvent, TradeSide};
use crate::config::types::{AppSettings, HyperliquidConfig};

/// Coins subscribed when the universe cannot be fetched
const FALLBACK_COINS: &[&str] = &["BTC", "ETH", "SOL"];

/// WebSocket client for the public trade stream
///
/// `run` owns the reconnection policy: on any disconnect it waits a fixed
/// delay and re-subscribes to the full universe in batches.
pub struct TradeFeedClient {
    url: String,
    info: InfoClient,
    batch_size: usize,
    batch_delay: Duration,
    ping_interval: Duration,
    reconnect_delay: Duration,
    is_connected: Arc<AtomicBool>,
}

impl TradeFeedClient {
    pub fn new(config: &HyperliquidConfig, settings: &AppSettings, info: InfoClient) -> Self {
        Self {
            url: config.ws_url.clone(),
            info,
            batch_size: config.subscribe_batch_size.max(1),
            batch_delay: Duration::from_millis(config.subscribe_batch_delay_ms),
            ping_interval: Duration::from_secs(settings.ping_interval_seconds),
            reconnect_delay: Duration::from_millis(settings.reconnect_delay_ms),
            is_connected: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Check if connected
    pub fn is_connected(&self) -> bool {
        self.is_connected.load(Ordering::SeqCst)
    }

    /// Connect and forward trade events until the receiver side shuts down
    ///
    /// Never returns under normal operation; each dropped connection is
    /// retried after the configured delay.
    pub async fn run(&self, event_sender: mpsc::Sender<TradeEvent>) {
        loop {
            match self.connect_once(&event_sender).await {
                Ok(()) => info!("Trade feed stream ended, reconnecting"),
                Err(e) => error!("Trade feed error: {}, reconnecting", e),
            }
            self.is_connected.store(false, Ordering::SeqCst);

            if event_sender.is_closed() {
                info!("Event channel closed, stopping trade feed");
                return;
            }
            tokio::time::sleep(self.reconnect_delay).await;
        }
    }

    /// One connection lifetime: subscribe to the universe, pump messages
    #[instrument(skip(self, event_sender))]
    async fn connect_once(&self, event_sender: &mpsc::Sender<TradeEvent>) -> Result<()> {
        info!("Connecting to trade feed: {}", self.url);

        let (ws_stream, _response) = connect_async(&self.url)
            .await
            .map_err(|e| ClientError::WebSocketConnection(e.to_string()))?;

        info!("Trade feed connection established");
        self.is_connected.store(true, Ordering::SeqCst);

        let (mut write, mut read) = ws_stream.split();

        // Subscribe to every listed coin, in batches with spacing so the
        // server is not slammed on (re)connect
        let coins = self.subscription_coins().await;
        info!("Subscribing to {} coins in batches", coins.len());
        for batch in coins.chunks(self.batch_size) {
            for coin in batch {
                let msg = serde_json::to_string(&WsSubscribeMessage::trades(coin.clone()))?;
                write.send(Message::Text(msg)).await?;
            }
            tokio::time::sleep(self.batch_delay).await;
        }
        debug!("All subscriptions sent");

        let mut ping_timer = interval(self.ping_interval);
        ping_timer.tick().await; // first tick fires immediately

        loop {
            tokio::select! {
                msg = read.next() => {
                    match msg {
                        Some(Ok(Message::Text(text))) => {
                            self.handle_text(&text, event_sender).await;
                        }
                        Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                        Some(Ok(Message::Close(frame))) => {
                            info!("Trade feed closed: {:?}", frame);
                            return Ok(());
                        }
                        Some(Err(e)) => {
                            return Err(ClientError::WebSocketCommunication(e.to_string()));
                        }
                        None => return Ok(()),
                        _ => {}
                    }
                }
                _ = ping_timer.tick() => {
                    let ping = serde_json::to_string(&WsPing::default())?;
                    write.send(Message::Text(ping)).await?;
                }
            }
        }
    }

    /// The full universe, or a small fixed fallback when meta is unavailable
    async fn subscription_coins(&self) -> Vec<String> {
        match self.info.meta().await {
            Some(meta) if !meta.universe.is_empty() => {
                meta.universe.into_iter().map(|a| a.name).collect()
            }
            _ => {
                warn!(
                    "Failed to fetch universe, falling back to {:?}",
                    FALLBACK_COINS
                );
                FALLBACK_COINS.iter().map(|s| s.to_string()).collect()
            }
        }
    }

    async fn handle_text(&self, text: &str, event_sender: &mpsc::Sender<TradeEvent>) {
        let envelope: WsEnvelope = match serde_json::from_str(text) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!("Unparseable feed message: {} - {}", e, text);
                return;
            }
        };

        match envelope.channel.as_str() {
            "trades" => {
                let trades: Vec<WsTrade> = match serde_json::from_value(envelope.data) {
                    Ok(trades) => trades,
                    Err(e) => {
                        warn!("Malformed trades payload: {}", e);
                        return;
                    }
                };
                for trade in trades {
                    if let Some(event) = Self::convert_trade(trade) {
                        if event_sender.send(event).await.is_err() {
                            error!("Trade channel closed, dropping events");
                            return;
                        }
                    }
                }
            }
            "subscriptionResponse" => debug!("Subscription confirmed"),
            "pong" => debug!("Received pong"),
            other => debug!("Ignoring feed channel: {}", other),
        }
    }

    /// Convert a raw feed trade, dropping ones with unusable numbers
    fn convert_trade(trade: WsTrade) -> Option<TradeEvent> {
        let price: Decimal = trade.px.parse().ok()?;
        let size: Decimal = trade.sz.parse().ok()?;

        let (maker, taker) = trade.users;
        let accounts: Vec<String> = [maker, taker]
            .into_iter()
            .filter(|a| is_valid_address(a))
            .collect();

        Some(TradeEvent {
            coin: trade.coin,
            side: TradeSide::from_feed_code(&trade.side),
            price,
            size,
            accounts,
        })
    }
}
