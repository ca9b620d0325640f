//! Typed facade over the request dispatcher

use std::time::Duration;
use tracing::{instrument, warn};

use super::dispatcher::RequestDispatcher;
use super::messages::{ClearinghouseState, InfoRequest, Meta, MetaAndAssetCtxs, UserFill};
use crate::common::errors::Result;
use crate::config::types::HyperliquidConfig;

/// Info API client; all calls share one rate-limited queue
#[derive(Debug, Clone)]
pub struct InfoClient {
    dispatcher: RequestDispatcher,
}

impl InfoClient {
    /// Create a client with the default request timeout
    pub fn new(config: &HyperliquidConfig) -> Result<Self> {
        Self::with_timeout(config, Duration::from_secs(30))
    }

    /// Create a client with a custom request timeout
    pub fn with_timeout(config: &HyperliquidConfig, timeout: Duration) -> Result<Self> {
        Ok(Self {
            dispatcher: RequestDispatcher::new(config, timeout)?,
        })
    }

    /// Account margin and open positions; `None` means no data this cycle
    #[instrument(skip(self))]
    pub async fn user_state(&self, user: &str) -> Option<ClearinghouseState> {
        let request = InfoRequest::ClearinghouseState {
            user: user.to_string(),
        };
        self.decode("clearinghouseState", self.dispatcher.enqueue(&request).await)
    }

    /// Fill history, used to derive wallet age
    #[instrument(skip(self))]
    pub async fn user_fills(&self, user: &str) -> Option<Vec<UserFill>> {
        let request = InfoRequest::UserFills {
            user: user.to_string(),
        };
        self.decode("userFills", self.dispatcher.enqueue(&request).await)
    }

    /// The instrument universe
    #[instrument(skip(self))]
    pub async fn meta(&self) -> Option<Meta> {
        self.decode("meta", self.dispatcher.enqueue(&InfoRequest::Meta).await)
    }

    /// Universe paired with live asset contexts (mark prices)
    #[instrument(skip(self))]
    pub async fn meta_and_asset_ctxs(&self) -> Option<MetaAndAssetCtxs> {
        self.decode(
            "metaAndAssetCtxs",
            self.dispatcher.enqueue(&InfoRequest::MetaAndAssetCtxs).await,
        )
    }

    fn decode<T: serde::de::DeserializeOwned>(
        &self,
        endpoint: &str,
        raw: Option<serde_json::Value>,
    ) -> Option<T> {
        let value = raw?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("Malformed {} response: {}", endpoint, e);
                None
            }
        }
    }
}
