//! Hyperliquid module - info API access and the public trade feed

pub mod client;
pub mod dispatcher;
pub mod messages;
pub mod websocket;

pub use client::InfoClient;
pub use dispatcher::RequestDispatcher;
pub use websocket::TradeFeedClient;
