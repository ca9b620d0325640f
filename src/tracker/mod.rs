pub mod aggregator;
pub mod alerts;
pub mod positions;

pub use aggregator::TradeAggregator;
pub use alerts::{AlertDeduper, AlertKind, FireDecision};
pub use positions::PositionTracker;
