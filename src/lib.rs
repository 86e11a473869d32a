// Expose the modules
pub mod config;
pub mod domain;

// Re-export key types for easier usage
pub use config::{Config, ConfigError};
pub use domain::models::types::{
    Order, OrderError, OrderId, OrderModify, OrderType, Price, Quantity, Side, Trade, TradeInfo,
    Volume,
};
pub use domain::services::matching_engine::MatchingEngine;
pub use domain::services::orderbook::OrderbookError;
pub use domain::services::orderbook::depth::{LevelInfo, OrderbookLevelInfos};
pub use domain::services::orderbook::orderbook::OrderBook;
