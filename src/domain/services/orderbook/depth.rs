//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Aggregated, read-only views of the order book. A snapshot is rebuilt from the price levels
// on every request; nothing here is cached or updated incrementally.
//
// | Name                  | Description                                       | Key Methods       |
// |-----------------------|---------------------------------------------------|-------------------|
// | LevelInfo             | Total remaining quantity at one price             | new               |
// | OrderbookLevelInfos   | Bid and ask levels in their natural order         | bids, asks        |
// |                       |                                                   | best_bid, spread  |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use crate::domain::models::types::{Price, Volume};

/// Aggregated remaining quantity at a single price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelInfo {
    pub price: Price,
    pub quantity: Volume,
}

impl LevelInfo {
    #[inline]
    pub fn new(price: Price, quantity: Volume) -> Self {
        Self { price, quantity }
    }
}

/// Point-in-time view of both sides of the book.
///
/// Bids are ordered by price descending and asks by price ascending, so the first entry of
/// each side is the top of book.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderbookLevelInfos {
    bids: Vec<LevelInfo>,
    asks: Vec<LevelInfo>,
}

impl OrderbookLevelInfos {
    pub fn new(bids: Vec<LevelInfo>, asks: Vec<LevelInfo>) -> Self {
        Self { bids, asks }
    }

    pub fn bids(&self) -> &[LevelInfo] {
        &self.bids
    }

    pub fn asks(&self) -> &[LevelInfo] {
        &self.asks
    }

    /// Returns the best bid price if available
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.first().map(|level| level.price)
    }

    /// Returns the best ask price if available
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.first().map(|level| level.price)
    }

    /// Returns the current spread (best ask - best bid), or `None` if either side is empty
    /// or the difference does not fit in a [`Price`].
    #[inline]
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => ask.checked_sub(bid),
            _ => None,
        }
    }
}
