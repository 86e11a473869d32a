//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module implements a limit order book for a single trading instrument.
// It maintains bid and ask orders in price-time priority (FIFO) order and matches crossing
// orders into trades as soon as they are submitted.
//
// | Component     | Description                                                               |
// |---------------|---------------------------------------------------------------------------|
// | OrderBook     | Price level index, order index and the matching loop                      |
// | Price levels  | BTreeMap per side; bids read from the back, asks from the front           |
// | Order index   | HashMap from order id to (side, price, arena key)                         |
// | Arena         | Slab owning every resting order; levels link through stable keys          |
//
//--------------------------------------------------------------------------------------------------
// FUNCTIONS
//--------------------------------------------------------------------------------------------------
// | Name                  | Description                                | Return Type            |
// |-----------------------|--------------------------------------------|------------------------|
// | add_order             | Submits an order and matches it            | Vec<Trade>             |
// | cancel_order          | Removes a resting order                    | Option<Order>          |
// | modify_order          | Cancels and resubmits with new terms       | Vec<Trade>             |
// | size                  | Number of resting orders                   | usize                  |
// | get_order_infos       | Aggregated quantity per price level        | OrderbookLevelInfos    |
// | can_match             | Whether a price would cross the book       | bool                   |
// | best_bid / best_ask   | Top of book prices                         | Option<Price>          |
// | get_order             | Read-only view of a resting order          | Option<&Order>         |
//
//--------------------------------------------------------------------------------------------------
// TESTS
//--------------------------------------------------------------------------------------------------
// | Name                                   | Description                                       |
// |----------------------------------------|---------------------------------------------------|
// | test_full_cross_empties_book           | Equal buy and sell fully fill each other          |
// | test_time_priority_partial_fill        | Older order fills first, newer keeps remainder    |
// | test_fill_and_kill_without_liquidity   | Non-crossing FillAndKill never rests              |
// | test_modify_moves_order_to_other_side  | Modify re-enters on the new side                  |
// | test_level_aggregation                 | Levels sum remaining quantity                     |
// | test_fill_and_kill_* / test_cancel_* / test_modify_*  | Edge cases of each operation       |
// | proptests                              | Invariants over random operation sequences        |
//--------------------------------------------------------------------------------------------------

use std::collections::{BTreeMap, HashMap};

use slab::Slab;
use tracing::{debug, error, trace};

use super::OrderbookError;
use super::depth::{LevelInfo, OrderbookLevelInfos};
use super::price_level::{OrderKey, OrderNode, PriceLevel};
use crate::domain::models::types::{
    Order, OrderId, OrderModify, OrderType, Price, Quantity, Side, Trade, TradeInfo, Volume,
};

/// Where a resting order lives: its side, its level's price and its arena slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct OrderLocation {
    side: Side,
    price: Price,
    key: OrderKey,
}

/// The main order book structure that maintains bid and ask orders in price-time priority.
///
/// Every mutation keeps the price levels and the order index in lock-step: an order is in a
/// level queue if and only if it has an index entry, and no level is ever left empty. After
/// any public method returns the book is not crossed.
#[derive(Debug, Default)]
pub struct OrderBook {
    /// Bid levels; the highest price is the last key.
    bids: BTreeMap<Price, PriceLevel>,
    /// Ask levels; the lowest price is the first key.
    asks: BTreeMap<Price, PriceLevel>,
    /// Owns every resting order.
    orders: Slab<OrderNode>,
    /// O(1) lookup for orders by ID
    order_map: HashMap<OrderId, OrderLocation>,
}

impl OrderBook {
    /// Creates a new empty order book.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty book with room for `capacity` resting orders before reallocating.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            bids: BTreeMap::new(),
            asks: BTreeMap::new(),
            orders: Slab::with_capacity(capacity),
            order_map: HashMap::with_capacity(capacity),
        }
    }

    /// Submits an order, matching it against the book.
    ///
    /// # Arguments
    /// * `order` - The order to submit
    ///
    /// # Returns
    /// The trades produced by this submission, in the order they were filled. Empty when
    /// nothing crossed or the order was ignored.
    ///
    /// # Notes
    /// - An order whose id is already resting is ignored
    /// - An order with no remaining quantity is ignored
    /// - A FillAndKill order that cannot cross on arrival is ignored and never rests
    /// - Anything left of a FillAndKill order after matching is cancelled
    ///
    /// # Panics
    /// If matching ever tries to fill an order past its remaining quantity. This means the
    /// book's accounting is corrupt and it must be discarded.
    pub fn add_order(&mut self, order: Order) -> Vec<Trade> {
        let order_id = order.id();

        if self.order_map.contains_key(&order_id) {
            debug!(order_id, "duplicate order id ignored");
            return Vec::new();
        }

        if order.is_filled() {
            debug!(order_id, "order without remaining quantity ignored");
            return Vec::new();
        }

        if order.order_type() == OrderType::FillAndKill
            && !self.can_match(order.side(), order.price())
        {
            debug!(
                order_id,
                side = ?order.side(),
                price = order.price(),
                "fill and kill order cannot match"
            );
            return Vec::new();
        }

        self.insert_resting(order);
        self.match_orders()
    }

    /// Cancels a resting order.
    ///
    /// Cancelling an unknown or already removed id does nothing. Cancelling never triggers
    /// matching.
    ///
    /// # Returns
    /// * `Some(Order)` - The order as it was when removed
    /// * `None` - If no order with this id was resting
    pub fn cancel_order(&mut self, order_id: OrderId) -> Option<Order> {
        let cancelled = self.remove_resting(order_id);
        match &cancelled {
            Some(order) => {
                debug!(order_id, remaining = order.remaining_quantity(), "order cancelled")
            }
            None => debug!(order_id, "cancel for unknown order ignored"),
        }
        cancelled
    }

    /// Replaces a resting order with new side, price and quantity.
    ///
    /// The original order type is kept. The order loses its time priority and joins the
    /// tail of its new level, and it trades like a fresh submission if the new price crosses.
    ///
    /// # Returns
    /// The trades produced by the resubmission; empty if the id is not resting.
    pub fn modify_order(&mut self, modify: OrderModify) -> Vec<Trade> {
        let order_id = modify.order_id();
        let Some(order_type) = self.get_order(order_id).map(Order::order_type) else {
            debug!(order_id, "modify for unknown order ignored");
            return Vec::new();
        };

        self.remove_resting(order_id);
        self.add_order(modify.to_order(order_type))
    }

    /// Number of resting orders.
    #[inline]
    pub fn size(&self) -> usize {
        self.order_map.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_map.is_empty()
    }

    /// Builds a fresh aggregated view of both sides.
    ///
    /// Bids are listed from the highest price down, asks from the lowest price up. Each
    /// entry sums the remaining quantity of every order at that price.
    pub fn get_order_infos(&self) -> OrderbookLevelInfos {
        let level_info =
            |level: &PriceLevel| LevelInfo::new(level.price(), level.total_quantity(&self.orders));

        OrderbookLevelInfos::new(
            self.bids.values().rev().map(&level_info).collect(),
            self.asks.values().map(&level_info).collect(),
        )
    }

    /// Whether an order on `side` at `price` would immediately cross the book.
    ///
    /// A buy crosses when asks exist and `price >= best ask`; a sell crosses when bids exist
    /// and `price <= best bid`.
    pub fn can_match(&self, side: Side, price: Price) -> bool {
        self.best_price(side.opposite())
            .is_some_and(|best| match side {
                Side::Buy => price >= best,
                Side::Sell => price <= best,
            })
    }

    /// Returns the best bid price.
    #[inline]
    pub fn best_bid(&self) -> Option<Price> {
        self.bids.keys().next_back().copied()
    }

    /// Returns the best ask price.
    #[inline]
    pub fn best_ask(&self) -> Option<Price> {
        self.asks.keys().next().copied()
    }

    /// Top of book price on `side`.
    #[inline]
    fn best_price(&self, side: Side) -> Option<Price> {
        match side {
            Side::Buy => self.best_bid(),
            Side::Sell => self.best_ask(),
        }
    }

    /// Returns the spread between the best bid and ask prices.
    ///
    /// # Returns
    /// * `Some(Price)` - The difference between best ask and best bid
    /// * `None` - If either best bid or best ask is missing, or the difference does not fit
    ///   in a `Price`
    pub fn spread(&self) -> Option<Price> {
        match (self.best_ask(), self.best_bid()) {
            (Some(ask), Some(bid)) => ask.checked_sub(bid),
            _ => None,
        }
    }

    /// Read-only view of a resting order.
    pub fn get_order(&self, order_id: OrderId) -> Option<&Order> {
        self.order_map
            .get(&order_id)
            .and_then(|location| self.orders.get(location.key))
            .map(OrderNode::order)
    }

    /// Gets the next order to be matched on `side` without removing it.
    ///
    /// # Notes
    /// - For bids, returns the oldest order at the highest price
    /// - For asks, returns the oldest order at the lowest price
    pub fn peek_best_order(&self, side: Side) -> Option<&Order> {
        let level = match side {
            Side::Buy => self.bids.values().next_back(),
            Side::Sell => self.asks.values().next(),
        }?;
        level
            .front()
            .and_then(|key| self.orders.get(key))
            .map(OrderNode::order)
    }

    /// Returns the number of orders at a specific price level.
    pub fn order_count_at_price(&self, side: Side, price: Price) -> usize {
        self.levels(side)
            .get(&price)
            .map_or(0, PriceLevel::order_count)
    }

    /// Returns the total remaining quantity at a specific price level.
    ///
    /// # Returns
    /// * `Some(Volume)` - The total quantity at the specified price
    /// * `None` - If no orders exist at the specified price
    pub fn volume_at_price(&self, side: Side, price: Price) -> Option<Volume> {
        self.levels(side)
            .get(&price)
            .map(|level| level.total_quantity(&self.orders))
    }

    /// Resting orders at `price` on `side`, oldest first.
    pub fn orders_at_price(&self, side: Side, price: Price) -> Vec<&Order> {
        self.levels(side)
            .get(&price)
            .map(|level| level.iter(&self.orders).collect())
            .unwrap_or_default()
    }

    #[inline]
    fn levels(&self, side: Side) -> &BTreeMap<Price, PriceLevel> {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }

    /// Appends `order` to its level, creating the level if needed, and indexes it.
    fn insert_resting(&mut self, order: Order) {
        let (order_id, side, price) = (order.id(), order.side(), order.price());
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };

        let key = levels
            .entry(price)
            .or_insert_with(|| PriceLevel::new(price))
            .push_back(&mut self.orders, order);

        self.order_map.insert(order_id, OrderLocation { side, price, key });
    }

    /// Unlinks a resting order from its level and the index, dropping the level if it
    /// becomes empty.
    fn remove_resting(&mut self, order_id: OrderId) -> Option<Order> {
        let OrderLocation { side, price, key } = self.order_map.remove(&order_id)?;
        let levels = match side {
            Side::Buy => &mut self.bids,
            Side::Sell => &mut self.asks,
        };

        let Some(level) = levels.get_mut(&price) else {
            fatal(OrderbookError::MissingLevel { order_id, side, price });
        };
        let Some(order) = level.unlink(&mut self.orders, key) else {
            fatal(OrderbookError::MissingOrder(order_id));
        };

        if level.is_empty() {
            levels.remove(&price);
        }
        Some(order)
    }

    /// Key of the oldest order at `price` on `side`.
    #[inline]
    fn front_key(&self, side: Side, price: Price) -> Option<OrderKey> {
        self.levels(side).get(&price).and_then(PriceLevel::front)
    }

    /// Matches the best bid and ask levels against each other until the book no longer
    /// crosses, then kills any FillAndKill remainder left at the top of either side.
    fn match_orders(&mut self) -> Vec<Trade> {
        let mut trades = Vec::new();

        while let (Some(bid_price), Some(ask_price)) = (self.best_bid(), self.best_ask()) {
            if bid_price < ask_price {
                break;
            }

            // Runs until one of the two levels is used up and removed.
            while let (Some(bid_key), Some(ask_key)) =
                (self.front_key(Side::Buy, bid_price), self.front_key(Side::Sell, ask_price))
            {
                let quantity = self.orders[bid_key]
                    .order
                    .remaining_quantity()
                    .min(self.orders[ask_key].order.remaining_quantity());

                let bid = self.fill_resting(bid_key, quantity);
                let ask = self.fill_resting(ask_key, quantity);
                trace!(
                    bid_order_id = bid.order_id,
                    bid_price = bid.price,
                    ask_order_id = ask.order_id,
                    ask_price = ask.price,
                    quantity,
                    "orders matched"
                );
                trades.push(Trade::new(bid, ask));
            }
        }

        self.kill_fill_and_kill(Side::Buy);
        self.kill_fill_and_kill(Side::Sell);
        trades
    }

    /// Fills the resting order at `key`, retiring it once nothing remains.
    fn fill_resting(&mut self, key: OrderKey, quantity: Quantity) -> TradeInfo {
        let order = &mut self.orders[key].order;
        if let Err(err) = order.fill(quantity) {
            fatal(err.into());
        }

        let fill = TradeInfo {
            order_id: order.id(),
            price: order.price(),
            quantity,
        };
        if order.is_filled() {
            self.remove_resting(fill.order_id);
        }
        fill
    }

    /// Cancels the head of the best level on `side` if it is a FillAndKill order.
    fn kill_fill_and_kill(&mut self, side: Side) {
        let doomed = self
            .peek_best_order(side)
            .filter(|order| order.order_type() == OrderType::FillAndKill)
            .map(Order::id);

        if let Some(order_id) = doomed {
            if let Some(order) = self.remove_resting(order_id) {
                debug!(
                    order_id,
                    filled = order.filled_quantity(),
                    killed = order.remaining_quantity(),
                    "fill and kill remainder cancelled"
                );
            }
        }
    }
}

/// Reports a corrupted book and aborts the operation.
#[cold]
fn fatal(err: OrderbookError) -> ! {
    error!(error = %err, "order book accounting violated");
    panic!("{err}");
}

#[cfg(test)]
mod tests {
    //----------------------------------------------------------------------------------------------
    // TEST MODULE OVERVIEW
    //----------------------------------------------------------------------------------------------
    // 1. Basic scenarios: full cross, partial fill, FillAndKill, modify, aggregation
    // 2. Matching: price priority, crossing prices, sweeping levels
    // 3. FillAndKill: partial fill then kill, full consumption, duplicate ids
    // 4. Cancel / Modify edge cases
    // 5. Property tests over random operation sequences
    //----------------------------------------------------------------------------------------------

    use super::*;

    fn gtc(id: OrderId, side: Side, price: Price, quantity: Quantity) -> Order {
        Order::new(OrderType::GoodTillCancel, id, side, price, quantity)
    }

    fn fak(id: OrderId, side: Side, price: Price, quantity: Quantity) -> Order {
        Order::new(OrderType::FillAndKill, id, side, price, quantity)
    }

    fn legs(trades: &[Trade]) -> Vec<(OrderId, OrderId, Quantity)> {
        trades
            .iter()
            .map(|trade| (trade.bid().order_id, trade.ask().order_id, trade.quantity()))
            .collect()
    }

    impl OrderBook {
        /// Checks that levels, index and arena agree and that the book is at rest.
        fn assert_invariants(&self) {
            let mut in_levels = 0;
            for (side, levels) in [(Side::Buy, &self.bids), (Side::Sell, &self.asks)] {
                for (price, level) in levels {
                    assert!(!level.is_empty(), "empty level left at {price}");
                    assert_eq!(level.price(), *price);
                    let queued: Vec<&Order> = level.iter(&self.orders).collect();
                    assert_eq!(queued.len(), level.order_count());
                    for order in queued {
                        assert_eq!(order.side(), side);
                        assert_eq!(order.price(), *price);
                        assert!(order.remaining_quantity() > 0);
                        assert_ne!(order.order_type(), OrderType::FillAndKill);
                        let location = self.order_map.get(&order.id());
                        assert!(matches!(location, Some(l) if l.side == side && l.price == *price));
                    }
                    in_levels += level.order_count();
                }
            }
            assert_eq!(in_levels, self.order_map.len());
            assert_eq!(self.orders.len(), self.order_map.len());
            for (order_id, location) in &self.order_map {
                assert_eq!(self.orders.get(location.key).map(|n| n.order().id()), Some(*order_id));
            }
            if let (Some(bid), Some(ask)) = (self.best_bid(), self.best_ask()) {
                assert!(bid < ask, "book left crossed: bid {bid} ask {ask}");
            }
        }
    }

    #[test]
    fn test_empty_orderbook() {
        let book = OrderBook::new();

        assert_eq!(book.size(), 0);
        assert!(book.is_empty());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), None);
        assert_eq!(book.spread(), None);
        assert_eq!(book.volume_at_price(Side::Buy, 100), None);
        assert_eq!(book.get_order_infos(), OrderbookLevelInfos::default());
        assert!(!book.can_match(Side::Buy, i64::MAX));
        assert!(!book.can_match(Side::Sell, i64::MIN));
    }

    #[test]
    fn test_full_cross_empties_book() {
        let mut book = OrderBook::new();

        assert!(book.add_order(gtc(1, Side::Buy, 100, 10)).is_empty());
        let trades = book.add_order(gtc(2, Side::Sell, 100, 10));

        assert_eq!(legs(&trades), vec![(1, 2, 10)]);
        assert_eq!(trades[0].bid().price, 100);
        assert_eq!(trades[0].ask().price, 100);
        assert_eq!(book.size(), 0);
        assert_eq!(book.get_order_infos(), OrderbookLevelInfos::default());
        book.assert_invariants();
    }

    #[test]
    fn test_time_priority_partial_fill() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));
        book.add_order(gtc(2, Side::Buy, 100, 5));

        let trades = book.add_order(gtc(3, Side::Sell, 100, 7));

        assert_eq!(legs(&trades), vec![(1, 3, 5), (2, 3, 2)]);
        assert!(book.get_order(1).is_none());
        assert_eq!(book.get_order(2).map(Order::remaining_quantity), Some(3));
        assert_eq!(book.peek_best_order(Side::Buy).map(Order::id), Some(2));
        assert_eq!(book.size(), 1);
        book.assert_invariants();
    }

    #[test]
    fn test_fill_and_kill_without_liquidity() {
        let mut book = OrderBook::new();

        let trades = book.add_order(fak(1, Side::Sell, 101, 5));

        assert!(trades.is_empty());
        assert_eq!(book.size(), 0);
        assert!(book.get_order(1).is_none());
    }

    #[test]
    fn test_fill_and_kill_not_reaching_best_price() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));

        assert!(book.add_order(fak(2, Side::Sell, 101, 5)).is_empty());
        assert_eq!(book.size(), 1);
        assert_eq!(book.best_ask(), None);
    }

    #[test]
    fn test_modify_moves_order_to_other_side() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 10));

        let trades = book.modify_order(OrderModify::new(1, Side::Sell, 100, 10));

        assert!(trades.is_empty());
        assert_eq!(book.size(), 1);
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.best_ask(), Some(100));
        let infos = book.get_order_infos();
        assert!(infos.bids().is_empty());
        assert_eq!(infos.asks(), &[LevelInfo::new(100, 10)]);
        book.assert_invariants();
    }

    #[test]
    fn test_level_aggregation() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 3));
        book.add_order(gtc(2, Side::Buy, 100, 4));

        let infos = book.get_order_infos();

        assert_eq!(infos.bids(), &[LevelInfo::new(100, 7)]);
        assert!(infos.asks().is_empty());
    }

    #[test]
    fn test_level_ordering_both_sides() {
        let mut book = OrderBook::new();
        for (id, price) in [(1, 98), (2, 100), (3, 99)] {
            book.add_order(gtc(id, Side::Buy, price, id));
        }
        for (id, price) in [(4, 103), (5, 101), (6, 102)] {
            book.add_order(gtc(id, Side::Sell, price, id));
        }

        let infos = book.get_order_infos();
        let bid_prices: Vec<Price> = infos.bids().iter().map(|l| l.price).collect();
        let ask_prices: Vec<Price> = infos.asks().iter().map(|l| l.price).collect();

        assert_eq!(bid_prices, vec![100, 99, 98]);
        assert_eq!(ask_prices, vec![101, 102, 103]);
        assert_eq!(book.spread(), Some(1));
        book.assert_invariants();
    }

    #[test]
    fn test_partial_fill_reduces_level_quantity() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Sell, 100, 10));

        book.add_order(gtc(2, Side::Buy, 100, 4));

        assert_eq!(book.volume_at_price(Side::Sell, 100), Some(6));
        let resting = book.get_order(1).cloned();
        assert_eq!(resting.as_ref().map(Order::filled_quantity), Some(4));
        assert_eq!(resting.as_ref().map(Order::initial_quantity), Some(10));
    }

    #[test]
    fn test_each_leg_keeps_its_own_price() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Sell, 99, 5));

        let trades = book.add_order(gtc(2, Side::Buy, 101, 5));

        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].bid().price, 101);
        assert_eq!(trades[0].ask().price, 99);
    }

    #[test]
    fn test_aggressor_sweeps_levels_in_price_order() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Sell, 102, 2));
        book.add_order(gtc(2, Side::Sell, 100, 2));
        book.add_order(gtc(3, Side::Sell, 101, 2));
        book.add_order(gtc(4, Side::Sell, 100, 2));

        let trades = book.add_order(gtc(5, Side::Buy, 101, 7));

        assert_eq!(legs(&trades), vec![(5, 2, 2), (5, 4, 2), (5, 3, 2)]);
        // One lot is left over at 101 and becomes the best bid.
        assert_eq!(book.best_bid(), Some(101));
        assert_eq!(book.volume_at_price(Side::Buy, 101), Some(1));
        assert_eq!(book.best_ask(), Some(102));
        book.assert_invariants();
    }

    #[test]
    fn test_fill_and_kill_partial_fill_then_killed() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Sell, 100, 3));
        book.add_order(gtc(2, Side::Sell, 105, 3));

        let trades = book.add_order(fak(3, Side::Buy, 101, 10));

        assert_eq!(legs(&trades), vec![(3, 1, 3)]);
        assert!(book.get_order(3).is_none());
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.size(), 1);
        book.assert_invariants();
    }

    #[test]
    fn test_fill_and_kill_fully_filled() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 8));

        let trades = book.add_order(fak(2, Side::Sell, 100, 5));

        assert_eq!(legs(&trades), vec![(1, 2, 5)]);
        assert_eq!(book.get_order(1).map(Order::remaining_quantity), Some(3));
        assert_eq!(book.size(), 1);
        book.assert_invariants();
    }

    #[test]
    fn test_fill_and_kill_leaves_resting_gtc_alone() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 99, 4));
        book.add_order(gtc(2, Side::Sell, 100, 2));

        book.add_order(fak(3, Side::Buy, 100, 5));

        assert_eq!(book.best_bid(), Some(99));
        assert_eq!(book.peek_best_order(Side::Buy).map(Order::id), Some(1));
        book.assert_invariants();
    }

    #[test]
    fn test_duplicate_order_id_ignored() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));

        let trades = book.add_order(gtc(1, Side::Sell, 100, 5));

        assert!(trades.is_empty());
        assert_eq!(book.size(), 1);
        assert_eq!(book.get_order(1).map(Order::side), Some(Side::Buy));
    }

    #[test]
    fn test_zero_quantity_ignored() {
        let mut book = OrderBook::new();

        assert!(book.add_order(gtc(1, Side::Buy, 100, 0)).is_empty());
        assert_eq!(book.size(), 0);
        assert_eq!(book.best_bid(), None);
    }

    #[test]
    fn test_filled_id_can_be_reused() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));
        book.add_order(gtc(2, Side::Sell, 100, 5));

        assert!(book.add_order(gtc(1, Side::Sell, 101, 2)).is_empty());
        assert_eq!(book.get_order(1).map(Order::side), Some(Side::Sell));
    }

    #[test]
    fn test_cancel_order() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));

        let cancelled = book.cancel_order(1);

        assert_eq!(cancelled.map(|o| o.id()), Some(1));
        assert_eq!(book.size(), 0);
        assert_eq!(book.best_bid(), None);
        assert_eq!(book.order_count_at_price(Side::Buy, 100), 0);
        book.assert_invariants();
    }

    #[test]
    fn test_cancel_is_idempotent() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));

        assert!(book.cancel_order(1).is_some());
        assert!(book.cancel_order(1).is_none());
        assert!(book.cancel_order(42).is_none());
        assert_eq!(book.size(), 0);
    }

    #[test]
    fn test_cancel_middle_keeps_fifo() {
        let mut book = OrderBook::new();
        for id in 1..=3 {
            book.add_order(gtc(id, Side::Sell, 100, 2));
        }

        book.cancel_order(2);
        let trades = book.add_order(gtc(4, Side::Buy, 100, 4));

        assert_eq!(legs(&trades), vec![(4, 1, 2), (4, 3, 2)]);
        assert!(book.is_empty());
    }

    #[test]
    fn test_cancel_partially_filled_order() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 10));
        book.add_order(gtc(2, Side::Sell, 100, 4));

        let cancelled = book.cancel_order(1);

        assert_eq!(cancelled.as_ref().map(Order::filled_quantity), Some(4));
        assert_eq!(cancelled.as_ref().map(Order::remaining_quantity), Some(6));
        assert!(book.is_empty());
    }

    #[test]
    fn test_modify_unknown_order() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));

        let trades = book.modify_order(OrderModify::new(2, Side::Sell, 100, 5));

        assert!(trades.is_empty());
        assert_eq!(book.size(), 1);
        assert!(book.get_order(2).is_none());
    }

    #[test]
    fn test_modify_resets_time_priority() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));
        book.add_order(gtc(2, Side::Buy, 100, 5));

        book.modify_order(OrderModify::new(1, Side::Buy, 100, 5));
        let trades = book.add_order(gtc(3, Side::Sell, 100, 5));

        assert_eq!(legs(&trades), vec![(2, 3, 5)]);
        assert_eq!(book.peek_best_order(Side::Buy).map(Order::id), Some(1));
    }

    #[test]
    fn test_modify_into_cross_trades() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Sell, 101, 5));
        book.add_order(gtc(2, Side::Buy, 99, 8));

        let trades = book.modify_order(OrderModify::new(2, Side::Buy, 101, 8));

        assert_eq!(legs(&trades), vec![(2, 1, 5)]);
        assert_eq!(book.get_order(2).map(Order::remaining_quantity), Some(3));
        assert_eq!(book.get_order(2).map(Order::price), Some(101));
        book.assert_invariants();
    }

    #[test]
    fn test_modify_to_zero_quantity_removes_order() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));

        assert!(book.modify_order(OrderModify::new(1, Side::Buy, 100, 0)).is_empty());
        assert!(book.is_empty());
    }

    #[test]
    fn test_negative_prices() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Sell, -5, 3));
        book.add_order(gtc(2, Side::Buy, -10, 3));

        assert_eq!(book.spread(), Some(5));
        assert!(book.can_match(Side::Buy, -5));
        assert!(!book.can_match(Side::Buy, -6));
        assert!(book.can_match(Side::Sell, -10));

        let trades = book.add_order(gtc(3, Side::Buy, -4, 3));
        assert_eq!(legs(&trades), vec![(3, 1, 3)]);
    }

    #[test]
    fn test_extreme_prices_and_quantities() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, Price::MIN, 1));
        book.add_order(gtc(2, Side::Sell, 1, Quantity::MAX));
        book.add_order(gtc(3, Side::Sell, 1, 5));

        assert_eq!(book.best_bid(), Some(Price::MIN));
        assert_eq!(book.best_ask(), Some(1));
        assert_eq!(book.spread(), None);
        assert_eq!(book.get_order_infos().spread(), None);
        assert!(!book.can_match(Side::Sell, 1));

        let total = Volume::from(Quantity::MAX) + 5;
        assert_eq!(book.volume_at_price(Side::Sell, 1), Some(total));
        assert_eq!(book.get_order_infos().asks(), &[LevelInfo::new(1, total)]);
        book.assert_invariants();
    }

    #[test]
    fn test_orders_at_price_fifo() {
        let mut book = OrderBook::new();
        for id in [5, 3, 9] {
            book.add_order(gtc(id, Side::Buy, 100, 1));
        }

        let ids: Vec<OrderId> = book
            .orders_at_price(Side::Buy, 100)
            .into_iter()
            .map(Order::id)
            .collect();
        assert_eq!(ids, vec![5, 3, 9]);
        assert_eq!(book.order_count_at_price(Side::Buy, 100), 3);
        assert!(book.orders_at_price(Side::Sell, 100).is_empty());
    }

    #[test]
    #[should_panic(expected = "cannot be filled for more than its remaining quantity")]
    fn test_overfill_is_fatal() {
        let mut book = OrderBook::new();
        book.add_order(gtc(1, Side::Buy, 100, 5));
        let key = book.order_map[&1].key;

        book.fill_resting(key, 6);
    }

    mod proptests {
        use super::*;
        use proptest::prelude::*;

        #[derive(Debug, Clone)]
        enum Op {
            Add(Order),
            Cancel(OrderId),
            Modify(OrderModify),
        }

        fn side() -> impl Strategy<Value = Side> {
            prop_oneof![Just(Side::Buy), Just(Side::Sell)]
        }

        fn op() -> impl Strategy<Value = Op> {
            let order_type = prop_oneof![
                3 => Just(OrderType::GoodTillCancel),
                1 => Just(OrderType::FillAndKill),
            ];
            prop_oneof![
                5 => (order_type, 0u64..30, side(), 95i64..=105, 1u64..=20)
                    .prop_map(|(t, id, s, p, q)| Op::Add(Order::new(t, id, s, p, q))),
                1 => (0u64..30).prop_map(Op::Cancel),
                1 => (0u64..30, side(), 95i64..=105, 1u64..=20)
                    .prop_map(|(id, s, p, q)| Op::Modify(OrderModify::new(id, s, p, q))),
            ]
        }

        proptest! {
            #[test]
            fn prop_book_stays_consistent(ops in prop::collection::vec(op(), 1..150)) {
                let mut book = OrderBook::new();

                for op in ops {
                    let size_before = book.size();
                    let (incoming, trades) = match op {
                        Op::Add(order) => {
                            let incoming = (order.id(), order.initial_quantity());
                            (Some(incoming), book.add_order(order))
                        }
                        Op::Cancel(order_id) => {
                            book.cancel_order(order_id);
                            prop_assert!(book.size() <= size_before);
                            (None, Vec::new())
                        }
                        Op::Modify(modify) => {
                            let incoming = (modify.order_id(), modify.quantity());
                            (Some(incoming), book.modify_order(modify))
                        }
                    };

                    for trade in &trades {
                        prop_assert_eq!(trade.bid().quantity, trade.ask().quantity);
                        prop_assert!(trade.quantity() > 0);
                        prop_assert!(trade.bid().price >= trade.ask().price);
                    }
                    if let Some((order_id, quantity)) = incoming {
                        let filled: Quantity = trades
                            .iter()
                            .flat_map(|t| [t.bid(), t.ask()])
                            .filter(|leg| leg.order_id == order_id)
                            .map(|leg| leg.quantity)
                            .sum();
                        prop_assert!(filled <= quantity);
                    }
                    book.assert_invariants();
                }
            }

            #[test]
            fn prop_same_price_fills_in_arrival_order(
                quantities in prop::collection::vec(1u64..=10, 1..20),
                sell_quantity in 1u64..=150,
            ) {
                let mut book = OrderBook::new();
                for (id, quantity) in quantities.iter().enumerate() {
                    book.add_order(gtc(id as OrderId, Side::Buy, 100, *quantity));
                }

                let trades = book.add_order(gtc(1_000, Side::Sell, 100, sell_quantity));

                // Every fill but the last must consume its bid completely, in arrival order.
                for (index, trade) in trades.iter().enumerate() {
                    prop_assert_eq!(trade.bid().order_id, index as OrderId);
                    if index + 1 < trades.len() {
                        prop_assert_eq!(trade.quantity(), quantities[index]);
                    }
                }
                let traded: Quantity = trades.iter().map(Trade::quantity).sum();
                let resting: Quantity = quantities.iter().sum();
                prop_assert_eq!(traded, sell_quantity.min(resting));
                book.assert_invariants();
            }
        }
    }
}
