//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// This module defines the value types shared by the order book: orders, modification
// requests and the trades produced by matching.
//
// | Section            | Description                                                      |
// |--------------------|------------------------------------------------------------------|
// | ALIASES            | OrderId, Price, Quantity and Volume scalar types.                |
// | ENUMS              | Side and OrderType.                                              |
// | STRUCTS            | Order, OrderModify, TradeInfo and Trade.                         |
// | ERRORS             | OrderError raised by order quantity accounting.                  |
// | TESTS              | Unit tests for the defined types.                                |
//--------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Caller-assigned order identifier. Unique per book instance.
pub type OrderId = u64;
/// Limit price in integer ticks.
pub type Price = i64;
/// Order quantity in lots.
pub type Quantity = u64;
/// Summed quantity of many orders. Wider than [`Quantity`] so a level total never overflows.
pub type Volume = u128;

//--------------------------------------------------------------------------------------------------
//  ENUMS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                         |
// |---------------|-----------------------------------------------------|
// | Side          | Buy (bid) or Sell (ask).                            |
// | OrderType     | GoodTillCancel or FillAndKill.                      |
//--------------------------------------------------------------------------------------------------

/// Represents the side of an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Side {
    /// A buy order, resting on the bid side.
    Buy,
    /// A sell order, resting on the ask side.
    Sell,
}

impl Side {
    /// Returns the side an order of this side trades against.
    pub fn opposite(&self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

/// Represents how long an order may stay in the book.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderType {
    /// Rests until it is fully filled or explicitly cancelled.
    GoodTillCancel,
    /// Trades immediately against whatever crosses; any remainder is discarded.
    FillAndKill,
}

//--------------------------------------------------------------------------------------------------
//  STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name          | Description                                                   |
// |---------------|---------------------------------------------------------------|
// | Order         | A single order with its fill state.                           |
// | OrderModify   | Replacement parameters for a resting order.                   |
// | TradeInfo     | One leg of a trade (order, price, filled quantity).           |
// | Trade         | A bid leg and an ask leg of equal quantity.                   |
//--------------------------------------------------------------------------------------------------

/// Represents a single order.
///
/// Identifier, type, side, price and initial quantity are fixed at construction. Only the
/// remaining quantity changes, and only downwards through [`Order::fill`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Order {
    id: OrderId,
    order_type: OrderType,
    side: Side,
    price: Price,
    initial_quantity: Quantity,
    remaining_quantity: Quantity,
}

impl Order {
    /// Creates a new, unfilled order.
    ///
    /// # Arguments
    /// * `order_type` - GoodTillCancel or FillAndKill
    /// * `id` - Caller-assigned identifier
    /// * `side` - Buy or Sell
    /// * `price` - Limit price
    /// * `quantity` - Initial quantity, also the starting remaining quantity
    pub fn new(
        order_type: OrderType,
        id: OrderId,
        side: Side,
        price: Price,
        quantity: Quantity,
    ) -> Self {
        Self {
            id,
            order_type,
            side,
            price,
            initial_quantity: quantity,
            remaining_quantity: quantity,
        }
    }

    #[inline]
    pub fn id(&self) -> OrderId {
        self.id
    }

    #[inline]
    pub fn order_type(&self) -> OrderType {
        self.order_type
    }

    #[inline]
    pub fn side(&self) -> Side {
        self.side
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    #[inline]
    pub fn initial_quantity(&self) -> Quantity {
        self.initial_quantity
    }

    #[inline]
    pub fn remaining_quantity(&self) -> Quantity {
        self.remaining_quantity
    }

    /// Quantity already executed: initial minus remaining.
    #[inline]
    pub fn filled_quantity(&self) -> Quantity {
        self.initial_quantity - self.remaining_quantity
    }

    #[inline]
    pub fn is_filled(&self) -> bool {
        self.remaining_quantity == 0
    }

    /// Reduces the remaining quantity by `quantity`.
    ///
    /// # Returns
    /// * `Ok(())` - The fill was applied
    /// * `Err(OrderError::Overfill)` - `quantity` exceeds the remaining quantity; the order is
    ///   left untouched
    pub fn fill(&mut self, quantity: Quantity) -> Result<(), OrderError> {
        if quantity > self.remaining_quantity {
            return Err(OrderError::Overfill {
                order_id: self.id,
                requested: quantity,
                remaining: self.remaining_quantity,
            });
        }
        self.remaining_quantity -= quantity;
        Ok(())
    }
}

/// Replacement parameters for a resting order. The order type is taken from the order being
/// replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrderModify {
    order_id: OrderId,
    side: Side,
    price: Price,
    quantity: Quantity,
}

impl OrderModify {
    pub fn new(order_id: OrderId, side: Side, price: Price, quantity: Quantity) -> Self {
        Self {
            order_id,
            side,
            price,
            quantity,
        }
    }

    pub fn order_id(&self) -> OrderId {
        self.order_id
    }

    pub fn side(&self) -> Side {
        self.side
    }

    pub fn price(&self) -> Price {
        self.price
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    /// Builds the fresh replacement order carrying `order_type`.
    pub fn to_order(&self, order_type: OrderType) -> Order {
        Order::new(order_type, self.order_id, self.side, self.price, self.quantity)
    }
}

/// One leg of a trade.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeInfo {
    /// Order that was filled.
    pub order_id: OrderId,
    /// The filled order's own limit price.
    pub price: Price,
    /// Quantity filled on this leg.
    pub quantity: Quantity,
}

/// A match between a bid and an ask. Both legs always carry the same quantity; each leg keeps
/// the price of its own order, so the two prices differ when the book crossed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trade {
    bid: TradeInfo,
    ask: TradeInfo,
}

impl Trade {
    pub fn new(bid: TradeInfo, ask: TradeInfo) -> Self {
        Self { bid, ask }
    }

    pub fn bid(&self) -> &TradeInfo {
        &self.bid
    }

    pub fn ask(&self) -> &TradeInfo {
        &self.ask
    }

    /// Quantity exchanged by this trade.
    pub fn quantity(&self) -> Quantity {
        self.bid.quantity
    }
}

//--------------------------------------------------------------------------------------------------
//  ERRORS
//--------------------------------------------------------------------------------------------------

/// Errors raised by order quantity accounting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum OrderError {
    /// A fill asked for more than the order has left.
    #[error(
        "Order ({order_id}) cannot be filled for more than its remaining quantity \
         (requested {requested}, remaining {remaining})"
    )]
    Overfill {
        order_id: OrderId,
        requested: Quantity,
        remaining: Quantity,
    },
}

//--------------------------------------------------------------------------------------------------
//  TESTS
//--------------------------------------------------------------------------------------------------
// | Name                          | Description                                          |
// |-------------------------------|------------------------------------------------------|
// | test_order_creation           | New orders start unfilled.                           |
// | test_partial_and_full_fill    | Fills reduce remaining and track filled quantity.    |
// | test_overfill_rejected        | Overfilling reports the order and leaves it intact.  |
// | test_modify_preserves_type    | OrderModify builds an order with the given type.     |
// | test_side_opposite            | Opposite side mapping.                               |
// | test_trade_serialization      | Trades serialize both legs.                          |
//--------------------------------------------------------------------------------------------------
