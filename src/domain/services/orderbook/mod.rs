use thiserror::Error;

use crate::domain::models::types::{OrderError, OrderId, Price, Side};

pub mod depth;
pub mod orderbook;
pub mod price_level;

/// Internal accounting faults of the order book.
///
/// None of these are reachable through valid use of the public API. When one is raised the
/// book's levels and order index no longer agree, so the book is abandoned: the matching
/// engine logs the error and panics instead of handing it back to the caller. Expected
/// conditions such as duplicate ids or unknown cancels are not errors at all.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OrderbookError {
    /// An order was filled past its remaining quantity.
    #[error(transparent)]
    Order(#[from] OrderError),

    /// The order index points at a price level that does not exist.
    #[error("Order {order_id} is indexed at {side:?} {price} but that price level is missing")]
    MissingLevel {
        order_id: OrderId,
        side: Side,
        price: Price,
    },

    /// The order index points at an arena slot that holds no order.
    #[error("Order {0} is indexed but not stored in any price level")]
    MissingOrder(OrderId),
}
