//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Thread-safe front for one instrument's order book. Every call takes the book's exclusive
// lock for the whole operation, so concurrent callers are serialized and never observe the
// price levels and the order index out of step.
//
// | Name            | Description                                   | Key Methods              |
// |-----------------|-----------------------------------------------|--------------------------|
// | MatchingEngine  | Mutex-guarded OrderBook for one instrument    | add_order, cancel_order  |
// |                 |                                               | modify_order, size       |
// |                 |                                               | get_order_infos          |
//--------------------------------------------------------------------------------------------------

use parking_lot::Mutex;
use tracing::debug_span;

use crate::config::Config;
use crate::domain::models::types::{Order, OrderId, OrderModify, Trade};
use crate::domain::services::orderbook::depth::OrderbookLevelInfos;
use crate::domain::services::orderbook::orderbook::OrderBook;

/// The matching engine for a single instrument.
///
/// Operations take `&self`, so one engine can be shared between threads.
#[derive(Debug)]
pub struct MatchingEngine {
    instrument: String,
    book: Mutex<OrderBook>,
}

impl MatchingEngine {
    /// Creates an engine with an empty book for `instrument`.
    pub fn new(instrument: impl Into<String>) -> Self {
        Self::with_book(instrument, OrderBook::new())
    }

    /// Creates an engine sized from configuration.
    pub fn from_config(config: &Config) -> Self {
        Self::with_book(
            config.instrument.clone(),
            OrderBook::with_capacity(config.order_capacity),
        )
    }

    fn with_book(instrument: impl Into<String>, book: OrderBook) -> Self {
        Self {
            instrument: instrument.into(),
            book: Mutex::new(book),
        }
    }

    /// Symbol of the instrument this engine trades.
    pub fn instrument(&self) -> &str {
        &self.instrument
    }

    /// Submits an order; see [`OrderBook::add_order`].
    pub fn add_order(&self, order: Order) -> Vec<Trade> {
        let order_id = order.id();
        let _span = debug_span!("add_order", instrument = %self.instrument, order_id).entered();
        self.book.lock().add_order(order)
    }

    /// Cancels a resting order; see [`OrderBook::cancel_order`].
    pub fn cancel_order(&self, order_id: OrderId) -> Option<Order> {
        let _span = debug_span!("cancel_order", instrument = %self.instrument, order_id).entered();
        self.book.lock().cancel_order(order_id)
    }

    /// Replaces a resting order; see [`OrderBook::modify_order`].
    pub fn modify_order(&self, modify: OrderModify) -> Vec<Trade> {
        let order_id = modify.order_id();
        let _span = debug_span!("modify_order", instrument = %self.instrument, order_id).entered();
        self.book.lock().modify_order(modify)
    }

    pub fn size(&self) -> usize {
        self.book.lock().size()
    }

    pub fn get_order_infos(&self) -> OrderbookLevelInfos {
        self.book.lock().get_order_infos()
    }

    /// Runs `f` against the book while holding the lock, for read-only queries that need a
    /// consistent view across several calls.
    pub fn read<R>(&self, f: impl FnOnce(&OrderBook) -> R) -> R {
        let book = self.book.lock();
        f(&*book)
    }
}
