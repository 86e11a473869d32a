//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// FIFO queues of orders sharing one price, stored as doubly-linked lists threaded through a
// shared slab arena. Every order lives in exactly one arena slot; the slot key never changes
// while the order rests, so the order index can hold it as a stable handle and unlink the
// order in O(1) from anywhere in its queue.
//
// | Name          | Description                                        | Key Methods              |
// |---------------|----------------------------------------------------|--------------------------|
// | OrderNode     | Arena slot: the order plus its queue neighbours    | order                    |
// | PriceLevel    | Head/tail of one price's queue                     | push_back, unlink, front |
// |               |                                                    | iter, total_quantity     |
//--------------------------------------------------------------------------------------------------

use slab::Slab;

use crate::domain::models::types::{Order, Price, Quantity, Volume};

/// Stable handle of an order inside the arena.
pub type OrderKey = usize;

/// Arena slot holding one resting order and its links inside its price level.
#[derive(Debug, Clone)]
pub struct OrderNode {
    pub(crate) order: Order,
    prev: Option<OrderKey>,
    next: Option<OrderKey>,
}

impl OrderNode {
    pub fn order(&self) -> &Order {
        &self.order
    }
}

/// Represents a price level in the order book, maintaining a FIFO queue of orders
/// at the same price point.
///
/// The level only stores the ends of its queue; the nodes themselves are owned by the arena
/// passed into each method.
#[derive(Debug, Clone)]
pub struct PriceLevel {
    price: Price,
    head: Option<OrderKey>,
    tail: Option<OrderKey>,
    order_count: usize,
}

impl PriceLevel {
    /// Creates an empty level at `price`.
    pub fn new(price: Price) -> Self {
        Self {
            price,
            head: None,
            tail: None,
            order_count: 0,
        }
    }

    #[inline]
    pub fn price(&self) -> Price {
        self.price
    }

    /// Returns true if this price level has no orders.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.order_count == 0
    }

    #[inline]
    pub fn order_count(&self) -> usize {
        self.order_count
    }

    /// Key of the oldest order at this level, the next one to be matched.
    #[inline]
    pub fn front(&self) -> Option<OrderKey> {
        self.head
    }

    /// Stores `order` in the arena and appends it to the tail of the queue.
    ///
    /// # Returns
    /// The arena key of the new node
    pub fn push_back(&mut self, arena: &mut Slab<OrderNode>, order: Order) -> OrderKey {
        let key = arena.insert(OrderNode {
            order,
            prev: self.tail,
            next: None,
        });

        match self.tail {
            Some(tail) => arena[tail].next = Some(key),
            None => self.head = Some(key),
        }
        self.tail = Some(key);
        self.order_count += 1;
        key
    }

    /// Removes the node at `key` from the queue and frees its arena slot.
    ///
    /// # Returns
    /// * `Some(Order)` - The unlinked order
    /// * `None` - If `key` holds no order
    pub fn unlink(&mut self, arena: &mut Slab<OrderNode>, key: OrderKey) -> Option<Order> {
        let node = arena.try_remove(key)?;

        match node.prev {
            Some(prev) => arena[prev].next = node.next,
            None => self.head = node.next,
        }
        match node.next {
            Some(next) => arena[next].prev = node.prev,
            None => self.tail = node.prev,
        }
        self.order_count -= 1;
        Some(node.order)
    }

    /// Iterates the level's orders from oldest to newest.
    pub fn iter<'a>(&self, arena: &'a Slab<OrderNode>) -> LevelIter<'a> {
        LevelIter {
            arena,
            cursor: self.head,
        }
    }

    /// Sum of the remaining quantity of every order at this level.
    pub fn total_quantity(&self, arena: &Slab<OrderNode>) -> Volume {
        self.iter(arena)
            .map(|order| Volume::from(order.remaining_quantity()))
            .sum()
    }
}

/// FIFO iterator over the orders of one level.
pub struct LevelIter<'a> {
    arena: &'a Slab<OrderNode>,
    cursor: Option<OrderKey>,
}

impl<'a> Iterator for LevelIter<'a> {
    type Item = &'a Order;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.arena.get(self.cursor?)?;
        self.cursor = node.next;
        Some(&node.order)
    }
}
