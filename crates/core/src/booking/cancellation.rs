//! Closing orders (cancel / refund) and returning their seats.

use std::sync::Arc;

use crate::booking::BookingError;
use crate::models::Order;
use crate::status::OrderStatus;
use crate::store::BookingStore;
use crate::types::DbId;

/// Who is acting on an order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderActor {
    /// May act only on their own orders.
    Customer(DbId),
    /// Box-office staff; may act on any order.
    Staff(DbId),
}

impl OrderActor {
    pub fn user_id(self) -> DbId {
        match self {
            OrderActor::Customer(id) | OrderActor::Staff(id) => id,
        }
    }

    /// Whether this actor may read or change `order`.
    pub fn can_access(self, order: &Order) -> bool {
        match self {
            OrderActor::Customer(id) => order.user_id == id,
            OrderActor::Staff(_) => true,
        }
    }
}

pub struct OrderCancellation {
    store: Arc<dyn BookingStore>,
}

impl OrderCancellation {
    pub fn new(store: Arc<dyn BookingStore>) -> Self {
        Self { store }
    }

    /// Load an order the actor is allowed to see.
    pub async fn load(&self, actor: OrderActor, order_id: DbId) -> Result<Order, BookingError> {
        let order = self
            .store
            .find_order(order_id)
            .await?
            .ok_or(BookingError::OrderNotFound(order_id))?;
        if !actor.can_access(&order) {
            return Err(BookingError::OrderAccessDenied {
                order_id,
                user_id: actor.user_id(),
            });
        }
        Ok(order)
    }

    /// Move an order to `target` (`CANCELLED` or `REFUNDED`) and free its
    /// seats. Closing an order that is already in `target` is a no-op.
    pub async fn close_order(
        &self,
        actor: OrderActor,
        order_id: DbId,
        target: OrderStatus,
    ) -> Result<Order, BookingError> {
        if !target.is_terminal() {
            return Err(BookingError::InvalidRequest(format!(
                "orders cannot be closed as {target}"
            )));
        }

        let order = self.load(actor, order_id).await?;
        if order.status == target {
            return Ok(order);
        }
        if order.status.is_terminal() {
            return Err(BookingError::InvalidOrderTransition {
                order_id,
                from: order.status,
                to: target,
            });
        }

        let closed = self.store.close_order(order_id, order.status, target).await?;
        if !closed {
            return Err(BookingError::InvalidOrderTransition {
                order_id,
                from: order.status,
                to: target,
            });
        }

        Ok(Order {
            status: target,
            ..order
        })
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use assert_matches::assert_matches;

    use super::*;
    use crate::booking::{BookingTransaction, SeatLedger};
    use crate::memory::MemoryStore;
    use crate::models::{BookingRequest, Showtime};
    use crate::status::TicketStatus;
    use crate::types::Money;

    struct Fixture {
        store: Arc<MemoryStore>,
        tx: BookingTransaction,
        cancellation: OrderCancellation,
        showtime: Showtime,
    }

    fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let room = store.add_room("Room 2", 5, 8);
        let showtime = store.add_showtime(&room, 3, Money::from(75_000));
        let ledger = Arc::new(SeatLedger::new(store.clone(), Duration::from_secs(1)));
        Fixture {
            tx: BookingTransaction::new(store.clone(), ledger, Duration::from_secs(5)),
            cancellation: OrderCancellation::new(store.clone()),
            store,
            showtime,
        }
    }

    async fn book(f: &Fixture, user_id: DbId, seats: &[&str], method: &str) -> DbId {
        f.tx.book(&BookingRequest {
            user_id,
            showtime_id: f.showtime.id,
            seat_codes: seats.iter().map(|s| s.to_string()).collect(),
            payment_method: method.into(),
        })
        .await
        .unwrap()
        .order_id
    }

    #[tokio::test]
    async fn cancel_frees_seat_for_rebooking() {
        let f = fixture();
        let order_id = book(&f, 1, &["B5"], "card").await;

        let order = f
            .cancellation
            .close_order(OrderActor::Customer(1), order_id, OrderStatus::Cancelled)
            .await
            .unwrap();

        assert_eq!(order.status, OrderStatus::Cancelled);
        let ticket = f.store.ticket_for(f.showtime.id, "B5").unwrap();
        assert_eq!(ticket.status, TicketStatus::Available);
        assert_eq!(ticket.order_id, None);

        book(&f, 2, &["B5"], "cash").await;
        assert_eq!(
            f.store.ticket_for(f.showtime.id, "B5").unwrap().status,
            TicketStatus::Sold
        );
    }

    #[tokio::test]
    async fn closing_twice_is_idempotent() {
        let f = fixture();
        let order_id = book(&f, 1, &["A1"], "cash").await;
        let actor = OrderActor::Staff(99);

        f.cancellation
            .close_order(actor, order_id, OrderStatus::Refunded)
            .await
            .unwrap();
        let again = f
            .cancellation
            .close_order(actor, order_id, OrderStatus::Refunded)
            .await
            .unwrap();
        assert_eq!(again.status, OrderStatus::Refunded);
    }

    #[tokio::test]
    async fn cancelled_order_cannot_be_refunded() {
        let f = fixture();
        let order_id = book(&f, 1, &["A2"], "card").await;
        f.cancellation
            .close_order(OrderActor::Customer(1), order_id, OrderStatus::Cancelled)
            .await
            .unwrap();

        let err = f
            .cancellation
            .close_order(OrderActor::Staff(2), order_id, OrderStatus::Refunded)
            .await
            .unwrap_err();
        assert_matches!(
            err,
            BookingError::InvalidOrderTransition {
                from: OrderStatus::Cancelled,
                to: OrderStatus::Refunded,
                ..
            }
        );
    }

    #[tokio::test]
    async fn customers_cannot_close_other_orders() {
        let f = fixture();
        let order_id = book(&f, 1, &["C1"], "card").await;

        let err = f
            .cancellation
            .close_order(OrderActor::Customer(2), order_id, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::OrderAccessDenied { user_id: 2, .. });
        assert_eq!(
            f.store.ticket_for(f.showtime.id, "C1").unwrap().status,
            TicketStatus::Booked
        );
    }

    #[tokio::test]
    async fn missing_order_is_not_found() {
        let f = fixture();
        let err = f
            .cancellation
            .close_order(OrderActor::Staff(1), 5_000, OrderStatus::Cancelled)
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::OrderNotFound(5_000));
    }

    #[tokio::test]
    async fn non_terminal_target_is_rejected() {
        let f = fixture();
        let order_id = book(&f, 1, &["D1"], "card").await;
        let err = f
            .cancellation
            .close_order(OrderActor::Staff(1), order_id, OrderStatus::Completed)
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::InvalidRequest(_));
    }
}
