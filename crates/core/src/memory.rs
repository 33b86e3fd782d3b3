//! In-memory [`BookingStore`] for tests and local tooling.
//!
//! All state sits behind one `std::sync::Mutex`, so every trait method is
//! atomic with respect to the others, matching the row-level guarantees the
//! PostgreSQL store provides. The mutex is never held across an `.await`.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use async_trait::async_trait;

use crate::models::{
    NewOrder, NewPayment, Order, PaymentTransaction, Room, Seat, Showtime, Ticket,
};
use crate::status::{OrderStatus, TicketStatus};
use crate::store::{BookingStore, StoreError};
use crate::types::{DbId, Money};

#[derive(Default)]
struct MemoryState {
    next_id: DbId,
    rooms: HashMap<DbId, Room>,
    seats: HashMap<DbId, Seat>,
    showtimes: HashMap<DbId, Showtime>,
    tickets: HashMap<DbId, Ticket>,
    orders: HashMap<DbId, Order>,
    payments: HashMap<DbId, PaymentTransaction>,
    contended: HashSet<DbId>,
}

impl MemoryState {
    fn next_id(&mut self) -> DbId {
        self.next_id += 1;
        self.next_id
    }

    fn release_tickets(&mut self, ticket_ids: &[DbId]) {
        for id in ticket_ids {
            if let Some(ticket) = self.tickets.get_mut(id) {
                ticket.status = TicketStatus::Available;
                ticket.order_id = None;
            }
        }
    }
}

/// Error injected by [`MemoryStore::fail_persistence`].
#[derive(Debug, thiserror::Error)]
#[error("injected persistence failure")]
pub struct InjectedFailure;

/// Process-local booking store.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
    fail_persistence: AtomicBool,
    persist_delay_ms: AtomicI64,
    commit_delay_ms: AtomicI64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MemoryState> {
        // A panic while holding the lock cannot leave a half-applied write:
        // every method mutates only after all of its checks pass.
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    // -----------------------------------------------------------------------
    // Seeding
    // -----------------------------------------------------------------------

    /// Create a room with a full `total_rows` x `seats_per_row` seat grid.
    pub fn add_room(&self, name: &str, total_rows: i32, seats_per_row: i32) -> Room {
        let mut state = self.lock();
        let room = Room {
            id: state.next_id(),
            name: name.to_string(),
            total_rows,
            seats_per_row,
        };
        for row in 0..total_rows {
            for number in 1..=seats_per_row {
                let id = state.next_id();
                state.seats.insert(
                    id,
                    Seat {
                        id,
                        room_id: room.id,
                        row_label: char::from(b'A' + row as u8),
                        seat_number: number,
                        seat_type: Some("standard".to_string()),
                    },
                );
            }
        }
        state.rooms.insert(room.id, room.clone());
        room
    }

    /// Remove a seat from a room (e.g. an aisle gap in the grid).
    pub fn remove_seat(&self, room_id: DbId, row_label: char, seat_number: i32) {
        self.lock().seats.retain(|_, s| {
            !(s.room_id == room_id && s.row_label == row_label && s.seat_number == seat_number)
        });
    }

    /// Schedule a showtime in `room` starting now.
    pub fn add_showtime(&self, room: &Room, movie_id: DbId, base_price: Money) -> Showtime {
        let mut state = self.lock();
        let starts_at = chrono::Utc::now();
        let showtime = Showtime {
            id: state.next_id(),
            movie_id,
            room: room.clone(),
            starts_at,
            ends_at: starts_at + chrono::Duration::hours(2),
            base_price,
        };
        state.showtimes.insert(showtime.id, showtime.clone());
        showtime
    }

    // -----------------------------------------------------------------------
    // Inspection and fault injection
    // -----------------------------------------------------------------------

    /// The non-cancelled ticket for a seat code in a showtime, if one exists.
    pub fn ticket_for(&self, showtime_id: DbId, code: &str) -> Option<Ticket> {
        let parsed = crate::seat_code::parse_seat_code(code).ok()?;
        let state = self.lock();
        let showtime = state.showtimes.get(&showtime_id)?;
        let seat = state.seats.values().find(|s| {
            s.room_id == showtime.room.id && s.code() == parsed
        })?;
        state
            .tickets
            .values()
            .find(|t| {
                t.showtime_id == showtime_id
                    && t.seat_id == seat.id
                    && t.status != TicketStatus::Cancelled
            })
            .cloned()
    }

    /// Overwrite a ticket's status directly, bypassing compare-and-set.
    pub fn force_ticket_status(&self, ticket_id: DbId, status: TicketStatus) {
        if let Some(ticket) = self.lock().tickets.get_mut(&ticket_id) {
            ticket.status = status;
        }
    }

    /// Make the next compare-and-set on `ticket_id` lose to another writer,
    /// which books the ticket first.
    pub fn contend_ticket(&self, ticket_id: DbId) {
        self.lock().contended.insert(ticket_id);
    }

    pub fn order_count(&self) -> usize {
        self.lock().orders.len()
    }

    pub fn payment_for_order(&self, order_id: DbId) -> Option<PaymentTransaction> {
        self.lock()
            .payments
            .values()
            .find(|p| p.order_id == order_id)
            .cloned()
    }

    /// Make every subsequent `persist_booking` fail.
    pub fn fail_persistence(&self, fail: bool) {
        self.fail_persistence.store(fail, Ordering::SeqCst);
    }

    /// Delay every subsequent `persist_booking` by `delay`.
    pub fn delay_persistence(&self, delay: Duration) {
        self.persist_delay_ms
            .store(delay.as_millis() as i64, Ordering::SeqCst);
    }

    /// Make `persist_booking` wait `delay` after its write is applied, so a
    /// caller can give up on a booking that has already been saved.
    pub fn delay_after_commit(&self, delay: Duration) {
        self.commit_delay_ms
            .store(delay.as_millis() as i64, Ordering::SeqCst);
    }
}

#[async_trait]
impl BookingStore for MemoryStore {
    async fn load_showtime_with_room(
        &self,
        showtime_id: DbId,
    ) -> Result<Option<Showtime>, StoreError> {
        Ok(self.lock().showtimes.get(&showtime_id).cloned())
    }

    async fn find_seat_in_room(
        &self,
        room_id: DbId,
        row_label: char,
        seat_number: i32,
    ) -> Result<Option<Seat>, StoreError> {
        Ok(self
            .lock()
            .seats
            .values()
            .find(|s| s.room_id == room_id && s.row_label == row_label && s.seat_number == seat_number)
            .cloned())
    }

    async fn list_seats_in_room(&self, room_id: DbId) -> Result<Vec<Seat>, StoreError> {
        let mut seats: Vec<Seat> = self
            .lock()
            .seats
            .values()
            .filter(|s| s.room_id == room_id)
            .cloned()
            .collect();
        seats.sort_by_key(|s| (s.row_label, s.seat_number));
        Ok(seats)
    }

    async fn find_or_create_ticket(
        &self,
        showtime_id: DbId,
        seat_id: DbId,
        default_price: Money,
    ) -> Result<Ticket, StoreError> {
        let mut state = self.lock();
        if let Some(existing) = state.tickets.values().find(|t| {
            t.showtime_id == showtime_id
                && t.seat_id == seat_id
                && t.status != TicketStatus::Cancelled
        }) {
            return Ok(existing.clone());
        }

        let ticket = Ticket {
            id: state.next_id(),
            showtime_id,
            seat_id,
            order_id: None,
            price: default_price,
            status: TicketStatus::Available,
        };
        state.tickets.insert(ticket.id, ticket.clone());
        Ok(ticket)
    }

    async fn list_tickets_for_showtime(
        &self,
        showtime_id: DbId,
    ) -> Result<Vec<Ticket>, StoreError> {
        Ok(self
            .lock()
            .tickets
            .values()
            .filter(|t| t.showtime_id == showtime_id && t.status != TicketStatus::Cancelled)
            .cloned()
            .collect())
    }

    async fn compare_and_set_ticket_status(
        &self,
        ticket_id: DbId,
        expected: TicketStatus,
        new: TicketStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        if state.contended.remove(&ticket_id) {
            if let Some(ticket) = state.tickets.get_mut(&ticket_id) {
                ticket.status = TicketStatus::Booked;
            }
            return Ok(false);
        }
        match state.tickets.get_mut(&ticket_id) {
            Some(ticket) if ticket.status == expected => {
                ticket.status = new;
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn revert_tickets_to_available(&self, ticket_ids: &[DbId]) -> Result<(), StoreError> {
        let mut state = self.lock();
        let unowned: Vec<DbId> = ticket_ids
            .iter()
            .copied()
            .filter(|id| state.tickets.get(id).is_some_and(|t| t.order_id.is_none()))
            .collect();
        state.release_tickets(&unowned);
        Ok(())
    }

    async fn persist_booking(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, PaymentTransaction), StoreError> {
        let delay_ms = self.persist_delay_ms.load(Ordering::SeqCst);
        if delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(delay_ms as u64)).await;
        }
        if self.fail_persistence.load(Ordering::SeqCst) {
            return Err(StoreError::backend(InjectedFailure));
        }

        let (saved, tx) = {
            let mut state = self.lock();
            if state.orders.values().any(|o| o.ticket_code == order.ticket_code) {
                return Err(StoreError::Corrupt(format!(
                    "duplicate ticket code {}",
                    order.ticket_code
                )));
            }
            let attachable = order.ticket_ids.iter().all(|id| {
                state
                    .tickets
                    .get(id)
                    .is_some_and(|t| t.order_id.is_none() && t.status.is_occupied())
            });
            if !attachable {
                return Err(StoreError::Corrupt(format!(
                    "order {} names tickets that are not claimed",
                    order.ticket_code
                )));
            }

            let saved = Order {
                id: state.next_id(),
                user_id: order.user_id,
                ticket_code: order.ticket_code,
                total_amount: order.total_amount,
                status: order.status,
                ticket_ids: order.ticket_ids,
                created_at: chrono::Utc::now(),
            };
            for id in &saved.ticket_ids {
                if let Some(ticket) = state.tickets.get_mut(id) {
                    ticket.order_id = Some(saved.id);
                }
            }

            let tx = PaymentTransaction {
                id: state.next_id(),
                order_id: saved.id,
                amount: payment.amount,
                payment_method: payment.payment_method,
                status: payment.status,
                paid_at: payment.paid_at,
            };

            state.orders.insert(saved.id, saved.clone());
            state.payments.insert(tx.id, tx.clone());
            (saved, tx)
        };

        let commit_delay_ms = self.commit_delay_ms.load(Ordering::SeqCst);
        if commit_delay_ms > 0 {
            tokio::time::sleep(Duration::from_millis(commit_delay_ms as u64)).await;
        }
        Ok((saved, tx))
    }

    async fn find_order(&self, order_id: DbId) -> Result<Option<Order>, StoreError> {
        Ok(self.lock().orders.get(&order_id).cloned())
    }

    async fn find_order_by_ticket_code(
        &self,
        ticket_code: &str,
    ) -> Result<Option<Order>, StoreError> {
        Ok(self
            .lock()
            .orders
            .values()
            .find(|o| o.ticket_code == ticket_code)
            .cloned())
    }

    async fn list_orders_for_user(&self, user_id: DbId) -> Result<Vec<Order>, StoreError> {
        let mut orders: Vec<Order> = self
            .lock()
            .orders
            .values()
            .filter(|o| o.user_id == user_id)
            .cloned()
            .collect();
        orders.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(orders)
    }

    async fn close_order(
        &self,
        order_id: DbId,
        expected: OrderStatus,
        new: OrderStatus,
    ) -> Result<bool, StoreError> {
        let mut state = self.lock();
        let ticket_ids = match state.orders.get_mut(&order_id) {
            Some(order) if order.status == expected => {
                order.status = new;
                order.ticket_ids.clone()
            }
            _ => return Ok(false),
        };

        let held: Vec<DbId> = ticket_ids
            .into_iter()
            .filter(|id| {
                state
                    .tickets
                    .get(id)
                    .is_some_and(|t| t.order_id == Some(order_id) && t.status.is_occupied())
            })
            .collect();
        state.release_tickets(&held);
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn find_or_create_ticket_is_idempotent() {
        let store = MemoryStore::new();
        let room = store.add_room("Room 1", 2, 5);
        let showtime = store.add_showtime(&room, 1, Money::from(100_000));
        let seat = store.find_seat_in_room(room.id, 'A', 1).await.unwrap().unwrap();

        let first = store
            .find_or_create_ticket(showtime.id, seat.id, showtime.base_price)
            .await
            .unwrap();
        let second = store
            .find_or_create_ticket(showtime.id, seat.id, Money::from(1))
            .await
            .unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(second.price, Money::from(100_000));
        assert_eq!(second.status, TicketStatus::Available);
    }

    #[tokio::test]
    async fn cancelled_ticket_does_not_block_a_new_one() {
        let store = MemoryStore::new();
        let room = store.add_room("Room 1", 1, 1);
        let showtime = store.add_showtime(&room, 1, Money::from(50));
        let seat = store.find_seat_in_room(room.id, 'A', 1).await.unwrap().unwrap();

        let old = store
            .find_or_create_ticket(showtime.id, seat.id, showtime.base_price)
            .await
            .unwrap();
        store.force_ticket_status(old.id, TicketStatus::Cancelled);

        let fresh = store
            .find_or_create_ticket(showtime.id, seat.id, showtime.base_price)
            .await
            .unwrap();
        assert_ne!(old.id, fresh.id);
        assert_eq!(fresh.status, TicketStatus::Available);
    }

    #[tokio::test]
    async fn compare_and_set_requires_expected_status() {
        let store = MemoryStore::new();
        let room = store.add_room("Room 1", 1, 1);
        let showtime = store.add_showtime(&room, 1, Money::from(50));
        let seat = store.find_seat_in_room(room.id, 'A', 1).await.unwrap().unwrap();
        let ticket = store
            .find_or_create_ticket(showtime.id, seat.id, showtime.base_price)
            .await
            .unwrap();

        assert!(store
            .compare_and_set_ticket_status(ticket.id, TicketStatus::Available, TicketStatus::Booked)
            .await
            .unwrap());
        assert!(!store
            .compare_and_set_ticket_status(ticket.id, TicketStatus::Available, TicketStatus::Sold)
            .await
            .unwrap());
    }

    #[tokio::test]
    async fn seats_are_listed_in_grid_order() {
        let store = MemoryStore::new();
        let room = store.add_room("Room 1", 2, 2);
        let codes: Vec<String> = store
            .list_seats_in_room(room.id)
            .await
            .unwrap()
            .iter()
            .map(|s| s.code().to_string())
            .collect();
        assert_eq!(codes, ["A1", "A2", "B1", "B2"]);
    }

    #[tokio::test]
    async fn revert_leaves_tickets_of_saved_orders_alone() {
        let store = MemoryStore::new();
        let room = store.add_room("Room 1", 1, 2);
        let showtime = store.add_showtime(&room, 1, Money::from(100_000));
        let mut ticket_ids = Vec::new();
        for number in 1..=2 {
            let seat = store.find_seat_in_room(room.id, 'A', number).await.unwrap().unwrap();
            let ticket = store
                .find_or_create_ticket(showtime.id, seat.id, showtime.base_price)
                .await
                .unwrap();
            store
                .compare_and_set_ticket_status(ticket.id, TicketStatus::Available, TicketStatus::Sold)
                .await
                .unwrap();
            ticket_ids.push(ticket.id);
        }

        let (order, _) = store
            .persist_booking(
                NewOrder {
                    user_id: 4,
                    ticket_code: "TKT-1-ABCD".into(),
                    total_amount: Money::from(100_000),
                    status: OrderStatus::Completed,
                    ticket_ids: vec![ticket_ids[0]],
                },
                NewPayment {
                    amount: Money::from(100_000),
                    payment_method: "CASH".into(),
                    status: crate::status::PaymentStatus::Success,
                    paid_at: Some(chrono::Utc::now()),
                },
            )
            .await
            .unwrap();

        store.revert_tickets_to_available(&ticket_ids).await.unwrap();

        let kept = store.ticket_for(showtime.id, "A1").unwrap();
        assert_eq!(kept.status, TicketStatus::Sold);
        assert_eq!(kept.order_id, Some(order.id));
        assert_eq!(
            store.ticket_for(showtime.id, "A2").unwrap().status,
            TicketStatus::Available
        );

        let found = store.find_order_by_ticket_code("TKT-1-ABCD").await.unwrap();
        assert_eq!(found.map(|o| o.id), Some(order.id));
        assert!(store.find_order_by_ticket_code("TKT-0-ZZZZ").await.unwrap().is_none());
    }
}
