//! End-to-end booking: claim seats, persist order + payment, compensate on
//! failure. A write whose outcome is unknown is looked up by ticket code
//! before it is reported as failed.

use std::sync::Arc;
use std::time::Duration;

use crate::booking::{BookingError, SeatClaim, SeatLedger};
use crate::models::{BookingRequest, BookingResult, NewOrder, NewPayment, Order, PaymentTransaction};
use crate::payment::{normalize_method, PaymentPlan};
use crate::store::{BookingStore, StoreError};
use crate::ticket_code::generate_ticket_code;

#[derive(Clone)]
pub struct BookingTransaction {
    store: Arc<dyn BookingStore>,
    ledger: Arc<SeatLedger>,
    persist_timeout: Duration,
}

impl BookingTransaction {
    pub fn new(
        store: Arc<dyn BookingStore>,
        ledger: Arc<SeatLedger>,
        persist_timeout: Duration,
    ) -> Self {
        Self {
            store,
            ledger,
            persist_timeout,
        }
    }

    /// Book `request.seat_codes` for `request.user_id`.
    ///
    /// Either an order with all requested seats is committed, or no seat
    /// changes status. The work runs on its own task: a caller that stops
    /// waiting (request timeout, client disconnect) does not interrupt it
    /// between claiming seats and saving or releasing them.
    pub async fn book(&self, request: &BookingRequest) -> Result<BookingResult, BookingError> {
        validate(request)?;

        let this = self.clone();
        let request = request.clone();
        match tokio::spawn(async move { this.run(&request).await }).await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => Err(BookingError::PersistenceFailure(StoreError::backend(err))),
        }
    }

    async fn run(&self, request: &BookingRequest) -> Result<BookingResult, BookingError> {
        let showtime = self
            .store
            .load_showtime_with_room(request.showtime_id)
            .await?
            .ok_or(BookingError::ShowtimeNotFound(request.showtime_id))?;

        let now = chrono::Utc::now();
        let plan = PaymentPlan::for_method(&request.payment_method, now);

        let claim = self
            .ledger
            .claim_seats(&showtime, &request.seat_codes, plan.ticket_status)
            .await?;

        let ticket_code = generate_ticket_code(now);
        let order = NewOrder {
            user_id: request.user_id,
            ticket_code: ticket_code.clone(),
            total_amount: claim.total(),
            status: plan.order_status,
            ticket_ids: claim.ticket_ids(),
        };
        let payment = NewPayment {
            amount: claim.total(),
            payment_method: normalize_method(&request.payment_method),
            status: plan.payment_status,
            paid_at: plan.paid_at,
        };

        let order = match self.persist(order, payment).await {
            Ok((order, _payment)) => order,
            Err(err) => {
                self.compensate(&claim).await;
                match self.landed_order(&claim, &ticket_code, &err).await {
                    Some(order) => order,
                    None => return Err(BookingError::PersistenceFailure(err)),
                }
            }
        };

        Ok(BookingResult {
            order_id: order.id,
            ticket_code: order.ticket_code,
            status: order.status,
            seat_codes: claim.seat_codes().iter().map(ToString::to_string).collect(),
            total_amount: order.total_amount,
        })
    }

    async fn persist(
        &self,
        order: NewOrder,
        payment: NewPayment,
    ) -> Result<(Order, PaymentTransaction), StoreError> {
        tokio::time::timeout(self.persist_timeout, self.store.persist_booking(order, payment))
            .await
            .unwrap_or(Err(StoreError::Timeout))
    }

    /// Return the claimed seats while their locks are still held.
    ///
    /// The store skips tickets an order already owns, so this is safe even
    /// when the failed write in fact committed.
    async fn compensate(&self, claim: &SeatClaim) {
        if let Err(e) = self.ledger.release(claim).await {
            tracing::error!(
                error = %e,
                showtime_id = claim.showtime_id(),
                ticket_ids = ?claim.ticket_ids(),
                "Failed to release seats after persistence failure",
            );
        }
    }

    /// A write that timed out or lost its connection may have committed
    /// anyway. Find the order it would have created, if it exists.
    async fn landed_order(
        &self,
        claim: &SeatClaim,
        ticket_code: &str,
        err: &StoreError,
    ) -> Option<Order> {
        if matches!(err, StoreError::Corrupt(_)) {
            return None;
        }
        let order = match self.store.find_order_by_ticket_code(ticket_code).await {
            Ok(order) => order?,
            Err(e) => {
                tracing::error!(
                    error = %e,
                    ticket_code,
                    "Could not check whether booking was saved",
                );
                return None;
            }
        };

        let mut claimed = claim.ticket_ids();
        let mut owned = order.ticket_ids.clone();
        claimed.sort_unstable();
        owned.sort_unstable();
        if claimed != owned {
            return None;
        }

        tracing::warn!(
            order_id = order.id,
            ticket_code,
            error = %err,
            "Booking was saved although persistence reported failure",
        );
        Some(order)
    }
}

fn validate(request: &BookingRequest) -> Result<(), BookingError> {
    if request.user_id <= 0 {
        return Err(BookingError::InvalidRequest("user id is required".into()));
    }
    if request.seat_codes.is_empty() {
        return Err(BookingError::InvalidRequest(
            "at least one seat is required".into(),
        ));
    }
    if request.payment_method.trim().is_empty() {
        return Err(BookingError::InvalidRequest(
            "payment method is required".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use assert_matches::assert_matches;

    use super::*;
    use crate::memory::MemoryStore;
    use crate::models::Showtime;
    use crate::status::{OrderStatus, PaymentStatus, TicketStatus};
    use crate::types::{DbId, Money};

    struct Fixture {
        store: Arc<MemoryStore>,
        tx: Arc<BookingTransaction>,
        showtime: Showtime,
    }

    fn fixture() -> Fixture {
        fixture_with(Duration::from_secs(2), Duration::from_secs(5))
    }

    fn fixture_with(lock_wait: Duration, persist_timeout: Duration) -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let room = store.add_room("Room 1", 6, 10);
        let showtime = store.add_showtime(&room, 1, Money::from(100_000));
        let ledger = Arc::new(SeatLedger::new(store.clone(), lock_wait));
        let tx = Arc::new(BookingTransaction::new(store.clone(), ledger, persist_timeout));
        Fixture { store, tx, showtime }
    }

    fn request(showtime_id: DbId, seats: &[&str], method: &str) -> BookingRequest {
        BookingRequest {
            user_id: 7,
            showtime_id,
            seat_codes: seats.iter().map(|s| s.to_string()).collect(),
            payment_method: method.to_string(),
        }
    }

    #[tokio::test]
    async fn cash_booking_completes_and_sells_seats() {
        let f = fixture();

        let result = f
            .tx
            .book(&request(f.showtime.id, &["A1", "A2"], "cash"))
            .await
            .unwrap();

        assert_eq!(result.status, OrderStatus::Completed);
        assert_eq!(result.total_amount, Money::from(200_000));
        assert_eq!(result.seat_codes, ["A1", "A2"]);
        assert!(result.ticket_code.starts_with("TKT-"));
        for code in ["A1", "A2"] {
            let ticket = f.store.ticket_for(f.showtime.id, code).unwrap();
            assert_eq!(ticket.status, TicketStatus::Sold);
            assert_eq!(ticket.order_id, Some(result.order_id));
        }

        let payment = f.store.payment_for_order(result.order_id).unwrap();
        assert_eq!(payment.payment_method, "CASH");
        assert_eq!(payment.status, PaymentStatus::Success);
        assert_eq!(payment.amount, Money::from(200_000));
        assert!(payment.paid_at.is_some());
    }

    #[tokio::test]
    async fn card_booking_stays_processing() {
        let f = fixture();

        let result = f
            .tx
            .book(&request(f.showtime.id, &["c4"], "card"))
            .await
            .unwrap();

        assert_eq!(result.status, OrderStatus::Processing);
        assert_eq!(result.seat_codes, ["C4"]);
        assert_eq!(
            f.store.ticket_for(f.showtime.id, "C4").unwrap().status,
            TicketStatus::Booked
        );
        let payment = f.store.payment_for_order(result.order_id).unwrap();
        assert_eq!(payment.payment_method, "CARD");
        assert_eq!(payment.status, PaymentStatus::Pending);
        assert!(payment.paid_at.is_none());
    }

    #[tokio::test]
    async fn total_is_sum_of_existing_ticket_prices() {
        let f = fixture();
        let seat = f
            .store
            .find_seat_in_room(f.showtime.room.id, 'B', 1)
            .await
            .unwrap()
            .unwrap();
        // A ticket created earlier at a different price keeps that price.
        f.store
            .find_or_create_ticket(f.showtime.id, seat.id, Money::from(80_000))
            .await
            .unwrap();

        let result = f
            .tx
            .book(&request(f.showtime.id, &["B1", "B2"], "cash"))
            .await
            .unwrap();
        assert_eq!(result.total_amount, Money::from(180_000));
    }

    #[tokio::test]
    async fn second_booking_of_same_seat_is_rejected() {
        let f = fixture();
        f.tx.book(&request(f.showtime.id, &["A1"], "cash"))
            .await
            .unwrap();

        let err = f
            .tx
            .book(&request(f.showtime.id, &["A1"], "card"))
            .await
            .unwrap_err();

        assert_matches!(err, BookingError::SeatUnavailable { seats } if seats == ["A1"]);
        assert_eq!(f.store.order_count(), 1);
    }

    #[tokio::test]
    async fn malformed_code_fails_before_storage() {
        let f = fixture();

        let err = f
            .tx
            .book(&request(f.showtime.id, &["A1", "1A"], "cash"))
            .await
            .unwrap_err();

        assert_matches!(err, BookingError::InvalidSeatCode(_));
        assert!(f.store.ticket_for(f.showtime.id, "A1").is_none());
    }

    #[tokio::test]
    async fn unknown_showtime_is_not_found() {
        let f = fixture();
        let err = f
            .tx
            .book(&request(424_242, &["A1"], "cash"))
            .await
            .unwrap_err();
        assert_matches!(err, BookingError::ShowtimeNotFound(424_242));
    }

    #[tokio::test]
    async fn invalid_requests_are_rejected() {
        let f = fixture();

        let mut no_user = request(f.showtime.id, &["A1"], "cash");
        no_user.user_id = 0;
        let no_seats = request(f.showtime.id, &[], "cash");
        let no_method = request(f.showtime.id, &["A1"], "  ");

        for bad in [no_user, no_seats, no_method] {
            let err = f.tx.book(&bad).await.unwrap_err();
            assert_matches!(err, BookingError::InvalidRequest(_));
        }
    }

    #[tokio::test]
    async fn persistence_failure_releases_seats() {
        let f = fixture();
        f.store.fail_persistence(true);

        let err = f
            .tx
            .book(&request(f.showtime.id, &["D1", "D2"], "cash"))
            .await
            .unwrap_err();

        assert_matches!(err, BookingError::PersistenceFailure(StoreError::Backend(_)));
        assert_eq!(f.store.order_count(), 0);
        for code in ["D1", "D2"] {
            assert_eq!(
                f.store.ticket_for(f.showtime.id, code).unwrap().status,
                TicketStatus::Available
            );
        }

        f.store.fail_persistence(false);
        f.tx.book(&request(f.showtime.id, &["D1", "D2"], "cash"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn persistence_timeout_releases_seats() {
        let f = fixture_with(Duration::from_secs(2), Duration::from_millis(50));
        f.store.delay_persistence(Duration::from_millis(500));

        let err = f
            .tx
            .book(&request(f.showtime.id, &["E5"], "card"))
            .await
            .unwrap_err();

        assert_matches!(err, BookingError::PersistenceFailure(StoreError::Timeout));
        assert_eq!(f.store.order_count(), 0);
        assert_eq!(
            f.store.ticket_for(f.showtime.id, "E5").unwrap().status,
            TicketStatus::Available
        );
    }

    #[tokio::test]
    async fn abandoned_booking_still_completes() {
        let f = fixture();
        f.store.delay_persistence(Duration::from_millis(300));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            f.tx.book(&request(f.showtime.id, &["B3"], "cash")),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let ticket = f.store.ticket_for(f.showtime.id, "B3").unwrap();
        assert_eq!(ticket.status, TicketStatus::Sold);
        assert!(ticket.order_id.is_some());
        assert_eq!(f.store.order_count(), 1);
    }

    #[tokio::test]
    async fn abandoned_booking_that_fails_still_releases_seats() {
        let f = fixture_with(Duration::from_secs(2), Duration::from_millis(100));
        f.store.delay_persistence(Duration::from_millis(300));

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            f.tx.book(&request(f.showtime.id, &["B4"], "cash")),
        )
        .await;
        assert!(abandoned.is_err());

        tokio::time::sleep(Duration::from_millis(500)).await;
        let ticket = f.store.ticket_for(f.showtime.id, "B4").unwrap();
        assert_eq!(ticket.status, TicketStatus::Available);
        assert_eq!(ticket.order_id, None);
        assert_eq!(f.store.order_count(), 0);
    }

    #[tokio::test]
    async fn write_that_commits_after_timeout_is_reported_as_booked() {
        let f = fixture_with(Duration::from_secs(2), Duration::from_millis(100));
        f.store.delay_after_commit(Duration::from_millis(300));

        let result = f
            .tx
            .book(&request(f.showtime.id, &["C7", "C8"], "cash"))
            .await
            .unwrap();

        assert_eq!(result.status, OrderStatus::Completed);
        assert_eq!(result.seat_codes, ["C7", "C8"]);
        for code in ["C7", "C8"] {
            let ticket = f.store.ticket_for(f.showtime.id, code).unwrap();
            assert_eq!(ticket.status, TicketStatus::Sold);
            assert_eq!(ticket.order_id, Some(result.order_id));
        }
        assert_eq!(f.store.order_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_bookings_of_one_seat_yield_one_order() {
        let f = fixture();
        let showtime_id = f.showtime.id;

        let handles: Vec<_> = (0..16)
            .map(|i| {
                let tx = Arc::clone(&f.tx);
                tokio::spawn(async move {
                    let mut req = request(showtime_id, &["F7"], "cash");
                    req.user_id = 100 + i;
                    tx.book(&req).await
                })
            })
            .collect();

        let mut won = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => won += 1,
                Err(err) => assert_matches!(err, BookingError::SeatUnavailable { .. }),
            }
        }

        assert_eq!(won, 1);
        assert_eq!(f.store.order_count(), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_multi_seat_bookings_never_split_seats() {
        let f = fixture();
        let showtime_id = f.showtime.id;

        let left = {
            let tx = Arc::clone(&f.tx);
            tokio::spawn(async move { tx.book(&request(showtime_id, &["A5", "A6"], "cash")).await })
        };
        let right = {
            let tx = Arc::clone(&f.tx);
            tokio::spawn(async move { tx.book(&request(showtime_id, &["A6", "A5"], "cash")).await })
        };

        let outcomes = [left.await.unwrap(), right.await.unwrap()];
        assert_eq!(outcomes.iter().filter(|r| r.is_ok()).count(), 1);

        let winner = outcomes.iter().find_map(|r| r.as_ref().ok()).unwrap();
        for code in ["A5", "A6"] {
            assert_eq!(
                f.store.ticket_for(showtime_id, code).unwrap().order_id,
                Some(winner.order_id)
            );
        }
    }
}
