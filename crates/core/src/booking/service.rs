//! Caller-facing booking operations.
//!
//! Thin layer over the engine: translates [`BookingError`] into
//! [`CoreError`] and logs every outcome.

use std::sync::Arc;

use tracing::Level;

use crate::booking::{
    BookingConfig, BookingError, BookingTransaction, OrderActor, OrderCancellation, SeatLedger,
};
use crate::error::CoreError;
use crate::models::{BookingRequest, BookingResult, Order, SeatMap};
use crate::status::OrderStatus;
use crate::store::BookingStore;
use crate::types::DbId;

impl From<BookingError> for CoreError {
    fn from(err: BookingError) -> Self {
        let message = err.to_string();
        match err {
            BookingError::InvalidRequest(_)
            | BookingError::InvalidSeatCode(_)
            | BookingError::DuplicateSeatInRequest(_) => CoreError::Validation(message),
            BookingError::SeatUnavailable { seats } => CoreError::Conflict { message, seats },
            BookingError::InvalidOrderTransition { .. } => CoreError::conflict(message),
            BookingError::ShowtimeNotFound(id) => CoreError::NotFound {
                entity: "Showtime",
                key: id.to_string(),
            },
            BookingError::SeatNotFound { code, .. } => CoreError::NotFound {
                entity: "Seat",
                key: code,
            },
            BookingError::OrderNotFound(id) => CoreError::NotFound {
                entity: "Order",
                key: id.to_string(),
            },
            BookingError::SeatLockTimeout { .. } => CoreError::Unavailable(message),
            BookingError::OrderAccessDenied { .. } => CoreError::Forbidden(message),
            BookingError::PersistenceFailure(_) => CoreError::Internal(message),
        }
    }
}

pub struct BookingService {
    store: Arc<dyn BookingStore>,
    ledger: Arc<SeatLedger>,
    transaction: BookingTransaction,
    cancellation: OrderCancellation,
}

impl BookingService {
    pub fn new(store: Arc<dyn BookingStore>, config: BookingConfig) -> Self {
        let ledger = Arc::new(SeatLedger::new(store.clone(), config.seat_lock_wait));
        Self {
            transaction: BookingTransaction::new(
                store.clone(),
                ledger.clone(),
                config.persist_timeout,
            ),
            cancellation: OrderCancellation::new(store.clone()),
            ledger,
            store,
        }
    }

    pub async fn book(&self, request: BookingRequest) -> Result<BookingResult, CoreError> {
        match self.transaction.book(&request).await {
            Ok(result) => {
                tracing::info!(
                    user_id = request.user_id,
                    showtime_id = request.showtime_id,
                    order_id = result.order_id,
                    seats = ?result.seat_codes,
                    status = %result.status,
                    total = %result.total_amount,
                    "Booking committed",
                );
                Ok(result)
            }
            Err(err) => {
                log_failure(
                    &err,
                    "Booking rejected",
                    Subject {
                        user_id: Some(request.user_id),
                        showtime_id: Some(request.showtime_id),
                        ..Subject::default()
                    },
                );
                Err(err.into())
            }
        }
    }

    pub async fn seat_map(&self, showtime_id: DbId) -> Result<SeatMap, CoreError> {
        self.ledger.seat_map(showtime_id).await.map_err(|err| {
            log_failure(
                &err,
                "Seat map unavailable",
                Subject {
                    showtime_id: Some(showtime_id),
                    ..Subject::default()
                },
            );
            err.into()
        })
    }

    /// Cancel one of the caller's own orders.
    pub async fn cancel_order(&self, user_id: DbId, order_id: DbId) -> Result<Order, CoreError> {
        self.close(OrderActor::Customer(user_id), order_id, OrderStatus::Cancelled)
            .await
    }

    /// Refund any order on behalf of staff.
    pub async fn refund_order(&self, staff_id: DbId, order_id: DbId) -> Result<Order, CoreError> {
        self.close(OrderActor::Staff(staff_id), order_id, OrderStatus::Refunded)
            .await
    }

    pub async fn orders_for_user(&self, user_id: DbId) -> Result<Vec<Order>, CoreError> {
        self.store
            .list_orders_for_user(user_id)
            .await
            .map_err(|e| {
                let err = BookingError::from(e);
                log_failure(
                    &err,
                    "Order listing failed",
                    Subject {
                        user_id: Some(user_id),
                        ..Subject::default()
                    },
                );
                err.into()
            })
    }

    pub async fn order(&self, actor: OrderActor, order_id: DbId) -> Result<Order, CoreError> {
        self.cancellation.load(actor, order_id).await.map_err(|err| {
            log_failure(
                &err,
                "Order lookup rejected",
                Subject {
                    user_id: Some(actor.user_id()),
                    order_id: Some(order_id),
                    ..Subject::default()
                },
            );
            err.into()
        })
    }

    async fn close(
        &self,
        actor: OrderActor,
        order_id: DbId,
        target: OrderStatus,
    ) -> Result<Order, CoreError> {
        match self.cancellation.close_order(actor, order_id, target).await {
            Ok(order) => {
                tracing::info!(
                    user_id = actor.user_id(),
                    order_id,
                    status = %order.status,
                    "Order closed",
                );
                Ok(order)
            }
            Err(err) => {
                let what = match target {
                    OrderStatus::Refunded => "Order refund rejected",
                    _ => "Order cancellation rejected",
                };
                log_failure(
                    &err,
                    what,
                    Subject {
                        user_id: Some(actor.user_id()),
                        order_id: Some(order_id),
                        ..Subject::default()
                    },
                );
                Err(err.into())
            }
        }
    }
}

/// Ids a failure is about. Unset ids are left out of the log line.
#[derive(Debug, Default, Clone, Copy)]
struct Subject {
    user_id: Option<DbId>,
    showtime_id: Option<DbId>,
    order_id: Option<DbId>,
}

/// Storage failures are ours; everything else is the caller's.
fn failure_level(err: &BookingError) -> Level {
    match err {
        BookingError::PersistenceFailure(_) => Level::ERROR,
        _ => Level::WARN,
    }
}

fn log_failure(err: &BookingError, what: &str, subject: Subject) {
    let Subject {
        user_id,
        showtime_id,
        order_id,
    } = subject;
    if failure_level(err) == Level::ERROR {
        tracing::error!(error = %err, user_id, showtime_id, order_id, "{}", what);
    } else {
        tracing::warn!(error = %err, user_id, showtime_id, order_id, "{}", what);
    }
}
