//! Domain records exchanged between the booking engine and its store.
//!
//! Stored records (`Showtime`, `Ticket`, `Order`, ...) are returned by the
//! store; `New*` records are immutable values handed to the store, which
//! assigns ids on insert.

use serde::{Deserialize, Serialize};

use crate::seat_code::SeatCode;
use crate::status::{OrderStatus, PaymentStatus, TicketStatus};
use crate::types::{DbId, Money, Timestamp};

// ---------------------------------------------------------------------------
// Catalog (read-only inputs)
// ---------------------------------------------------------------------------

/// A screening room and its seat grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Room {
    pub id: DbId,
    pub name: String,
    pub total_rows: i32,
    pub seats_per_row: i32,
}

impl Room {
    /// Whether `code` falls inside this room's grid.
    pub fn contains(&self, code: &SeatCode) -> bool {
        code.row_index() < self.total_rows && code.seat_number <= self.seats_per_row
    }
}

/// A screening of a movie in a room, loaded together with its room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Showtime {
    pub id: DbId,
    pub movie_id: DbId,
    pub room: Room,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub base_price: Money,
}

/// A physical seat in a room.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Seat {
    pub id: DbId,
    pub room_id: DbId,
    pub row_label: char,
    pub seat_number: i32,
    pub seat_type: Option<String>,
}

impl Seat {
    pub fn code(&self) -> SeatCode {
        SeatCode {
            row_label: self.row_label,
            seat_number: self.seat_number,
        }
    }
}

// ---------------------------------------------------------------------------
// Ticket
// ---------------------------------------------------------------------------

/// Occupancy record of one seat for one showtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Ticket {
    pub id: DbId,
    pub showtime_id: DbId,
    pub seat_id: DbId,
    /// Owning order while the ticket is booked or sold.
    pub order_id: Option<DbId>,
    pub price: Money,
    pub status: TicketStatus,
}

// ---------------------------------------------------------------------------
// Order + payment
// ---------------------------------------------------------------------------

/// A committed purchase of one or more tickets.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Order {
    pub id: DbId,
    pub user_id: DbId,
    pub ticket_code: String,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub ticket_ids: Vec<DbId>,
    pub created_at: Timestamp,
}

/// Payment record created alongside an order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PaymentTransaction {
    pub id: DbId,
    pub order_id: DbId,
    pub amount: Money,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub paid_at: Option<Timestamp>,
}

/// Order to insert. `ticket_ids` become owned by the new order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewOrder {
    pub user_id: DbId,
    pub ticket_code: String,
    pub total_amount: Money,
    pub status: OrderStatus,
    pub ticket_ids: Vec<DbId>,
}

/// Payment record to insert with a [`NewOrder`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub amount: Money,
    pub payment_method: String,
    pub status: PaymentStatus,
    pub paid_at: Option<Timestamp>,
}

// ---------------------------------------------------------------------------
// Booking request / result
// ---------------------------------------------------------------------------

/// Input to a booking. `user_id` is the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookingRequest {
    pub user_id: DbId,
    pub showtime_id: DbId,
    pub seat_codes: Vec<String>,
    pub payment_method: String,
}

/// Outcome of a successful booking.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingResult {
    pub order_id: DbId,
    pub ticket_code: String,
    pub status: OrderStatus,
    /// Canonical seat codes in request order.
    pub seat_codes: Vec<String>,
    pub total_amount: Money,
}

// ---------------------------------------------------------------------------
// Seat map
// ---------------------------------------------------------------------------

/// One seat in a showtime's seat map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatAvailability {
    pub seat_id: DbId,
    pub code: String,
    pub row_label: char,
    pub seat_number: i32,
    pub seat_type: Option<String>,
    pub booked: bool,
}

/// Occupancy view of one showtime.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatMap {
    pub showtime_id: DbId,
    pub room_id: DbId,
    pub room_name: String,
    pub total_rows: i32,
    pub seats_per_row: i32,
    pub price_per_seat: Money,
    pub seats: Vec<SeatAvailability>,
    pub booked_seat_codes: Vec<String>,
}
