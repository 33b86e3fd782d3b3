//! Seat occupancy ledger.
//!
//! Claims are serialized per `(showtime, seat)` by an in-process lock table
//! and every ticket transition is a store-level compare-and-set, so a seat
//! can be claimed at most once even when other processes share the store.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tokio::time::Instant;

use crate::booking::BookingError;
use crate::models::{Room, SeatAvailability, SeatMap, Showtime, Ticket};
use crate::seat_code::{parse_seat_code, SeatCode};
use crate::status::TicketStatus;
use crate::store::{BookingStore, StoreError};
use crate::types::{DbId, Money};

type LockKey = (DbId, DbId);

// ---------------------------------------------------------------------------
// Lock table
// ---------------------------------------------------------------------------

/// Per-(showtime, seat) async mutexes, created on demand.
#[derive(Default)]
pub struct SeatLockTable {
    locks: DashMap<LockKey, Arc<Mutex<()>>>,
}

impl SeatLockTable {
    /// Lock every seat in `seat_ids` (which must be sorted ascending) or give
    /// up at `deadline`. On timeout, locks acquired so far are released.
    async fn acquire(
        self: &Arc<Self>,
        showtime_id: DbId,
        seat_ids: Vec<DbId>,
        deadline: Instant,
    ) -> Option<SeatLocks> {
        let mut held = SeatLocks {
            showtime_id,
            seat_ids,
            guards: Vec::new(),
            table: Arc::clone(self),
        };
        for &seat_id in &held.seat_ids {
            // The shard guard must be released before awaiting.
            let mutex = self
                .locks
                .entry((showtime_id, seat_id))
                .or_default()
                .clone();
            let guard = tokio::time::timeout_at(deadline, mutex.lock_owned())
                .await
                .ok()?;
            held.guards.push(guard);
        }
        Some(held)
    }

    /// Drop entries no claim or waiter references any more.
    fn prune(&self, showtime_id: DbId, seat_ids: &[DbId]) {
        for &seat_id in seat_ids {
            self.locks
                .remove_if(&(showtime_id, seat_id), |_, m| Arc::strong_count(m) == 1);
        }
    }

    /// Number of live lock entries.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

/// Seat locks held by one claim attempt. Unlocks and prunes on drop.
struct SeatLocks {
    showtime_id: DbId,
    seat_ids: Vec<DbId>,
    guards: Vec<OwnedMutexGuard<()>>,
    table: Arc<SeatLockTable>,
}

impl Drop for SeatLocks {
    fn drop(&mut self) {
        self.guards.clear();
        self.table.prune(self.showtime_id, &self.seat_ids);
    }
}

// ---------------------------------------------------------------------------
// Claim
// ---------------------------------------------------------------------------

/// Seats successfully moved out of `AVAILABLE` by one claim.
///
/// The seat locks stay held until the claim is dropped.
pub struct SeatClaim {
    showtime_id: DbId,
    tickets: Vec<Ticket>,
    seat_codes: Vec<SeatCode>,
    total: Money,
    _locks: SeatLocks,
}

impl SeatClaim {
    pub fn showtime_id(&self) -> DbId {
        self.showtime_id
    }

    /// Claimed tickets, in request order, with their new status.
    pub fn tickets(&self) -> &[Ticket] {
        &self.tickets
    }

    pub fn ticket_ids(&self) -> Vec<DbId> {
        self.tickets.iter().map(|t| t.id).collect()
    }

    /// Canonical seat codes, in request order.
    pub fn seat_codes(&self) -> &[SeatCode] {
        &self.seat_codes
    }

    /// Sum of the claimed tickets' prices.
    pub fn total(&self) -> Money {
        self.total
    }
}

impl std::fmt::Debug for SeatClaim {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeatClaim")
            .field("showtime_id", &self.showtime_id)
            .field("tickets", &self.tickets)
            .field("total", &self.total)
            .finish_non_exhaustive()
    }
}

// ---------------------------------------------------------------------------
// Ledger
// ---------------------------------------------------------------------------

pub struct SeatLedger {
    store: Arc<dyn BookingStore>,
    locks: Arc<SeatLockTable>,
    lock_wait: Duration,
}

impl SeatLedger {
    pub fn new(store: Arc<dyn BookingStore>, lock_wait: Duration) -> Self {
        Self {
            store,
            locks: Arc::new(SeatLockTable::default()),
            lock_wait,
        }
    }

    pub fn lock_table(&self) -> &SeatLockTable {
        &self.locks
    }

    /// Atomically move the seats named by `seat_codes` from `AVAILABLE` to
    /// `requested`. Either every seat is claimed or none is.
    pub async fn claim_seats(
        &self,
        showtime: &Showtime,
        seat_codes: &[String],
        requested: TicketStatus,
    ) -> Result<SeatClaim, BookingError> {
        if seat_codes.is_empty() {
            return Err(BookingError::InvalidRequest(
                "at least one seat is required".into(),
            ));
        }
        if !requested.is_occupied() {
            return Err(BookingError::InvalidRequest(format!(
                "cannot claim seats as {requested}"
            )));
        }

        let room = &showtime.room;
        let mut codes = Vec::with_capacity(seat_codes.len());
        let mut seen = HashSet::with_capacity(seat_codes.len());
        for raw in seat_codes {
            let code = parse_seat_code(raw)?;
            if !seen.insert(code.in_room(room.id)) {
                return Err(BookingError::DuplicateSeatInRequest(code.to_string()));
            }
            codes.push(code);
        }

        let mut seat_ids = Vec::with_capacity(codes.len());
        for code in &codes {
            seat_ids.push(self.resolve_seat(room, *code).await?);
        }

        let mut lock_order = seat_ids.clone();
        lock_order.sort_unstable();
        let deadline = Instant::now() + self.lock_wait;
        let locks = self
            .locks
            .acquire(showtime.id, lock_order, deadline)
            .await
            .ok_or_else(|| BookingError::SeatLockTimeout {
                seats: codes.iter().map(ToString::to_string).collect(),
            })?;

        let mut tickets = Vec::with_capacity(seat_ids.len());
        for &seat_id in &seat_ids {
            let ticket = self
                .store
                .find_or_create_ticket(showtime.id, seat_id, showtime.base_price)
                .await?;
            tickets.push(ticket);
        }

        let taken: Vec<String> = tickets
            .iter()
            .zip(&codes)
            .filter(|(t, _)| t.status != TicketStatus::Available)
            .map(|(_, c)| c.to_string())
            .collect();
        if !taken.is_empty() {
            return Err(BookingError::SeatUnavailable { seats: taken });
        }

        let mut moved: Vec<DbId> = Vec::with_capacity(tickets.len());
        for (ticket, code) in tickets.iter_mut().zip(&codes) {
            let outcome = self
                .store
                .compare_and_set_ticket_status(ticket.id, TicketStatus::Available, requested)
                .await;
            match outcome {
                Ok(true) => {
                    ticket.status = requested;
                    moved.push(ticket.id);
                }
                Ok(false) => {
                    self.compensate(&moved).await;
                    return Err(BookingError::SeatUnavailable {
                        seats: vec![code.to_string()],
                    });
                }
                Err(err) => {
                    self.compensate(&moved).await;
                    return Err(err.into());
                }
            }
        }

        let total = tickets.iter().map(|t| t.price).sum();
        Ok(SeatClaim {
            showtime_id: showtime.id,
            tickets,
            seat_codes: codes,
            total,
            _locks: locks,
        })
    }

    /// Return every ticket of `claim` to `AVAILABLE`.
    pub async fn release(&self, claim: &SeatClaim) -> Result<(), StoreError> {
        self.store
            .revert_tickets_to_available(&claim.ticket_ids())
            .await
    }

    /// Occupancy view of a showtime.
    pub async fn seat_map(&self, showtime_id: DbId) -> Result<SeatMap, BookingError> {
        let showtime = self
            .store
            .load_showtime_with_room(showtime_id)
            .await?
            .ok_or(BookingError::ShowtimeNotFound(showtime_id))?;
        let seats = self.store.list_seats_in_room(showtime.room.id).await?;
        let tickets = self.store.list_tickets_for_showtime(showtime_id).await?;

        let occupied: HashMap<DbId, TicketStatus> = tickets
            .into_iter()
            .filter(|t| t.status.is_occupied())
            .map(|t| (t.seat_id, t.status))
            .collect();

        let seats: Vec<SeatAvailability> = seats
            .into_iter()
            .map(|seat| SeatAvailability {
                seat_id: seat.id,
                code: seat.code().to_string(),
                row_label: seat.row_label,
                seat_number: seat.seat_number,
                booked: occupied.contains_key(&seat.id),
                seat_type: seat.seat_type,
            })
            .collect();
        let booked_seat_codes = seats
            .iter()
            .filter(|s| s.booked)
            .map(|s| s.code.clone())
            .collect();

        Ok(SeatMap {
            showtime_id,
            room_id: showtime.room.id,
            room_name: showtime.room.name,
            total_rows: showtime.room.total_rows,
            seats_per_row: showtime.room.seats_per_row,
            price_per_seat: showtime.base_price,
            seats,
            booked_seat_codes,
        })
    }

    /// Look up the seat id for `code`. Codes outside the room grid never
    /// reach the store.
    async fn resolve_seat(&self, room: &Room, code: SeatCode) -> Result<DbId, BookingError> {
        let not_found = || BookingError::SeatNotFound {
            room_id: room.id,
            code: code.to_string(),
        };
        if !room.contains(&code) {
            return Err(not_found());
        }
        self.store
            .find_seat_in_room(room.id, code.row_label, code.seat_number)
            .await?
            .map(|seat| seat.id)
            .ok_or_else(not_found)
    }

    async fn compensate(&self, ticket_ids: &[DbId]) {
        if ticket_ids.is_empty() {
            return;
        }
        if let Err(e) = self.store.revert_tickets_to_available(ticket_ids).await {
            tracing::error!(
                error = %e,
                ticket_ids = ?ticket_ids,
                "Failed to revert claimed tickets",
            );
        }
    }
}
