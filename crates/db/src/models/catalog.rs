//! Rooms, movies, showtimes and seats.

use cinebook_core::models::{Room, Seat, Showtime};
use cinebook_core::store::StoreError;
use cinebook_core::types::{DbId, Money, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `rooms` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct RoomRow {
    pub id: DbId,
    pub name: String,
    pub total_rows: i32,
    pub seats_per_row: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl From<RoomRow> for Room {
    fn from(row: RoomRow) -> Self {
        Room {
            id: row.id,
            name: row.name,
            total_rows: row.total_rows,
            seats_per_row: row.seats_per_row,
        }
    }
}

/// DTO for creating a room. Its full seat grid is created with it.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoom {
    pub name: String,
    pub total_rows: i32,
    pub seats_per_row: i32,
    pub seat_type: Option<String>,
}

/// A row from the `movies` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct MovieRow {
    pub id: DbId,
    pub title: String,
    pub duration_minutes: i32,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateMovie {
    pub title: String,
    pub duration_minutes: i32,
}

/// A `showtimes` row joined with its room.
#[derive(Debug, Clone, FromRow)]
pub struct ShowtimeWithRoomRow {
    pub id: DbId,
    pub movie_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub base_price: Money,
    pub room_id: DbId,
    pub room_name: String,
    pub total_rows: i32,
    pub seats_per_row: i32,
}

impl From<ShowtimeWithRoomRow> for Showtime {
    fn from(row: ShowtimeWithRoomRow) -> Self {
        Showtime {
            id: row.id,
            movie_id: row.movie_id,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            base_price: row.base_price,
            room: Room {
                id: row.room_id,
                name: row.room_name,
                total_rows: row.total_rows,
                seats_per_row: row.seats_per_row,
            },
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateShowtime {
    pub movie_id: DbId,
    pub room_id: DbId,
    pub starts_at: Timestamp,
    pub ends_at: Timestamp,
    pub base_price: Money,
}

/// A row from the `seats` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct SeatRow {
    pub id: DbId,
    pub room_id: DbId,
    pub row_label: String,
    pub seat_number: i32,
    pub seat_type: Option<String>,
}

impl TryFrom<SeatRow> for Seat {
    type Error = StoreError;

    fn try_from(row: SeatRow) -> Result<Self, Self::Error> {
        let mut chars = row.row_label.chars();
        let row_label = match (chars.next(), chars.next()) {
            (Some(c), None) if c.is_ascii_uppercase() => c,
            _ => {
                return Err(StoreError::Corrupt(format!(
                    "seat {} has row label '{}'",
                    row.id, row.row_label
                )))
            }
        };
        Ok(Seat {
            id: row.id,
            room_id: row.room_id,
            row_label,
            seat_number: row.seat_number,
            seat_type: row.seat_type,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seat_row(label: &str) -> SeatRow {
        SeatRow {
            id: 1,
            room_id: 2,
            row_label: label.to_string(),
            seat_number: 3,
            seat_type: None,
        }
    }

    #[test]
    fn seat_row_converts_single_letter_label() {
        let seat = Seat::try_from(seat_row("C")).unwrap();
        assert_eq!(seat.code().to_string(), "C3");
    }

    #[test]
    fn seat_row_rejects_bad_label() {
        assert!(Seat::try_from(seat_row("AB")).is_err());
        assert!(Seat::try_from(seat_row("")).is_err());
        assert!(Seat::try_from(seat_row("c")).is_err());
    }
}
