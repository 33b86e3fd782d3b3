//! Repositories for `rooms`, `movies`, `showtimes` and `seats`.

use sqlx::PgPool;
use cinebook_core::types::DbId;

use crate::models::catalog::{
    CreateMovie, CreateRoom, CreateShowtime, MovieRow, RoomRow, SeatRow, ShowtimeWithRoomRow,
};

// ---------------------------------------------------------------------------
// RoomRepo
// ---------------------------------------------------------------------------

const ROOM_COLUMNS: &str = "id, name, total_rows, seats_per_row, created_at, updated_at";

pub struct RoomRepo;

impl RoomRepo {
    /// Insert a room and its full seat grid (rows `A..`, seats `1..`).
    pub async fn create(pool: &PgPool, input: &CreateRoom) -> Result<RoomRow, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO rooms (name, total_rows, seats_per_row) \
             VALUES ($1, $2, $3) \
             RETURNING {ROOM_COLUMNS}"
        );
        let room = sqlx::query_as::<_, RoomRow>(&query)
            .bind(&input.name)
            .bind(input.total_rows)
            .bind(input.seats_per_row)
            .fetch_one(&mut *tx)
            .await?;

        sqlx::query(
            "INSERT INTO seats (room_id, row_label, seat_number, seat_type) \
             SELECT $1, CHR(65 + r), s, $4 \
             FROM generate_series(0, $2 - 1) AS r, generate_series(1, $3) AS s",
        )
        .bind(room.id)
        .bind(room.total_rows)
        .bind(room.seats_per_row)
        .bind(&input.seat_type)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(room)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<RoomRow>, sqlx::Error> {
        let query = format!("SELECT {ROOM_COLUMNS} FROM rooms WHERE id = $1");
        sqlx::query_as::<_, RoomRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// MovieRepo
// ---------------------------------------------------------------------------

pub struct MovieRepo;

impl MovieRepo {
    pub async fn create(pool: &PgPool, input: &CreateMovie) -> Result<MovieRow, sqlx::Error> {
        sqlx::query_as::<_, MovieRow>(
            "INSERT INTO movies (title, duration_minutes) VALUES ($1, $2) \
             RETURNING id, title, duration_minutes, created_at, updated_at",
        )
        .bind(&input.title)
        .bind(input.duration_minutes)
        .fetch_one(pool)
        .await
    }
}

// ---------------------------------------------------------------------------
// ShowtimeRepo
// ---------------------------------------------------------------------------

const SHOWTIME_WITH_ROOM_SELECT: &str = "SELECT s.id, s.movie_id, s.starts_at, s.ends_at, \
                                         s.base_price, r.id AS room_id, r.name AS room_name, \
                                         r.total_rows, r.seats_per_row \
                                         FROM showtimes s JOIN rooms r ON r.id = s.room_id";

pub struct ShowtimeRepo;

impl ShowtimeRepo {
    /// Insert a showtime and return it joined with its room.
    pub async fn create(
        pool: &PgPool,
        input: &CreateShowtime,
    ) -> Result<ShowtimeWithRoomRow, sqlx::Error> {
        let id: DbId = sqlx::query_scalar(
            "INSERT INTO showtimes (movie_id, room_id, starts_at, ends_at, base_price) \
             VALUES ($1, $2, $3, $4, $5) \
             RETURNING id",
        )
        .bind(input.movie_id)
        .bind(input.room_id)
        .bind(input.starts_at)
        .bind(input.ends_at)
        .bind(input.base_price)
        .fetch_one(pool)
        .await?;

        let query = format!("{SHOWTIME_WITH_ROOM_SELECT} WHERE s.id = $1");
        sqlx::query_as::<_, ShowtimeWithRoomRow>(&query)
            .bind(id)
            .fetch_one(pool)
            .await
    }

    pub async fn find_with_room(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ShowtimeWithRoomRow>, sqlx::Error> {
        let query = format!("{SHOWTIME_WITH_ROOM_SELECT} WHERE s.id = $1");
        sqlx::query_as::<_, ShowtimeWithRoomRow>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }
}

// ---------------------------------------------------------------------------
// SeatRepo
// ---------------------------------------------------------------------------

const SEAT_COLUMNS: &str = "id, room_id, row_label, seat_number, seat_type";

pub struct SeatRepo;

impl SeatRepo {
    pub async fn find_in_room(
        pool: &PgPool,
        room_id: DbId,
        row_label: char,
        seat_number: i32,
    ) -> Result<Option<SeatRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SEAT_COLUMNS} FROM seats \
             WHERE room_id = $1 AND row_label = $2 AND seat_number = $3"
        );
        sqlx::query_as::<_, SeatRow>(&query)
            .bind(room_id)
            .bind(row_label.to_string())
            .bind(seat_number)
            .fetch_optional(pool)
            .await
    }

    /// All seats of a room, ordered by row then number.
    pub async fn list_by_room(pool: &PgPool, room_id: DbId) -> Result<Vec<SeatRow>, sqlx::Error> {
        let query = format!(
            "SELECT {SEAT_COLUMNS} FROM seats WHERE room_id = $1 \
             ORDER BY row_label, seat_number"
        );
        sqlx::query_as::<_, SeatRow>(&query)
            .bind(room_id)
            .fetch_all(pool)
            .await
    }

    /// Remove one seat from a room's grid. Returns `true` if a row was deleted.
    pub async fn delete(
        pool: &PgPool,
        room_id: DbId,
        row_label: char,
        seat_number: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "DELETE FROM seats WHERE room_id = $1 AND row_label = $2 AND seat_number = $3",
        )
        .bind(room_id)
        .bind(row_label.to_string())
        .bind(seat_number)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
