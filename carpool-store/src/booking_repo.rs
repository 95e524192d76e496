//! Booking persistence. State changes run in one transaction that locks
//! the booking row and then the ride row, always in that order.

use async_trait::async_trait;
use carpool_core::models::booking::RideSummary;
use carpool_core::repository::BookingRepository;
use carpool_core::{
    Booking, BookingStatus, BookingView, CoreError, CoreResult, Notification, Ride, UserSummary,
};
use chrono::{DateTime, Utc};
use sqlx::{PgConnection, PgPool};
use uuid::Uuid;

use crate::notification_repo::insert_notification;
use crate::ride_repo::{RideRow, RIDE_COLUMNS};
use crate::{conflict_on_unique, storage};

pub struct PgBookingRepository {
    pool: PgPool,
}

impl PgBookingRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const BOOKING_COLUMNS: &str = "id, ride_id, user_id, seats, status, reason, created_at, updated_at";

const VIEW_SELECT: &str = r#"
    SELECT b.id, b.ride_id, b.user_id, b.seats, b.status, b.reason, b.created_at, b.updated_at,
           r.from_name AS ride_from, r.to_name AS ride_to, r.start_time AS ride_start_time,
           u.name AS user_name, u.email AS user_email
    FROM bookings b
    JOIN rides r ON r.id = b.ride_id
    JOIN users u ON u.id = b.user_id
"#;

#[derive(sqlx::FromRow)]
struct BookingRow {
    id: Uuid,
    ride_id: Uuid,
    user_id: Uuid,
    seats: i32,
    status: String,
    reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<BookingRow> for Booking {
    type Error = CoreError;

    fn try_from(row: BookingRow) -> Result<Self, Self::Error> {
        Ok(Booking {
            id: row.id,
            ride_id: row.ride_id,
            user_id: row.user_id,
            seats: row.seats,
            status: row.status.parse()?,
            reason: row.reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct BookingViewRow {
    #[sqlx(flatten)]
    booking: BookingRow,
    ride_from: String,
    ride_to: String,
    ride_start_time: DateTime<Utc>,
    user_name: String,
    user_email: String,
}

impl BookingViewRow {
    fn into_view(self, with_user: bool) -> CoreResult<BookingView> {
        let booking = Booking::try_from(self.booking)?;
        let user = with_user.then(|| UserSummary {
            id: booking.user_id,
            name: self.user_name,
            email: self.user_email,
        });
        Ok(BookingView {
            ride: RideSummary {
                id: booking.ride_id,
                from: self.ride_from,
                to: self.ride_to,
                start_time: self.ride_start_time,
            },
            booking,
            user,
        })
    }
}

impl PgBookingRepository {
    async fn views(&self, filter: &str, id: Uuid, with_user: bool) -> CoreResult<Vec<BookingView>> {
        let rows = sqlx::query_as::<_, BookingViewRow>(&format!(
            "{VIEW_SELECT} WHERE {filter} ORDER BY b.created_at DESC"
        ))
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        rows.into_iter().map(|row| row.into_view(with_user)).collect()
    }
}

async fn lock_pending(conn: &mut PgConnection, id: Uuid, to: BookingStatus) -> CoreResult<Booking> {
    let row = sqlx::query_as::<_, BookingRow>(&format!(
        "SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1 FOR UPDATE"
    ))
    .bind(id)
    .fetch_optional(conn)
    .await
    .map_err(storage)?
    .ok_or_else(|| CoreError::NotFound("Booking not found".to_string()))?;

    let booking = Booking::try_from(row)?;
    booking.ensure_can_move_to(to)?;
    Ok(booking)
}

async fn lock_ride(conn: &mut PgConnection, id: Uuid) -> CoreResult<Ride> {
    let row = sqlx::query_as::<_, RideRow>(&format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1 FOR UPDATE"))
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(storage)?
        .ok_or_else(|| CoreError::NotFound("Ride not found".to_string()))?;
    Ride::try_from(row)
}

async fn write_status(conn: &mut PgConnection, booking: &Booking) -> CoreResult<()> {
    sqlx::query("UPDATE bookings SET status = $2, reason = $3, updated_at = $4 WHERE id = $1 AND status = 'PENDING'")
        .bind(booking.id)
        .bind(booking.status.as_str())
        .bind(&booking.reason)
        .bind(booking.updated_at)
        .execute(conn)
        .await
        .map_err(storage)?;
    Ok(())
}

#[async_trait]
impl BookingRepository for PgBookingRepository {
    async fn create_booking(&self, booking: &Booking, notifications: &[Notification]) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        sqlx::query(&format!(
            "INSERT INTO bookings ({BOOKING_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8)"
        ))
        .bind(booking.id)
        .bind(booking.ride_id)
        .bind(booking.user_id)
        .bind(booking.seats)
        .bind(booking.status.as_str())
        .bind(&booking.reason)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "You have already requested this ride"))?;

        for notification in notifications {
            insert_notification(&mut tx, notification).await?;
        }

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!("SELECT {BOOKING_COLUMNS} FROM bookings WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Booking::try_from).transpose()
    }

    async fn find_by_ride_and_user(&self, ride_id: Uuid, user_id: Uuid) -> CoreResult<Option<Booking>> {
        let row = sqlx::query_as::<_, BookingRow>(&format!(
            "SELECT {BOOKING_COLUMNS} FROM bookings WHERE ride_id = $1 AND user_id = $2"
        ))
        .bind(ride_id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        row.map(Booking::try_from).transpose()
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<BookingView>> {
        self.views("b.user_id = $1", user_id, false).await
    }

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<BookingView>> {
        self.views("r.driver_id = $1", driver_id, true).await
    }

    async fn list_by_ride(&self, ride_id: Uuid) -> CoreResult<Vec<BookingView>> {
        self.views("b.ride_id = $1", ride_id, true).await
    }

    async fn accept_booking(&self, booking_id: Uuid, notification: &Notification) -> CoreResult<Ride> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let mut booking = lock_pending(&mut tx, booking_id, BookingStatus::Accepted).await?;
        let mut ride = lock_ride(&mut tx, booking.ride_id).await?;
        if !ride.is_active() {
            return Err(CoreError::Conflict("Ride is no longer active".to_string()));
        }
        ride.reserve_seats(booking.seats)?;
        booking.accept()?;

        let updated = sqlx::query("UPDATE rides SET seats_left = seats_left - $2 WHERE id = $1 AND seats_left >= $2")
            .bind(ride.id)
            .bind(booking.seats)
            .execute(&mut *tx)
            .await
            .map_err(storage)?;
        if updated.rows_affected() == 0 {
            return Err(CoreError::InsufficientSeats {
                requested: booking.seats,
                available: ride.seats_left + booking.seats,
            });
        }

        write_status(&mut tx, &booking).await?;
        insert_notification(&mut tx, notification).await?;

        tx.commit().await.map_err(storage)?;
        Ok(ride)
    }

    async fn reject_booking(&self, booking_id: Uuid, reason: &str, notification: &Notification) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let mut booking = lock_pending(&mut tx, booking_id, BookingStatus::Rejected).await?;
        booking.reject(reason.to_string())?;
        write_status(&mut tx, &booking).await?;
        insert_notification(&mut tx, notification).await?;

        tx.commit().await.map_err(storage)?;
        Ok(())
    }

    async fn cancel_booking(&self, booking_id: Uuid, notification: &Notification) -> CoreResult<()> {
        let mut tx = self.pool.begin().await.map_err(storage)?;

        let mut booking = lock_pending(&mut tx, booking_id, BookingStatus::Cancelled).await?;
        booking.cancel()?;
        write_status(&mut tx, &booking).await?;
        insert_notification(&mut tx, notification).await?;

        tx.commit().await.map_err(storage)?;
        Ok(())
    }
}
