use async_trait::async_trait;
use carpool_core::matching::CandidateQuery;
use carpool_core::repository::RideRepository;
use carpool_core::{CoreError, CoreResult, Ride, RideStatus};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::storage;

pub struct PgRideRepository {
    pool: PgPool,
}

impl PgRideRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

pub(crate) const RIDE_COLUMNS: &str = "id, driver_id, car_id, from_name, from_lat, from_lng, to_name, to_lat, to_lng, \
     route_polyline, seats_total, seats_left, start_time, status, created_at";

#[derive(sqlx::FromRow)]
pub(crate) struct RideRow {
    id: Uuid,
    driver_id: Uuid,
    car_id: Option<Uuid>,
    from_name: String,
    from_lat: f64,
    from_lng: f64,
    to_name: String,
    to_lat: f64,
    to_lng: f64,
    route_polyline: Option<String>,
    seats_total: i32,
    seats_left: i32,
    start_time: DateTime<Utc>,
    status: String,
    created_at: DateTime<Utc>,
}

impl TryFrom<RideRow> for Ride {
    type Error = CoreError;

    fn try_from(row: RideRow) -> Result<Self, Self::Error> {
        Ok(Ride {
            id: row.id,
            driver_id: row.driver_id,
            car_id: row.car_id,
            from: row.from_name,
            from_lat: row.from_lat,
            from_lng: row.from_lng,
            to: row.to_name,
            to_lat: row.to_lat,
            to_lng: row.to_lng,
            route_polyline: row.route_polyline,
            seats_total: row.seats_total,
            seats_left: row.seats_left,
            start_time: row.start_time,
            status: row.status.parse()?,
            created_at: row.created_at,
        })
    }
}

pub(crate) fn into_rides(rows: Vec<RideRow>) -> CoreResult<Vec<Ride>> {
    rows.into_iter().map(Ride::try_from).collect()
}

#[async_trait]
impl RideRepository for PgRideRepository {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()> {
        sqlx::query(&format!(
            r#"
            INSERT INTO rides ({RIDE_COLUMNS})
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#
        ))
        .bind(ride.id)
        .bind(ride.driver_id)
        .bind(ride.car_id)
        .bind(&ride.from)
        .bind(ride.from_lat)
        .bind(ride.from_lng)
        .bind(&ride.to)
        .bind(ride.to_lat)
        .bind(ride.to_lng)
        .bind(&ride.route_polyline)
        .bind(ride.seats_total)
        .bind(ride.seats_left)
        .bind(ride.start_time)
        .bind(ride.status.as_str())
        .bind(ride.created_at)
        .execute(&self.pool)
        .await
        .map_err(storage)?;
        Ok(())
    }

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        let row = sqlx::query_as::<_, RideRow>(&format!("SELECT {RIDE_COLUMNS} FROM rides WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(storage)?;
        row.map(Ride::try_from).transpose()
    }

    async fn list_recent_active(&self, limit: i64) -> CoreResult<Vec<Ride>> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE status = 'ACTIVE' ORDER BY created_at DESC LIMIT $1"
        ))
        .bind(limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        into_rides(rows)
    }

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<Ride>> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            "SELECT {RIDE_COLUMNS} FROM rides WHERE driver_id = $1 ORDER BY created_at DESC"
        ))
        .bind(driver_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        into_rides(rows)
    }

    async fn search_candidates(&self, query: &CandidateQuery) -> CoreResult<Vec<Ride>> {
        let rows = sqlx::query_as::<_, RideRow>(&format!(
            r#"
            SELECT {RIDE_COLUMNS}
            FROM rides
            WHERE status = 'ACTIVE'
              AND ($1 = FALSE OR route_polyline IS NOT NULL)
              AND ($2::date IS NULL OR (start_time AT TIME ZONE 'UTC')::date = $2::date)
            ORDER BY created_at DESC
            LIMIT $3
            "#
        ))
        .bind(query.require_polyline)
        .bind(query.date)
        .bind(query.limit)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        into_rides(rows)
    }

    async fn update_status(&self, id: Uuid, from: RideStatus, to: RideStatus) -> CoreResult<bool> {
        let result = sqlx::query("UPDATE rides SET status = $3 WHERE id = $1 AND status = $2")
            .bind(id)
            .bind(from.as_str())
            .bind(to.as_str())
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }
}
