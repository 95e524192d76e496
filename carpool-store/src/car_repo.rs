use async_trait::async_trait;
use carpool_core::repository::CarRepository;
use carpool_core::{Car, CoreResult};
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use crate::{conflict_on_unique, storage};

pub struct PgCarRepository {
    pool: PgPool,
}

impl PgCarRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct CarRow {
    id: Uuid,
    user_id: Uuid,
    make: String,
    model: String,
    plate_number: String,
    color: Option<String>,
    seats: Option<i32>,
    created_at: DateTime<Utc>,
}

impl From<CarRow> for Car {
    fn from(row: CarRow) -> Self {
        Car {
            id: row.id,
            user_id: row.user_id,
            make: row.make,
            model: row.model,
            plate_number: row.plate_number,
            color: row.color,
            seats: row.seats,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CarRepository for PgCarRepository {
    async fn create_car(&self, car: &Car) -> CoreResult<()> {
        sqlx::query(
            r#"
            INSERT INTO cars (id, user_id, make, model, plate_number, color, seats, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(car.id)
        .bind(car.user_id)
        .bind(&car.make)
        .bind(&car.model)
        .bind(&car.plate_number)
        .bind(&car.color)
        .bind(car.seats)
        .bind(car.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_on_unique(e, "Car with this plate number already exists"))?;
        Ok(())
    }

    async fn find_car(&self, id: Uuid) -> CoreResult<Option<Car>> {
        let row = sqlx::query_as::<_, CarRow>(
            "SELECT id, user_id, make, model, plate_number, color, seats, created_at FROM cars WHERE id = $1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(storage)?;
        Ok(row.map(Car::from))
    }

    async fn list_cars(&self, user_id: Uuid) -> CoreResult<Vec<Car>> {
        let rows = sqlx::query_as::<_, CarRow>(
            r#"
            SELECT id, user_id, make, model, plate_number, color, seats, created_at
            FROM cars
            WHERE user_id = $1
            ORDER BY created_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(storage)?;
        Ok(rows.into_iter().map(Car::from).collect())
    }

    async fn delete_car(&self, id: Uuid, user_id: Uuid) -> CoreResult<bool> {
        let result = sqlx::query("DELETE FROM cars WHERE id = $1 AND user_id = $2")
            .bind(id)
            .bind(user_id)
            .execute(&self.pool)
            .await
            .map_err(storage)?;
        Ok(result.rows_affected() > 0)
    }
}
