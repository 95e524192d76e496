pub mod app_config;
pub mod database;
pub mod redis_repo;
pub mod events;
pub mod user_repo;
pub mod car_repo;
pub mod ride_repo;
pub mod booking_repo;
pub mod notification_repo;

use std::sync::Arc;

use carpool_core::repository::Repositories;
use carpool_core::CoreError;

pub use database::DbClient;
pub use redis_repo::RedisClient;
pub use events::EventProducer;
pub use user_repo::PgUserRepository;
pub use car_repo::PgCarRepository;
pub use ride_repo::PgRideRepository;
pub use booking_repo::PgBookingRepository;
pub use notification_repo::PgNotificationRepository;

/// Postgres-backed handles for every repository.
pub fn repositories(db: &DbClient) -> Repositories {
    Repositories {
        users: Arc::new(PgUserRepository::new(db.pool.clone())),
        cars: Arc::new(PgCarRepository::new(db.pool.clone())),
        rides: Arc::new(PgRideRepository::new(db.pool.clone())),
        bookings: Arc::new(PgBookingRepository::new(db.pool.clone())),
        notifications: Arc::new(PgNotificationRepository::new(db.pool.clone())),
    }
}

pub(crate) fn storage(err: sqlx::Error) -> CoreError {
    CoreError::Storage(err.to_string())
}

/// Maps a unique-constraint violation to `Conflict(message)`, anything else to `Storage`.
pub(crate) fn conflict_on_unique(err: sqlx::Error, message: &str) -> CoreError {
    match &err {
        sqlx::Error::Database(db) if db.is_unique_violation() => CoreError::Conflict(message.to_string()),
        _ => storage(err),
    }
}
