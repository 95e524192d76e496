pub mod models;
pub mod geo;
pub mod matching;
pub mod repository;
pub mod events;
pub mod bookings;
pub mod rides;
pub mod notifications;
pub mod memory;

pub use models::booking::{Booking, BookingAction, BookingStatus, BookingView};
pub use models::ride::{NewRide, Ride, RideStatus};
pub use models::notification::{Notification, NotificationKind};
pub use models::account::{
    Car, CompleteProfile, DriverSummary, Gender, ProfileDetails, User, UserMode, UserProfile, UserSummary,
};

#[derive(Debug, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),
    #[error("{0}")]
    Unauthorized(String),
    #[error("{0}")]
    Forbidden(String),
    #[error("{0}")]
    NotFound(String),
    #[error("{0}")]
    Conflict(String),
    #[error("Not enough seats left: requested {requested}, available {available}")]
    InsufficientSeats { requested: i32, available: i32 },
    #[error("Booking already processed: cannot move from {from} to {to}")]
    InvalidTransition {
        from: BookingStatus,
        to: BookingStatus,
    },
    #[error("Storage failure: {0}")]
    Storage(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
