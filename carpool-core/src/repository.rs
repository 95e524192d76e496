use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use crate::matching::CandidateQuery;
use crate::models::account::{Car, ProfileDetails, User, UserMode};
use crate::models::booking::{Booking, BookingView};
use crate::models::notification::Notification;
use crate::models::ride::{Ride, RideStatus};
use crate::CoreResult;

/// Repository trait for account data access
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// `Conflict` when the email is already registered.
    async fn create_user(&self, user: &User) -> CoreResult<()>;

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>>;

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>>;

    /// Leaves fields passed as `None` untouched.
    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> CoreResult<Option<User>>;

    /// Stores the completion fields and grants the driving capability.
    async fn complete_profile(&self, id: Uuid, details: &ProfileDetails) -> CoreResult<Option<User>>;

    async fn set_mode(&self, id: Uuid, mode: UserMode) -> CoreResult<Option<User>>;

    /// Unknown ids are skipped.
    async fn find_users(&self, ids: &[Uuid]) -> CoreResult<Vec<User>>;
}

#[async_trait]
pub trait CarRepository: Send + Sync {
    /// `Conflict` when the plate number is taken.
    async fn create_car(&self, car: &Car) -> CoreResult<()>;

    async fn find_car(&self, id: Uuid) -> CoreResult<Option<Car>>;

    /// Newest first.
    async fn list_cars(&self, user_id: Uuid) -> CoreResult<Vec<Car>>;

    /// Owner-scoped; returns whether a row was removed.
    async fn delete_car(&self, id: Uuid, user_id: Uuid) -> CoreResult<bool>;
}

#[async_trait]
pub trait RideRepository: Send + Sync {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()>;

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<Ride>>;

    /// ACTIVE rides, most recently posted first.
    async fn list_recent_active(&self, limit: i64) -> CoreResult<Vec<Ride>>;

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<Ride>>;

    /// Bounded set of ACTIVE rides for the route matcher.
    async fn search_candidates(&self, query: &CandidateQuery) -> CoreResult<Vec<Ride>>;

    /// Conditional status change; `false` when the ride was no longer in `from`.
    async fn update_status(&self, id: Uuid, from: RideStatus, to: RideStatus) -> CoreResult<bool>;
}

/// Booking persistence. Every state change is one atomic unit together with
/// the notification rows it produces.
#[async_trait]
pub trait BookingRepository: Send + Sync {
    /// Inserts a PENDING booking plus its notifications. A second booking for
    /// the same (ride, user) pair is a `Conflict`.
    async fn create_booking(&self, booking: &Booking, notifications: &[Notification]) -> CoreResult<()>;

    async fn find_booking(&self, id: Uuid) -> CoreResult<Option<Booking>>;

    async fn find_by_ride_and_user(&self, ride_id: Uuid, user_id: Uuid) -> CoreResult<Option<Booking>>;

    /// The requester's bookings, newest first.
    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<BookingView>>;

    /// Bookings on rides driven by `driver_id`, newest first, with requester.
    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<BookingView>>;

    async fn list_by_ride(&self, ride_id: Uuid) -> CoreResult<Vec<BookingView>>;

    /// PENDING → ACCEPTED and `seats_left -= seats` in one transaction. The
    /// capacity and status checks are repeated under the transaction's locks;
    /// on any failure nothing is written. Returns the ride after the decrement.
    async fn accept_booking(&self, booking_id: Uuid, notification: &Notification) -> CoreResult<Ride>;

    /// PENDING → REJECTED with the stored reason.
    async fn reject_booking(&self, booking_id: Uuid, reason: &str, notification: &Notification) -> CoreResult<()>;

    /// PENDING → CANCELLED.
    async fn cancel_booking(&self, booking_id: Uuid, notification: &Notification) -> CoreResult<()>;
}

#[async_trait]
pub trait NotificationRepository: Send + Sync {
    /// Newest first.
    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Notification>>;

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> CoreResult<Option<Notification>>;

    /// Owner-scoped; `false` when no row matched.
    async fn set_read(&self, id: Uuid, user_id: Uuid, is_read: bool) -> CoreResult<bool>;
}

/// The full set of storage handles the services are wired with.
#[derive(Clone)]
pub struct Repositories {
    pub users: Arc<dyn UserRepository>,
    pub cars: Arc<dyn CarRepository>,
    pub rides: Arc<dyn RideRepository>,
    pub bookings: Arc<dyn BookingRepository>,
    pub notifications: Arc<dyn NotificationRepository>,
}

impl Repositories {
    /// Wire every handle to one store that implements all repositories.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: UserRepository
            + CarRepository
            + RideRepository
            + BookingRepository
            + NotificationRepository
            + 'static,
    {
        Self {
            users: store.clone(),
            cars: store.clone(),
            rides: store.clone(),
            bookings: store.clone(),
            notifications: store,
        }
    }
}
