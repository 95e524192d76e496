use std::sync::Arc;

use carpool_shared::{BookingEvent, BookingEventKind};
use serde::Deserialize;
use tracing::{info, warn};
use uuid::Uuid;

use crate::events::EventSink;
use crate::models::account::User;
use crate::models::booking::{Booking, BookingAction, BookingStatus, BookingView};
use crate::models::notification::Notification;
use crate::models::ride::Ride;
use crate::repository::{BookingRepository, Repositories, RideRepository, UserRepository};
use crate::{CoreError, CoreResult};

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBooking {
    pub ride_id: Uuid,
    pub seats: i32,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingDecision {
    pub booking_id: Uuid,
    pub action: BookingAction,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Booking lifecycle: request, accept/reject by the driver, cancel by the requester.
///
/// Persistence and notification rows commit together through the
/// repository; the real-time push happens afterwards and its failure is
/// logged, never returned.
pub struct BookingService {
    users: Arc<dyn UserRepository>,
    rides: Arc<dyn RideRepository>,
    bookings: Arc<dyn BookingRepository>,
    events: Arc<dyn EventSink>,
}

impl BookingService {
    pub fn new(repos: &Repositories, events: Arc<dyn EventSink>) -> Self {
        Self {
            users: repos.users.clone(),
            rides: repos.rides.clone(),
            bookings: repos.bookings.clone(),
            events,
        }
    }

    pub async fn create_booking(&self, requester_id: Uuid, req: CreateBooking) -> CoreResult<Booking> {
        if req.seats < 1 {
            return Err(CoreError::Validation("Seats must be at least 1".to_string()));
        }

        let requester = self.requester(requester_id).await?;
        let ride = self.ride(req.ride_id).await?;

        if ride.driver_id == requester.id {
            return Err(CoreError::Forbidden("Cannot book your own ride".to_string()));
        }
        if !ride.is_active() {
            return Err(CoreError::Conflict("Ride is not accepting bookings".to_string()));
        }
        if self.bookings.find_by_ride_and_user(ride.id, requester.id).await?.is_some() {
            return Err(CoreError::Conflict("You have already requested this ride".to_string()));
        }
        ride.ensure_capacity(req.seats)?;

        let booking = Booking::new(ride.id, requester.id, req.seats);
        let notifications = [
            Notification::booking_sent(requester.id, &ride),
            Notification::booking_received(&ride, &requester.name),
        ];
        self.bookings.create_booking(&booking, &notifications).await?;

        info!(booking_id = %booking.id, ride_id = %ride.id, seats = booking.seats, "Booking requested");

        self.push(event(BookingEventKind::BookingCreated, ride.driver_id, &booking, &ride, None));

        Ok(booking)
    }

    /// Driver's accept/reject. Returns the booking in its new state.
    pub async fn act_on_booking(&self, actor_id: Uuid, decision: BookingDecision) -> CoreResult<Booking> {
        let reason = decision
            .reason
            .as_deref()
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .map(String::from);

        let mut booking = self.booking(decision.booking_id).await?;
        let ride = self.ride(booking.ride_id).await?;

        if ride.driver_id != actor_id {
            return Err(CoreError::Forbidden("Not allowed".to_string()));
        }
        booking.ensure_can_move_to(decision.action.target_status())?;

        match (decision.action, reason) {
            (BookingAction::Accept, _) => {
                if !ride.is_active() {
                    return Err(CoreError::Conflict("Ride is no longer active".to_string()));
                }
                ride.ensure_capacity(booking.seats)?;

                let notification = Notification::booking_accepted(booking.user_id, &ride);
                let updated = self.bookings.accept_booking(booking.id, &notification).await?;
                booking.accept()?;

                info!(
                    booking_id = %booking.id,
                    ride_id = %ride.id,
                    seats_left = updated.seats_left,
                    "Booking accepted"
                );
                self.push(event(BookingEventKind::BookingAccepted, booking.user_id, &booking, &ride, None));
            }
            (BookingAction::Reject, Some(reason)) => {
                let notification = Notification::booking_rejected(booking.user_id, &ride, &reason);
                self.bookings.reject_booking(booking.id, &reason, &notification).await?;
                booking.reject(reason.clone())?;

                info!(booking_id = %booking.id, ride_id = %ride.id, "Booking rejected");
                self.push(event(
                    BookingEventKind::BookingRejected,
                    booking.user_id,
                    &booking,
                    &ride,
                    Some(reason),
                ));
            }
            (BookingAction::Reject, None) => {
                return Err(CoreError::Validation("Rejection reason required".to_string()));
            }
        }

        Ok(booking)
    }

    /// Requester withdraws a still-pending request.
    pub async fn cancel_booking(&self, actor_id: Uuid, booking_id: Uuid) -> CoreResult<Booking> {
        let mut booking = self.booking(booking_id).await?;
        if booking.user_id != actor_id {
            return Err(CoreError::Forbidden("Not allowed".to_string()));
        }
        booking.ensure_can_move_to(BookingStatus::Cancelled)?;

        let requester = self.requester(actor_id).await?;
        let ride = self.ride(booking.ride_id).await?;

        let notification = Notification::booking_cancelled(&ride, &requester.name);
        self.bookings.cancel_booking(booking.id, &notification).await?;
        booking.cancel()?;

        info!(booking_id = %booking.id, ride_id = %ride.id, "Booking cancelled");
        self.push(event(BookingEventKind::BookingCancelled, ride.driver_id, &booking, &ride, None));

        Ok(booking)
    }

    pub async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<BookingView>> {
        self.bookings.list_by_user(user_id).await
    }

    pub async fn list_for_driver(&self, driver_id: Uuid) -> CoreResult<Vec<BookingView>> {
        self.bookings.list_by_driver(driver_id).await
    }

    async fn requester(&self, id: Uuid) -> CoreResult<User> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| CoreError::Unauthorized("User not found".to_string()))
    }

    async fn ride(&self, id: Uuid) -> CoreResult<Ride> {
        self.rides
            .find_ride(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Ride not found".to_string()))
    }

    async fn booking(&self, id: Uuid) -> CoreResult<Booking> {
        self.bookings
            .find_booking(id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Booking not found".to_string()))
    }

    /// Publishes on a detached task; failures are only logged.
    fn push(&self, event: BookingEvent) {
        let events = self.events.clone();
        tokio::spawn(async move {
            if let Err(e) = events.publish(&event).await {
                warn!(
                    booking_id = %event.booking_id,
                    "Real-time push {} failed: {}",
                    event.kind.as_str(),
                    e
                );
            }
        });
    }
}

fn event(
    kind: BookingEventKind,
    recipient: Uuid,
    booking: &Booking,
    ride: &Ride,
    reason: Option<String>,
) -> BookingEvent {
    BookingEvent::new(
        kind,
        recipient,
        booking.id,
        ride.id,
        booking.seats,
        ride.from.clone(),
        ride.to.clone(),
        reason,
    )
}
