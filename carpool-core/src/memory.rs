//! Process-local store implementing every repository trait.
//!
//! All state sits behind one mutex, so each repository call is atomic: the
//! read-check-decrement of an accept cannot interleave with another accept.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use uuid::Uuid;

use crate::matching::CandidateQuery;
use crate::models::account::{Car, ProfileDetails, User, UserMode};
use crate::models::booking::{Booking, BookingStatus, BookingView, RideSummary};
use crate::models::notification::Notification;
use crate::models::ride::{Ride, RideStatus};
use crate::repository::{
    BookingRepository, CarRepository, NotificationRepository, RideRepository, UserRepository,
};
use crate::{CoreError, CoreResult};

#[derive(Default)]
struct State {
    users: HashMap<Uuid, User>,
    cars: HashMap<Uuid, Car>,
    rides: HashMap<Uuid, Ride>,
    bookings: HashMap<Uuid, Booking>,
    notifications: Vec<Notification>,
}

impl State {
    fn view(&self, booking: &Booking, with_user: bool) -> Option<BookingView> {
        let ride = self.rides.get(&booking.ride_id)?;
        Some(BookingView {
            booking: booking.clone(),
            ride: RideSummary {
                id: ride.id,
                from: ride.from.clone(),
                to: ride.to.clone(),
                start_time: ride.start_time,
            },
            user: if with_user {
                self.users.get(&booking.user_id).map(User::summary)
            } else {
                None
            },
        })
    }

    fn views<F>(&self, filter: F, with_user: bool) -> Vec<BookingView>
    where
        F: Fn(&Booking) -> bool,
    {
        let mut views: Vec<BookingView> = self
            .bookings
            .values()
            .filter(|b| filter(b))
            .filter_map(|b| self.view(b, with_user))
            .collect();
        views.sort_by(|a, b| b.booking.created_at.cmp(&a.booking.created_at));
        views
    }

    fn pending_booking(&self, id: Uuid, to: BookingStatus) -> CoreResult<Booking> {
        let booking = self
            .bookings
            .get(&id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound("Booking not found".to_string()))?;
        booking.ensure_can_move_to(to)?;
        Ok(booking)
    }
}

#[derive(Default)]
pub struct InMemoryStore {
    state: Mutex<State>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> CoreResult<MutexGuard<'_, State>> {
        self.state
            .lock()
            .map_err(|_| CoreError::Storage("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl UserRepository for InMemoryStore {
    async fn create_user(&self, user: &User) -> CoreResult<()> {
        let mut state = self.lock()?;
        if state.users.values().any(|u| u.email == user.email) {
            return Err(CoreError::Conflict("User already exists".to_string()));
        }
        state.users.insert(user.id, user.clone());
        Ok(())
    }

    async fn find_user_by_email(&self, email: &str) -> CoreResult<Option<User>> {
        let state = self.lock()?;
        Ok(state.users.values().find(|u| u.email == email).cloned())
    }

    async fn find_user(&self, id: Uuid) -> CoreResult<Option<User>> {
        Ok(self.lock()?.users.get(&id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        name: Option<&str>,
        phone: Option<&str>,
    ) -> CoreResult<Option<User>> {
        let mut state = self.lock()?;
        let Some(user) = state.users.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = name {
            user.name = name.to_string();
        }
        if let Some(phone) = phone {
            user.phone = Some(phone.to_string());
        }
        Ok(Some(user.clone()))
    }

    async fn complete_profile(&self, id: Uuid, details: &ProfileDetails) -> CoreResult<Option<User>> {
        let mut state = self.lock()?;
        Ok(state.users.get_mut(&id).map(|user| {
            user.apply_profile(details);
            user.clone()
        }))
    }

    async fn set_mode(&self, id: Uuid, mode: UserMode) -> CoreResult<Option<User>> {
        let mut state = self.lock()?;
        Ok(state.users.get_mut(&id).map(|user| {
            user.mode = mode;
            user.clone()
        }))
    }

    async fn find_users(&self, ids: &[Uuid]) -> CoreResult<Vec<User>> {
        let state = self.lock()?;
        Ok(ids.iter().filter_map(|id| state.users.get(id).cloned()).collect())
    }
}

#[async_trait]
impl CarRepository for InMemoryStore {
    async fn create_car(&self, car: &Car) -> CoreResult<()> {
        let mut state = self.lock()?;
        if state.cars.values().any(|c| c.plate_number == car.plate_number) {
            return Err(CoreError::Conflict(
                "Car with this plate number already exists".to_string(),
            ));
        }
        state.cars.insert(car.id, car.clone());
        Ok(())
    }

    async fn find_car(&self, id: Uuid) -> CoreResult<Option<Car>> {
        Ok(self.lock()?.cars.get(&id).cloned())
    }

    async fn list_cars(&self, user_id: Uuid) -> CoreResult<Vec<Car>> {
        let state = self.lock()?;
        let mut cars: Vec<Car> = state.cars.values().filter(|c| c.user_id == user_id).cloned().collect();
        cars.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(cars)
    }

    async fn delete_car(&self, id: Uuid, user_id: Uuid) -> CoreResult<bool> {
        let mut state = self.lock()?;
        match state.cars.get(&id) {
            Some(car) if car.user_id == user_id => {
                state.cars.remove(&id);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl RideRepository for InMemoryStore {
    async fn create_ride(&self, ride: &Ride) -> CoreResult<()> {
        self.lock()?.rides.insert(ride.id, ride.clone());
        Ok(())
    }

    async fn find_ride(&self, id: Uuid) -> CoreResult<Option<Ride>> {
        Ok(self.lock()?.rides.get(&id).cloned())
    }

    async fn list_recent_active(&self, limit: i64) -> CoreResult<Vec<Ride>> {
        let state = self.lock()?;
        let mut rides: Vec<Ride> = state.rides.values().filter(|r| r.is_active()).cloned().collect();
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rides.truncate(limit.max(0) as usize);
        Ok(rides)
    }

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<Ride>> {
        let state = self.lock()?;
        let mut rides: Vec<Ride> = state.rides.values().filter(|r| r.driver_id == driver_id).cloned().collect();
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rides)
    }

    async fn search_candidates(&self, query: &CandidateQuery) -> CoreResult<Vec<Ride>> {
        let state = self.lock()?;
        let mut rides: Vec<Ride> = state
            .rides
            .values()
            .filter(|r| r.is_active())
            .filter(|r| !query.require_polyline || r.route_polyline.is_some())
            .filter(|r| query.date.map_or(true, |d| r.start_time.date_naive() == d))
            .cloned()
            .collect();
        rides.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        rides.truncate(query.limit.max(0) as usize);
        Ok(rides)
    }

    async fn update_status(&self, id: Uuid, from: RideStatus, to: RideStatus) -> CoreResult<bool> {
        let mut state = self.lock()?;
        match state.rides.get_mut(&id) {
            Some(ride) if ride.status == from => {
                ride.status = to;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl BookingRepository for InMemoryStore {
    async fn create_booking(&self, booking: &Booking, notifications: &[Notification]) -> CoreResult<()> {
        let mut state = self.lock()?;
        if state
            .bookings
            .values()
            .any(|b| b.ride_id == booking.ride_id && b.user_id == booking.user_id)
        {
            return Err(CoreError::Conflict("You have already requested this ride".to_string()));
        }
        state.bookings.insert(booking.id, booking.clone());
        state.notifications.extend(notifications.iter().cloned());
        Ok(())
    }

    async fn find_booking(&self, id: Uuid) -> CoreResult<Option<Booking>> {
        Ok(self.lock()?.bookings.get(&id).cloned())
    }

    async fn find_by_ride_and_user(&self, ride_id: Uuid, user_id: Uuid) -> CoreResult<Option<Booking>> {
        let state = self.lock()?;
        Ok(state
            .bookings
            .values()
            .find(|b| b.ride_id == ride_id && b.user_id == user_id)
            .cloned())
    }

    async fn list_by_user(&self, user_id: Uuid) -> CoreResult<Vec<BookingView>> {
        let state = self.lock()?;
        Ok(state.views(|b| b.user_id == user_id, false))
    }

    async fn list_by_driver(&self, driver_id: Uuid) -> CoreResult<Vec<BookingView>> {
        let state = self.lock()?;
        let rides: Vec<Uuid> = state
            .rides
            .values()
            .filter(|r| r.driver_id == driver_id)
            .map(|r| r.id)
            .collect();
        Ok(state.views(|b| rides.contains(&b.ride_id), true))
    }

    async fn list_by_ride(&self, ride_id: Uuid) -> CoreResult<Vec<BookingView>> {
        let state = self.lock()?;
        Ok(state.views(|b| b.ride_id == ride_id, true))
    }

    async fn accept_booking(&self, booking_id: Uuid, notification: &Notification) -> CoreResult<Ride> {
        let mut state = self.lock()?;
        let mut booking = state.pending_booking(booking_id, BookingStatus::Accepted)?;

        let mut ride = state
            .rides
            .get(&booking.ride_id)
            .cloned()
            .ok_or_else(|| CoreError::NotFound("Ride not found".to_string()))?;
        if !ride.is_active() {
            return Err(CoreError::Conflict("Ride is no longer active".to_string()));
        }

        // Work on copies; nothing is written unless both checks pass.
        ride.reserve_seats(booking.seats)?;
        booking.accept()?;

        state.rides.insert(ride.id, ride.clone());
        state.bookings.insert(booking.id, booking);
        state.notifications.push(notification.clone());
        Ok(ride)
    }

    async fn reject_booking(&self, booking_id: Uuid, reason: &str, notification: &Notification) -> CoreResult<()> {
        let mut state = self.lock()?;
        let mut booking = state.pending_booking(booking_id, BookingStatus::Rejected)?;
        booking.reject(reason.to_string())?;
        state.bookings.insert(booking.id, booking);
        state.notifications.push(notification.clone());
        Ok(())
    }

    async fn cancel_booking(&self, booking_id: Uuid, notification: &Notification) -> CoreResult<()> {
        let mut state = self.lock()?;
        let mut booking = state.pending_booking(booking_id, BookingStatus::Cancelled)?;
        booking.cancel()?;
        state.bookings.insert(booking.id, booking);
        state.notifications.push(notification.clone());
        Ok(())
    }
}

#[async_trait]
impl NotificationRepository for InMemoryStore {
    async fn list_for_user(&self, user_id: Uuid) -> CoreResult<Vec<Notification>> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .rev()
            .filter(|n| n.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn find_for_user(&self, id: Uuid, user_id: Uuid) -> CoreResult<Option<Notification>> {
        let state = self.lock()?;
        Ok(state
            .notifications
            .iter()
            .find(|n| n.id == id && n.user_id == user_id)
            .cloned())
    }

    async fn set_read(&self, id: Uuid, user_id: Uuid, is_read: bool) -> CoreResult<bool> {
        let mut state = self.lock()?;
        match state
            .notifications
            .iter_mut()
            .find(|n| n.id == id && n.user_id == user_id)
        {
            Some(n) => {
                n.is_read = is_read;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
