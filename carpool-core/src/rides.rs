use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;
use tracing::info;
use uuid::Uuid;

use crate::geo::decode_polyline;
use crate::matching::{filter_matches, CandidateQuery, MatchConfig, SearchQuery};
use crate::models::account::DriverSummary;
use crate::models::booking::BookingView;
use crate::models::ride::{NewRide, Ride, RideStatus};
use crate::repository::{BookingRepository, CarRepository, Repositories, RideRepository, UserRepository};
use crate::{CoreError, CoreResult};

/// Homepage listing size.
pub const RECENT_RIDES_LIMIT: i64 = 10;

/// Driver-only view of a ride together with every request made against it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RideDetail {
    #[serde(flatten)]
    pub ride: Ride,
    pub bookings: Vec<BookingView>,
}

/// Public listing entry: the ride plus who is driving it.
#[derive(Debug, Clone, Serialize)]
pub struct RideListing {
    #[serde(flatten)]
    pub ride: Ride,
    pub driver: Option<DriverSummary>,
}

pub struct RideService {
    users: Arc<dyn UserRepository>,
    rides: Arc<dyn RideRepository>,
    bookings: Arc<dyn BookingRepository>,
    cars: Arc<dyn CarRepository>,
    matching: MatchConfig,
}

impl RideService {
    pub fn new(repos: &Repositories, matching: MatchConfig) -> Self {
        Self {
            users: repos.users.clone(),
            rides: repos.rides.clone(),
            bookings: repos.bookings.clone(),
            cars: repos.cars.clone(),
            matching,
        }
    }

    pub async fn create_ride(&self, driver_id: Uuid, draft: NewRide) -> CoreResult<Ride> {
        if let Some(polyline) = draft.route_polyline.as_deref() {
            decode_polyline(polyline)?;
        }

        if let Some(car_id) = draft.car_id {
            match self.cars.find_car(car_id).await? {
                Some(car) if car.user_id == driver_id => {}
                _ => return Err(CoreError::NotFound("Car not found".to_string())),
            }
        }

        let ride = Ride::new(driver_id, draft)?;
        self.rides.create_ride(&ride).await?;

        info!(ride_id = %ride.id, seats = ride.seats_total, "Ride posted: {}", ride.route_label());
        Ok(ride)
    }

    pub async fn list_recent(&self) -> CoreResult<Vec<RideListing>> {
        let rides = self.rides.list_recent_active(RECENT_RIDES_LIMIT).await?;
        self.with_drivers(rides).await
    }

    pub async fn list_for_driver(&self, driver_id: Uuid) -> CoreResult<Vec<Ride>> {
        self.rides.list_by_driver(driver_id).await
    }

    pub async fn ride_detail(&self, actor_id: Uuid, ride_id: Uuid) -> CoreResult<RideDetail> {
        let ride = self.owned_ride(actor_id, ride_id).await?;
        let bookings = self.bookings.list_by_ride(ride.id).await?;
        Ok(RideDetail { ride, bookings })
    }

    /// Driver completes or cancels an active ride.
    pub async fn update_status(&self, actor_id: Uuid, ride_id: Uuid, to: RideStatus) -> CoreResult<Ride> {
        let mut ride = self.owned_ride(actor_id, ride_id).await?;
        let from = ride.status;
        ride.transition(to)?;

        if !self.rides.update_status(ride.id, from, to).await? {
            return Err(CoreError::Conflict("Ride status changed concurrently".to_string()));
        }

        info!(ride_id = %ride.id, "Ride moved from {} to {}", from, to);
        Ok(ride)
    }

    pub async fn search(&self, query: &SearchQuery) -> CoreResult<Vec<RideListing>> {
        let candidates = self
            .rides
            .search_candidates(&CandidateQuery::for_search(query, &self.matching))
            .await?;
        let total = candidates.len();
        let matched = filter_matches(candidates, query, &self.matching);

        info!(mode = ?query.mode, candidates = total, matched = matched.len(), "Ride search");
        self.with_drivers(matched).await
    }

    /// One batched user lookup for the whole page.
    async fn with_drivers(&self, rides: Vec<Ride>) -> CoreResult<Vec<RideListing>> {
        let mut ids: Vec<Uuid> = rides.iter().map(|r| r.driver_id).collect();
        ids.sort_unstable();
        ids.dedup();
        let drivers: HashMap<Uuid, DriverSummary> = self
            .users
            .find_users(&ids)
            .await?
            .into_iter()
            .map(|u| (u.id, u.driver_summary()))
            .collect();

        Ok(rides
            .into_iter()
            .map(|ride| {
                let driver = drivers.get(&ride.driver_id).cloned();
                RideListing { ride, driver }
            })
            .collect())
    }

    async fn owned_ride(&self, actor_id: Uuid, ride_id: Uuid) -> CoreResult<Ride> {
        let ride = self
            .rides
            .find_ride(ride_id)
            .await?
            .ok_or_else(|| CoreError::NotFound("Ride not found".to_string()))?;
        if ride.driver_id != actor_id {
            return Err(CoreError::Forbidden("Not allowed".to_string()));
        }
        Ok(ride)
    }
}
