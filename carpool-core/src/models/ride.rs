use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::{CoreError, CoreResult};

/// Ride status in the lifecycle
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RideStatus {
    Active,
    Completed,
    Cancelled,
}

impl RideStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RideStatus::Active => "ACTIVE",
            RideStatus::Completed => "COMPLETED",
            RideStatus::Cancelled => "CANCELLED",
        }
    }
}

impl fmt::Display for RideStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RideStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ACTIVE" => Ok(RideStatus::Active),
            "COMPLETED" => Ok(RideStatus::Completed),
            "CANCELLED" => Ok(RideStatus::Cancelled),
            other => Err(CoreError::Storage(format!("Unknown ride status: {}", other))),
        }
    }
}

/// A posted trip offering one or more seats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Ride {
    pub id: Uuid,
    pub driver_id: Uuid,
    pub car_id: Option<Uuid>,
    pub from: String,
    pub from_lat: f64,
    pub from_lng: f64,
    pub to: String,
    pub to_lat: f64,
    pub to_lng: f64,
    pub route_polyline: Option<String>,
    pub seats_total: i32,
    pub seats_left: i32,
    pub start_time: DateTime<Utc>,
    pub status: RideStatus,
    pub created_at: DateTime<Utc>,
}

/// Fields a driver supplies when posting a ride.
#[derive(Debug, Clone)]
pub struct NewRide {
    pub car_id: Option<Uuid>,
    pub from: String,
    pub from_lat: f64,
    pub from_lng: f64,
    pub to: String,
    pub to_lat: f64,
    pub to_lng: f64,
    pub route_polyline: Option<String>,
    pub seats_total: i32,
    pub start_time: DateTime<Utc>,
}

impl Ride {
    pub fn new(driver_id: Uuid, draft: NewRide) -> CoreResult<Self> {
        if draft.seats_total < 1 {
            return Err(CoreError::Validation("seatsTotal must be at least 1".to_string()));
        }

        Ok(Self {
            id: Uuid::new_v4(),
            driver_id,
            car_id: draft.car_id,
            from: draft.from,
            from_lat: draft.from_lat,
            from_lng: draft.from_lng,
            to: draft.to,
            to_lat: draft.to_lat,
            to_lng: draft.to_lng,
            route_polyline: draft.route_polyline,
            seats_total: draft.seats_total,
            seats_left: draft.seats_total,
            start_time: draft.start_time,
            status: RideStatus::Active,
            created_at: Utc::now(),
        })
    }

    pub fn origin(&self) -> GeoPoint {
        GeoPoint::new(self.from_lat, self.from_lng)
    }

    pub fn destination(&self) -> GeoPoint {
        GeoPoint::new(self.to_lat, self.to_lng)
    }

    pub fn route_label(&self) -> String {
        format!("{} → {}", self.from, self.to)
    }

    pub fn is_active(&self) -> bool {
        self.status == RideStatus::Active
    }

    /// Fails unless `seats` can still be taken from this ride.
    pub fn ensure_capacity(&self, seats: i32) -> CoreResult<()> {
        if seats > self.seats_left {
            return Err(CoreError::InsufficientSeats {
                requested: seats,
                available: self.seats_left,
            });
        }
        Ok(())
    }

    /// Take `seats` from the remaining capacity; leaves the ride untouched on failure.
    pub fn reserve_seats(&mut self, seats: i32) -> CoreResult<()> {
        if seats < 1 {
            return Err(CoreError::Validation("Seats must be at least 1".to_string()));
        }
        self.ensure_capacity(seats)?;
        self.seats_left -= seats;
        Ok(())
    }

    /// ACTIVE → COMPLETED | CANCELLED; terminal states never move.
    pub fn transition(&mut self, to: RideStatus) -> CoreResult<()> {
        if self.status != RideStatus::Active || to == RideStatus::Active {
            return Err(CoreError::Conflict(format!(
                "Ride cannot move from {} to {}",
                self.status, to
            )));
        }
        self.status = to;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft(seats_total: i32) -> NewRide {
        NewRide {
            car_id: None,
            from: "Sector 29".to_string(),
            from_lat: 28.4686,
            from_lng: 77.0628,
            to: "Cyber City".to_string(),
            to_lat: 28.4947,
            to_lng: 77.0888,
            route_polyline: None,
            seats_total,
            start_time: Utc::now(),
        }
    }

    #[test]
    fn test_new_ride_starts_full() {
        let ride = Ride::new(Uuid::new_v4(), draft(3)).unwrap();
        assert_eq!(ride.seats_left, 3);
        assert_eq!(ride.status, RideStatus::Active);
        assert!(Ride::new(Uuid::new_v4(), draft(0)).is_err());
    }

    #[test]
    fn test_seat_accounting() {
        let mut ride = Ride::new(Uuid::new_v4(), draft(2)).unwrap();

        ride.reserve_seats(2).unwrap();
        assert_eq!(ride.seats_left, 0);

        let err = ride.reserve_seats(1).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientSeats { requested: 1, available: 0 }));
        assert_eq!(ride.seats_left, 0);
        assert!(ride.reserve_seats(0).is_err());
    }

    #[test]
    fn test_status_transitions() {
        let mut ride = Ride::new(Uuid::new_v4(), draft(1)).unwrap();
        ride.transition(RideStatus::Completed).unwrap();
        assert!(ride.transition(RideStatus::Cancelled).is_err());
        assert_eq!("CANCELLED".parse::<RideStatus>().unwrap(), RideStatus::Cancelled);
        assert!("PAUSED".parse::<RideStatus>().is_err());
    }
}
