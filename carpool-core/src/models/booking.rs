use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::account::UserSummary;
use crate::{CoreError, CoreResult};

/// Booking status in the lifecycle. Only PENDING is non-terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
    Cancelled,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "PENDING",
            BookingStatus::Accepted => "ACCEPTED",
            BookingStatus::Rejected => "REJECTED",
            BookingStatus::Cancelled => "CANCELLED",
        }
    }

    pub fn is_terminal(&self) -> bool {
        *self != BookingStatus::Pending
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BookingStatus {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "PENDING" => Ok(BookingStatus::Pending),
            "ACCEPTED" => Ok(BookingStatus::Accepted),
            "REJECTED" => Ok(BookingStatus::Rejected),
            "CANCELLED" => Ok(BookingStatus::Cancelled),
            other => Err(CoreError::Storage(format!("Unknown booking status: {}", other))),
        }
    }
}

/// What a driver does with a pending request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingAction {
    Accept,
    Reject,
}

impl BookingAction {
    pub fn target_status(&self) -> BookingStatus {
        match self {
            BookingAction::Accept => BookingStatus::Accepted,
            BookingAction::Reject => BookingStatus::Rejected,
        }
    }
}

/// A seat request against a ride.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: Uuid,
    pub ride_id: Uuid,
    pub user_id: Uuid,
    pub seats: i32,
    pub status: BookingStatus,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(ride_id: Uuid, user_id: Uuid, seats: i32) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            ride_id,
            user_id,
            seats,
            status: BookingStatus::Pending,
            reason: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Guard for leaving PENDING; every other move is an invalid transition.
    pub fn ensure_can_move_to(&self, to: BookingStatus) -> CoreResult<()> {
        if self.status.is_terminal() || !to.is_terminal() {
            return Err(CoreError::InvalidTransition {
                from: self.status,
                to,
            });
        }
        Ok(())
    }

    /// Transition: Pending → Accepted
    pub fn accept(&mut self) -> CoreResult<()> {
        self.move_to(BookingStatus::Accepted)
    }

    /// Transition: Pending → Rejected, keeping the driver's reason
    pub fn reject(&mut self, reason: String) -> CoreResult<()> {
        self.move_to(BookingStatus::Rejected)?;
        self.reason = Some(reason);
        Ok(())
    }

    /// Transition: Pending → Cancelled (requester withdrew)
    pub fn cancel(&mut self) -> CoreResult<()> {
        self.move_to(BookingStatus::Cancelled)
    }

    fn move_to(&mut self, to: BookingStatus) -> CoreResult<()> {
        self.ensure_can_move_to(to)?;
        self.status = to;
        self.updated_at = Utc::now();
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RideSummary {
    pub id: Uuid,
    pub from: String,
    pub to: String,
    pub start_time: DateTime<Utc>,
}

/// Booking joined with the ride it targets and, for driver-facing lists, the requester.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingView {
    #[serde(flatten)]
    pub booking: Booking,
    pub ride: RideSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user: Option<UserSummary>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_booking_lifecycle() {
        let mut booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), 2);
        assert_eq!(booking.status, BookingStatus::Pending);

        booking.accept().unwrap();
        assert_eq!(booking.status, BookingStatus::Accepted);
    }

    #[test]
    fn test_leaves_pending_only_once() {
        let mut booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), 1);
        booking.reject("Car is full".to_string()).unwrap();
        assert_eq!(booking.reason.as_deref(), Some("Car is full"));

        let err = booking.accept().unwrap_err();
        assert!(matches!(
            err,
            CoreError::InvalidTransition { from: BookingStatus::Rejected, to: BookingStatus::Accepted }
        ));
        assert!(booking.cancel().is_err());
        assert_eq!(booking.status, BookingStatus::Rejected);
    }

    #[test]
    fn test_cannot_move_back_to_pending() {
        let booking = Booking::new(Uuid::new_v4(), Uuid::new_v4(), 1);
        assert!(booking.ensure_can_move_to(BookingStatus::Pending).is_err());
    }

    #[test]
    fn test_action_wire_format() {
        let action: BookingAction = serde_json::from_str("\"REJECT\"").unwrap();
        assert_eq!(action.target_status(), BookingStatus::Rejected);
        assert_eq!("ACCEPTED".parse::<BookingStatus>().unwrap(), BookingStatus::Accepted);
    }
}
