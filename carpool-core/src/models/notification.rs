use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::ride::Ride;
use crate::CoreError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NotificationKind {
    BookingSent,
    BookingReceived,
    BookingAccepted,
    BookingRejected,
    BookingCancelled,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::BookingSent => "BOOKING_SENT",
            NotificationKind::BookingReceived => "BOOKING_RECEIVED",
            NotificationKind::BookingAccepted => "BOOKING_ACCEPTED",
            NotificationKind::BookingRejected => "BOOKING_REJECTED",
            NotificationKind::BookingCancelled => "BOOKING_CANCELLED",
        }
    }
}

impl FromStr for NotificationKind {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "BOOKING_SENT" => Ok(NotificationKind::BookingSent),
            "BOOKING_RECEIVED" => Ok(NotificationKind::BookingReceived),
            "BOOKING_ACCEPTED" => Ok(NotificationKind::BookingAccepted),
            "BOOKING_REJECTED" => Ok(NotificationKind::BookingRejected),
            "BOOKING_CANCELLED" => Ok(NotificationKind::BookingCancelled),
            other => Err(CoreError::Storage(format!("Unknown notification type: {}", other))),
        }
    }
}

/// Append-only inbox row. Only `is_read` ever changes after insert.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub id: Uuid,
    pub user_id: Uuid,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Uuid, kind: NotificationKind, message: String) -> Self {
        Self {
            id: Uuid::new_v4(),
            user_id,
            kind,
            message,
            is_read: false,
            created_at: Utc::now(),
        }
    }

    pub fn booking_sent(requester: Uuid, ride: &Ride) -> Self {
        Self::new(
            requester,
            NotificationKind::BookingSent,
            format!("Booking request sent for {}", ride.route_label()),
        )
    }

    pub fn booking_received(ride: &Ride, requester_name: &str) -> Self {
        Self::new(
            ride.driver_id,
            NotificationKind::BookingReceived,
            format!("New booking request from {} for {}", requester_name, ride.route_label()),
        )
    }

    pub fn booking_accepted(requester: Uuid, ride: &Ride) -> Self {
        Self::new(
            requester,
            NotificationKind::BookingAccepted,
            format!("Your booking for {} was accepted", ride.route_label()),
        )
    }

    pub fn booking_rejected(requester: Uuid, ride: &Ride, reason: &str) -> Self {
        Self::new(
            requester,
            NotificationKind::BookingRejected,
            format!("Your booking for {} was rejected. Reason: {}", ride.route_label(), reason),
        )
    }

    pub fn booking_cancelled(ride: &Ride, requester_name: &str) -> Self {
        Self::new(
            ride.driver_id,
            NotificationKind::BookingCancelled,
            format!("{} cancelled their booking request for {}", requester_name, ride.route_label()),
        )
    }
}
