use chrono::Utc;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum BookingEventKind {
    BookingCreated,
    BookingAccepted,
    BookingRejected,
    BookingCancelled,
}

impl BookingEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingEventKind::BookingCreated => "BOOKING_CREATED",
            BookingEventKind::BookingAccepted => "BOOKING_ACCEPTED",
            BookingEventKind::BookingRejected => "BOOKING_REJECTED",
            BookingEventKind::BookingCancelled => "BOOKING_CANCELLED",
        }
    }
}

/// Real-time event addressed to a single user (`user_id` is the recipient).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct BookingEvent {
    pub kind: BookingEventKind,
    pub user_id: Uuid,
    pub booking_id: Uuid,
    pub ride_id: Uuid,
    pub seats: i32,
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    pub timestamp: i64,
}

impl BookingEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        kind: BookingEventKind,
        user_id: Uuid,
        booking_id: Uuid,
        ride_id: Uuid,
        seats: i32,
        from: impl Into<String>,
        to: impl Into<String>,
        reason: Option<String>,
    ) -> Self {
        Self {
            kind,
            user_id,
            booking_id,
            ride_id,
            seats,
            from: from.into(),
            to: to.into(),
            reason,
            timestamp: Utc::now().timestamp(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_wire_format() {
        let event = BookingEvent::new(
            BookingEventKind::BookingRejected,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            2,
            "Sector 29",
            "Cyber City",
            Some("Car is full".to_string()),
        );

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["kind"], "BOOKING_REJECTED");
        assert_eq!(json["seats"], 2);
        assert_eq!(json["reason"], "Car is full");
        assert!(json.get("userId").is_some());
        assert!(json.get("bookingId").is_some());
    }

    #[test]
    fn test_reason_omitted_when_absent() {
        let event = BookingEvent::new(
            BookingEventKind::BookingAccepted,
            Uuid::new_v4(),
            Uuid::new_v4(),
            Uuid::new_v4(),
            1,
            "A",
            "B",
            None,
        );
        let json = serde_json::to_value(&event).unwrap();
        assert!(json.get("reason").is_none());
        assert_eq!(json["kind"], event.kind.as_str());
    }
}
