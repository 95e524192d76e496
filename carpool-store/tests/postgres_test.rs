//! Runs against a live Postgres when `DATABASE_URL` is set; skipped otherwise.

use std::sync::Arc;

use carpool_core::repository::{BookingRepository, RideRepository, UserRepository};
use carpool_core::{
    Booking, BookingStatus, CompleteProfile, CoreError, NewRide, Notification, Ride, User, UserMode,
};
use carpool_store::app_config::DatabaseConfig;
use carpool_store::{DbClient, PgBookingRepository, PgRideRepository, PgUserRepository};
use chrono::Utc;
use uuid::Uuid;

async fn connect() -> Option<DbClient> {
    let Ok(url) = std::env::var("DATABASE_URL") else {
        eprintln!("DATABASE_URL not set, skipping");
        return None;
    };
    let db = DbClient::new(&DatabaseConfig { url, max_connections: 10 }).await.unwrap();
    db.migrate().await.unwrap();
    Some(db)
}

async fn user(users: &PgUserRepository, label: &str) -> User {
    let user = User::new(&format!("{}-{}@example.com", label, Uuid::new_v4()), Some(label), "hash".to_string());
    users.create_user(&user).await.unwrap();
    user
}

async fn ride(rides: &PgRideRepository, driver: Uuid, seats_total: i32) -> Ride {
    let ride = Ride::new(
        driver,
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
        },
    )
    .unwrap();
    rides.create_ride(&ride).await.unwrap();
    ride
}

#[tokio::test]
async fn test_concurrent_accepts_never_oversell() {
    let Some(db) = connect().await else { return };
    let users = PgUserRepository::new(db.pool.clone());
    let rides = PgRideRepository::new(db.pool.clone());
    let bookings = Arc::new(PgBookingRepository::new(db.pool.clone()));

    let driver = user(&users, "driver").await;
    let ride = ride(&rides, driver.id, 3).await;

    let mut requests = Vec::new();
    for i in 0..8 {
        let rider = user(&users, &format!("rider{}", i)).await;
        let booking = Booking::new(ride.id, rider.id, 1);
        bookings.create_booking(&booking, &[]).await.unwrap();
        requests.push(booking);
    }

    let mut handles = Vec::new();
    for booking in requests {
        let bookings = bookings.clone();
        let notification = Notification::booking_accepted(booking.user_id, &ride);
        handles.push(tokio::spawn(async move { bookings.accept_booking(booking.id, &notification).await }));
    }

    let mut accepted = 0;
    for handle in handles {
        match handle.await.unwrap() {
            Ok(updated) => {
                assert!(updated.seats_left >= 0);
                accepted += 1;
            }
            Err(CoreError::InsufficientSeats { .. }) => {}
            Err(e) => panic!("unexpected error: {}", e),
        }
    }

    let stored = rides.find_ride(ride.id).await.unwrap().unwrap();
    assert_eq!(accepted, 3);
    assert_eq!(stored.seats_left, 0);

    let views = bookings.list_by_ride(ride.id).await.unwrap();
    let accepted_rows = views.iter().filter(|v| v.booking.status == BookingStatus::Accepted).count();
    assert_eq!(accepted_rows, 3);
}

#[tokio::test]
async fn test_duplicate_request_is_conflict() {
    let Some(db) = connect().await else { return };
    let users = PgUserRepository::new(db.pool.clone());
    let rides = PgRideRepository::new(db.pool.clone());
    let bookings = PgBookingRepository::new(db.pool.clone());

    let driver = user(&users, "driver").await;
    let rider = user(&users, "rider").await;
    let ride = ride(&rides, driver.id, 2).await;

    bookings.create_booking(&Booking::new(ride.id, rider.id, 1), &[]).await.unwrap();
    let again = bookings.create_booking(&Booking::new(ride.id, rider.id, 1), &[]).await;
    assert!(matches!(again, Err(CoreError::Conflict(_))));
}

#[tokio::test]
async fn test_profile_completion_enables_driver_mode() {
    let Some(db) = connect().await else { return };
    let users = PgUserRepository::new(db.pool.clone());
    let kabir = user(&users, "kabir").await;

    let details = CompleteProfile {
        phone: Some("9876543210".to_string()),
        gender: Some("male".to_string()),
        date_of_birth: Some("1990-07-04".to_string()),
        address: Some("Sector 56, Gurugram".to_string()),
        aadhaar_number: Some("123456789012".to_string()),
        pan_number: Some("ABCDE1234F".to_string()),
        driving_license_number: Some("HR2620110012345".to_string()),
    }
    .normalize()
    .unwrap();

    let completed = users.complete_profile(kabir.id, &details).await.unwrap().unwrap();
    assert!(completed.can_drive);
    assert!(completed.is_profile_complete());

    let switched = users.set_mode(kabir.id, UserMode::Driver).await.unwrap().unwrap();
    assert_eq!(switched.mode, UserMode::Driver);

    let found = users.find_users(&[kabir.id, Uuid::new_v4()]).await.unwrap();
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].pan_number.as_deref(), Some("ABCDE1234F"));
}
