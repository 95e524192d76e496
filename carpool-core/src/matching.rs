use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::geo::{decode_polyline, distance_km, GeoPoint};
use crate::models::ride::Ride;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchMode {
    #[default]
    Route,
    BoundingBox,
}

/// Tunables for ride search.
#[derive(Debug, Clone, Deserialize)]
pub struct MatchConfig {
    #[serde(default = "default_pickup_radius")]
    pub pickup_radius_km: f64,
    #[serde(default = "default_drop_radius")]
    pub drop_radius_km: f64,
    #[serde(default = "default_bbox_delta")]
    pub bbox_delta_deg: f64,
    #[serde(default = "default_candidate_limit")]
    pub candidate_limit: i64,
}

fn default_pickup_radius() -> f64 { 25.0 }
fn default_drop_radius() -> f64 { 30.0 }
fn default_bbox_delta() -> f64 { 0.1 }
fn default_candidate_limit() -> i64 { 50 }

impl Default for MatchConfig {
    fn default() -> Self {
        Self {
            pickup_radius_km: default_pickup_radius(),
            drop_radius_km: default_drop_radius(),
            bbox_delta_deg: default_bbox_delta(),
            candidate_limit: default_candidate_limit(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchQuery {
    pub from: GeoPoint,
    pub to: GeoPoint,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub mode: MatchMode,
}

/// Broad filter handed to the repository before geometric matching.
#[derive(Debug, Clone)]
pub struct CandidateQuery {
    pub require_polyline: bool,
    pub date: Option<NaiveDate>,
    pub limit: i64,
}

impl CandidateQuery {
    pub fn for_search(query: &SearchQuery, config: &MatchConfig) -> Self {
        Self {
            require_polyline: query.mode == MatchMode::Route,
            date: query.date,
            limit: config.candidate_limit,
        }
    }
}

/// Single pass over `route`: first point within the pickup radius, then the
/// first later point within the drop radius. Returns both indices on a match.
pub fn route_match(
    route: &[GeoPoint],
    pickup: GeoPoint,
    drop: GeoPoint,
    config: &MatchConfig,
) -> Option<(usize, usize)> {
    let mut pickup_index = None;

    for (i, point) in route.iter().enumerate() {
        match pickup_index {
            None => {
                if distance_km(*point, pickup) <= config.pickup_radius_km {
                    pickup_index = Some(i);
                }
            }
            Some(p) => {
                if distance_km(*point, drop) <= config.drop_radius_km {
                    return Some((p, i));
                }
            }
        }
    }

    None
}

pub fn bounding_box_match(ride: &Ride, from: GeoPoint, to: GeoPoint, delta_deg: f64) -> bool {
    within_box(ride.origin(), from, delta_deg) && within_box(ride.destination(), to, delta_deg)
}

fn within_box(point: GeoPoint, center: GeoPoint, delta_deg: f64) -> bool {
    (point.lat - center.lat).abs() <= delta_deg && (point.lng - center.lng).abs() <= delta_deg
}

pub fn ride_matches(ride: &Ride, query: &SearchQuery, config: &MatchConfig) -> bool {
    match query.mode {
        MatchMode::BoundingBox => bounding_box_match(ride, query.from, query.to, config.bbox_delta_deg),
        MatchMode::Route => {
            let Some(encoded) = ride.route_polyline.as_deref() else {
                return false;
            };
            match decode_polyline(encoded) {
                Ok(route) => route_match(&route, query.from, query.to, config).is_some(),
                Err(e) => {
                    warn!(ride_id = %ride.id, "Skipping ride with undecodable polyline: {}", e);
                    false
                }
            }
        }
    }
}

/// Filters candidates, preserving order. No ranking.
pub fn filter_matches(candidates: Vec<Ride>, query: &SearchQuery, config: &MatchConfig) -> Vec<Ride> {
    candidates
        .into_iter()
        .filter(|ride| ride_matches(ride, query, config))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::encode_polyline;
    use crate::models::ride::NewRide;
    use chrono::Utc;
    use uuid::Uuid;

    // Rough north-south line through Gurgaon towards Delhi.
    fn route() -> Vec<GeoPoint> {
        vec![
            GeoPoint::new(28.30, 77.00),
            GeoPoint::new(28.45, 77.02),
            GeoPoint::new(28.60, 77.10),
            GeoPoint::new(28.75, 77.15),
        ]
    }

    fn tight() -> MatchConfig {
        MatchConfig {
            pickup_radius_km: 5.0,
            drop_radius_km: 5.0,
            ..MatchConfig::default()
        }
    }

    fn ride_with(polyline: Option<String>) -> Ride {
        Ride::new(
            Uuid::new_v4(),
            NewRide {
                car_id: None,
                from: "Gurgaon".to_string(),
                from_lat: 28.30,
                from_lng: 77.00,
                to: "Delhi".to_string(),
                to_lat: 28.75,
                to_lng: 77.15,
                route_polyline: polyline,
                seats_total: 3,
                start_time: Utc::now(),
            },
        )
        .unwrap()
    }

    #[test]
    fn test_pickup_before_drop_matches() {
        let m = route_match(&route(), GeoPoint::new(28.45, 77.02), GeoPoint::new(28.75, 77.15), &tight());
        assert_eq!(m, Some((1, 3)));
    }

    #[test]
    fn test_reverse_direction_does_not_match() {
        let m = route_match(&route(), GeoPoint::new(28.75, 77.15), GeoPoint::new(28.45, 77.02), &tight());
        assert_eq!(m, None);
    }

    #[test]
    fn test_drop_must_come_after_pickup_point() {
        // Pickup and drop both near the same single point: never a match.
        let single = vec![GeoPoint::new(28.45, 77.02)];
        let m = route_match(&single, GeoPoint::new(28.45, 77.02), GeoPoint::new(28.451, 77.021), &tight());
        assert_eq!(m, None);
    }

    #[test]
    fn test_route_mode_requires_polyline() {
        let query = SearchQuery {
            from: GeoPoint::new(28.45, 77.02),
            to: GeoPoint::new(28.75, 77.15),
            date: None,
            mode: MatchMode::Route,
        };
        assert!(!ride_matches(&ride_with(None), &query, &tight()));
        assert!(!ride_matches(&ride_with(Some("!!".to_string())), &query, &tight()));
        assert!(ride_matches(&ride_with(Some(encode_polyline(&route()))), &query, &tight()));
    }

    #[test]
    fn test_bounding_box_mode() {
        let mut query = SearchQuery {
            from: GeoPoint::new(28.35, 77.05),
            to: GeoPoint::new(28.70, 77.10),
            date: None,
            mode: MatchMode::BoundingBox,
        };
        let ride = ride_with(None);
        assert!(ride_matches(&ride, &query, &MatchConfig::default()));

        query.to = GeoPoint::new(29.00, 77.10);
        assert!(!ride_matches(&ride, &query, &MatchConfig::default()));
    }

    #[test]
    fn test_search_query_defaults_to_route_mode() {
        let query: SearchQuery = serde_json::from_str(
            r#"{"from":{"lat":28.4,"lng":77.0},"to":{"lat":28.7,"lng":77.1},"date":"2026-10-20"}"#,
        )
        .unwrap();
        assert_eq!(query.mode, MatchMode::Route);
        assert_eq!(query.date, NaiveDate::from_ymd_opt(2026, 10, 20));
    }
}
