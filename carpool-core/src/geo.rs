use serde::{Deserialize, Serialize};
use crate::{CoreError, CoreResult};

const EARTH_RADIUS_KM: f64 = 6371.0;
const POLYLINE_PRECISION: f64 = 1e5;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// Great-circle distance in kilometres (haversine).
pub fn distance_km(a: GeoPoint, b: GeoPoint) -> f64 {
    let d_lat = (b.lat - a.lat).to_radians();
    let d_lng = (b.lng - a.lng).to_radians();

    let x = (d_lat / 2.0).sin().powi(2)
        + a.lat.to_radians().cos() * b.lat.to_radians().cos() * (d_lng / 2.0).sin().powi(2);

    2.0 * EARTH_RADIUS_KM * x.sqrt().atan2((1.0 - x).sqrt())
}

/// Decode a Google encoded polyline (precision 5).
pub fn decode_polyline(encoded: &str) -> CoreResult<Vec<GeoPoint>> {
    let bytes = encoded.as_bytes();
    let mut index = 0;
    let mut lat: i64 = 0;
    let mut lng: i64 = 0;
    let mut points = Vec::new();

    while index < bytes.len() {
        lat = accumulate(lat, next_value(bytes, &mut index)?)?;
        lng = accumulate(lng, next_value(bytes, &mut index)?)?;

        let point = GeoPoint::new(lat as f64 / POLYLINE_PRECISION, lng as f64 / POLYLINE_PRECISION);
        if !(-90.0..=90.0).contains(&point.lat) || !(-180.0..=180.0).contains(&point.lng) {
            return Err(CoreError::Validation(
                "Invalid route polyline: coordinate out of range".to_string(),
            ));
        }
        points.push(point);
    }

    Ok(points)
}

fn accumulate(total: i64, delta: i64) -> CoreResult<i64> {
    total
        .checked_add(delta)
        .ok_or_else(|| CoreError::Validation("Invalid route polyline: value overflow".to_string()))
}

pub fn encode_polyline(points: &[GeoPoint]) -> String {
    let mut out = String::new();
    let (mut prev_lat, mut prev_lng) = (0i64, 0i64);

    for p in points {
        let lat = (p.lat * POLYLINE_PRECISION).round() as i64;
        let lng = (p.lng * POLYLINE_PRECISION).round() as i64;
        push_value(lat - prev_lat, &mut out);
        push_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

fn next_value(bytes: &[u8], index: &mut usize) -> CoreResult<i64> {
    let mut result: i64 = 0;
    let mut shift = 0;

    loop {
        let byte = *bytes
            .get(*index)
            .ok_or_else(|| CoreError::Validation("Invalid route polyline: truncated".to_string()))?;
        *index += 1;

        if !(63..=126).contains(&byte) {
            return Err(CoreError::Validation(format!(
                "Invalid route polyline: unexpected character {:?}",
                byte as char
            )));
        }

        let chunk = (byte - 63) as i64;
        result |= (chunk & 0x1f) << shift;
        shift += 5;

        if chunk < 0x20 {
            break;
        }
        if shift > 60 {
            return Err(CoreError::Validation("Invalid route polyline: value overflow".to_string()));
        }
    }

    Ok(if result & 1 != 0 { !(result >> 1) } else { result >> 1 })
}

fn push_value(value: i64, out: &mut String) {
    let mut v = if value < 0 { !(value << 1) } else { value << 1 };
    while v >= 0x20 {
        out.push(char::from(((0x20 | (v & 0x1f)) + 63) as u8));
        v >>= 5;
    }
    out.push(char::from((v + 63) as u8));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-6
    }

    #[test]
    fn test_decode_reference_polyline() {
        let points = decode_polyline("_p~iF~ps|U_ulLnnqC_mqNvxq`@").unwrap();
        assert_eq!(points.len(), 3);
        assert!(close(points[0].lat, 38.5) && close(points[0].lng, -120.2));
        assert!(close(points[1].lat, 40.7) && close(points[1].lng, -120.95));
        assert!(close(points[2].lat, 43.252) && close(points[2].lng, -126.453));
    }

    #[test]
    fn test_encode_matches_reference() {
        let points = vec![
            GeoPoint::new(38.5, -120.2),
            GeoPoint::new(40.7, -120.95),
            GeoPoint::new(43.252, -126.453),
        ];
        assert_eq!(encode_polyline(&points), "_p~iF~ps|U_ulLnnqC_mqNvxq`@");
    }

    #[test]
    fn test_decode_rejects_garbage() {
        assert!(matches!(decode_polyline("_p~iF~ps|U_"), Err(CoreError::Validation(_))));
        assert!(matches!(decode_polyline("ab cd"), Err(CoreError::Validation(_))));
        assert!(decode_polyline("").unwrap().is_empty());
    }

    #[test]
    fn test_decode_rejects_huge_deltas() {
        // Decodes to -2^62, the largest magnitude one value can carry.
        let huge = format!("}}{}F", "~".repeat(11));
        let encoded = format!("{huge}?{huge}?{huge}?");
        assert!(matches!(decode_polyline(&encoded), Err(CoreError::Validation(_))));

        assert!(matches!(accumulate(i64::MAX, 1), Err(CoreError::Validation(_))));
        assert_eq!(accumulate(-5, 7).unwrap(), 2);
    }

    #[test]
    fn test_decode_rejects_out_of_range_points() {
        let off_planet = encode_polyline(&[GeoPoint::new(95.0, 10.0)]);
        assert!(matches!(decode_polyline(&off_planet), Err(CoreError::Validation(_))));

        let bad_lng = encode_polyline(&[GeoPoint::new(10.0, 181.0)]);
        assert!(matches!(decode_polyline(&bad_lng), Err(CoreError::Validation(_))));
    }

    #[test]
    fn test_haversine_one_degree_of_longitude_at_equator() {
        let d = distance_km(GeoPoint::new(0.0, 0.0), GeoPoint::new(0.0, 1.0));
        assert!((d - 111.195).abs() < 0.01, "got {}", d);
        assert_eq!(distance_km(GeoPoint::new(28.45, 77.02), GeoPoint::new(28.45, 77.02)), 0.0);
    }
}
