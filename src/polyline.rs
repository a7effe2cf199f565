//! Encoded-polyline codec for route geometries.
//!
//! The directions oracle returns geometries in Google's polyline5 format
//! (5-decimal precision, delta + zig-zag + base64-ish ASCII). The pipeline
//! keeps the encoded string on the wire and only decodes where it needs the
//! raw coordinates, e.g. to recompute a bounding box.

use crate::models::{LatLng, Viewport};

const PRECISION: f64 = 1e5;

/// Encodes a coordinate sequence as a polyline5 string.
pub fn encode(points: &[LatLng]) -> String {
    let mut out = String::new();
    let mut prev_lat = 0i64;
    let mut prev_lng = 0i64;

    for point in points {
        let lat = (point.lat * PRECISION).round() as i64;
        let lng = (point.lng * PRECISION).round() as i64;
        encode_value(lat - prev_lat, &mut out);
        encode_value(lng - prev_lng, &mut out);
        prev_lat = lat;
        prev_lng = lng;
    }

    out
}

/// Decodes a polyline5 string. Malformed input yields `None`.
pub fn decode(encoded: &str) -> Option<Vec<LatLng>> {
    let mut points = Vec::new();
    let mut bytes = encoded.bytes().peekable();
    let mut lat = 0i64;
    let mut lng = 0i64;

    while bytes.peek().is_some() {
        let delta_lat = decode_value(&mut bytes)?;
        let delta_lng = decode_value(&mut bytes)?;
        lat += delta_lat;
        lng += delta_lng;
        points.push(LatLng::new(lat as f64 / PRECISION, lng as f64 / PRECISION));
    }

    Some(points)
}

/// Smallest viewport containing every point. `None` for an empty sequence.
pub fn bounding_viewport(points: &[LatLng]) -> Option<Viewport> {
    let first = points.first()?;
    let mut low = *first;
    let mut high = *first;
    for point in &points[1..] {
        low.lat = low.lat.min(point.lat);
        low.lng = low.lng.min(point.lng);
        high.lat = high.lat.max(point.lat);
        high.lng = high.lng.max(point.lng);
    }
    Some(Viewport { low, high })
}

fn encode_value(value: i64, out: &mut String) {
    // Zig-zag so small negative deltas stay short.
    let mut v = if value < 0 { !(value << 1) } else { value << 1 } as u64;
    while v >= 0x20 {
        out.push((((v & 0x1f) | 0x20) as u8 + 63) as char);
        v >>= 5;
    }
    out.push((v as u8 + 63) as char);
}

fn decode_value(bytes: &mut impl Iterator<Item = u8>) -> Option<i64> {
    let mut result = 0u64;
    let mut shift = 0u32;
    loop {
        let byte = bytes.next()?.checked_sub(63)?;
        result |= u64::from(byte & 0x1f) << shift;
        if byte < 0x20 {
            break;
        }
        shift += 5;
        if shift > 60 {
            return None;
        }
    }
    let value = (result >> 1) as i64;
    Some(if result & 1 == 1 { !value } else { value })
}

#[cfg(test)]
mod tests {
    use super::*;

    // Reference example from the polyline format documentation.
    const REFERENCE: &str = "_p~iF~ps|U_ulLnnqC_mqNvxq`@";

    #[test]
    fn decodes_reference_polyline() {
        let points = decode(REFERENCE).unwrap();
        assert_eq!(points.len(), 3);
        assert!((points[0].lat - 38.5).abs() < 1e-5);
        assert!((points[0].lng - -120.2).abs() < 1e-5);
        assert!((points[2].lat - 43.252).abs() < 1e-5);
        assert!((points[2].lng - -126.453).abs() < 1e-5);
    }

    #[test]
    fn encodes_reference_polyline() {
        let points = vec![
            LatLng::new(38.5, -120.2),
            LatLng::new(40.7, -120.95),
            LatLng::new(43.252, -126.453),
        ];
        assert_eq!(encode(&points), REFERENCE);
    }

    #[test]
    fn round_trips_singapore_loop() {
        let points = vec![
            LatLng::new(1.2834, 103.8607),
            LatLng::new(1.2901, 103.8520),
            LatLng::new(1.2810, 103.8490),
            LatLng::new(1.2834, 103.8607),
        ];
        let decoded = decode(&encode(&points)).unwrap();
        assert_eq!(decoded.len(), points.len());
        for (a, b) in points.iter().zip(&decoded) {
            assert!((a.lat - b.lat).abs() < 1e-5);
            assert!((a.lng - b.lng).abs() < 1e-5);
        }
    }

    #[test]
    fn empty_string_decodes_to_empty() {
        assert_eq!(decode("").unwrap().len(), 0);
    }

    #[test]
    fn bounding_viewport_contains_all_points() {
        let points = decode(REFERENCE).unwrap();
        let viewport = bounding_viewport(&points).unwrap();
        for point in &points {
            assert!(viewport.contains(*point));
        }
    }

    #[test]
    fn bounding_viewport_of_empty_is_none() {
        assert!(bounding_viewport(&[]).is_none());
    }
}
