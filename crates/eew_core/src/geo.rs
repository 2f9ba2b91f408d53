//! Great-circle distance and the land/sea classifier for the network footprint.

use crate::Region;

pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// Haversine distance in km.
pub fn distance_km(lat1: f64, lng1: f64, lat2: f64, lng2: f64) -> f64 {
    let d_lat = (lat2 - lat1).to_radians();
    let d_lng = (lng2 - lng1).to_radians();
    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.to_radians().cos() * lat2.to_radians().cos() * (d_lng / 2.0).sin().powi(2);
    EARTH_RADIUS_KM * 2.0 * a.sqrt().atan2((1.0 - a).sqrt())
}

/// True unless the point falls on Taiwan or one of the Japanese main islands.
///
/// Boxes are hand-tuned to the network footprint; anything outside is sea.
pub fn is_offshore(lat: f64, lng: f64) -> bool {
    // Taiwan: a slanted band following the island's north-east tilt.
    if lat > 21.8 && lat < 25.4 && lng > 120.0 && lng < 122.0 {
        let center_lng = 120.8 + (lat - 22.0) * 0.25;
        if (lng - center_lng).abs() < 0.6 {
            return false;
        }
    }

    // Kyushu
    if lat > 31.0 && lat < 34.0 && lng > 129.5 && lng < 132.0 {
        return false;
    }

    // Shikoku
    if lat > 32.7 && lat < 34.5 && lng > 132.0 && lng < 134.8 {
        return false;
    }

    // Honshu, minus the sea south of Tokyo and the Sea of Japan corner.
    if lat > 34.0 && lat < 41.5 && lng > 131.0 && lng < 142.0 {
        if lat < 35.0 && lng > 137.0 {
            return true;
        }
        if lat > 38.0 && lng < 138.0 {
            return true;
        }
        return false;
    }

    // Hokkaido
    if lat > 41.5 && lat < 45.5 && lng > 139.5 && lng < 146.0 {
        return false;
    }

    true
}

pub fn region_of(lat: f64, lng: f64) -> Region {
    if is_offshore(lat, lng) {
        Region::Offshore
    } else {
        Region::Inland
    }
}
