//! Per-event precomputation of every station's distance, arrivals and intensities.
//!
//! The output is sorted by distance so the engine can stream arrivals with
//! monotonic cursors instead of rescanning the network every tick.

use rand::Rng;

use crate::attenuation::{arrival_times, intensity, jitter_sample};
use crate::geo::distance_km;
use crate::{Constants, EventType, GeoPoint, Station, StationImpact, WaveType};

#[allow(clippy::too_many_arguments)]
pub fn compile(
    stations: &[Station],
    epicenter: GeoPoint,
    magnitude: f64,
    depth_km: f64,
    event_type: EventType,
    constants: &Constants,
    rng: &mut impl Rng,
    deterministic: bool,
) -> Vec<StationImpact> {
    let mut impacts: Vec<StationImpact> = stations
        .iter()
        .map(|station| {
            let distance = distance_km(epicenter.lat, epicenter.lng, station.lat, station.lng);
            let p_jitter = jitter_sample(rng, deterministic);
            let s_jitter = jitter_sample(rng, deterministic);
            let (p_time, s_time) = arrival_times(distance, depth_km, station.terrain, constants);
            StationImpact {
                station: station.clone(),
                distance_km: distance,
                p_intensity: intensity(
                    magnitude,
                    distance,
                    depth_km,
                    station.terrain,
                    WaveType::P,
                    p_jitter,
                ),
                s_intensity: intensity(
                    magnitude,
                    distance,
                    depth_km,
                    station.terrain,
                    WaveType::S,
                    s_jitter,
                ),
                p_time,
                s_time,
                ash_time: (event_type == EventType::Volcano)
                    .then(|| distance / constants.ash_speed_km_s),
            }
        })
        .collect();

    // Stable: equidistant stations keep network order.
    impacts.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
    impacts
}

/// Indices of `impacts` ordered by P arrival.
///
/// Terrain changes wave speed, so arrival order can differ from distance
/// order. P and S share a velocity factor, so the S order is the same.
pub fn arrival_order(impacts: &[StationImpact]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..impacts.len()).collect();
    order.sort_by(|&a, &b| impacts[a].p_time.total_cmp(&impacts[b].p_time));
    order
}
