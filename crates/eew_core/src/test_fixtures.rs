//! Shared test fixtures for eew_core and downstream crates.
//!
//! `test_network()` is a compact, fully deterministic network: an inland grid
//! over central Taiwan, an offshore grid east of it, a line of tsunami gauges
//! and two volcano stations. `base_constants()` carries the production tuning.

use crate::geo::region_of;
use crate::network::StationNetwork;
use crate::{
    Constants, EventType, GeoPoint, RunOptions, SimulationState, SpawnRequest, Station,
    StationId, StationType, Terrain,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

/// Epicenter inside the inland grid.
pub const INLAND_EPICENTER: GeoPoint = GeoPoint::new(23.85, 120.9);
/// Epicenter in the middle of the offshore grid.
pub const OFFSHORE_EPICENTER: GeoPoint = GeoPoint::new(23.0, 122.75);

pub fn base_constants() -> Constants {
    Constants {
        p_wave_speed_km_s: 6.0,
        s_wave_speed_km_s: 3.5,
        ash_speed_km_s: 0.5,
        nominal_frame_rate: 60.0,
        live_decay: 0.95,
        tsunami_live_decay: 0.99,
        live_epsilon: 0.05,
        p_trigger_intensity: 0.5,
        inland_trigger_threshold: 15,
        offshore_trigger_threshold: 10,
        processing_delay_min_s: 5.0,
        processing_delay_max_s: 7.0,
        alert_magnitude: 5.0,
        moderate_alert_magnitude: 4.0,
        moderate_alert_min_intensity: 1.5,
        tsunami_min_magnitude: 7.0,
        tsunami_max_depth_km: 35.0,
        tsunami_delay_min_s: 8.0,
        tsunami_delay_max_s: 10.0,
        tsunami_gauge_radius_km: 800.0,
        tsunami_wave_start_s: 2.0,
        tsunami_wave_end_s: 30.0,
        tsunami_visual_scale: 0.5,
        tsunami_smoothing: 0.1,
        alarm_min_interval_s: 5.0,
        countdown_min_intensity: 1.5,
        countdown_size: 5,
        report_interval_s: 0.6,
        report_min_stations: 6,
        estimate_noise_floor: 1.8,
        estimate_default_depth_km: 10.0,
        estimate_blend_start_stations: 10,
        estimate_blend_full_stations: 40,
        gear_thresholds: vec![1.5, 2.5, 3.5, 4.5, 6.0, 7.5],
        simulation_ceiling_s: 300.0,
    }
}

pub fn make_station(
    id: &str,
    name: &str,
    lat: f64,
    lng: f64,
    terrain: Terrain,
    station_type: StationType,
    is_major: bool,
) -> Station {
    Station {
        id: StationId(id.to_string()),
        name: name.to_string(),
        lat,
        lng,
        terrain,
        region: region_of(lat, lng),
        station_type,
        is_major,
    }
}

/// Majors first, then 100 inland, 64 offshore, 6 tsunami gauges, 2 volcanoes.
pub fn test_stations() -> Vec<Station> {
    let mut stations = vec![
        make_station(
            "CITY-TAICHUNG",
            "Taichung",
            24.15,
            120.75,
            Terrain::Basin,
            StationType::Seismic,
            true,
        ),
        make_station(
            "CITY-HUALIEN",
            "Hualien",
            23.98,
            121.60,
            Terrain::Valley,
            StationType::Seismic,
            true,
        ),
        make_station(
            "CITY-TAIPEI",
            "Taipei",
            25.03,
            121.56,
            Terrain::Basin,
            StationType::Seismic,
            true,
        ),
    ];

    for row in 0..10_u32 {
        for col in 0..10_u32 {
            let lat = 23.5 + f64::from(row) * 0.1;
            let lng = 120.85 + f64::from(col) * 0.1;
            let terrain = if (row + col) % 2 == 0 {
                Terrain::Plain
            } else {
                Terrain::Mountain
            };
            let id = format!("TW-{row}{col}");
            stations.push(make_station(&id, &id, lat, lng, terrain, StationType::Seismic, false));
        }
    }

    for row in 0..8_u32 {
        for col in 0..8_u32 {
            let lat = 22.6 + f64::from(row) * 0.1;
            let lng = 122.4 + f64::from(col) * 0.1;
            let id = format!("SEA-{row}{col}");
            stations.push(make_station(
                &id,
                &id,
                lat,
                lng,
                Terrain::Offshore,
                StationType::Seismic,
                false,
            ));
        }
    }

    for i in 0..6_u32 {
        let lat = 22.5 + f64::from(i) * 0.4;
        let id = format!("TSU-{i}");
        stations.push(make_station(
            &id,
            &id,
            lat,
            122.2,
            Terrain::Offshore,
            StationType::Tsunami,
            false,
        ));
    }

    stations.push(make_station(
        "VOL-TATUN",
        "Tatun",
        25.17,
        121.55,
        Terrain::Mountain,
        StationType::Volcano,
        false,
    ));
    stations.push(make_station(
        "VOL-GUISHAN",
        "Guishan",
        24.84,
        121.95,
        Terrain::Mountain,
        StationType::Volcano,
        false,
    ));
    stations
}

pub fn test_network() -> StationNetwork {
    StationNetwork::new(test_stations())
}

/// Seeded state with jitter, noise and randomized delays switched off.
pub fn deterministic_state() -> SimulationState {
    SimulationState::new(
        42,
        RunOptions {
            speed: 1.0,
            deterministic: true,
        },
    )
}

/// Seeded state with the default (randomized) options.
pub fn base_state() -> SimulationState {
    SimulationState::new(42, RunOptions::default())
}

pub fn spawn_at(
    epicenter: GeoPoint,
    magnitude: f64,
    depth_km: f64,
    event_type: EventType,
) -> SpawnRequest {
    SpawnRequest {
        epicenter,
        magnitude,
        depth_km,
        event_type,
        delay_s: 0.0,
    }
}

/// Deterministic RNG seeded with 42.
pub fn make_rng() -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(42)
}
