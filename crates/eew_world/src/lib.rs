//! Content loading and station-network generation shared between eew_cli and eew_bench.

use anyhow::{Context, Result};
use eew_core::attenuation::MAX_GEAR;
use eew_core::geo::is_offshore;
use eew_core::{
    Constants, EewContent, NetworkDef, Region, Station, StationId, StationNetwork, StationType,
    Terrain, ZoneDef,
};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

#[derive(Deserialize)]
struct NetworkFile {
    content_version: String,
    #[serde(flatten)]
    network: NetworkDef,
}

/// Validates ranges and cross-references in loaded content, panicking on any authoring error.
///
/// Catches mistakes like: a duplicated station id, a zone with an inverted
/// bounding box, or wave speeds that would let S overtake P.
pub fn validate_content(content: &EewContent) {
    validate_network(&content.network);
    validate_constants(&content.constants);
}

fn validate_network(network: &NetworkDef) {
    let mut ids: HashSet<&str> = HashSet::new();
    for major in &network.major_stations {
        assert!(!major.id.is_empty(), "major station '{}' has an empty id", major.name);
        assert!(
            ids.insert(major.id.as_str()),
            "station id '{}' is defined more than once",
            major.id,
        );
    }
    for volcano in &network.volcanoes {
        assert!(
            ids.insert(volcano.id.as_str()),
            "station id '{}' is defined more than once",
            volcano.id,
        );
    }

    let mut prefixes: HashSet<&str> = HashSet::new();
    for zone in &network.zones {
        assert!(
            prefixes.insert(zone.prefix.as_str()),
            "zone prefix '{}' is used by more than one zone",
            zone.prefix,
        );
        assert!(zone.count > 0, "zone '{}' has zero stations", zone.prefix);
        assert!(
            zone.bounds.lat_min < zone.bounds.lat_max && zone.bounds.lng_min < zone.bounds.lng_max,
            "zone '{}' has an empty or inverted bounding box",
            zone.prefix,
        );
        assert!(
            zone.station_type != StationType::Volcano,
            "zone '{}' cannot generate volcano stations; list them under volcanoes",
            zone.prefix,
        );
        for (label, p) in [
            ("offshore_keep_probability", zone.offshore_keep_probability),
            ("inland_keep_probability", zone.inland_keep_probability),
            ("plain_probability", zone.plain_probability),
        ] {
            assert!(
                (0.0..=1.0).contains(&p),
                "zone '{}' {label} {p} is not a probability",
                zone.prefix,
            );
        }
        assert!(
            zone.offshore_keep_probability > 0.0 || zone.inland_keep_probability > 0.0,
            "zone '{}' rejects every candidate",
            zone.prefix,
        );
    }
}

fn validate_constants(c: &Constants) {
    assert!(
        c.p_wave_speed_km_s > c.s_wave_speed_km_s && c.s_wave_speed_km_s > c.ash_speed_km_s,
        "wave speeds must satisfy P > S > ash",
    );
    assert!(c.ash_speed_km_s > 0.0, "ash_speed_km_s must be positive");
    assert!(c.nominal_frame_rate > 0.0, "nominal_frame_rate must be positive");
    for (label, factor) in [
        ("live_decay", c.live_decay),
        ("tsunami_live_decay", c.tsunami_live_decay),
        ("tsunami_smoothing", c.tsunami_smoothing),
    ] {
        assert!(factor > 0.0 && factor <= 1.0, "{label} {factor} must be in (0, 1]");
    }
    for (label, min, max) in [
        ("processing_delay", c.processing_delay_min_s, c.processing_delay_max_s),
        ("tsunami_delay", c.tsunami_delay_min_s, c.tsunami_delay_max_s),
        ("tsunami_wave window", c.tsunami_wave_start_s, c.tsunami_wave_end_s),
    ] {
        assert!(min >= 0.0 && min <= max, "{label} range [{min}, {max}] is invalid");
    }
    assert!(
        c.estimate_blend_start_stations <= c.estimate_blend_full_stations,
        "estimate blend must start before it is full",
    );
    assert!(c.report_min_stations > 0, "report_min_stations must be positive");
    assert!(c.report_interval_s > 0.0, "report_interval_s must be positive");
    assert!(c.countdown_size > 0, "countdown_size must be positive");
    assert!(
        c.gear_thresholds.windows(2).all(|w| w[0] < w[1]),
        "gear_thresholds must be strictly ascending",
    );
    assert!(
        c.gear_thresholds.len() < usize::from(MAX_GEAR),
        "gear_thresholds has {} entries; at most {} gears exist",
        c.gear_thresholds.len(),
        MAX_GEAR,
    );
    assert!(c.simulation_ceiling_s > 0.0, "simulation_ceiling_s must be positive");
}

pub fn load_content(content_dir: &str) -> Result<EewContent> {
    let dir = Path::new(content_dir);
    let constants: Constants = serde_json::from_str(
        &std::fs::read_to_string(dir.join("constants.json")).context("reading constants.json")?,
    )
    .context("parsing constants.json")?;
    let network_file: NetworkFile = serde_json::from_str(
        &std::fs::read_to_string(dir.join("network.json")).context("reading network.json")?,
    )
    .context("parsing network.json")?;
    let content = EewContent {
        content_version: network_file.content_version,
        network: network_file.network,
        constants,
    };
    validate_content(&content);
    Ok(content)
}

/// Lays out the station network: major stations verbatim, then every zone in
/// order, then volcano stations.
///
/// Zone placement is random inside the zone's bounds. Candidates are kept with
/// the zone's offshore or inland keep probability; a zone gives up after
/// `count × 5` attempts, so it may come up short but never loops forever.
pub fn generate_network(def: &NetworkDef, rng: &mut impl Rng) -> StationNetwork {
    let mut stations: Vec<Station> = def
        .major_stations
        .iter()
        .map(|major| Station {
            id: StationId(major.id.clone()),
            name: major.name.clone(),
            lat: major.lat,
            lng: major.lng,
            terrain: major.terrain,
            region: eew_core::geo::region_of(major.lat, major.lng),
            station_type: StationType::Seismic,
            is_major: true,
        })
        .collect();

    for zone in &def.zones {
        let before = stations.len();
        generate_zone(&mut stations, zone, rng);
        let added = stations.len() - before;
        if added < zone.count as usize {
            tracing::debug!(
                zone = %zone.prefix,
                requested = zone.count,
                added,
                "zone ran out of placement attempts"
            );
        }
    }

    stations.extend(def.volcanoes.iter().map(|volcano| Station {
        id: StationId(volcano.id.clone()),
        name: volcano.name.clone(),
        lat: volcano.lat,
        lng: volcano.lng,
        terrain: Terrain::Mountain,
        region: eew_core::geo::region_of(volcano.lat, volcano.lng),
        station_type: StationType::Volcano,
        is_major: false,
    }));

    let network = StationNetwork::new(stations);
    tracing::info!(
        stations = network.len(),
        seismic = network.of_type(StationType::Seismic).count(),
        tsunami = network.of_type(StationType::Tsunami).count(),
        volcano = network.of_type(StationType::Volcano).count(),
        "station network generated"
    );
    network
}

/// Candidate points tried per zone before giving up on rejected placements.
fn attempt_budget(count: u32) -> u32 {
    count.saturating_mul(5)
}

fn generate_zone(stations: &mut Vec<Station>, zone: &ZoneDef, rng: &mut impl Rng) {
    let max_attempts = attempt_budget(zone.count);
    let bounds = &zone.bounds;
    let mut added = 0;
    let mut attempts = 0;

    while added < zone.count && attempts < max_attempts {
        attempts += 1;
        let lat = rng.gen_range(bounds.lat_min..bounds.lat_max);
        let lng = rng.gen_range(bounds.lng_min..bounds.lng_max);
        let offshore = is_offshore(lat, lng);
        let keep = if offshore {
            zone.offshore_keep_probability
        } else {
            zone.inland_keep_probability
        };
        if !rng.gen_bool(keep) {
            continue;
        }

        let terrain = if offshore {
            Terrain::Offshore
        } else if rng.gen_bool(zone.plain_probability) {
            Terrain::Plain
        } else {
            Terrain::Mountain
        };
        let suffix = match (zone.station_type, offshore) {
            (StationType::Tsunami, _) => "Gauge",
            (_, true) => "Sea",
            (_, false) => "Stn",
        };
        stations.push(Station {
            id: StationId(format!("{}-{added:04}", zone.prefix)),
            name: format!("{}-{suffix}", zone.prefix),
            lat,
            lng,
            terrain,
            region: if offshore { Region::Offshore } else { Region::Inland },
            station_type: zone.station_type,
            is_major: false,
        });
        added += 1;
    }
}

/// Network layout for a seed. Uses its own RNG stream so the engine RNG
/// starts from the same point whatever the network size.
pub fn build_network(content: &EewContent, seed: u64) -> StationNetwork {
    let mut rng = ChaCha8Rng::seed_from_u64(seed ^ NETWORK_SEED_SALT);
    generate_network(&content.network, &mut rng)
}

const NETWORK_SEED_SALT: u64 = 0x6e65_7477_6f72_6b00;

/// Write `run_info.json` into a run directory.
pub fn write_run_info(
    dir: &Path,
    run_id: &str,
    seed: u64,
    content_version: &str,
    metrics_every: u64,
    args: serde_json::Value,
) -> Result<()> {
    let info = serde_json::json!({
        "run_id": run_id,
        "seed": seed,
        "start_time": chrono::Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
        "content_version": content_version,
        "metrics_every": metrics_every,
        "args": args,
    });
    let path = dir.join("run_info.json");
    let file =
        std::fs::File::create(&path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, &info)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}
