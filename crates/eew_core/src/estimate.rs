//! Magnitude and depth re-estimation from the stations triggered so far.
//!
//! Each contributing station inverts the S-wave formula against a depth guess
//! that converges on the true depth as the network fills in. The per-station
//! magnitudes are averaged into one bulletin.

use rand::Rng;

use crate::attenuation::{intensity, invert_magnitude, to_discrete_scale};
use crate::geo::distance_km;
use crate::network::StationNetwork;
use crate::{Constants, EewReport, Estimate, SimulationState, StationType, Terrain, WaveType};

/// Depth perturbation width is `NOISE_SCALE / sqrt(n)`, floored at `MIN_NOISE_WIDTH`.
const NOISE_SCALE: f64 = 5.0;
const MIN_NOISE_WIDTH: f64 = 0.1;

/// Depth guess for one contributing station given `n` triggered stations.
pub fn depth_guess(true_depth: f64, n: usize, noise: f64, constants: &Constants) -> f64 {
    let start = constants.estimate_blend_start_stations;
    let full = constants.estimate_blend_full_stations;
    let default = constants.estimate_default_depth_km;
    let guess = if n > full {
        true_depth + noise
    } else if n > start {
        #[allow(clippy::cast_precision_loss)]
        let factor = (n - start) as f64 / full.saturating_sub(start).max(1) as f64;
        default * (1.0 - factor) + true_depth * factor + noise * 2.0
    } else {
        default + noise * 5.0
    };
    guess.max(0.0)
}

pub fn noise_width(n: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let n = n.max(1) as f64;
    (NOISE_SCALE / n.sqrt()).max(MIN_NOISE_WIDTH)
}

/// Result of one estimation pass, before it becomes a bulletin.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEstimate {
    /// Rounded to one decimal.
    pub magnitude: f64,
    pub depth_km: f64,
    pub contributors: usize,
}

/// Average per-station magnitude over `observations` of `(distance_km, peak)`.
///
/// `triggered` is the total triggered count that drives depth convergence.
/// Returns `None` when nothing contributes.
pub fn estimate_source(
    observations: &[(f64, f64)],
    true_depth: f64,
    triggered: usize,
    constants: &Constants,
    rng: &mut impl Rng,
    deterministic: bool,
) -> Option<SourceEstimate> {
    if observations.is_empty() {
        return None;
    }
    let width = noise_width(triggered);
    let mut magnitude_sum = 0.0;
    let mut depth_sum = 0.0;
    for &(distance, peak) in observations {
        let noise = if deterministic {
            0.0
        } else {
            (rng.gen::<f64>() - 0.5) * width
        };
        let depth = depth_guess(true_depth, triggered, noise, constants);
        magnitude_sum += invert_magnitude(peak, distance, depth);
        depth_sum += depth;
    }
    #[allow(clippy::cast_precision_loss)]
    let count = observations.len() as f64;
    Some(SourceEstimate {
        magnitude: (magnitude_sum / count * 10.0).round() / 10.0,
        depth_km: depth_sum / count,
        contributors: observations.len(),
    })
}

/// Throttled bulletin step. Appends to `state.reports` and refreshes
/// `state.estimate` when a report is due.
pub(crate) fn maybe_report(
    state: &mut SimulationState,
    network: &StationNetwork,
    constants: &Constants,
    rng: &mut impl Rng,
) -> Option<EewReport> {
    let now = state.elapsed;
    let triggered = state.stations.peak.len();
    if now - state.last_report_time <= constants.report_interval_s
        || triggered < constants.report_min_stations
    {
        return None;
    }
    state.last_report_time = now;

    let event = state.events.iter().find(|e| e.start_time <= now)?;
    let observations: Vec<(f64, f64)> = network
        .of_type(StationType::Seismic)
        .filter_map(|station| {
            let peak = state.stations.peak.get(&station.id).copied()?;
            (peak > constants.estimate_noise_floor).then(|| {
                let distance = distance_km(
                    event.epicenter.lat,
                    event.epicenter.lng,
                    station.lat,
                    station.lng,
                );
                (distance, peak)
            })
        })
        .collect();

    let source = estimate_source(
        &observations,
        event.depth_km,
        triggered,
        constants,
        rng,
        state.meta.options.deterministic,
    )?;

    state.counters.next_report_num += 1;
    let report = EewReport {
        report_num: state.counters.next_report_num,
        event_id: event.id.clone(),
        time: now,
        magnitude: source.magnitude,
        depth_km: source.depth_km,
        stations: u32::try_from(source.contributors).unwrap_or(u32::MAX),
        offshore: event.offshore,
    };

    let predicted = intensity(
        source.magnitude,
        0.0,
        source.depth_km,
        Terrain::Basin,
        WaveType::S,
        0.0,
    );
    state.estimate = Some(Estimate {
        magnitude: source.magnitude,
        depth_km: source.depth_km,
        predicted_max_intensity: predicted,
        predicted_class: to_discrete_scale(predicted),
    });
    state.reports.push(report.clone());
    Some(report)
}
