//! Station runtime updates: live decay, arrival cursors, tsunami gauge easing.

use std::collections::BTreeSet;

use crate::network::StationNetwork;
use crate::{ActiveEvent, Constants, Region, StationId, StationRuntime, StationType};

/// Stations whose runtime values changed this tick. Ordered for stable output.
pub(crate) type DirtySet = BTreeSet<StationId>;

/// Per-tick multiplier for a per-frame decay factor, so the rate does not
/// depend on how often `tick` is called.
pub(crate) fn frame_normalized(factor: f64, dt: f64, constants: &Constants) -> f64 {
    factor.powf(dt * constants.nominal_frame_rate)
}

/// Decays every live value; values at or below epsilon are dropped.
pub(crate) fn decay_live(
    runtime: &mut StationRuntime,
    network: &StationNetwork,
    dt: f64,
    constants: &Constants,
    dirty: &mut DirtySet,
) {
    if dt <= 0.0 {
        return;
    }
    let seismic = frame_normalized(constants.live_decay, dt, constants);
    let tide = frame_normalized(constants.tsunami_live_decay, dt, constants);
    runtime.live.retain(|id, value| {
        let factor = match network.station_type(id) {
            Some(StationType::Tsunami) => tide,
            _ => seismic,
        };
        *value *= factor;
        dirty.insert(id.clone());
        *value > constants.live_epsilon
    });
}

fn raise(runtime: &mut StationRuntime, id: &StationId, value: f64, dirty: &mut DirtySet) {
    if value > runtime.live_of(id) {
        runtime.live.insert(id.clone(), value);
        dirty.insert(id.clone());
    }
    if value > runtime.peak_of(id) {
        runtime.peak.insert(id.clone(), value);
        dirty.insert(id.clone());
    }
}

/// Moves the ash, P and S cursors up to `event_elapsed`.
pub(crate) fn advance_cursors(
    event: &mut ActiveEvent,
    event_elapsed: f64,
    runtime: &mut StationRuntime,
    constants: &Constants,
    dirty: &mut DirtySet,
) {
    while let Some(impact) = event.impacts.get(event.next_ash_index) {
        match impact.ash_time {
            Some(ash_time) if ash_time <= event_elapsed => {
                if runtime.ashed.insert(impact.station.id.clone()) {
                    dirty.insert(impact.station.id.clone());
                }
                event.next_ash_index += 1;
            }
            _ => break,
        }
    }

    while let Some(impact) = event
        .arrival_order
        .get(event.next_p_index)
        .and_then(|&index| event.impacts.get(index))
    {
        if event_elapsed < impact.p_time {
            break;
        }
        if impact.p_intensity > constants.p_trigger_intensity {
            match impact.station.region {
                Region::Inland => event.triggered_inland += 1,
                Region::Offshore => event.triggered_offshore += 1,
            }
            event.max_local_intensity = event.max_local_intensity.max(impact.p_intensity);
            raise(runtime, &impact.station.id, impact.p_intensity, dirty);
        }
        event.next_p_index += 1;
    }

    while let Some(impact) = event
        .arrival_order
        .get(event.next_s_index)
        .and_then(|&index| event.impacts.get(index))
    {
        if event_elapsed < impact.s_time {
            break;
        }
        raise(runtime, &impact.station.id, impact.s_intensity, dirty);
        event.max_local_intensity = event.max_local_intensity.max(impact.s_intensity);
        event.next_s_index += 1;
    }
}

/// Eases nearby gauges toward their wave-height target inside the wave window.
pub(crate) fn ease_tsunami_gauges(
    event: &ActiveEvent,
    now: f64,
    dt: f64,
    runtime: &mut StationRuntime,
    constants: &Constants,
    dirty: &mut DirtySet,
) {
    if !event.is_alerting() || !event.tsunami_risk {
        return;
    }
    let Some(alert_time) = event.alert_time else {
        return;
    };
    let since_alert = now - alert_time;
    if since_alert < constants.tsunami_wave_start_s || since_alert >= constants.tsunami_wave_end_s {
        return;
    }
    let alpha = 1.0 - frame_normalized(1.0 - constants.tsunami_smoothing, dt, constants);
    for gauge in &event.tsunami_gauges {
        let current = runtime.live_of(&gauge.station_id);
        if current >= gauge.target {
            continue;
        }
        let eased = current + (gauge.target - current) * alpha;
        raise(runtime, &gauge.station_id, eased, dirty);
    }
}
