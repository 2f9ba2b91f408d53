use rand::Rng;

use crate::alerting::{advance_phase, AlertContext};
use crate::arrivals::{advance_cursors, decay_live, ease_tsunami_gauges, DirtySet};
use crate::attenuation::{
    estimate_peak_acceleration, estimate_peak_velocity, intensity_gear, to_discrete_scale,
    tsunami_height,
};
use crate::geo::{distance_km, is_offshore};
use crate::id::new_event_id;
use crate::network::StationNetwork;
use crate::{
    countdown, estimate, impact, ActiveEvent, AlarmState, AlertFlags, Constants,
    Counters, EventId, EventPhase, EventSummary, EventType, FrameDelta, MetaState, RunOptions,
    Signal, SignalEnvelope, SimStatus, SimulationState, SimulationSummary, SpawnRequest,
    StationDelta, StationId, StationReadout, StationRuntime, StationType, SystemStatus,
    TsunamiGauge, Wavefront,
};

impl SimulationState {
    pub fn new(seed: u64, options: RunOptions) -> Self {
        Self {
            meta: MetaState { seed, options },
            status: SimStatus::Idle,
            elapsed: 0.0,
            frame: 0,
            events: Vec::new(),
            stations: StationRuntime::default(),
            reports: Vec::new(),
            estimate: None,
            alerts: AlertFlags::default(),
            alarm: AlarmState::default(),
            audio_gear: 0,
            max_peak: 0.0,
            last_report_time: 0.0,
            counters: Counters::default(),
        }
    }

    pub fn system_status(&self) -> SystemStatus {
        match self.status {
            SimStatus::Idle => SystemStatus::Idle,
            SimStatus::Ended => SystemStatus::Ended,
            SimStatus::Running => self
                .events
                .iter()
                .map(|event| match event.phase {
                    EventPhase::Alerting => SystemStatus::Alerting,
                    EventPhase::Computing => SystemStatus::Computing,
                    EventPhase::Detecting | EventPhase::Dismissed => SystemStatus::Detecting,
                })
                .max()
                .unwrap_or(SystemStatus::Detecting),
        }
    }
}

/// Advance the simulation by `real_elapsed` wall-clock seconds.
///
/// Order of operations:
/// 1. Register spawn requests (the first one on an idle or ended run starts a new run).
/// 2. Advance the clock by `real_elapsed × speed`.
/// 3. Decay live intensities.
/// 4. Per event, in registration order: wavefronts, arrival cursors, phase
///    transitions, tsunami gauges.
/// 5. Countdown boards, audio gear, throttled EEW report.
/// 6. End the run past the simulation ceiling.
pub fn tick(
    state: &mut SimulationState,
    spawns: &[SpawnRequest],
    network: &StationNetwork,
    constants: &Constants,
    rng: &mut impl Rng,
    real_elapsed: f64,
) -> FrameDelta {
    let mut signals = Vec::new();
    for request in spawns {
        spawn(state, request, network, constants, rng, &mut signals);
    }

    if state.status != SimStatus::Running {
        let mut frame = FrameDelta::empty(state.elapsed, state.system_status(), state.alerts);
        frame.signals = signals;
        return frame;
    }

    let dt = real_elapsed.max(0.0) * state.meta.options.clock_rate();
    state.elapsed += dt;
    state.frame += 1;
    let now = state.elapsed;

    let mut dirty = DirtySet::new();
    decay_live(&mut state.stations, network, dt, constants, &mut dirty);
    let wavefronts = advance_events(state, now, dt, constants, &mut dirty, &mut signals);

    let (main_countdowns, secondary_countdowns) = countdown::build(&state.events, now, constants);
    update_gear(state, constants, &mut signals);

    let mut new_reports = Vec::new();
    if let Some(report) = estimate::maybe_report(state, network, constants, rng) {
        signals.push(crate::emit(
            &mut state.counters,
            now,
            Signal::ReportIssued {
                report_num: report.report_num,
            },
        ));
        new_reports.push(report);
    }

    let mut frame = FrameDelta::empty(now, state.system_status(), state.alerts);
    frame.stations = dirty
        .into_iter()
        .map(|id| StationDelta {
            peak: state.stations.peak_of(&id),
            live: state.stations.live_of(&id),
            ashed: state.stations.ashed.contains(&id),
            id,
        })
        .collect();
    frame.wavefronts = wavefronts;
    frame.main_countdowns = main_countdowns;
    frame.secondary_countdowns = secondary_countdowns;
    frame.new_reports = new_reports;

    if now > constants.simulation_ceiling_s {
        state.status = SimStatus::Ended;
        signals.push(crate::emit(&mut state.counters, now, Signal::SimulationEnded));
        frame.status = SystemStatus::Ended;
        frame.main_countdowns.clear();
        frame.secondary_countdowns.clear();
        frame.summary = simulation_summary(state);
    }

    frame.signals = signals;
    frame
}

fn advance_events(
    state: &mut SimulationState,
    now: f64,
    dt: f64,
    constants: &Constants,
    dirty: &mut DirtySet,
    signals: &mut Vec<SignalEnvelope>,
) -> Vec<Wavefront> {
    let SimulationState {
        events,
        stations,
        alerts,
        alarm,
        counters,
        ..
    } = state;
    let mut ctx = AlertContext {
        alerts,
        alarm,
        counters,
        signals,
    };
    let mut wavefronts = Vec::with_capacity(events.len());

    for event in events.iter_mut() {
        let event_elapsed = now - event.start_time;
        if event_elapsed < 0.0 {
            continue;
        }
        wavefronts.push(Wavefront {
            event_id: event.id.clone(),
            event_type: event.event_type,
            p_radius_km: event_elapsed * constants.p_wave_speed_km_s,
            s_radius_km: event_elapsed * constants.s_wave_speed_km_s,
            ash_radius_km: (event.event_type == EventType::Volcano)
                .then(|| event_elapsed * constants.ash_speed_km_s),
        });

        advance_cursors(event, event_elapsed, stations, constants, dirty);
        advance_phase(event, now, constants, &mut ctx);
        ease_tsunami_gauges(event, now, dt, stations, constants, dirty);
    }
    wavefronts
}

fn update_gear(
    state: &mut SimulationState,
    constants: &Constants,
    signals: &mut Vec<SignalEnvelope>,
) {
    if state.stations.peak.is_empty() {
        return;
    }
    let max_peak = state
        .stations
        .peak
        .values()
        .copied()
        .fold(state.max_peak, f64::max);
    state.max_peak = max_peak;
    let gear = intensity_gear(max_peak, &constants.gear_thresholds);
    if gear > state.audio_gear {
        state.audio_gear = gear;
        signals.push(crate::emit(
            &mut state.counters,
            state.elapsed,
            Signal::IntensityGear { gear },
        ));
    }
}

/// Register one event. A request on an idle or ended run starts a fresh run.
/// No-op when the network has no stations.
fn spawn(
    state: &mut SimulationState,
    request: &SpawnRequest,
    network: &StationNetwork,
    constants: &Constants,
    rng: &mut impl Rng,
    signals: &mut Vec<SignalEnvelope>,
) -> Option<EventId> {
    if network.is_empty() {
        return None;
    }
    if state.status != SimStatus::Running {
        clear_run(state);
        state.status = SimStatus::Running;
    }

    let deterministic = state.meta.options.deterministic;
    let epicenter = request.epicenter;
    let impacts = impact::compile(
        network.stations(),
        epicenter,
        request.magnitude,
        request.depth_km,
        request.event_type,
        constants,
        rng,
        deterministic,
    );
    let major_indices = impacts
        .iter()
        .enumerate()
        .filter(|(_, i)| i.station.is_major)
        .map(|(index, _)| index)
        .collect();
    let arrival_order = impact::arrival_order(&impacts);

    let offshore = is_offshore(epicenter.lat, epicenter.lng);
    let tsunami_risk = request.magnitude >= constants.tsunami_min_magnitude
        && request.depth_km < constants.tsunami_max_depth_km
        && offshore;
    let tsunami_gauges = if tsunami_risk {
        gauges_near(request, network, constants)
    } else {
        Vec::new()
    };

    let processing_delay = draw_delay(
        rng,
        deterministic,
        constants.processing_delay_min_s,
        constants.processing_delay_max_s,
    );
    let tsunami_delay = draw_delay(
        rng,
        deterministic,
        constants.tsunami_delay_min_s,
        constants.tsunami_delay_max_s,
    );
    let id = new_event_id(rng);
    let start_time = state.elapsed + request.delay_s.max(0.0);

    state.events.push(ActiveEvent {
        id: id.clone(),
        event_type: request.event_type,
        magnitude: request.magnitude,
        depth_km: request.depth_km,
        epicenter,
        region_name: network.region_name(epicenter.lat, epicenter.lng),
        start_time,
        impacts,
        major_indices,
        tsunami_gauges,
        arrival_order,
        next_p_index: 0,
        next_s_index: 0,
        next_ash_index: 0,
        triggered_inland: 0,
        triggered_offshore: 0,
        first_trigger_time: None,
        processing_delay,
        max_local_intensity: 0.0,
        phase: EventPhase::Detecting,
        alert_time: None,
        offshore,
        tsunami_risk,
        tsunami_alerted: false,
        tsunami_delay,
    });
    signals.push(crate::emit(
        &mut state.counters,
        state.elapsed,
        Signal::EventSpawned {
            event_id: id.clone(),
            event_type: request.event_type,
            start_time,
        },
    ));
    Some(id)
}

fn gauges_near(
    request: &SpawnRequest,
    network: &StationNetwork,
    constants: &Constants,
) -> Vec<TsunamiGauge> {
    let epicenter = request.epicenter;
    network
        .of_type(StationType::Tsunami)
        .filter_map(|station| {
            let distance = distance_km(epicenter.lat, epicenter.lng, station.lat, station.lng);
            (distance < constants.tsunami_gauge_radius_km).then(|| TsunamiGauge {
                station_id: station.id.clone(),
                distance_km: distance,
                target: tsunami_height(request.magnitude, distance, request.depth_km)
                    * constants.tsunami_visual_scale,
            })
        })
        .collect()
}

fn draw_delay(rng: &mut impl Rng, deterministic: bool, min: f64, max: f64) -> f64 {
    if deterministic || max <= min {
        (min + max) / 2.0
    } else {
        rng.gen_range(min..max)
    }
}

/// Clears everything a run accumulates; keeps seed, options and id counters.
fn clear_run(state: &mut SimulationState) {
    state.elapsed = 0.0;
    state.frame = 0;
    state.events.clear();
    state.stations.clear();
    state.reports.clear();
    state.estimate = None;
    state.alerts = AlertFlags::default();
    state.alarm = AlarmState::default();
    state.audio_gear = 0;
    state.max_peak = 0.0;
    state.last_report_time = 0.0;
}

/// Emergency stop: freezes the run. Events, station state and reports are kept.
pub fn stop(state: &mut SimulationState) {
    if state.status == SimStatus::Running {
        state.status = SimStatus::Ended;
    }
}

/// Discards the run entirely. The result is indistinguishable from a fresh state.
pub fn reset(state: &mut SimulationState) {
    *state = SimulationState::new(state.meta.seed, state.meta.options);
}

/// End-of-run summary, or `None` when no event was ever registered.
pub fn simulation_summary(state: &SimulationState) -> Option<SimulationSummary> {
    let max_intensity_class = to_discrete_scale(
        state
            .stations
            .peak
            .values()
            .copied()
            .fold(0.0, f64::max),
    );
    match state.events.as_slice() {
        [] => None,
        [event] => Some(SimulationSummary::Single {
            magnitude: event.magnitude,
            depth_km: event.depth_km,
            epicenter: event.epicenter,
            max_intensity_class,
        }),
        events => Some(SimulationSummary::Multi {
            events: events
                .iter()
                .map(|event| EventSummary {
                    id: event.id.clone(),
                    event_type: event.event_type,
                    magnitude: event.magnitude,
                    depth_km: event.depth_km,
                    epicenter: event.epicenter,
                    region_name: event.region_name.clone(),
                    phase: event.phase,
                    tsunami_alerted: event.tsunami_alerted,
                    max_local_intensity: event.max_local_intensity,
                })
                .collect(),
            max_intensity_class,
        }),
    }
}

/// Readout for one station against the event that shakes it hardest.
pub fn station_readout(state: &SimulationState, station_id: &StationId) -> Option<StationReadout> {
    state
        .events
        .iter()
        .filter_map(|event| {
            event
                .impacts
                .iter()
                .find(|impact| &impact.station.id == station_id)
                .map(|impact| (event, impact))
        })
        .max_by(|a, b| a.1.s_intensity.total_cmp(&b.1.s_intensity))
        .map(|(event, impact)| StationReadout {
            station_id: station_id.clone(),
            event_id: event.id.clone(),
            distance_km: impact.distance_km,
            p_time: impact.p_time,
            s_time: impact.s_time,
            max_intensity: impact.s_intensity,
            class: to_discrete_scale(impact.s_intensity),
            pga_gal: estimate_peak_acceleration(impact.s_intensity),
            pgv_cm_s: estimate_peak_velocity(impact.s_intensity),
        })
}
