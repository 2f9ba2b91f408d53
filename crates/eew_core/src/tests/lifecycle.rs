use super::*;

#[test]
fn idle_state_ignores_ticks() {
    let mut h = Harness::deterministic();
    let frame = h.step(1.0).clone();
    assert_eq!(frame.status, SystemStatus::Idle);
    assert!(frame.stations.is_empty());
    assert!(h.state.elapsed.abs() < f64::EPSILON);
    assert_eq!(h.state.frame, 0);
}

#[test]
fn spawn_on_empty_network_is_a_no_op() {
    let mut h = Harness::deterministic();
    h.network = StationNetwork::default();
    h.spawn(&[main_shock_921()]);
    assert!(h.state.events.is_empty());
    assert_eq!(h.state.status, SimStatus::Idle);
    assert!(h.frames[0].signals.is_empty());
}

#[test]
fn spawn_starts_a_run_and_emits_signal() {
    let mut h = Harness::deterministic();
    h.spawn(&[main_shock_921()]);
    assert_eq!(h.state.status, SimStatus::Running);
    assert_eq!(h.state.system_status(), SystemStatus::Detecting);
    let event = h.event(0);
    assert_eq!(event.region_name, "Near Taichung");
    assert!(event.id.0.starts_with("EVT-"));
    assert!(matches!(
        h.frames[0].signals[0].signal,
        Signal::EventSpawned { .. }
    ));
}

#[test]
fn simulated_time_scales_with_speed() {
    let mut h = Harness::with_state(SimulationState::new(
        1,
        RunOptions {
            speed: 4.0,
            deterministic: true,
        },
    ));
    h.spawn(&[main_shock_921()]);
    h.step(0.5);
    assert!((h.state.elapsed - 2.0).abs() < 1e-12);
}

#[test]
fn negative_wall_time_does_not_rewind() {
    let mut h = Harness::deterministic();
    h.spawn(&[main_shock_921()]);
    h.step(1.0);
    h.step(-5.0);
    assert!((h.state.elapsed - 1.0).abs() < 1e-12);
}

#[test]
fn negative_speed_does_not_rewind() {
    let mut h = Harness::with_state(SimulationState::new(
        42,
        RunOptions {
            speed: -2.0,
            deterministic: true,
        },
    ));
    h.spawn(&[main_shock_921()]);
    h.step(1.0);
    assert_eq!(h.state.status, SimStatus::Running);
    assert!(h.state.elapsed.abs() < f64::EPSILON);
}

#[test]
fn delayed_event_waits_for_its_start_time() {
    let mut h = Harness::deterministic();
    let mut request = main_shock_921();
    request.delay_s = 5.0;
    h.spawn(&[request]);

    h.run_for(4.9, 0.1);
    assert!(h.frames.last().unwrap().wavefronts.is_empty());
    assert!(h.state.stations.peak.is_empty());

    h.run_for(1.0, 0.1);
    let wavefront = &h.frames.last().unwrap().wavefronts[0];
    assert!(wavefront.p_radius_km > wavefront.s_radius_km);
    assert!(wavefront.ash_radius_km.is_none());
}

#[test]
fn run_ends_after_ceiling_with_single_summary() {
    let mut h = Harness::deterministic();
    h.spawn(&[main_shock_921()]);
    h.run_for(400.0, 1.0);

    assert_eq!(h.state.status, SimStatus::Ended);
    assert!(h.state.elapsed > 300.0 && h.state.elapsed < 302.0);
    let last = h.frames.last().unwrap();
    assert_eq!(last.status, SystemStatus::Ended);
    assert!(last.main_countdowns.is_empty());
    assert!(last
        .signals
        .iter()
        .any(|s| matches!(s.signal, Signal::SimulationEnded)));
    match last.summary.as_ref().unwrap() {
        SimulationSummary::Single {
            magnitude,
            depth_km,
            max_intensity_class,
            ..
        } => {
            assert!((magnitude - 7.6).abs() < f64::EPSILON);
            assert!((depth_km - 8.0).abs() < f64::EPSILON);
            assert!(*max_intensity_class >= IntensityClass::SixLower);
        }
        other => panic!("expected single summary, got {other:?}"),
    }

    // Frozen afterwards.
    let elapsed = h.state.elapsed;
    h.step(1.0);
    assert!((h.state.elapsed - elapsed).abs() < f64::EPSILON);
}

#[test]
fn multi_event_summary_lists_every_event() {
    let mut h = Harness::deterministic();
    h.spawn(&[main_shock_921(), offshore_megathrust()]);
    h.run_for(301.0, 1.0);
    let summary = h.frames.last().unwrap().summary.clone().unwrap();
    let SimulationSummary::Multi { events, .. } = summary else {
        panic!("expected multi summary");
    };
    assert_eq!(events.len(), 2);
    assert!(events[1].tsunami_alerted);
    assert_eq!(events[0].phase, EventPhase::Alerting);
}

#[test]
fn summary_absent_without_events() {
    assert!(simulation_summary(&deterministic_state()).is_none());
}

#[test]
fn emergency_stop_keeps_state() {
    let mut h = Harness::deterministic();
    h.spawn(&[main_shock_921()]);
    h.run_for(20.0, 0.1);
    let reports = h.state.reports.len();
    stop(&mut h.state);

    assert_eq!(h.state.system_status(), SystemStatus::Ended);
    assert_eq!(h.state.events.len(), 1);
    assert!(!h.state.stations.peak.is_empty());
    h.step(1.0);
    assert_eq!(h.state.reports.len(), reports);
}

#[test]
fn spawning_after_stop_starts_a_fresh_run() {
    let mut h = Harness::deterministic();
    h.spawn(&[main_shock_921()]);
    h.run_for(20.0, 0.1);
    stop(&mut h.state);
    h.spawn(&[offshore_megathrust()]);

    assert_eq!(h.state.status, SimStatus::Running);
    assert_eq!(h.state.events.len(), 1);
    assert!(h.state.elapsed.abs() < f64::EPSILON);
    assert!(h.state.reports.is_empty());
    assert!(h.state.stations.peak.is_empty());
    assert!(!h.state.alerts.any());
}

#[test]
fn reset_equals_fresh_start() {
    let mut h = Harness::randomized();
    h.spawn(&[main_shock_921(), offshore_megathrust()]);
    h.run_for(45.0, 1.0 / 30.0);
    reset(&mut h.state);

    let fresh = base_state();
    assert_eq!(
        serde_json::to_value(&h.state).unwrap(),
        serde_json::to_value(&fresh).unwrap()
    );
}

#[test]
fn same_seed_same_run() {
    let run = || {
        let mut h = Harness::randomized();
        h.spawn(&[main_shock_921()]);
        h.run_for(30.0, 1.0 / 30.0);
        let signals: Vec<SignalEnvelope> = h.signals().cloned().collect();
        (h.state.reports.clone(), signals)
    };
    let (reports_a, signals_a) = run();
    let (reports_b, signals_b) = run();
    assert_eq!(reports_a, reports_b);
    assert_eq!(signals_a, signals_b);
}

#[test]
fn system_status_follows_most_advanced_event() {
    let mut h = Harness::deterministic();
    h.spawn(&[main_shock_921()]);
    let mut seen = vec![h.state.system_status()];
    for _ in 0..600 {
        let status = h.step(1.0 / 30.0).status;
        if seen.last() != Some(&status) {
            seen.push(status);
        }
    }
    assert_eq!(
        seen,
        vec![
            SystemStatus::Detecting,
            SystemStatus::Computing,
            SystemStatus::Alerting
        ]
    );
}

#[test]
fn station_readout_uses_strongest_event() {
    let mut h = Harness::deterministic();
    h.spawn(&[
        main_shock_921(),
        spawn_at(GeoPoint::new(24.3, 121.6), 5.0, 10.0, EventType::Aftershock),
    ]);
    let id = StationId("CITY-TAIPEI".to_string());
    let readout = station_readout(&h.state, &id).unwrap();
    assert_eq!(readout.event_id, h.event(0).id);
    assert!(readout.p_time < readout.s_time);
    assert!(readout.pga_gal > 0.0 && readout.pgv_cm_s > 0.0);
    assert_eq!(readout.class, attenuation::to_discrete_scale(readout.max_intensity));
    assert!(station_readout(&h.state, &StationId("nope".to_string())).is_none());
}
