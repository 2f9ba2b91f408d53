use super::*;

const DT: f64 = 1.0 / 30.0;

fn tsunami_signal_time(h: &Harness) -> Option<f64> {
    h.signals().find_map(|s| match s.signal {
        Signal::TsunamiAlertIssued { .. } => Some(s.sim_time),
        _ => None,
    })
}

#[test]
fn offshore_megathrust_carries_tsunami_risk() {
    let mut h = Harness::deterministic();
    h.spawn(&[offshore_megathrust()]);
    let event = h.event(0);
    assert!(event.offshore);
    assert!(event.tsunami_risk);
    assert!(!event.tsunami_gauges.is_empty());
    assert!(event
        .tsunami_gauges
        .iter()
        .all(|g| g.distance_km < h.constants.tsunami_gauge_radius_km && g.target > 0.0));
}

#[test]
fn inland_or_deep_events_carry_no_risk() {
    let mut h = Harness::deterministic();
    h.spawn(&[
        main_shock_921(),
        spawn_at(OFFSHORE_EPICENTER, 8.2, 60.0, EventType::Main),
        spawn_at(OFFSHORE_EPICENTER, 6.5, 10.0, EventType::Main),
    ]);
    assert!(h.state.events.iter().all(|e| !e.tsunami_risk));
    assert!(h.state.events.iter().all(|e| e.tsunami_gauges.is_empty()));
}

#[test]
fn tsunami_alert_follows_randomized_delay() {
    let mut h = Harness::randomized();
    h.spawn(&[offshore_megathrust()]);
    let done = h.run_until(DT, 90.0, |s| s.events[0].tsunami_alerted);
    assert!(done, "tsunami never escalated");

    let event = h.event(0);
    assert!((8.0..10.0).contains(&event.tsunami_delay));
    let alert_time = event.alert_time.unwrap();
    let tsunami_time = tsunami_signal_time(&h).unwrap();
    let waited = tsunami_time - alert_time;
    assert!(waited >= event.tsunami_delay - 1e-9);
    assert!(waited < event.tsunami_delay + DT + 1e-9);
    assert!(h.state.alerts.tsunami);
}

#[test]
fn offshore_detection_uses_the_offshore_threshold() {
    let mut h = Harness::deterministic();
    h.spawn(&[offshore_megathrust()]);
    h.run_until(DT, 60.0, |s| s.events[0].first_trigger_time.is_some());
    let event = h.event(0);
    assert!(event.triggered_offshore > event.triggered_inland);
    let triggers = event.total_triggers();
    assert!(triggers > h.constants.offshore_trigger_threshold);
    assert!(triggers <= h.constants.inland_trigger_threshold);
}

#[test]
fn gauges_ease_toward_target_instead_of_jumping() {
    let mut h = Harness::deterministic();
    h.spawn(&[offshore_megathrust()]);
    h.run_until(DT, 60.0, |s| s.events[0].is_alerting());
    let alert_time = h.event(0).alert_time.unwrap();
    // The farthest gauge: no seismic wave reaches it for a while.
    let gauge = h
        .event(0)
        .tsunami_gauges
        .iter()
        .max_by(|a, b| a.distance_km.total_cmp(&b.distance_km))
        .cloned()
        .unwrap();

    h.run_for(alert_time + 2.5 - h.state.elapsed, DT);
    let mut previous = h.state.stations.live_of(&gauge.station_id);
    let mut increases = 0;
    for _ in 0..60 {
        h.step(DT);
        let live = h.state.stations.live_of(&gauge.station_id);
        if live > previous + 1e-12 {
            increases += 1;
            // A single frame only covers a fraction of the remaining gap.
            assert!(live < gauge.target);
        }
        previous = live;
    }
    assert!(increases > 0);
}

#[test]
fn easing_stops_after_wave_window() {
    let mut h = Harness::deterministic();
    h.spawn(&[offshore_megathrust()]);
    h.run_until(DT, 60.0, |s| s.events[0].is_alerting());
    let alert_time = h.event(0).alert_time.unwrap();
    // Past the window and past the last seismic arrival at any gauge.
    h.run_for(alert_time + 45.0 - h.state.elapsed, DT);

    let ids: Vec<StationId> = h
        .event(0)
        .tsunami_gauges
        .iter()
        .map(|g| g.station_id.clone())
        .collect();
    let before: Vec<f64> = ids.iter().map(|id| h.state.stations.live_of(id)).collect();
    h.run_for(5.0, DT);
    for (id, old) in ids.iter().zip(before) {
        assert!(h.state.stations.live_of(id) <= old + 1e-12);
    }
}
