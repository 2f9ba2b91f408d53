use crate::run_result::{self, RunResult, SummaryMetrics};
use crate::scenario::Scenario;
use anyhow::{Context, Result};
use eew_core::{
    compute_metrics, simulation_summary, station_readout, stop, tick, EewContent,
    MetricsFileWriter, MetricsSnapshot, RunOptions, SignalEnvelope, SimStatus, SimulationState,
    StationNetwork,
};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Instant;
use uuid::Uuid;

pub struct SeedResult {
    pub seed: u64,
    pub final_snapshot: MetricsSnapshot,
    pub alert_latency_s: Option<f64>,
    pub mean_major_lead_time_s: Option<f64>,
    pub missed_alert: bool,
    #[allow(dead_code)]
    pub wall_time_ms: u64,
    pub run_id: String,
}

/// Per-kind signal counts with first and last simulated times.
#[derive(Debug, Default)]
struct SignalTimeline {
    counts: BTreeMap<String, u64>,
    first: BTreeMap<String, f64>,
    last: BTreeMap<String, f64>,
}

impl SignalTimeline {
    fn record(&mut self, signals: &[SignalEnvelope]) {
        for envelope in signals {
            let kind = envelope.signal.kind();
            *self.counts.entry(kind.to_string()).or_default() += 1;
            self.first
                .entry(kind.to_string())
                .or_insert(envelope.sim_time);
            self.last.insert(kind.to_string(), envelope.sim_time);
        }
    }
}

/// Seconds between the earliest rupture and the first alert.
fn alert_latency(state: &SimulationState, first_alert: Option<f64>) -> Option<f64> {
    let first_rupture = state
        .events
        .iter()
        .map(|e| e.start_time)
        .min_by(f64::total_cmp)?;
    first_alert.map(|alert| alert - first_rupture)
}

/// Mean warning time at major stations shaken above the countdown floor.
/// Negative values mean the S wave arrived before the alert.
fn mean_major_lead_time(
    state: &SimulationState,
    network: &StationNetwork,
    content: &EewContent,
    first_alert: Option<f64>,
) -> Option<f64> {
    let alert = first_alert?;
    let leads: Vec<f64> = network
        .stations()
        .iter()
        .filter(|s| s.is_major)
        .filter_map(|s| station_readout(state, &s.id))
        .filter(|r| r.max_intensity >= content.constants.countdown_min_intensity)
        .filter_map(|r| {
            let event = state.events.iter().find(|e| e.id == r.event_id)?;
            Some(event.start_time + r.s_time - alert)
        })
        .collect();
    if leads.is_empty() {
        None
    } else {
        Some(leads.iter().sum::<f64>() / leads.len() as f64)
    }
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("writing {}", path.display()))
}

/// Tick until the run ends, stops early or the source has nothing to start.
fn drive(
    scenario: &Scenario,
    content: &EewContent,
    network: &StationNetwork,
    state: &mut SimulationState,
    metrics_writer: &mut MetricsFileWriter,
) -> Result<SignalTimeline> {
    let mut rng = ChaCha8Rng::seed_from_u64(state.meta.seed);
    let mut source = scenario.events.source();
    let mut timeline = SignalTimeline::default();
    let dt = 1.0 / scenario.fps;
    let mut real_elapsed = 0.0;
    loop {
        let spawns = source.next_spawns(state, network, &mut rng);
        let frame = tick(
            state,
            &spawns,
            network,
            &content.constants,
            &mut rng,
            real_elapsed,
        );
        real_elapsed = dt;
        timeline.record(&frame.signals);

        if state.frame % scenario.metrics_every == 0 {
            metrics_writer
                .write_row(&compute_metrics(state))
                .context("writing metrics row")?;
        }
        if state.status == SimStatus::Ended
            || (state.status == SimStatus::Idle && source.is_finished())
        {
            return Ok(timeline);
        }
        if scenario.duration_s.is_some_and(|limit| state.elapsed >= limit) {
            stop(state);
            return Ok(timeline);
        }
    }
}

pub fn run_seed(
    content: &EewContent,
    scenario: &Scenario,
    seed: u64,
    seed_dir: &Path,
    scenario_params: &serde_json::Value,
) -> Result<SeedResult> {
    let run_id = Uuid::new_v4().to_string();
    let start = Instant::now();

    let network = eew_world::build_network(content, seed);
    let mut state = SimulationState::new(
        seed,
        RunOptions {
            speed: scenario.speed,
            deterministic: scenario.deterministic,
        },
    );
    std::fs::create_dir_all(seed_dir)
        .with_context(|| format!("creating seed directory: {}", seed_dir.display()))?;

    eew_world::write_run_info(
        seed_dir,
        &format!("seed_{seed}"),
        seed,
        &content.content_version,
        scenario.metrics_every,
        serde_json::json!({
            "runner": "eew_bench",
            "scenario": scenario.name,
        }),
    )?;

    let mut metrics_writer = MetricsFileWriter::new(seed_dir.to_path_buf())
        .with_context(|| format!("opening metrics CSV in {}", seed_dir.display()))?;

    let timeline = drive(scenario, content, &network, &mut state, &mut metrics_writer)?;

    // Always capture final snapshot
    let final_snapshot = compute_metrics(&state);
    if state.frame % scenario.metrics_every != 0 {
        metrics_writer
            .write_row(&final_snapshot)
            .context("writing final metrics row")?;
    }
    metrics_writer.flush().context("flushing metrics")?;

    write_json(&seed_dir.join("reports.json"), &state.reports)?;
    write_json(&seed_dir.join("summary.json"), &simulation_summary(&state))?;

    #[allow(clippy::cast_possible_truncation)]
    let wall_time_ms = start.elapsed().as_millis() as u64;
    let sim_frames_per_second = if wall_time_ms > 0 {
        (state.frame as f64) / (wall_time_ms as f64 / 1000.0)
    } else {
        0.0
    };

    let first_alert = timeline.first.get("alert_issued").copied();
    let alert_latency_s = alert_latency(&state, first_alert);
    let mean_major_lead_time_s = mean_major_lead_time(&state, &network, content, first_alert);
    let (missed_alert, missed_alert_reason) = run_result::detect_missed_alert(&final_snapshot);
    if missed_alert {
        tracing::warn!(seed, reason = ?missed_alert_reason, "missed alert");
    }

    let run_result = RunResult {
        run_schema_version: 1,
        run_status: "completed".to_string(),
        run_id: run_id.clone(),
        git_sha: run_result::git_sha(),
        git_dirty: run_result::git_dirty(),
        seed,
        scenario_name: scenario.name.clone(),
        scenario_params: scenario_params.clone(),
        station_count: network.len(),
        frame_end: state.frame,
        sim_time_end: state.elapsed,
        wall_time_ms,
        sim_frames_per_second,
        summary_metrics: Some(SummaryMetrics::from_snapshot(
            &final_snapshot,
            alert_latency_s,
            mean_major_lead_time_s,
        )),
        signal_counts_by_kind: timeline.counts,
        signal_first_time_by_kind: timeline.first,
        signal_last_time_by_kind: timeline.last,
        missed_alert,
        missed_alert_reason,
        metrics_path: "metrics_000.csv".to_string(),
        reports_path: "reports.json".to_string(),
        summary_path: "summary.json".to_string(),
        error_message: None,
    };

    run_result
        .write_atomic(&seed_dir.join("run_result.json"))
        .context("writing run_result.json")?;

    Ok(SeedResult {
        seed,
        final_snapshot,
        alert_latency_s,
        mean_major_lead_time_s,
        missed_alert,
        wall_time_ms,
        run_id,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scenario::SeedSpec;
    use eew_control::{Preset, ScenarioDef};
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn chichi_scenario(duration_s: f64) -> Scenario {
        Scenario {
            name: "test_scenario".to_string(),
            seeds: SeedSpec::List(vec![42]),
            events: ScenarioDef::Preset {
                preset: Preset::Chichi,
            },
            fps: 20.0,
            speed: 1.0,
            deterministic: true,
            duration_s: Some(duration_s),
            metrics_every: 20,
            content_dir: "../../content".to_string(),
            overrides: HashMap::new(),
        }
    }

    #[test]
    fn test_run_seed_produces_output() {
        let content = eew_world::load_content("../../content").unwrap();
        let temp_dir = TempDir::new().unwrap();
        let seed_dir = temp_dir.path().join("seed_42");
        let params = serde_json::json!({"fps": 20.0});

        let result = run_seed(&content, &chichi_scenario(30.0), 42, &seed_dir, &params).unwrap();

        assert_eq!(result.seed, 42);
        assert!(result.final_snapshot.sim_time >= 30.0);
        assert!(!result.run_id.is_empty());
        assert!(!result.missed_alert);
        let latency = result.alert_latency_s.unwrap();
        assert!(latency > 0.0 && latency < 15.0, "latency {latency}");
        for file in [
            "run_info.json",
            "metrics_000.csv",
            "reports.json",
            "summary.json",
            "run_result.json",
        ] {
            assert!(seed_dir.join(file).exists(), "missing {file}");
        }

        // Verify run_result.json content
        let content_str = std::fs::read_to_string(seed_dir.join("run_result.json")).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&content_str).unwrap();
        assert_eq!(parsed["run_schema_version"], 1);
        assert_eq!(parsed["run_status"], "completed");
        assert_eq!(parsed["seed"], 42);
        assert_eq!(parsed["signal_counts_by_kind"]["event_spawned"], 1);
        assert_eq!(parsed["signal_counts_by_kind"]["alert_issued"], 1);
        assert!(parsed["summary_metrics"].is_object());
    }

    #[test]
    fn test_run_seed_determinism() {
        let content = eew_world::load_content("../../content").unwrap();
        let dir1 = TempDir::new().unwrap();
        let dir2 = TempDir::new().unwrap();
        let params = serde_json::json!({});
        let scenario = chichi_scenario(20.0);

        let result1 =
            run_seed(&content, &scenario, 7, &dir1.path().join("seed_7"), &params).unwrap();
        let result2 =
            run_seed(&content, &scenario, 7, &dir2.path().join("seed_7"), &params).unwrap();

        assert_eq!(result1.final_snapshot.frame, result2.final_snapshot.frame);
        assert_eq!(
            result1.final_snapshot.report_count,
            result2.final_snapshot.report_count
        );
        assert_eq!(
            result1.final_snapshot.triggered_stations,
            result2.final_snapshot.triggered_stations
        );
        assert_eq!(result1.alert_latency_s, result2.alert_latency_s);
    }

    #[test]
    fn test_signal_timeline_keeps_first_and_last() {
        let gear = |id: &str, sim_time: f64| SignalEnvelope {
            id: eew_core::SignalId(id.to_string()),
            sim_time,
            signal: eew_core::Signal::IntensityGear { gear: 2 },
        };
        let mut timeline = SignalTimeline::default();
        timeline.record(&[gear("sig_000001", 1.0), gear("sig_000002", 4.0)]);

        assert_eq!(timeline.counts["intensity_gear"], 2);
        assert!((timeline.first["intensity_gear"] - 1.0).abs() < f64::EPSILON);
        assert!((timeline.last["intensity_gear"] - 4.0).abs() < f64::EPSILON);
        assert!(!timeline.counts.contains_key("alert_issued"));
    }
}
