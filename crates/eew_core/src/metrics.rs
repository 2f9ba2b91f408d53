//! Snapshot metrics computed from `SimulationState`.
//!
//! A single `compute_metrics(&SimulationState) -> MetricsSnapshot` function
//! samples the current state for time-series analysis. No state mutation, no IO.

use crate::attenuation::estimate_peak_acceleration;
use crate::{EventPhase, SimulationState};
use serde::Serialize;
use std::io::Write;

/// Current schema version. Bump when fields are added/removed/reordered.
const METRICS_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize)]
pub struct MetricsSnapshot {
    pub sim_time: f64,
    pub frame: u64,
    pub metrics_version: u32,

    // Network response
    pub triggered_stations: u32,
    pub live_stations: u32,
    pub ashed_stations: u32,
    /// Trigger counters of the first registered event.
    pub primary_inland_triggers: u32,
    pub primary_offshore_triggers: u32,
    pub max_peak_intensity: f64,
    pub max_pga_gal: f64,

    // Event phases
    pub events_total: u32,
    pub events_detecting: u32,
    pub events_computing: u32,
    pub events_alerting: u32,
    pub events_dismissed: u32,
    pub events_tsunami_alerted: u32,

    // Alerts
    pub alert_main: bool,
    pub alert_tsunami: bool,
    pub alert_volcano: bool,
    pub audio_gear: u8,

    // Estimation
    pub report_count: u32,
    pub estimated_magnitude: f64,
    pub estimated_depth_km: f64,
}

fn count(n: usize) -> u32 {
    u32::try_from(n).unwrap_or(u32::MAX)
}

pub fn compute_metrics(state: &SimulationState) -> MetricsSnapshot {
    let max_peak = state.stations.peak.values().copied().fold(0.0, f64::max);
    let by_phase =
        |phase: EventPhase| count(state.events.iter().filter(|e| e.phase == phase).count());
    let primary = state.events.first();
    let (estimated_magnitude, estimated_depth_km) = state
        .estimate
        .as_ref()
        .map_or((0.0, 0.0), |e| (e.magnitude, e.depth_km));

    MetricsSnapshot {
        sim_time: state.elapsed,
        frame: state.frame,
        metrics_version: METRICS_VERSION,
        triggered_stations: count(state.stations.peak.len()),
        live_stations: count(state.stations.live.len()),
        ashed_stations: count(state.stations.ashed.len()),
        primary_inland_triggers: primary.map_or(0, |e| e.triggered_inland),
        primary_offshore_triggers: primary.map_or(0, |e| e.triggered_offshore),
        max_peak_intensity: max_peak,
        max_pga_gal: if max_peak > 0.0 {
            estimate_peak_acceleration(max_peak)
        } else {
            0.0
        },
        events_total: count(state.events.len()),
        events_detecting: by_phase(EventPhase::Detecting),
        events_computing: by_phase(EventPhase::Computing),
        events_alerting: by_phase(EventPhase::Alerting),
        events_dismissed: by_phase(EventPhase::Dismissed),
        events_tsunami_alerted: count(state.events.iter().filter(|e| e.tsunami_alerted).count()),
        alert_main: state.alerts.main,
        alert_tsunami: state.alerts.tsunami,
        alert_volcano: state.alerts.volcano,
        audio_gear: state.audio_gear,
        report_count: count(state.reports.len()),
        estimated_magnitude,
        estimated_depth_km,
    }
}

/// Write the CSV header row for metrics.
pub fn write_metrics_header(writer: &mut impl std::io::Write) -> std::io::Result<()> {
    writeln!(
        writer,
        "sim_time,frame,metrics_version,\
         triggered_stations,live_stations,ashed_stations,\
         primary_inland_triggers,primary_offshore_triggers,max_peak_intensity,max_pga_gal,\
         events_total,events_detecting,events_computing,events_alerting,events_dismissed,\
         events_tsunami_alerted,\
         alert_main,alert_tsunami,alert_volcano,audio_gear,\
         report_count,estimated_magnitude,estimated_depth_km"
    )
}

/// Append a single metrics snapshot as a CSV row.
pub fn append_metrics_row(
    writer: &mut impl std::io::Write,
    snapshot: &MetricsSnapshot,
) -> std::io::Result<()> {
    writeln!(
        writer,
        "{:.3},{},{},{},{},{},{},{},{:.3},{:.2},{},{},{},{},{},{},{},{},{},{},{},{:.1},{:.2}",
        snapshot.sim_time,
        snapshot.frame,
        snapshot.metrics_version,
        snapshot.triggered_stations,
        snapshot.live_stations,
        snapshot.ashed_stations,
        snapshot.primary_inland_triggers,
        snapshot.primary_offshore_triggers,
        snapshot.max_peak_intensity,
        snapshot.max_pga_gal,
        snapshot.events_total,
        snapshot.events_detecting,
        snapshot.events_computing,
        snapshot.events_alerting,
        snapshot.events_dismissed,
        snapshot.events_tsunami_alerted,
        u8::from(snapshot.alert_main),
        u8::from(snapshot.alert_tsunami),
        u8::from(snapshot.alert_volcano),
        snapshot.audio_gear,
        snapshot.report_count,
        snapshot.estimated_magnitude,
        snapshot.estimated_depth_km,
    )
}

/// Maximum data rows per CSV file before rotating to a new file.
const MAX_ROWS_PER_FILE: usize = 50_000;

/// Rotating metrics CSV writer. Automatically splits into numbered files
/// (`metrics_000.csv`, `metrics_001.csv`, ...) after [`MAX_ROWS_PER_FILE`] rows each.
pub struct MetricsFileWriter {
    run_dir: std::path::PathBuf,
    file_index: u32,
    rows_in_current_file: usize,
    writer: std::io::BufWriter<std::fs::File>,
}

impl MetricsFileWriter {
    /// Create a new writer, opening the first CSV file with a header row.
    pub fn new(run_dir: std::path::PathBuf) -> std::io::Result<Self> {
        let writer = open_csv_file(&run_dir, 0)?;
        Ok(Self {
            run_dir,
            file_index: 0,
            rows_in_current_file: 0,
            writer,
        })
    }

    /// Append one snapshot row, rotating to a new file if the current one is full.
    pub fn write_row(&mut self, snapshot: &MetricsSnapshot) -> std::io::Result<()> {
        if self.rows_in_current_file >= MAX_ROWS_PER_FILE {
            self.writer.flush()?;
            self.file_index += 1;
            self.writer = open_csv_file(&self.run_dir, self.file_index)?;
            self.rows_in_current_file = 0;
        }
        append_metrics_row(&mut self.writer, snapshot)?;
        self.rows_in_current_file += 1;
        Ok(())
    }

    pub fn flush(&mut self) -> std::io::Result<()> {
        self.writer.flush()
    }
}

fn open_csv_file(
    run_dir: &std::path::Path,
    index: u32,
) -> std::io::Result<std::io::BufWriter<std::fs::File>> {
    let path = run_dir.join(format!("metrics_{index:03}.csv"));
    let file = std::fs::File::create(path)?;
    let mut writer = std::io::BufWriter::new(file);
    write_metrics_header(&mut writer)?;
    Ok(writer)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_fixtures::{
        base_constants, deterministic_state, make_rng, spawn_at, test_network, INLAND_EPICENTER,
    };
    use crate::{tick, EventType};

    #[test]
    fn fresh_state_is_all_zeros() {
        let snapshot = compute_metrics(&deterministic_state());
        assert_eq!(snapshot.triggered_stations, 0);
        assert_eq!(snapshot.events_total, 0);
        assert_eq!(snapshot.report_count, 0);
        assert!(snapshot.max_pga_gal.abs() < f64::EPSILON);
        assert!(!snapshot.alert_main);
    }

    #[test]
    fn snapshot_tracks_a_running_event() {
        let network = test_network();
        let constants = base_constants();
        let mut state = deterministic_state();
        let mut rng = make_rng();
        let spawn = spawn_at(INLAND_EPICENTER, 7.6, 8.0, EventType::Main);
        tick(&mut state, &[spawn], &network, &constants, &mut rng, 0.0);
        for _ in 0..300 {
            tick(&mut state, &[], &network, &constants, &mut rng, 0.1);
        }
        let snapshot = compute_metrics(&state);
        assert_eq!(snapshot.events_total, 1);
        assert_eq!(snapshot.events_alerting, 1);
        assert!(snapshot.triggered_stations > 15);
        assert!(snapshot.primary_inland_triggers > 15);
        assert!(snapshot.max_pga_gal > 0.0);
        assert!(snapshot.report_count > 0);
        assert!(snapshot.alert_main);
    }

    #[test]
    fn csv_header_and_rows_have_matching_columns() {
        let mut buf = Vec::new();
        write_metrics_header(&mut buf).unwrap();
        append_metrics_row(&mut buf, &compute_metrics(&deterministic_state())).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].split(',').count(), lines[1].split(',').count());
    }

    #[test]
    fn same_state_same_snapshot() {
        let a = compute_metrics(&deterministic_state());
        let b = compute_metrics(&deterministic_state());
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
    }
}
