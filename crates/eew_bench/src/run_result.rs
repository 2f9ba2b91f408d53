use eew_core::MetricsSnapshot;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Peak intensity at or above which a run without any alert counts as missed.
pub const MISSED_ALERT_INTENSITY: f64 = 4.5;

#[derive(Debug, Serialize)]
pub struct RunResult {
    pub run_schema_version: u32,
    pub run_status: String,
    pub run_id: String,
    pub git_sha: String,
    pub git_dirty: bool,
    pub seed: u64,
    pub scenario_name: String,
    pub scenario_params: serde_json::Value,
    pub station_count: usize,
    pub frame_end: u64,
    pub sim_time_end: f64,
    pub wall_time_ms: u64,
    pub sim_frames_per_second: f64,
    pub summary_metrics: Option<SummaryMetrics>,
    pub signal_counts_by_kind: BTreeMap<String, u64>,
    pub signal_first_time_by_kind: BTreeMap<String, f64>,
    pub signal_last_time_by_kind: BTreeMap<String, f64>,
    pub missed_alert: bool,
    pub missed_alert_reason: Option<String>,
    pub metrics_path: String,
    pub reports_path: String,
    pub summary_path: String,
    pub error_message: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SummaryMetrics {
    pub triggered_stations: u32,
    pub ashed_stations: u32,
    pub max_peak_intensity: f64,
    pub max_pga_gal: f64,
    pub events_total: u32,
    pub events_alerting: u32,
    pub events_dismissed: u32,
    pub events_tsunami_alerted: u32,
    pub report_count: u32,
    pub estimated_magnitude: f64,
    pub estimated_depth_km: f64,
    /// Seconds from the first rupture to the first alert.
    pub alert_latency_s: Option<f64>,
    /// Mean seconds of warning before S arrival at shaken major stations.
    pub mean_major_lead_time_s: Option<f64>,
}

impl SummaryMetrics {
    pub fn from_snapshot(
        snapshot: &MetricsSnapshot,
        alert_latency_s: Option<f64>,
        mean_major_lead_time_s: Option<f64>,
    ) -> Self {
        Self {
            triggered_stations: snapshot.triggered_stations,
            ashed_stations: snapshot.ashed_stations,
            max_peak_intensity: snapshot.max_peak_intensity,
            max_pga_gal: snapshot.max_pga_gal,
            events_total: snapshot.events_total,
            events_alerting: snapshot.events_alerting,
            events_dismissed: snapshot.events_dismissed,
            events_tsunami_alerted: snapshot.events_tsunami_alerted,
            report_count: snapshot.report_count,
            estimated_magnitude: snapshot.estimated_magnitude,
            estimated_depth_km: snapshot.estimated_depth_km,
            alert_latency_s,
            mean_major_lead_time_s,
        }
    }
}

impl RunResult {
    /// Write JSON atomically: write to `.tmp` then rename.
    pub fn write_atomic(&self, path: &Path) -> anyhow::Result<()> {
        let tmp_path = path.with_extension("json.tmp");
        let json = serde_json::to_string_pretty(self)?;
        let mut file = std::fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;
        std::fs::rename(&tmp_path, path)?;
        Ok(())
    }
}

/// Missed alert: the network saw strong shaking yet no event ever alerted.
pub fn detect_missed_alert(snapshot: &MetricsSnapshot) -> (bool, Option<String>) {
    let missed = snapshot.events_alerting == 0
        && snapshot.max_peak_intensity >= MISSED_ALERT_INTENSITY;
    if missed {
        (
            true,
            Some(format!(
                "peak {:.2} without alert",
                snapshot.max_peak_intensity
            )),
        )
    } else {
        (false, None)
    }
}

pub fn git_sha() -> String {
    env!("GIT_SHA").to_string()
}

pub fn git_dirty() -> bool {
    env!("GIT_DIRTY") == "true"
}
