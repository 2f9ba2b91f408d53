use crate::runner::SeedResult;
use serde::Serialize;

/// Metric name and how to read it from one seed. `None` leaves the seed out.
type Extractor = (&'static str, fn(&SeedResult) -> Option<f64>);

fn extractors() -> [Extractor; 13] {
    [
        ("alert_latency_s", |r| r.alert_latency_s),
        ("mean_major_lead_time_s", |r| r.mean_major_lead_time_s),
        ("max_peak_intensity", |r| {
            Some(r.final_snapshot.max_peak_intensity)
        }),
        ("max_pga_gal", |r| Some(r.final_snapshot.max_pga_gal)),
        ("triggered_stations", |r| {
            Some(f64::from(r.final_snapshot.triggered_stations))
        }),
        ("ashed_stations", |r| {
            Some(f64::from(r.final_snapshot.ashed_stations))
        }),
        ("events_total", |r| Some(f64::from(r.final_snapshot.events_total))),
        ("events_alerting", |r| {
            Some(f64::from(r.final_snapshot.events_alerting))
        }),
        ("events_dismissed", |r| {
            Some(f64::from(r.final_snapshot.events_dismissed))
        }),
        ("events_tsunami_alerted", |r| {
            Some(f64::from(r.final_snapshot.events_tsunami_alerted))
        }),
        ("report_count", |r| Some(f64::from(r.final_snapshot.report_count))),
        ("estimated_magnitude", |r| {
            (r.final_snapshot.report_count > 0).then_some(r.final_snapshot.estimated_magnitude)
        }),
        ("estimated_depth_km", |r| {
            (r.final_snapshot.report_count > 0).then_some(r.final_snapshot.estimated_depth_km)
        }),
    ]
}

#[derive(Debug, Serialize)]
pub struct SummaryStats {
    pub seed_count: usize,
    pub missed_alert_count: usize,
    pub metrics: Vec<MetricSummary>,
}

#[derive(Debug, Serialize)]
pub struct MetricSummary {
    pub name: String,
    /// Seeds that contributed a value.
    pub count: usize,
    pub mean: f64,
    pub min: f64,
    pub max: f64,
    pub stddev: f64,
}

pub fn compute_summary(results: &[&SeedResult]) -> SummaryStats {
    let metrics = extractors()
        .iter()
        .filter_map(|(name, extract)| {
            let values: Vec<f64> = results.iter().filter_map(|r| extract(r)).collect();
            compute_metric_summary(name, &values)
        })
        .collect();

    SummaryStats {
        seed_count: results.len(),
        missed_alert_count: results.iter().filter(|r| r.missed_alert).count(),
        metrics,
    }
}

fn compute_metric_summary(name: &str, values: &[f64]) -> Option<MetricSummary> {
    if values.is_empty() {
        return None;
    }
    let count = values.len() as f64;
    let mean = values.iter().sum::<f64>() / count;
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / count;
    let stddev = variance.sqrt();

    Some(MetricSummary {
        name: name.to_string(),
        count: values.len(),
        mean,
        min,
        max,
        stddev,
    })
}

/// Build aggregated metrics in the contract format:
/// `{ "key": { "mean": ..., "min": ..., "max": ..., "stddev": ... }, ... }`
pub fn build_aggregated_metrics(stats: &SummaryStats) -> serde_json::Value {
    let mut map = serde_json::Map::new();
    for summary in &stats.metrics {
        map.insert(
            summary.name.clone(),
            serde_json::json!({
                "mean": summary.mean,
                "min": summary.min,
                "max": summary.max,
                "stddev": summary.stddev,
            }),
        );
    }
    serde_json::Value::Object(map)
}

pub fn print_summary(scenario_name: &str, stats: &SummaryStats) {
    println!(
        "\n=== {} ({} seeds) ===\n",
        scenario_name, stats.seed_count
    );
    println!(
        "{:<26} {:>5} {:>9} {:>9} {:>9} {:>9}",
        "Metric", "N", "Mean", "Min", "Max", "StdDev"
    );
    println!("{}", "-".repeat(72));
    for metric in &stats.metrics {
        println!(
            "{:<26} {:>5} {:>9.2} {:>9.2} {:>9.2} {:>9.2}",
            metric.name, metric.count, metric.mean, metric.min, metric.max, metric.stddev
        );
    }
    println!(
        "{:<26} {}/{}",
        "missed_alert_rate", stats.missed_alert_count, stats.seed_count
    );
}
