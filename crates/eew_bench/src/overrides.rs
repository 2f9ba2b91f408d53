use anyhow::{bail, Result};
use eew_core::Constants;
use std::collections::HashMap;

const VALID_KEYS: &[&str] = &[
    "p_wave_speed_km_s",
    "s_wave_speed_km_s",
    "ash_speed_km_s",
    "live_decay",
    "p_trigger_intensity",
    "inland_trigger_threshold",
    "offshore_trigger_threshold",
    "processing_delay_min_s",
    "processing_delay_max_s",
    "alert_magnitude",
    "moderate_alert_magnitude",
    "moderate_alert_min_intensity",
    "tsunami_min_magnitude",
    "tsunami_max_depth_km",
    "tsunami_delay_min_s",
    "tsunami_delay_max_s",
    "tsunami_gauge_radius_km",
    "alarm_min_interval_s",
    "countdown_min_intensity",
    "countdown_size",
    "report_interval_s",
    "report_min_stations",
    "estimate_noise_floor",
    "simulation_ceiling_s",
];

pub fn apply_overrides(
    constants: &mut Constants,
    overrides: &HashMap<String, serde_json::Value>,
) -> Result<()> {
    for (key, value) in overrides {
        let slot = match key.as_str() {
            "inland_trigger_threshold" => {
                constants.inland_trigger_threshold = as_u32(key, value)?;
                continue;
            }
            "offshore_trigger_threshold" => {
                constants.offshore_trigger_threshold = as_u32(key, value)?;
                continue;
            }
            "countdown_size" => {
                constants.countdown_size = as_usize(key, value)?;
                continue;
            }
            "report_min_stations" => {
                constants.report_min_stations = as_usize(key, value)?;
                continue;
            }
            "p_wave_speed_km_s" => &mut constants.p_wave_speed_km_s,
            "s_wave_speed_km_s" => &mut constants.s_wave_speed_km_s,
            "ash_speed_km_s" => &mut constants.ash_speed_km_s,
            "live_decay" => &mut constants.live_decay,
            "p_trigger_intensity" => &mut constants.p_trigger_intensity,
            "processing_delay_min_s" => &mut constants.processing_delay_min_s,
            "processing_delay_max_s" => &mut constants.processing_delay_max_s,
            "alert_magnitude" => &mut constants.alert_magnitude,
            "moderate_alert_magnitude" => &mut constants.moderate_alert_magnitude,
            "moderate_alert_min_intensity" => &mut constants.moderate_alert_min_intensity,
            "tsunami_min_magnitude" => &mut constants.tsunami_min_magnitude,
            "tsunami_max_depth_km" => &mut constants.tsunami_max_depth_km,
            "tsunami_delay_min_s" => &mut constants.tsunami_delay_min_s,
            "tsunami_delay_max_s" => &mut constants.tsunami_delay_max_s,
            "tsunami_gauge_radius_km" => &mut constants.tsunami_gauge_radius_km,
            "alarm_min_interval_s" => &mut constants.alarm_min_interval_s,
            "countdown_min_intensity" => &mut constants.countdown_min_intensity,
            "report_interval_s" => &mut constants.report_interval_s,
            "estimate_noise_floor" => &mut constants.estimate_noise_floor,
            "simulation_ceiling_s" => &mut constants.simulation_ceiling_s,
            _ => bail!(
                "unknown override key '{key}'. Valid keys: {}",
                VALID_KEYS.join(", ")
            ),
        };
        *slot = as_f64(key, value)?;
    }
    Ok(())
}

fn as_f64(key: &str, value: &serde_json::Value) -> Result<f64> {
    value
        .as_f64()
        .ok_or_else(|| anyhow::anyhow!("override '{key}': expected a number, got {value}"))
}

fn as_u64(key: &str, value: &serde_json::Value) -> Result<u64> {
    value.as_u64().ok_or_else(|| {
        anyhow::anyhow!("override '{key}': expected a positive integer, got {value}")
    })
}

fn as_u32(key: &str, value: &serde_json::Value) -> Result<u32> {
    let val = as_u64(key, value)?;
    u32::try_from(val)
        .map_err(|_| anyhow::anyhow!("override '{key}': value {val} exceeds u32 range"))
}

fn as_usize(key: &str, value: &serde_json::Value) -> Result<usize> {
    let val = as_u64(key, value)?;
    usize::try_from(val)
        .map_err(|_| anyhow::anyhow!("override '{key}': value {val} exceeds usize range"))
}
