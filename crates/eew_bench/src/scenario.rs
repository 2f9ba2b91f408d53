use anyhow::{bail, Context, Result};
use eew_control::ScenarioDef;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
pub struct Scenario {
    pub name: String,
    pub seeds: SeedSpec,
    /// What happens in each run: a preset or a spawn script.
    pub events: ScenarioDef,
    /// Frames per real second driven into `tick`.
    #[serde(default = "default_fps")]
    pub fps: f64,
    #[serde(default = "default_speed")]
    pub speed: f64,
    #[serde(default)]
    pub deterministic: bool,
    /// Stop early, in simulated seconds. Runs otherwise end at the ceiling.
    #[serde(default)]
    pub duration_s: Option<f64>,
    #[serde(default = "default_metrics_every")]
    pub metrics_every: u64,
    #[serde(default = "default_content_dir")]
    pub content_dir: String,
    #[serde(default)]
    pub overrides: HashMap<String, serde_json::Value>,
}

fn default_fps() -> f64 {
    20.0
}

fn default_speed() -> f64 {
    1.0
}

fn default_metrics_every() -> u64 {
    20
}

fn default_content_dir() -> String {
    "./content".to_string()
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SeedSpec {
    List(Vec<u64>),
    Range { range: [u64; 2] },
}

impl SeedSpec {
    pub fn expand(&self) -> Vec<u64> {
        match self {
            SeedSpec::List(seeds) => seeds.clone(),
            SeedSpec::Range { range } => (range[0]..=range[1]).collect(),
        }
    }
}

pub fn load_scenario(path: &Path) -> Result<Scenario> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading scenario file: {}", path.display()))?;
    let scenario: Scenario = serde_json::from_str(&json)
        .with_context(|| format!("parsing scenario file: {}", path.display()))?;
    if scenario.name.is_empty() {
        bail!("scenario 'name' must not be empty");
    }
    if scenario.fps <= 0.0 {
        bail!("scenario 'fps' must be > 0");
    }
    if scenario.speed <= 0.0 {
        bail!("scenario 'speed' must be > 0");
    }
    if scenario.metrics_every == 0 {
        bail!("scenario 'metrics_every' must be > 0");
    }
    if scenario.duration_s.is_some_and(|d| d <= 0.0) {
        bail!("scenario 'duration_s' must be > 0 when set");
    }
    let seeds = scenario.seeds.expand();
    if seeds.is_empty() {
        bail!("scenario 'seeds' must produce at least one seed");
    }
    Ok(scenario)
}
