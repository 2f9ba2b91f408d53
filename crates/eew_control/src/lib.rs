use eew_core::geo::is_offshore;
use eew_core::{
    EventType, GeoPoint, SimStatus, SimulationState, SpawnRequest, StationNetwork, StationType,
};
use rand::{Rng, RngCore};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Feeds spawn requests to the tick loop.
///
/// Called once per tick before `eew_core::tick`; whatever it returns is passed
/// straight through as that tick's spawns.
pub trait ScenarioSource {
    fn next_spawns(
        &mut self,
        state: &SimulationState,
        network: &StationNetwork,
        rng: &mut dyn RngCore,
    ) -> Vec<SpawnRequest>;

    /// True once the source will never emit again.
    fn is_finished(&self) -> bool;
}

/// Run-relative time the source compares its schedule against. Before the
/// first spawn the next run has not started, so its clock reads zero.
fn run_clock(state: &SimulationState) -> f64 {
    if state.status == SimStatus::Running {
        state.elapsed
    } else {
        0.0
    }
}

// ---------------------------------------------------------------------------
// Scripted scenarios
// ---------------------------------------------------------------------------

/// One spawn request, released once the run clock reaches `at_s`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledSpawn {
    pub at_s: f64,
    #[serde(flatten)]
    pub request: SpawnRequest,
}

/// Fixed spawn schedule. The earliest entry starts the run and later entries
/// are timed relative to it. Once the run it started is no longer running,
/// the rest of the schedule is dropped.
pub struct ScriptedScenario {
    pending: VecDeque<ScheduledSpawn>,
    /// `at_s` of the entry that started the run.
    origin: Option<f64>,
}

impl ScriptedScenario {
    pub fn new(mut spawns: Vec<ScheduledSpawn>) -> Self {
        spawns.sort_by(|a, b| a.at_s.total_cmp(&b.at_s));
        Self {
            pending: spawns.into(),
            origin: None,
        }
    }
}

impl ScenarioSource for ScriptedScenario {
    fn next_spawns(
        &mut self,
        state: &SimulationState,
        _network: &StationNetwork,
        _rng: &mut dyn RngCore,
    ) -> Vec<SpawnRequest> {
        let origin = match self.origin {
            Some(_) if state.status != SimStatus::Running => {
                self.pending.clear();
                return Vec::new();
            }
            Some(origin) => origin,
            None => match self.pending.front() {
                Some(first) => first.at_s,
                None => return Vec::new(),
            },
        };
        self.origin = Some(origin);
        let now = run_clock(state) + origin;
        let mut due = Vec::new();
        while self.pending.front().is_some_and(|next| next.at_s <= now) {
            if let Some(next) = self.pending.pop_front() {
                due.push(next.request);
            }
        }
        due
    }

    fn is_finished(&self) -> bool {
        self.pending.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Composite disaster
// ---------------------------------------------------------------------------

/// Seconds between the eruption and the offshore quake that follows it.
pub const COMPOSITE_FOLLOW_UP_S: f64 = 5.0;
const COMPOSITE_OFFSET_DEG: f64 = 1.0;

enum CompositeStage {
    Eruption,
    Quake { due_at: f64, epicenter: GeoPoint },
    Done,
}

/// Eruption at a random volcano station, then a shallow M8.2 quake displaced
/// one degree diagonally out to sea.
pub struct CompositeDisaster {
    stage: CompositeStage,
}

impl CompositeDisaster {
    pub fn new() -> Self {
        Self {
            stage: CompositeStage::Eruption,
        }
    }
}

impl Default for CompositeDisaster {
    fn default() -> Self {
        Self::new()
    }
}

/// First offshore point among the four diagonal displacements, starting from
/// a random one; falls back to the random one when all of them are on land.
fn offshore_displacement(origin: GeoPoint, rng: &mut dyn RngCore) -> GeoPoint {
    let diagonals = [(1.0, 1.0), (1.0, -1.0), (-1.0, 1.0), (-1.0, -1.0)];
    let start = rng.gen_range(0..diagonals.len());
    let candidates: Vec<GeoPoint> = (0..diagonals.len())
        .map(|i| {
            let (dlat, dlng) = diagonals[(start + i) % diagonals.len()];
            GeoPoint::new(
                origin.lat + dlat * COMPOSITE_OFFSET_DEG,
                origin.lng + dlng * COMPOSITE_OFFSET_DEG,
            )
        })
        .collect();
    candidates
        .iter()
        .copied()
        .find(|p| is_offshore(p.lat, p.lng))
        .unwrap_or(candidates[0])
}

impl ScenarioSource for CompositeDisaster {
    fn next_spawns(
        &mut self,
        state: &SimulationState,
        network: &StationNetwork,
        rng: &mut dyn RngCore,
    ) -> Vec<SpawnRequest> {
        match self.stage {
            CompositeStage::Eruption => {
                let volcanoes: Vec<GeoPoint> = network
                    .of_type(StationType::Volcano)
                    .map(|s| GeoPoint::new(s.lat, s.lng))
                    .collect();
                if volcanoes.is_empty() {
                    self.stage = CompositeStage::Done;
                    return Vec::new();
                }
                let vent = volcanoes[rng.gen_range(0..volcanoes.len())];
                self.stage = CompositeStage::Quake {
                    due_at: run_clock(state) + COMPOSITE_FOLLOW_UP_S,
                    epicenter: offshore_displacement(vent, rng),
                };
                vec![SpawnRequest {
                    epicenter: vent,
                    magnitude: 6.0,
                    depth_km: 1.0,
                    event_type: EventType::Volcano,
                    delay_s: 0.0,
                }]
            }
            CompositeStage::Quake { due_at, epicenter } => {
                if state.status != SimStatus::Running {
                    self.stage = CompositeStage::Done;
                    return Vec::new();
                }
                if state.elapsed < due_at {
                    return Vec::new();
                }
                self.stage = CompositeStage::Done;
                vec![SpawnRequest {
                    epicenter,
                    magnitude: 8.2,
                    depth_km: 10.0,
                    event_type: EventType::Main,
                    delay_s: 0.0,
                }]
            }
            CompositeStage::Done => Vec::new(),
        }
    }

    fn is_finished(&self) -> bool {
        matches!(self.stage, CompositeStage::Done)
    }
}

// ---------------------------------------------------------------------------
// Aftershock sequence
// ---------------------------------------------------------------------------

/// A main shock plus aftershocks scheduled into the future through the spawn
/// delay, all registered in the first tick.
pub struct AftershockSequence {
    main: SpawnRequest,
    count: u32,
    emitted: bool,
}

impl AftershockSequence {
    pub fn new(main: SpawnRequest, count: u32) -> Self {
        Self {
            main,
            count,
            emitted: false,
        }
    }

    fn aftershock(&self, index: u32, rng: &mut dyn RngCore) -> SpawnRequest {
        // Spacing widens with each aftershock.
        let delay_s = 20.0 + 40.0 * f64::from(index) + rng.gen_range(0.0..20.0);
        let magnitude = self.main.magnitude - 1.2 - rng.gen_range(0.0..1.0);
        SpawnRequest {
            epicenter: GeoPoint::new(
                self.main.epicenter.lat + rng.gen_range(-0.3..0.3),
                self.main.epicenter.lng + rng.gen_range(-0.3..0.3),
            ),
            magnitude: (magnitude * 10.0).round() / 10.0,
            depth_km: (self.main.depth_km + rng.gen_range(-3.0..10.0)).max(1.0),
            event_type: EventType::Aftershock,
            delay_s,
        }
    }
}

impl ScenarioSource for AftershockSequence {
    fn next_spawns(
        &mut self,
        _state: &SimulationState,
        _network: &StationNetwork,
        rng: &mut dyn RngCore,
    ) -> Vec<SpawnRequest> {
        if self.emitted {
            return Vec::new();
        }
        self.emitted = true;
        let mut spawns = vec![self.main];
        spawns.extend((0..self.count).map(|i| self.aftershock(i, rng)));
        spawns
    }

    fn is_finished(&self) -> bool {
        self.emitted
    }
}

// ---------------------------------------------------------------------------
// Presets and scenario definitions
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Preset {
    /// 1999 Chi-Chi: M7.6 at 8 km under central Taiwan.
    #[serde(rename = "921")]
    Chichi,
    /// 2024 Hualien: M7.4 at 15 km off the east coast.
    #[serde(rename = "0403")]
    Hualien,
    #[serde(rename = "composite")]
    Composite,
    #[serde(rename = "aftershocks")]
    Aftershocks,
}

pub const AFTERSHOCK_COUNT: u32 = 5;

impl Preset {
    pub const NAMES: [&'static str; 4] = ["921", "0403", "composite", "aftershocks"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "921" => Some(Preset::Chichi),
            "0403" => Some(Preset::Hualien),
            "composite" => Some(Preset::Composite),
            "aftershocks" => Some(Preset::Aftershocks),
            _ => None,
        }
    }

    pub fn main_shock(self) -> Option<SpawnRequest> {
        let (lat, lng, magnitude, depth_km) = match self {
            Preset::Chichi | Preset::Aftershocks => (23.85, 120.82, 7.6, 8.0),
            Preset::Hualien => (23.77, 121.67, 7.4, 15.0),
            Preset::Composite => return None,
        };
        Some(SpawnRequest {
            epicenter: GeoPoint::new(lat, lng),
            magnitude,
            depth_km,
            event_type: EventType::Main,
            delay_s: 0.0,
        })
    }

    pub fn source(self) -> Box<dyn ScenarioSource> {
        match (self, self.main_shock()) {
            (Preset::Aftershocks, Some(main)) => {
                Box::new(AftershockSequence::new(main, AFTERSHOCK_COUNT))
            }
            (_, Some(main)) => Box::new(ScriptedScenario::new(vec![ScheduledSpawn {
                at_s: 0.0,
                request: main,
            }])),
            (_, None) => Box::new(CompositeDisaster::new()),
        }
    }
}

/// Serializable description of a scenario, as found in bench scenario files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ScenarioDef {
    Preset { preset: Preset },
    Script { spawns: Vec<ScheduledSpawn> },
}

impl ScenarioDef {
    pub fn source(&self) -> Box<dyn ScenarioSource> {
        match self {
            ScenarioDef::Preset { preset } => preset.source(),
            ScenarioDef::Script { spawns } => Box::new(ScriptedScenario::new(spawns.clone())),
        }
    }
}
