//! Type definitions for `eew_core`.
//!
//! All public types, structs, enums, and ID newtypes used by the simulation.

use ahash::{AHashMap, AHashSet};
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

// ---------------------------------------------------------------------------
// ID newtypes
// ---------------------------------------------------------------------------

macro_rules! string_id {
    ($name:ident) => {
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        pub struct $name(pub String);

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(StationId);
string_id!(EventId);
string_id!(SignalId);

// ---------------------------------------------------------------------------
// Core enums
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Terrain {
    Basin,
    Plain,
    Mountain,
    Valley,
    Offshore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Region {
    Inland,
    Offshore,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StationType {
    Seismic,
    Tsunami,
    Volcano,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    Main,
    Aftershock,
    Volcano,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WaveType {
    P,
    S,
}

/// Per-event decision state. Terminal phases are `Alerting` and `Dismissed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventPhase {
    Detecting,
    Computing,
    Alerting,
    Dismissed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SimStatus {
    Idle,
    Running,
    Ended,
}

/// Operator-facing status line, derived from the most advanced event phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SystemStatus {
    Idle,
    Detecting,
    Computing,
    Alerting,
    Ended,
}

// ---------------------------------------------------------------------------
// Stations and impacts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub const fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }
}

/// A sensor. Immutable once the network has been generated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Station {
    pub id: StationId,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub terrain: Terrain,
    pub region: Region,
    pub station_type: StationType,
    /// Named city or landmark sensor, shown in countdowns.
    pub is_major: bool,
}

/// One station as seen by one event. Produced once per event, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StationImpact {
    pub station: Station,
    /// Epicentral distance in km.
    pub distance_km: f64,
    pub p_intensity: f64,
    /// Peak (S-wave) intensity.
    pub s_intensity: f64,
    pub p_time: f64,
    pub s_time: f64,
    /// Volcanic events only.
    pub ash_time: Option<f64>,
}

/// Tsunami-class station near a tsunami-risk event with its precomputed target level.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TsunamiGauge {
    pub station_id: StationId,
    pub distance_km: f64,
    pub target: f64,
}

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActiveEvent {
    pub id: EventId,
    pub event_type: EventType,
    pub magnitude: f64,
    pub depth_km: f64,
    pub epicenter: GeoPoint,
    pub region_name: String,
    /// Offset into the shared simulation clock. May lie in the future.
    pub start_time: f64,
    /// Sorted ascending by distance.
    pub impacts: Vec<StationImpact>,
    /// Indices into `impacts` of major stations, for countdowns.
    pub major_indices: Vec<usize>,
    pub tsunami_gauges: Vec<TsunamiGauge>,
    /// Indices into `impacts` by P arrival time. S arrivals share the order.
    pub arrival_order: Vec<usize>,
    /// Positions in `arrival_order`.
    pub next_p_index: usize,
    pub next_s_index: usize,
    /// Position in `impacts`; ash arrives in distance order.
    pub next_ash_index: usize,
    pub triggered_inland: u32,
    pub triggered_offshore: u32,
    pub first_trigger_time: Option<f64>,
    pub processing_delay: f64,
    pub max_local_intensity: f64,
    pub phase: EventPhase,
    pub alert_time: Option<f64>,
    pub offshore: bool,
    pub tsunami_risk: bool,
    pub tsunami_alerted: bool,
    pub tsunami_delay: f64,
}

impl ActiveEvent {
    pub fn total_triggers(&self) -> u32 {
        self.triggered_inland + self.triggered_offshore
    }

    pub fn is_alerting(&self) -> bool {
        self.phase == EventPhase::Alerting
    }
}

/// Per-station runtime intensities. Keyed by station id; absent means zero.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StationRuntime {
    /// Non-decreasing until reset.
    pub peak: AHashMap<StationId, f64>,
    /// Decays every tick.
    pub live: AHashMap<StationId, f64>,
    pub ashed: AHashSet<StationId>,
}

impl StationRuntime {
    pub fn peak_of(&self, id: &StationId) -> f64 {
        self.peak.get(id).copied().unwrap_or(0.0)
    }

    pub fn live_of(&self, id: &StationId) -> f64 {
        self.live.get(id).copied().unwrap_or(0.0)
    }

    pub fn clear(&mut self) {
        self.peak.clear();
        self.live.clear();
        self.ashed.clear();
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertFlags {
    pub main: bool,
    pub tsunami: bool,
    pub volcano: bool,
}

impl AlertFlags {
    pub fn any(&self) -> bool {
        self.main || self.tsunami || self.volcano
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct AlarmState {
    /// Simulation time of the last audible alarm, across all events.
    pub last_fired: Option<f64>,
}

/// Append-only EEW bulletin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EewReport {
    pub report_num: u32,
    pub event_id: EventId,
    pub time: f64,
    pub magnitude: f64,
    pub depth_km: f64,
    pub stations: u32,
    pub offshore: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Estimate {
    pub magnitude: f64,
    pub depth_km: f64,
    /// Intensity predicted at the epicenter from the estimated source.
    pub predicted_max_intensity: f64,
    pub predicted_class: IntensityClass,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunOptions {
    /// Simulated seconds per real second.
    pub speed: f64,
    /// Zeroes jitter and estimation noise; randomized delays take their midpoints.
    pub deterministic: bool,
}

impl RunOptions {
    /// Speed as applied to the clock. Negative or non-finite speeds pause it.
    pub fn clock_rate(&self) -> f64 {
        if self.speed.is_finite() {
            self.speed.max(0.0)
        } else {
            0.0
        }
    }
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            speed: 1.0,
            deterministic: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaState {
    pub seed: u64,
    pub options: RunOptions,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Counters {
    pub next_signal_id: u64,
    pub next_report_num: u32,
}

/// Everything the engine mutates. One value per simulation; no globals.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationState {
    pub meta: MetaState,
    pub status: SimStatus,
    /// Global simulated seconds since the run started.
    pub elapsed: f64,
    pub frame: u64,
    /// Ordered by registration; earlier events are processed first each tick.
    pub events: Vec<ActiveEvent>,
    pub stations: StationRuntime,
    pub reports: Vec<EewReport>,
    pub estimate: Option<Estimate>,
    pub alerts: AlertFlags,
    pub alarm: AlarmState,
    pub audio_gear: u8,
    pub max_peak: f64,
    pub last_report_time: f64,
    pub counters: Counters,
}

// ---------------------------------------------------------------------------
// Boundary types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpawnRequest {
    pub epicenter: GeoPoint,
    pub magnitude: f64,
    pub depth_km: f64,
    pub event_type: EventType,
    /// Seconds after the current simulation time at which the rupture starts.
    #[serde(default)]
    pub delay_s: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationDelta {
    pub id: StationId,
    pub peak: f64,
    pub live: f64,
    pub ashed: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wavefront {
    pub event_id: EventId,
    pub event_type: EventType,
    pub p_radius_km: f64,
    pub s_radius_km: f64,
    pub ash_radius_km: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Countdown {
    pub station_id: StationId,
    pub name: String,
    pub seconds: f64,
    pub intensity: f64,
    pub class: IntensityClass,
    pub event_type: EventType,
}

pub type CountdownList = SmallVec<[Countdown; 5]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum AlarmPriority {
    Low,
    Normal,
    Elevated,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SuppressReason {
    VolcanoPriority,
    WithinInterval,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Signal {
    EventSpawned {
        event_id: EventId,
        event_type: EventType,
        start_time: f64,
    },
    DetectionConfirmed {
        event_id: EventId,
        triggers: u32,
    },
    AlertIssued {
        event_id: EventId,
        event_type: EventType,
    },
    AlertDismissed {
        event_id: EventId,
    },
    TsunamiAlertIssued {
        event_id: EventId,
    },
    /// `overrode` is set when the alarm restarted inside the re-fire window.
    AlarmFired {
        event_id: EventId,
        event_type: EventType,
        priority: AlarmPriority,
        overrode: bool,
    },
    AlarmSuppressed {
        event_id: EventId,
        event_type: EventType,
        priority: AlarmPriority,
        reason: SuppressReason,
    },
    IntensityGear {
        gear: u8,
    },
    ReportIssued {
        report_num: u32,
    },
    SimulationEnded,
}

impl Signal {
    /// Stable snake_case tag, used as a key in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Signal::EventSpawned { .. } => "event_spawned",
            Signal::DetectionConfirmed { .. } => "detection_confirmed",
            Signal::AlertIssued { .. } => "alert_issued",
            Signal::AlertDismissed { .. } => "alert_dismissed",
            Signal::TsunamiAlertIssued { .. } => "tsunami_alert_issued",
            Signal::AlarmFired { .. } => "alarm_fired",
            Signal::AlarmSuppressed { .. } => "alarm_suppressed",
            Signal::IntensityGear { .. } => "intensity_gear",
            Signal::ReportIssued { .. } => "report_issued",
            Signal::SimulationEnded => "simulation_ended",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SignalEnvelope {
    pub id: SignalId,
    pub sim_time: f64,
    pub signal: Signal,
}

/// Everything downstream collaborators need from one tick.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FrameDelta {
    pub sim_time: f64,
    pub status: SystemStatus,
    pub stations: Vec<StationDelta>,
    pub wavefronts: Vec<Wavefront>,
    pub main_countdowns: CountdownList,
    pub secondary_countdowns: CountdownList,
    pub new_reports: Vec<EewReport>,
    pub alerts: AlertFlags,
    pub signals: Vec<SignalEnvelope>,
    pub summary: Option<SimulationSummary>,
}

impl FrameDelta {
    pub(crate) fn empty(sim_time: f64, status: SystemStatus, alerts: AlertFlags) -> Self {
        Self {
            sim_time,
            status,
            stations: Vec::new(),
            wavefronts: Vec::new(),
            main_countdowns: CountdownList::new(),
            secondary_countdowns: CountdownList::new(),
            new_reports: Vec::new(),
            alerts,
            signals: Vec::new(),
            summary: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventSummary {
    pub id: EventId,
    pub event_type: EventType,
    pub magnitude: f64,
    pub depth_km: f64,
    pub epicenter: GeoPoint,
    pub region_name: String,
    pub phase: EventPhase,
    pub tsunami_alerted: bool,
    pub max_local_intensity: f64,
}

/// Handed to the report collaborator once, when the run ends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum SimulationSummary {
    Single {
        magnitude: f64,
        depth_km: f64,
        epicenter: GeoPoint,
        max_intensity_class: IntensityClass,
    },
    Multi {
        events: Vec<EventSummary>,
        max_intensity_class: IntensityClass,
    },
}

/// Strongest-event readout for one station, display only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StationReadout {
    pub station_id: StationId,
    pub event_id: EventId,
    pub distance_km: f64,
    pub p_time: f64,
    pub s_time: f64,
    pub max_intensity: f64,
    pub class: IntensityClass,
    pub pga_gal: f64,
    pub pgv_cm_s: f64,
}

// ---------------------------------------------------------------------------
// Intensity scale
// ---------------------------------------------------------------------------

/// Nine-step display scale. Control flow never compares against these.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum IntensityClass {
    One,
    Two,
    Three,
    Four,
    FiveLower,
    FiveUpper,
    SixLower,
    SixUpper,
    Seven,
}

// ---------------------------------------------------------------------------
// Content types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EewContent {
    pub content_version: String,
    pub network: NetworkDef,
    pub constants: Constants,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkDef {
    pub major_stations: Vec<MajorStationDef>,
    pub zones: Vec<ZoneDef>,
    pub volcanoes: Vec<VolcanoDef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MajorStationDef {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    pub terrain: Terrain,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct BoundsDef {
    pub lat_min: f64,
    pub lat_max: f64,
    pub lng_min: f64,
    pub lng_max: f64,
}

impl BoundsDef {
    pub fn contains(&self, lat: f64, lng: f64) -> bool {
        lat >= self.lat_min && lat <= self.lat_max && lng >= self.lng_min && lng <= self.lng_max
    }
}

/// Randomly populated rectangle of stations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ZoneDef {
    pub prefix: String,
    pub count: u32,
    pub bounds: BoundsDef,
    pub station_type: StationType,
    /// Probability that an offshore candidate point is kept.
    pub offshore_keep_probability: f64,
    /// Probability that an inland candidate point is kept.
    pub inland_keep_probability: f64,
    /// Share of inland stations placed on plains; the rest are mountain sites.
    pub plain_probability: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolcanoDef {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Constants {
    // Propagation
    pub p_wave_speed_km_s: f64,
    pub s_wave_speed_km_s: f64,
    pub ash_speed_km_s: f64,

    // Runtime intensity
    pub nominal_frame_rate: f64,
    pub live_decay: f64,
    pub tsunami_live_decay: f64,
    pub live_epsilon: f64,

    // Detection
    pub p_trigger_intensity: f64,
    pub inland_trigger_threshold: u32,
    pub offshore_trigger_threshold: u32,
    pub processing_delay_min_s: f64,
    pub processing_delay_max_s: f64,

    // Alert criteria
    pub alert_magnitude: f64,
    pub moderate_alert_magnitude: f64,
    pub moderate_alert_min_intensity: f64,

    // Tsunami
    pub tsunami_min_magnitude: f64,
    pub tsunami_max_depth_km: f64,
    pub tsunami_delay_min_s: f64,
    pub tsunami_delay_max_s: f64,
    pub tsunami_gauge_radius_km: f64,
    pub tsunami_wave_start_s: f64,
    pub tsunami_wave_end_s: f64,
    pub tsunami_visual_scale: f64,
    pub tsunami_smoothing: f64,

    // Alarm
    pub alarm_min_interval_s: f64,

    // Countdowns
    pub countdown_min_intensity: f64,
    pub countdown_size: usize,

    // Estimation
    pub report_interval_s: f64,
    pub report_min_stations: usize,
    pub estimate_noise_floor: f64,
    pub estimate_default_depth_km: f64,
    pub estimate_blend_start_stations: usize,
    pub estimate_blend_full_stations: usize,

    // Audio gear thresholds (ascending)
    pub gear_thresholds: Vec<f64>,

    pub simulation_ceiling_s: f64,
}
