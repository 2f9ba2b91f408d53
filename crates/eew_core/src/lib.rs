//! `eew_core`: deterministic seismic network simulation and EEW decision engine.
//!
//! No IO, no network. All randomness via the passed-in Rng.

pub mod alarm;
mod alerting;
mod arrivals;
pub mod attenuation;
pub mod countdown;
mod engine;
pub mod estimate;
pub mod geo;
mod id;
pub mod impact;
pub mod metrics;
mod network;
mod types;

#[cfg(any(test, feature = "test-support"))]
pub mod test_fixtures;

pub use alerting::{detection_threshold, meets_alert_criteria};
pub use engine::{reset, simulation_summary, station_readout, stop, tick};
pub use id::generate_uuid;
pub use metrics::{compute_metrics, MetricsFileWriter, MetricsSnapshot};
pub use network::StationNetwork;
pub use types::*;

pub(crate) fn emit(counters: &mut Counters, sim_time: f64, signal: Signal) -> SignalEnvelope {
    let id = SignalId(format!("sig_{:06}", counters.next_signal_id));
    counters.next_signal_id += 1;
    SignalEnvelope {
        id,
        sim_time,
        signal,
    }
}

#[cfg(test)]
mod tests;
