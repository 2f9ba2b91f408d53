use super::*;
use crate::test_fixtures::{
    base_constants, base_state, deterministic_state, make_rng, spawn_at, test_network,
    INLAND_EPICENTER, OFFSHORE_EPICENTER,
};
use rand_chacha::ChaCha8Rng;

mod lifecycle;
mod tsunami;

// --- Shared test helpers ------------------------------------------------

/// Everything one simulation run needs, bundled for terse tests.
struct Harness {
    network: StationNetwork,
    constants: Constants,
    state: SimulationState,
    rng: ChaCha8Rng,
    frames: Vec<FrameDelta>,
}

impl Harness {
    fn deterministic() -> Self {
        Self::with_state(deterministic_state())
    }

    fn randomized() -> Self {
        Self::with_state(base_state())
    }

    fn with_state(state: SimulationState) -> Self {
        Self {
            network: test_network(),
            constants: base_constants(),
            state,
            rng: make_rng(),
            frames: Vec::new(),
        }
    }

    fn spawn(&mut self, requests: &[SpawnRequest]) {
        let frame = tick(
            &mut self.state,
            requests,
            &self.network,
            &self.constants,
            &mut self.rng,
            0.0,
        );
        self.frames.push(frame);
    }

    fn step(&mut self, dt: f64) -> &FrameDelta {
        let frame = tick(
            &mut self.state,
            &[],
            &self.network,
            &self.constants,
            &mut self.rng,
            dt,
        );
        self.frames.push(frame);
        &self.frames[self.frames.len() - 1]
    }

    /// Steps in increments of `dt` until `seconds` of simulated time have passed.
    fn run_for(&mut self, seconds: f64, dt: f64) {
        let target = self.state.elapsed + seconds;
        while self.state.elapsed + 1e-9 < target && self.state.status == SimStatus::Running {
            self.step(dt);
        }
    }

    /// Steps until `done` holds or `limit` simulated seconds pass.
    fn run_until(&mut self, dt: f64, limit: f64, done: impl Fn(&SimulationState) -> bool) -> bool {
        while self.state.elapsed < limit && self.state.status == SimStatus::Running {
            self.step(dt);
            if done(&self.state) {
                return true;
            }
        }
        false
    }

    fn signals(&self) -> impl Iterator<Item = &SignalEnvelope> {
        self.frames.iter().flat_map(|f| f.signals.iter())
    }

    fn event(&self, index: usize) -> &ActiveEvent {
        &self.state.events[index]
    }
}

fn main_shock_921() -> SpawnRequest {
    spawn_at(INLAND_EPICENTER, 7.6, 8.0, EventType::Main)
}

fn offshore_megathrust() -> SpawnRequest {
    spawn_at(OFFSHORE_EPICENTER, 8.2, 10.0, EventType::Main)
}
