use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use eew_control::{Preset, ScenarioDef, ScenarioSource};
use eew_core::{
    compute_metrics, simulation_summary, station_readout, stop, tick, MetricsFileWriter,
    RunOptions, Signal, SignalEnvelope, SimStatus, SimulationState, StationNetwork,
};
use eew_world::{build_network, load_content, write_run_info};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

// ---------------------------------------------------------------------------
// CLI definition
// ---------------------------------------------------------------------------

#[derive(Parser)]
#[command(name = "eew_cli", about = "Earthquake early warning simulation CLI")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run one scenario headless until the simulation ends.
    Run(RunArgs),
}

#[derive(Args)]
struct RunArgs {
    /// Built-in scenario. Mutually exclusive with --scenario.
    #[arg(long, default_value = "921", value_parser = Preset::NAMES, conflicts_with = "scenario")]
    preset: String,
    /// Scenario definition JSON (a preset or a spawn script).
    #[arg(long)]
    scenario: Option<PathBuf>,
    /// Seeds both the station network and the engine RNG.
    #[arg(long)]
    seed: Option<u64>,
    /// Stop after this many simulated seconds instead of running to the ceiling.
    #[arg(long)]
    duration: Option<f64>,
    /// Frames per real second; defaults to the content's nominal frame rate.
    #[arg(long)]
    fps: Option<f64>,
    /// Simulated seconds per real second.
    #[arg(long, default_value_t = 1.0)]
    speed: f64,
    /// Zero jitter and estimation noise; randomized delays take their midpoints.
    #[arg(long)]
    deterministic: bool,
    #[arg(long, default_value = "./content")]
    content_dir: String,
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    print_every: u64,
    /// Sample metrics every N frames.
    #[arg(long, default_value_t = 60, value_parser = clap::value_parser!(u64).range(1..))]
    metrics_every: u64,
    /// Disable the runs/ directory (run info, reports, summary, metrics).
    #[arg(long)]
    no_metrics: bool,
}

// ---------------------------------------------------------------------------
// Run directory
// ---------------------------------------------------------------------------

fn generate_run_id(seed: u64) -> String {
    format!("{}_seed{seed}", chrono::Utc::now().format("%Y%m%d_%H%M%S"))
}

fn create_run_dir(root: &Path, run_id: &str) -> Result<PathBuf> {
    let dir = root.join(run_id);
    std::fs::create_dir_all(&dir)
        .with_context(|| format!("creating run directory: {}", dir.display()))?;
    Ok(dir)
}

fn write_json(path: &Path, value: &impl Serialize) -> Result<()> {
    let file =
        std::fs::File::create(path).with_context(|| format!("creating {}", path.display()))?;
    serde_json::to_writer_pretty(file, value)
        .with_context(|| format!("writing {}", path.display()))?;
    Ok(())
}

fn load_source(args: &RunArgs) -> Result<Box<dyn ScenarioSource>> {
    if let Some(path) = &args.scenario {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("reading scenario file: {}", path.display()))?;
        let def: ScenarioDef = serde_json::from_str(&json)
            .with_context(|| format!("parsing scenario file: {}", path.display()))?;
        return Ok(def.source());
    }
    match Preset::from_name(&args.preset) {
        Some(preset) => Ok(preset.source()),
        None => bail!("unknown preset '{}'", args.preset),
    }
}

/// Create `runs/<run_id>/`, write its run info and open the metrics CSV.
fn open_run_dir(
    args: &RunArgs,
    seed: u64,
    fps: f64,
    content_version: &str,
) -> Result<(PathBuf, MetricsFileWriter)> {
    let run_id = generate_run_id(seed);
    let dir = create_run_dir(Path::new("runs"), &run_id)?;
    write_run_info(
        &dir,
        &run_id,
        seed,
        content_version,
        args.metrics_every,
        serde_json::json!({
            "preset": args.scenario.is_none().then_some(&args.preset),
            "scenario": args.scenario.as_ref().map(|p| p.display().to_string()),
            "fps": fps,
            "speed": args.speed,
            "deterministic": args.deterministic,
            "duration": args.duration,
        }),
    )?;
    let writer = MetricsFileWriter::new(dir.clone())
        .with_context(|| format!("opening metrics CSV in {}", dir.display()))?;
    println!("Run directory: {}", dir.display());
    Ok((dir, writer))
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

fn run(args: &RunArgs) -> Result<()> {
    if args.speed <= 0.0 {
        bail!("--speed must be positive, got {}", args.speed);
    }
    let content = load_content(&args.content_dir)?;
    let fps = args.fps.unwrap_or(content.constants.nominal_frame_rate);
    if fps <= 0.0 {
        bail!("--fps must be positive, got {fps}");
    }

    let seed = args.seed.unwrap_or_else(rand::random);
    let network = build_network(&content, seed);
    let mut source = load_source(args)?;
    let mut state = SimulationState::new(
        seed,
        RunOptions {
            speed: args.speed,
            deterministic: args.deterministic,
        },
    );
    let mut rng = ChaCha8Rng::seed_from_u64(seed);

    let (run_dir, mut metrics_writer) = if args.no_metrics {
        (None, None)
    } else {
        let (dir, writer) = open_run_dir(args, seed, fps, &content.content_version)?;
        (Some(dir), Some(writer))
    };

    tracing::info!(
        seed,
        stations = network.len(),
        fps,
        speed = args.speed,
        content_version = %content.content_version,
        "starting simulation"
    );
    println!("{}", "-".repeat(80));

    let dt = 1.0 / fps;
    let mut first_frame = true;
    loop {
        let spawns = source.next_spawns(&state, &network, &mut rng);
        let real_elapsed = if first_frame { 0.0 } else { dt };
        first_frame = false;
        let frame = tick(
            &mut state,
            &spawns,
            &network,
            &content.constants,
            &mut rng,
            real_elapsed,
        );

        let spawned = frame
            .signals
            .iter()
            .filter(|s| matches!(s.signal, Signal::EventSpawned { .. }))
            .count();
        if spawned < spawns.len() {
            tracing::warn!(requested = spawns.len(), spawned, "spawn requests ignored");
        }
        for envelope in &frame.signals {
            print_signal(envelope, &state);
        }

        if state.frame % args.print_every == 0 {
            print_status(&state);
        }
        if let Some(writer) = metrics_writer.as_mut() {
            if state.frame % args.metrics_every == 0 {
                writer
                    .write_row(&compute_metrics(&state))
                    .context("writing metrics row")?;
            }
        }

        if state.status == SimStatus::Ended {
            break;
        }
        if state.status == SimStatus::Idle && source.is_finished() {
            tracing::warn!("scenario produced no events");
            break;
        }
        if args.duration.is_some_and(|limit| state.elapsed >= limit) {
            tracing::info!(elapsed = state.elapsed, "duration reached, stopping");
            stop(&mut state);
            break;
        }
    }

    println!("{}", "-".repeat(80));
    println!("Done. Final state at t={:.2}s:", state.elapsed);
    print_status(&state);
    print_major_readouts(&state, &network);

    let summary = simulation_summary(&state);
    if let Some(dir) = &run_dir {
        write_json(&dir.join("reports.json"), &state.reports)?;
        write_json(&dir.join("summary.json"), &summary)?;
    }
    if let Some(writer) = metrics_writer.as_mut() {
        writer.flush().context("final metrics flush")?;
        println!("Metrics written to runs/ directory.");
    }
    Ok(())
}

fn print_signal(envelope: &SignalEnvelope, state: &SimulationState) {
    let t = envelope.sim_time;
    match &envelope.signal {
        Signal::EventSpawned {
            event_id,
            event_type,
            start_time,
        } => {
            if let Some(event) = state.events.iter().find(|e| &e.id == event_id) {
                println!(
                    "*** [{t:7.2}s] {event_type:?} M{:.1} depth {:.0} km {} (rupture at {start_time:.1}s) ***",
                    event.magnitude, event.depth_km, event.region_name,
                );
            }
        }
        Signal::AlertIssued {
            event_id,
            event_type,
        } => println!("*** [{t:7.2}s] ALERT {event_type:?} {event_id} ***"),
        Signal::TsunamiAlertIssued { event_id } => {
            println!("*** [{t:7.2}s] TSUNAMI WARNING {event_id} ***");
        }
        Signal::AlertDismissed { event_id } => println!("    [{t:7.2}s] dismissed {event_id}"),
        Signal::SimulationEnded => println!("*** [{t:7.2}s] SIMULATION ENDED ***"),
        _ => tracing::debug!(sim_time = t, signal = ?envelope.signal, "signal"),
    }
}

fn print_status(state: &SimulationState) {
    let alerts = &state.alerts;
    let estimate = state.estimate.as_ref().map_or_else(
        || "-".to_string(),
        |e| format!("M{:.1}/{:.0}km", e.magnitude, e.depth_km),
    );
    println!(
        "[t={:7.2}s  frame={:6}]  status={:?}  events={}  reports={:3}  \
         estimate={estimate}  max_peak={:.2}  gear={}  alerts={}{}{}",
        state.elapsed,
        state.frame,
        state.system_status(),
        state.events.len(),
        state.reports.len(),
        state.max_peak,
        state.audio_gear,
        if alerts.main { "M" } else { "-" },
        if alerts.tsunami { "T" } else { "-" },
        if alerts.volcano { "V" } else { "-" },
    );
}

fn print_major_readouts(state: &SimulationState, network: &StationNetwork) {
    for station in network.stations().iter().filter(|s| s.is_major) {
        if let Some(readout) = station_readout(state, &station.id) {
            println!(
                "  {:<12} {:6.1} km  P {:6.1}s  S {:6.1}s  class {:<3}  PGA {:7.1} gal",
                station.name,
                readout.distance_km,
                readout.p_time,
                readout.s_time,
                readout.class,
                readout.pga_gal,
            );
        }
    }
}

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(&args)?,
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(preset: &str, scenario: Option<PathBuf>) -> RunArgs {
        RunArgs {
            preset: preset.to_string(),
            scenario,
            seed: Some(1),
            duration: None,
            fps: None,
            speed: 1.0,
            deterministic: true,
            content_dir: "./content".to_string(),
            print_every: 60,
            metrics_every: 60,
            no_metrics: true,
        }
    }

    #[test]
    fn run_id_ends_with_seed() {
        let id = generate_run_id(99);
        assert!(id.ends_with("_seed99"));
        assert_eq!(id.split('_').count(), 3);
    }

    #[test]
    fn unknown_preset_is_an_error() {
        assert!(load_source(&args("1906", None)).is_err());
        assert!(load_source(&args("0403", None)).is_ok());
    }

    #[test]
    fn scenario_file_overrides_preset() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(
            &path,
            r#"{"kind": "script", "spawns": [
                {"at_s": 0.0, "epicenter": {"lat": 24.0, "lng": 121.0},
                 "magnitude": 6.0, "depth_km": 10.0, "event_type": "MAIN"}
            ]}"#,
        )
        .unwrap();
        let source = load_source(&args("not-a-preset", Some(path))).unwrap();
        assert!(!source.is_finished());

        let broken = dir.path().join("broken.json");
        std::fs::write(&broken, "{").unwrap();
        let err = load_source(&args("921", Some(broken))).err().unwrap();
        assert!(format!("{err:#}").contains("parsing scenario file"));
    }

    #[test]
    fn run_dir_holds_json_artifacts() {
        let root = tempfile::tempdir().unwrap();
        let dir = create_run_dir(root.path(), "20260101_000000_seed1").unwrap();
        write_json(&dir.join("summary.json"), &Option::<u32>::None).unwrap();
        let written = std::fs::read_to_string(dir.join("summary.json")).unwrap();
        assert_eq!(written.trim(), "null");
    }
}
