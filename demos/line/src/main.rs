//! line — a four-segment conveyor line with train formation.
//!
//! Loads a TOML layout and a CSV arrival file, runs the line on belt
//! kinematics, and writes `events.csv` and `trains.csv`.
//!
//! ```text
//! cargo run -p line -- [layout.toml] [arrivals.csv] [output-dir]
//! ```
//!
//! Set `RUST_LOG=debug` to watch individual transfers.

use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use cv_core::{LoadId, SegmentId, Tick};
use cv_output::{CsvWriter, OutputWriter, SimOutputObserver};
use cv_schedule::load_arrivals_csv;
use cv_sim::{BeltPlant, FirstLink, Layout, SimObserver};
use cv_transfer::{SegmentEvent, TransferPhase};

// ── Defaults ──────────────────────────────────────────────────────────────────

const LAYOUT:     &str = concat!(env!("CARGO_MANIFEST_DIR"), "/layout.toml");
const ARRIVALS:   &str = concat!(env!("CARGO_MANIFEST_DIR"), "/arrivals.csv");
const OUTPUT_DIR: &str = "output/line";

// ── Observer wrapper to count what happened ──────────────────────────────────

struct CountingObserver<W: OutputWriter> {
    inner:    SimOutputObserver<W>,
    arrived:  usize,
    consumed: usize,
    trains:   usize,
    warnings: usize,
}

impl<W: OutputWriter> CountingObserver<W> {
    fn new(inner: SimOutputObserver<W>) -> Self {
        Self { inner, arrived: 0, consumed: 0, trains: 0, warnings: 0 }
    }
}

impl<W: OutputWriter> SimObserver for CountingObserver<W> {
    fn on_time_advance(&mut self, tick: Tick) {
        self.inner.on_time_advance(tick);
    }

    fn on_phase(&mut self, tick: Tick, segment: SegmentId, load: LoadId, phase: TransferPhase) {
        self.inner.on_phase(tick, segment, load, phase);
    }

    fn on_segment_event(&mut self, tick: Tick, segment: SegmentId, event: &SegmentEvent) {
        match event {
            SegmentEvent::TrainReleased { .. } => self.trains += 1,
            SegmentEvent::Warning(reason) => {
                tracing::warn!(%segment, reason = reason.as_str(), "segment warning");
                self.warnings += 1;
            }
            _ => {}
        }
        self.inner.on_segment_event(tick, segment, event);
    }

    fn on_motor(&mut self, tick: Tick, segment: SegmentId, on: bool) {
        self.inner.on_motor(tick, segment, on);
    }

    fn on_gate(&mut self, tick: Tick, segment: SegmentId, open: bool) {
        self.inner.on_gate(tick, segment, open);
    }

    fn on_dispatch_request(&mut self, tick: Tick, segment: SegmentId) {
        self.inner.on_dispatch_request(tick, segment);
    }

    fn on_load_arrived(&mut self, tick: Tick, segment: SegmentId, load: LoadId) {
        self.arrived += 1;
        self.inner.on_load_arrived(tick, segment, load);
    }

    fn on_load_consumed(&mut self, tick: Tick, segment: SegmentId, load: LoadId) {
        self.consumed += 1;
        self.inner.on_load_consumed(tick, segment, load);
    }

    fn on_sim_end(&mut self, final_tick: Tick) {
        self.inner.on_sim_end(final_tick);
    }
}

// ── main ──────────────────────────────────────────────────────────────────────

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    let mut args = std::env::args().skip(1);
    let layout_path = args.next().map_or_else(|| PathBuf::from(LAYOUT), PathBuf::from);
    let arrivals_path = args.next().map_or_else(|| PathBuf::from(ARRIVALS), PathBuf::from);
    let output_dir = args.next().map_or_else(|| PathBuf::from(OUTPUT_DIR), PathBuf::from);

    println!("=== line — conveyor transfer demo ===");

    // 1. Layout.
    let layout = Layout::load(&layout_path)
        .with_context(|| format!("loading layout {}", layout_path.display()))?;
    let mut sim = layout.into_builder(BeltPlant::new(), FirstLink).build()?;
    println!("Line: {} segments, {} links", sim.segments().len(), sim.links().len());

    // 2. Arrivals.
    let arrivals = load_arrivals_csv(&arrivals_path)
        .with_context(|| format!("loading arrivals {}", arrivals_path.display()))?;
    let scheduled = sim.schedule_arrivals(&arrivals)?;
    println!("Scheduled {scheduled} arrivals");

    // 3. Output.
    std::fs::create_dir_all(&output_dir)?;
    let writer = CsvWriter::new(Path::new(&output_dir))?;
    let mut obs = CountingObserver::new(SimOutputObserver::for_sim(writer, &sim));

    // 4. Run.
    let t0 = Instant::now();
    sim.run(&mut obs)?;
    let elapsed = t0.elapsed();

    if let Some(e) = obs.inner.take_error() {
        eprintln!("output error: {e}");
    }

    // 5. Summary.
    println!(
        "Simulated {:.1} s in {:.3} s",
        sim.clock.elapsed_secs(),
        elapsed.as_secs_f64()
    );
    println!("  arrived  : {}", obs.arrived);
    println!("  consumed : {}", obs.consumed);
    println!("  trains   : {}", obs.trains);
    println!("  warnings : {}", obs.warnings);
    println!("  output   : {}", output_dir.display());
    println!();

    println!("{:<10} {:<14} {:<8}", "Load", "Segment", "At (m)");
    println!("{}", "-".repeat(34));
    for i in 0..sim.loads.len() {
        let load = LoadId(i as u32);
        match sim.plant.position(load) {
            Some((segment, front)) => {
                let name = sim.segment(segment).map_or("?", |s| s.name());
                println!("{:<10} {:<14} {:<8.3}", load.0, name, front);
            }
            None => println!("{:<10} {:<14} {:<8}", load.0, "(gone)", "-"),
        }
    }

    Ok(())
}
