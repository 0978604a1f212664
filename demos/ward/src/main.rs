//! Hospital-ward occupancy: the smallest end-to-end model.
//!
//! Two beds, hourly admissions in bursts of three, stochastic stay lengths.
//! Prints the full notification stream and the run counters.

use pdes_core::{Cycle, ElementRng, KernelConfig, SimTime};
use pdes_engine::{RecordingListener, SimulationBuilder};
use pdes_model::{ExecutionKind, Flow, ModelBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    pdes_engine::init_logging("info");

    // ── Model ─────────────────────────────────────────────────────────────
    let mut b = ModelBuilder::new();
    let bed = b.new_resource_type("BED");
    for name in ["bed-east", "bed-west"] {
        let r = b.new_resource(name);
        b.add_timetable_entry(r, Cycle::once(SimTime::ZERO), 10_000, bed);
    }
    let stay = b.new_activity("Stay", 0, ExecutionKind::time_driven());
    b.new_workgroup(stay, 0, vec![(bed, 1)], |rng: &mut ElementRng| {
        rng.gen_range(2..6_u64)
    });
    let patient = b.new_element_type("patient", 0, Flow::sequence(&[stay]));
    b.new_generator(patient, 3, Cycle::every(SimTime::ZERO, 24));
    let model = b.build()?;

    // ── Run ───────────────────────────────────────────────────────────────
    let recorder = RecordingListener::new();
    let log = recorder.handle();
    let config = KernelConfig::new(SimTime::ZERO, SimTime(96), 42);
    let mut sim = SimulationBuilder::new(model, config).listener(recorder).build()?;
    let stats = sim.run()?;

    for n in log.lock().expect("recorder log").iter() {
        println!("{n:?}");
    }
    println!(
        "\n{} rounds, {} events, {} elements, {} notifications",
        stats.rounds, stats.events_executed, stats.elements_created, stats.notifications
    );
    Ok(())
}
