//! Headless Scene Example
//!
//! Spawns the animated arm model from the test fixtures, fires a thruster for
//! a moment, and prints what a chase camera sees while the body drifts.
//!
//! Run with `RUST_LOG=debug` to watch spawning and removal.

use std::thread;
use std::time::Duration;

use anyhow::Context;
use glam::Vec3;

use orrery::physics::{Thrust, ThrusterSet};
use orrery::renderer::{HeadlessBackend, Program};
use orrery::scene::{BodyDesc, ChaseCam, Universe};
use orrery::{EngineSettings, JsonImporter};

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = EngineSettings::default();
    let interval = settings.refresh_interval();
    let mut universe = Universe::new(settings.clone())?;
    let mut backend = HeadlessBackend::new();
    let skin = backend.register_texture("arm_albedo.png");

    let model = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/fixtures/arm.json");
    let handle = universe
        .spawn_body(
            model,
            &BodyDesc::new(Program::Skinned).with_textures(vec![skin]),
            &JsonImporter::new(),
            &mut backend,
        )
        .context("spawning arm")?;
    let body = &handle.body;

    let cam = ChaseCam::new(body, Vec3::new(0.0, 2.0, -10.0), settings.chase_cam)?;
    let thrusters = ThrusterSet::new(body, settings.thrusters, interval)?;

    thrusters.set(Thrust::Forward, true)?;
    thread::sleep(Duration::from_millis(250));
    thrusters.set(Thrust::Forward, false)?;
    thrusters.set(Thrust::RollLeft, true)?;

    for frame in 0..5 {
        thread::sleep(Duration::from_millis(100));
        universe.draw(&mut backend);
        let draws = backend.take_draws();
        let view = cam.view();
        println!(
            "frame {frame}: body at {:.2}, speed {:.2}, eye at {:.2}, {} draw call(s)",
            body.location(),
            body.velocity().length(),
            view.eye,
            draws.len()
        );
    }

    thrusters.destroy()?;
    cam.remove();
    universe.remove_body(handle.key, &mut backend)?;
    println!("live geometries after removal: {}", backend.geometry_count());
    Ok(())
}
