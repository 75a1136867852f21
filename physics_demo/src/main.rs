//! Drop Demo
//!
//! Headless run of the physics core:
//! - A static ground slab and a handful of randomly placed spheres and boxes
//! - Fixed-step simulation driven from a simulated 30 Hz frame clock
//! - Enter callbacks counting first impacts
//! - A raycast down the middle once everything has settled
//!
//! Pass a `.toml` or `.ron` world config path as the first argument to
//! override the default settings.

use rand::Rng;
use rust_physics::config::Config;
use rust_physics::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

// Scene settings
const NUM_BODIES: usize = 24;
const SPAWN_HEIGHT: f32 = 8.0;
const SPAWN_SPREAD: f32 = 4.0;

// Simulated frame clock
const FRAME_TIME: f32 = 1.0 / 30.0;
const RUN_SECONDS: f32 = 6.0;

#[derive(thiserror::Error, Debug)]
enum DemoError {
    #[error("failed to load world config: {0}")]
    Config(#[from] rust_physics::ConfigError),
    #[error("physics error: {0}")]
    Physics(#[from] PhysicsError),
}

fn load_config() -> Result<WorldConfig, DemoError> {
    match std::env::args().nth(1) {
        Some(path) => {
            log::info!("Loading world config from {}", path);
            Ok(WorldConfig::load_from_file(path)?)
        }
        None => Ok(WorldConfig::default()),
    }
}

fn build_scene(world: &mut World) -> Result<Vec<ColliderHandle>, DemoError> {
    let ground = world.create_collider(Vec3::new(0.0, -1.0, 0.0));
    world.add_shape(ground, Shape::cuboid(Vec3::new(50.0, 1.0, 50.0))?)?;
    world.set_body_kind(ground, BodyKind::Static)?;

    let mut rng = rand::thread_rng();
    let mut bodies = Vec::with_capacity(NUM_BODIES);
    for i in 0..NUM_BODIES {
        let position = Vec3::new(
            rng.gen_range(-SPAWN_SPREAD..SPAWN_SPREAD),
            SPAWN_HEIGHT + i as f32 * 0.8,
            rng.gen_range(-SPAWN_SPREAD..SPAWN_SPREAD),
        );
        let body = world.create_collider(position);
        let shape = if rng.gen_bool(0.5) {
            Shape::sphere(rng.gen_range(0.3..0.7))?
        } else {
            let half = rng.gen_range(0.25..0.6);
            Shape::cuboid(Vec3::new(half, half, half))?
        };
        world.add_shape(body, shape)?;
        if let Some(collider) = world.collider_mut(body) {
            collider.set_restitution(rng.gen_range(0.0..0.4));
        }
        bodies.push(body);
    }
    Ok(bodies)
}

fn run() -> Result<(), DemoError> {
    let config = load_config()?;
    let mut world = World::new(config)?;
    let bodies = build_scene(&mut world)?;
    log::info!(
        "Scene ready: {} colliders on the {} backend",
        world.collider_count(),
        world.backend_name()
    );

    let impacts = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&impacts);
    world.set_callbacks(WorldCallbacks::new().with_enter(move |_, _, _| {
        counter.fetch_add(1, Ordering::Relaxed);
    }));

    let frames = (RUN_SECONDS / FRAME_TIME).round() as usize;
    let frames_per_report = (1.0 / FRAME_TIME).round() as usize;
    for frame in 1..=frames {
        world.advance(FRAME_TIME)?;
        if frame % frames_per_report == 0 {
            let awake = bodies
                .iter()
                .filter_map(|b| world.collider(*b))
                .filter(|c| c.is_awake())
                .count();
            log::info!(
                "t={:.1}s steps={} contacts={} awake={}/{} impacts={}",
                frame as f32 * FRAME_TIME,
                world.step_count(),
                world.contacts().len(),
                awake,
                bodies.len(),
                impacts.load(Ordering::Relaxed)
            );
        }
    }

    for body in bodies.iter().take(5) {
        if let Some(collider) = world.collider(*body) {
            log::info!("{:?} rests at {}", body, collider.position());
        }
    }
    match world.raycast_closest(Vec3::new(0.0, 50.0, 0.0), Vec3::new(0.0, -5.0, 0.0), TagMask::ALL) {
        Some(hit) => log::info!("Raycast down the middle hit {:?} at {}", hit.collider, hit.position),
        None => log::warn!("Raycast down the middle hit nothing"),
    }
    Ok(())
}

fn main() {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    println!("=== Drop Demo ===");
    println!("Usage: drop_demo [world_config.toml|world_config.ron]");
    println!();

    if let Err(e) = run() {
        log::error!("{}", e);
        std::process::exit(1);
    }
}
