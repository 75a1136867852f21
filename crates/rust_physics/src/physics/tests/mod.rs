//! World-level behaviour tests

mod joints;
mod lifecycle;
mod scenarios;

use crate::config::WorldConfig;
use crate::foundation::collections::ColliderHandle;
use crate::foundation::math::Vec3;
use crate::physics::collider::BodyKind;
use crate::physics::shape::Shape;
use crate::physics::world::World;

pub(super) const DT: f32 = 1.0 / 60.0;

pub(super) fn world(config: WorldConfig) -> World {
    crate::foundation::logging::init_for_tests();
    World::new(config).expect("valid config")
}

/// Static slab whose top face is the plane y = 0
pub(super) fn ground(world: &mut World) -> ColliderHandle {
    let ground = world.create_collider(Vec3::new(0.0, -1.0, 0.0));
    world
        .add_shape(ground, Shape::cuboid(Vec3::new(50.0, 1.0, 50.0)).expect("box"))
        .expect("shape");
    world.set_body_kind(ground, BodyKind::Static).expect("static");
    ground
}

pub(super) fn ball(world: &mut World, position: Vec3, radius: f32) -> ColliderHandle {
    let ball = world.create_collider(position);
    world
        .add_shape(ball, Shape::sphere(radius).expect("sphere"))
        .expect("shape");
    ball
}

pub(super) fn crate_box(world: &mut World, position: Vec3, half_extents: Vec3) -> ColliderHandle {
    let body = world.create_collider(position);
    world
        .add_shape(body, Shape::cuboid(half_extents).expect("box"))
        .expect("shape");
    body
}

pub(super) fn run(world: &mut World, steps: usize) {
    for _ in 0..steps {
        world.update(DT).expect("step");
    }
}

pub(super) fn position(world: &World, collider: ColliderHandle) -> Vec3 {
    world.collider(collider).expect("live collider").position()
}
