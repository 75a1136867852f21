use super::*;
use crate::error::PhysicsError;
use crate::physics::backend::runtime;
use crate::physics::joint::JointDesc;
use approx::assert_relative_eq;

#[test]
fn test_cross_world_joint_is_rejected() {
    let mut first = world(WorldConfig::default());
    let mut second = world(WorldConfig::default());
    let a = ball(&mut first, Vec3::zeros(), 1.0);
    let b = ball(&mut second, Vec3::zeros(), 1.0);

    let result = first.create_joint(a, b, JointDesc::Ball { anchor: Vec3::zeros() });
    assert!(matches!(result, Err(PhysicsError::CrossWorldJoint)));
    assert_eq!(first.joint_count(), 0);
    assert_eq!(second.joint_count(), 0);
    // Foreign handles never resolve
    assert!(first.collider(b).is_none());
}

#[test]
fn test_invalid_joint_requests() {
    let mut world = world(WorldConfig::default());
    let a = ball(&mut world, Vec3::zeros(), 1.0);
    let b = ball(&mut world, Vec3::new(3.0, 0.0, 0.0), 1.0);

    let same = world.create_joint(a, a, JointDesc::Ball { anchor: Vec3::zeros() });
    assert!(matches!(same, Err(PhysicsError::InvalidHandle)));
    let nan = world.create_joint(a, b, JointDesc::Hinge { anchor: Vec3::zeros(), axis: Vec3::new(f32::NAN, 0.0, 0.0) });
    assert!(matches!(nan, Err(PhysicsError::InvalidGeometry(_))));
    assert_eq!(world.joint_count(), 0);
}

#[test]
fn test_destroying_a_collider_removes_its_shapes_and_joints() {
    let mut world = world(WorldConfig::default());
    let a = ball(&mut world, Vec3::zeros(), 1.0);
    let b = ball(&mut world, Vec3::new(3.0, 0.0, 0.0), 1.0);
    let joint = world
        .create_joint(a, b, JointDesc::Ball { anchor: Vec3::new(1.5, 0.0, 0.0) })
        .expect("joint");
    let shape = world.collider_shapes(a)[0];

    assert!(world.destroy_collider(a));
    assert!(!world.destroy_collider(a));
    assert!(world.collider(a).is_none());
    assert!(world.shape(shape).is_none());
    assert!(world.joint(joint).is_none());
    assert!(world.collider_joints(b).is_empty());
    assert_eq!((world.collider_count(), world.shape_count(), world.joint_count()), (1, 1, 0));

    // A recycled slot does not revive the old handle
    let c = world.create_collider(Vec3::zeros());
    assert_ne!(a, c);
    assert!(world.collider(a).is_none());
    world.update(DT).expect("step");
}

#[test]
fn test_shape_round_trip_restores_mass() {
    let mut world = world(WorldConfig::default());
    let body = ball(&mut world, Vec3::zeros(), 1.0);
    let before = world.collider(body).expect("body").mass_data();
    assert_relative_eq!(before.mass, 4.0 / 3.0 * std::f32::consts::PI, epsilon = 1e-4);

    let extra = world
        .add_shape(body, Shape::cuboid(Vec3::new(1.0, 1.0, 1.0)).expect("box"))
        .expect("shape");
    assert!(world.collider(body).expect("body").mass() > before.mass);

    let removed = world.remove_shape(extra).expect("removed shape");
    assert_eq!(removed.shape_type(), crate::physics::shape::ShapeType::Box);
    let after = world.collider(body).expect("body").mass_data();
    assert_relative_eq!(after.mass, before.mass, epsilon = 1e-5);
    assert_relative_eq!(after.inertia, before.inertia, epsilon = 1e-5);

    let only = world.collider_shapes(body)[0];
    world.remove_shape(only);
    let empty = world.collider(body).expect("body");
    assert_eq!(empty.mass(), 0.0);
    assert_eq!(empty.inverse_mass(), 0.0);
}

#[test]
fn test_concave_shapes_need_explicit_mass() {
    let mut world = world(WorldConfig::default());
    let quad = || {
        Shape::mesh(
            vec![
                Vec3::new(-1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, -1.0),
                Vec3::new(1.0, 0.0, 1.0),
                Vec3::new(-1.0, 0.0, 1.0),
            ],
            vec![0, 2, 1, 0, 3, 2],
        )
        .expect("mesh")
    };

    let dynamic = world.create_collider(Vec3::zeros());
    assert!(matches!(world.add_shape(dynamic, quad()), Err(PhysicsError::MassRequired)));
    assert_eq!(world.shape_count(), 0);

    let floor = world.create_collider(Vec3::zeros());
    world.set_body_kind(floor, BodyKind::Static).expect("static");
    world.add_shape(floor, quad()).expect("static mesh");
    assert!(matches!(
        world.set_body_kind(floor, BodyKind::Dynamic),
        Err(PhysicsError::MassRequired)
    ));

    world.set_automatic_mass(floor, false).expect("manual mass");
    world.collider_mut(floor).expect("floor").set_mass(5.0);
    world.set_body_kind(floor, BodyKind::Dynamic).expect("dynamic with explicit mass");
    assert_relative_eq!(world.collider(floor).expect("floor").mass(), 5.0);

    // The kinematic toggle enforces the same rule
    let platform = world.create_collider(Vec3::new(5.0, 0.0, 0.0));
    world.set_kinematic(platform, true).expect("kinematic");
    world.add_shape(platform, quad()).expect("kinematic mesh");
    assert!(matches!(world.set_kinematic(platform, false), Err(PhysicsError::MassRequired)));
    let body = world.collider(platform).expect("platform");
    assert!(body.is_kinematic());
    assert_eq!(body.inverse_mass(), 0.0);
}

#[test]
fn test_runtime_tracks_live_worlds() {
    let first = world(WorldConfig::default());
    assert!(runtime::is_initialized());
    assert!(runtime::live_worlds() >= 1);
    assert!(runtime::initialization_count() >= 1);
    let second = world(WorldConfig::default());
    assert_ne!(first.id(), second.id());
    assert!(runtime::live_worlds() >= 2);
    second.destroy();
    drop(first);
}

#[test]
fn test_invalid_config_is_rejected() {
    let mut config = WorldConfig::default();
    config.tick_rate = 0.0;
    assert!(matches!(World::new(config), Err(PhysicsError::Config(_))));

    let too_many = WorldConfig::default().with_tags((0..32).map(|i| format!("tag{i}")));
    assert!(matches!(World::new(too_many), Err(PhysicsError::Config(_))));
}

#[test]
fn test_tags_resolve_by_name() {
    let mut world = world(WorldConfig::default().with_tags(["player", "enemy"]));
    let c = world.create_collider(Vec3::zeros());
    assert!(world.set_collider_tag(c, Some("enemy")));
    assert_eq!(world.collider_tag(c), Some("enemy"));
    assert_eq!(world.collider(c).expect("collider").tag(), Some(1));
    assert!(!world.set_collider_tag(c, Some("ghost")));
    assert_eq!(world.tag_name(0), Some("player"));
    assert_eq!(world.tag_name(5), None);
    assert!(world.set_collider_tag(c, None));
    assert_eq!(world.collider_tag(c), None);
}

#[test]
fn test_static_kind_clears_motion() {
    let mut world = world(WorldConfig::default());
    let c = ball(&mut world, Vec3::zeros(), 1.0);
    world
        .collider_mut(c)
        .expect("ball")
        .set_linear_velocity(Vec3::new(1.0, 2.0, 3.0));
    world.set_body_kind(c, BodyKind::Static).expect("static");
    let body = world.collider(c).expect("ball");
    assert_eq!(body.linear_velocity(), Vec3::zeros());
    assert_eq!(body.inverse_mass(), 0.0);
    run(&mut world, 10);
    assert_eq!(position(&world, c), Vec3::zeros());
}

#[test]
fn test_removing_a_shape_wakes_manual_mass_bodies() {
    let mut world = world(WorldConfig::default());
    ground(&mut world);
    let body = world.create_collider(Vec3::new(0.0, 0.5, 0.0));
    let shape = world
        .add_shape(body, Shape::cuboid(Vec3::repeat(0.5)).expect("box"))
        .expect("shape");
    world.set_automatic_mass(body, false).expect("manual mass");
    world.collider_mut(body).expect("body").set_awake(false);

    let removed = world.remove_shape(shape).expect("removed");
    assert_eq!(removed.shape_type(), crate::physics::shape::ShapeType::Box);
    let collider = world.collider(body).expect("body");
    assert!(collider.is_awake());
    assert_relative_eq!(collider.mass(), 1.0);
}
