use super::*;
use crate::foundation::collections::JointHandle;
use crate::physics::joint::{JointDesc, Spring, TargetType};
use approx::{assert_abs_diff_eq, assert_relative_eq};

fn anchor_body(world: &mut World, position: Vec3) -> ColliderHandle {
    let anchor = world.create_collider(position);
    world.set_body_kind(anchor, BodyKind::Static).expect("static");
    anchor
}

fn hinged_door(config: WorldConfig) -> (World, ColliderHandle, JointHandle) {
    let mut world = world(config);
    let frame = anchor_body(&mut world, Vec3::zeros());
    let door = crate_box(&mut world, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 0.5, 0.1));
    let hinge = world
        .create_joint(frame, door, JointDesc::Hinge { anchor: Vec3::zeros(), axis: Vec3::y() })
        .expect("hinge");
    (world, door, hinge)
}

#[test]
fn test_hinge_motor_stops_at_limit() {
    let (mut world, door, hinge) = hinged_door(WorldConfig::default().with_gravity(Vec3::zeros()));
    {
        let joint = world.joint_mut(hinge).expect("hinge");
        joint.set_limits(-0.5, 0.5);
        joint.set_motor_target(TargetType::Velocity, 2.0);
    }

    run(&mut world, 120);
    let angle = world.joint_angle(hinge).expect("hinge angle");
    assert!((angle - 0.5).abs() < 0.05, "angle {angle} should rest at the upper limit");
    // The pivot holds
    let (pa, pb) = world.joint_anchors(hinge).expect("anchors");
    assert!((pa - pb).norm() < 0.02);
    assert_relative_eq!((position(&world, door) - pa).norm(), 1.0, epsilon = 0.02);
}

#[test]
fn test_hinge_position_motor_reaches_target() {
    let (mut world, _, hinge) = hinged_door(WorldConfig::default().with_gravity(Vec3::zeros()));
    world
        .joint_mut(hinge)
        .expect("hinge")
        .set_motor_target(TargetType::Position, -0.3);

    run(&mut world, 120);
    assert_abs_diff_eq!(world.joint_angle(hinge).expect("angle"), -0.3, epsilon = 0.02);
}

#[test]
fn test_distance_joint_keeps_length() {
    let mut world = world(WorldConfig::default());
    let pivot = anchor_body(&mut world, Vec3::zeros());
    let bob = ball(&mut world, Vec3::new(2.0, 0.0, 0.0), 0.2);
    world
        .create_joint(
            pivot,
            bob,
            JointDesc::Distance {
                anchor_a: Vec3::zeros(),
                anchor_b: Vec3::new(2.0, 0.0, 0.0),
            },
        )
        .expect("rod");

    let mut lowest = f32::MAX;
    for _ in 0..90 {
        world.update(DT).expect("step");
        let p = position(&world, bob);
        assert_relative_eq!(p.norm(), 2.0, epsilon = 0.05);
        lowest = lowest.min(p.y);
    }
    assert!(lowest < -1.9, "pendulum should swing through the bottom, lowest {lowest}");
}

#[test]
fn test_ball_joint_reports_supporting_force() {
    let mut world = world(WorldConfig::default().with_allow_sleep(false));
    let ceiling = anchor_body(&mut world, Vec3::zeros());
    let weight = ball(&mut world, Vec3::new(0.0, -1.0, 0.0), 0.25);
    let joint = world
        .create_joint(ceiling, weight, JointDesc::Ball { anchor: Vec3::zeros() })
        .expect("joint");

    run(&mut world, 30);
    let mass = world.collider(weight).expect("weight").mass();
    let force = world.joint(joint).expect("joint").force();
    assert_relative_eq!(force, mass * 9.81, max_relative = 0.05);
    assert_relative_eq!(position(&world, weight).y, -1.0, epsilon = 0.01);
}

#[test]
fn test_weld_holds_cantilever() {
    let mut world = world(WorldConfig::default());
    let wall = anchor_body(&mut world, Vec3::zeros());
    let beam = crate_box(&mut world, Vec3::new(1.0, 0.0, 0.0), Vec3::new(0.5, 0.1, 0.1));
    world
        .create_joint(wall, beam, JointDesc::Weld { anchor: Vec3::new(0.5, 0.0, 0.0) })
        .expect("weld");

    run(&mut world, 60);
    let body = world.collider(beam).expect("beam");
    assert!((body.position() - Vec3::new(1.0, 0.0, 0.0)).norm() < 0.05);
    assert!(body.rotation().angle() < 0.05);
}

#[test]
fn test_slider_moves_along_axis_within_limits() {
    let mut world = world(WorldConfig::default().with_allow_sleep(false));
    let rail = anchor_body(&mut world, Vec3::zeros());
    let carriage = crate_box(&mut world, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.2, 0.2, 0.2));
    let slider = world
        .create_joint(rail, carriage, JointDesc::Slider { axis: Vec3::x() })
        .expect("slider");
    world.joint_mut(slider).expect("slider").set_limits(-0.5, 0.5);
    world
        .collider_mut(carriage)
        .expect("carriage")
        .set_linear_velocity(Vec3::new(1.0, 0.0, 0.0));

    run(&mut world, 20);
    let travelled = world.joint_position(slider).expect("slider position");
    assert_relative_eq!(travelled, position(&world, carriage).x - 2.0, epsilon = 1e-3);
    assert!(travelled > 0.2 && travelled < 0.5);

    run(&mut world, 60);
    let p = position(&world, carriage);
    assert!((world.joint_position(slider).expect("position") - 0.5).abs() < 0.05);
    assert!(p.y.abs() < 0.02 && p.z.abs() < 0.02, "carriage left the rail: {p}");
    assert!(world.joint_angle(slider).is_none());
}

#[test]
fn test_cone_limits_swing() {
    let mut world = world(WorldConfig::default().with_gravity(Vec3::zeros()));
    let socket = anchor_body(&mut world, Vec3::zeros());
    let arm = ball(&mut world, Vec3::zeros(), 0.5);
    world
        .create_joint(
            socket,
            arm,
            JointDesc::Cone {
                anchor: Vec3::zeros(),
                axis: Vec3::y(),
                max_angle: 0.3,
            },
        )
        .expect("cone");
    world
        .collider_mut(arm)
        .expect("arm")
        .set_angular_velocity(Vec3::new(3.0, 0.0, 0.0));

    for _ in 0..60 {
        world.update(DT).expect("step");
        let up = world.collider(arm).expect("arm").rotation() * Vec3::y();
        assert!(up.dot(&Vec3::y()).clamp(-1.0, 1.0).acos() < 0.35);
    }
}

#[test]
fn test_reenabling_an_enabled_joint_changes_nothing() {
    let config = WorldConfig::default().with_allow_sleep(false).with_deterministic(true);
    let (mut plain, door_a, _) = hinged_door(config.clone());
    let (mut touched, door_b, hinge) = hinged_door(config);

    for _ in 0..60 {
        plain.update(DT).expect("step");
        touched.joint_mut(hinge).expect("hinge").set_enabled(true);
        touched.update(DT).expect("step");
    }
    assert_eq!(
        plain.collider(door_a).expect("door").pose(),
        touched.collider(door_b).expect("door").pose()
    );
}

#[test]
fn test_disabled_joint_releases_bodies() {
    let (mut world, door, hinge) = hinged_door(WorldConfig::default());
    world.joint_mut(hinge).expect("hinge").set_enabled(false);
    run(&mut world, 60);
    assert!(position(&world, door).y < -1.0);
    assert_eq!(world.joint(hinge).expect("hinge").force(), 0.0);
}

#[test]
fn test_slider_motor_reports_holding_force() {
    let mut world = world(WorldConfig::default().with_allow_sleep(false));
    let rail = anchor_body(&mut world, Vec3::zeros());
    let carriage = crate_box(&mut world, Vec3::new(0.0, -1.0, 0.0), Vec3::new(0.2, 0.2, 0.2));
    let slider = world
        .create_joint(rail, carriage, JointDesc::Slider { axis: Vec3::y() })
        .expect("slider");
    world
        .joint_mut(slider)
        .expect("slider")
        .set_motor_target(TargetType::Velocity, 0.0);

    run(&mut world, 30);
    let mass = world.collider(carriage).expect("carriage").mass();
    let motor_force = world.joint(slider).expect("slider").motor_force().expect("slider motor");
    // Pushes up the axis against gravity
    assert_relative_eq!(motor_force, mass * 9.81, max_relative = 0.05);
    assert_relative_eq!(position(&world, carriage).y, -1.0, epsilon = 0.01);

    world.joint_mut(slider).expect("slider").set_motor_target(TargetType::None, 0.0);
    world.update(DT).expect("step");
    assert_eq!(world.joint(slider).expect("slider").motor_force(), Some(0.0));
}

#[test]
fn test_soft_limit_lets_slider_overshoot() {
    let travel = |spring: Option<Spring>| {
        let mut world = world(WorldConfig::default().with_gravity(Vec3::zeros()).with_allow_sleep(false));
        let rail = anchor_body(&mut world, Vec3::zeros());
        let carriage = crate_box(&mut world, Vec3::new(2.0, 0.0, 0.0), Vec3::new(0.2, 0.2, 0.2));
        let slider = world
            .create_joint(rail, carriage, JointDesc::Slider { axis: Vec3::x() })
            .expect("slider");
        let joint = world.joint_mut(slider).expect("slider");
        joint.set_limits(-0.5, 0.5);
        if let Some(spring) = spring {
            joint.set_spring(spring.frequency, spring.damping_ratio);
        }
        world
            .collider_mut(carriage)
            .expect("carriage")
            .set_linear_velocity(Vec3::new(3.0, 0.0, 0.0));

        let mut furthest = f32::MIN;
        for _ in 0..60 {
            world.update(DT).expect("step");
            furthest = furthest.max(world.joint_position(slider).expect("position"));
        }
        (furthest, world.joint_position(slider).expect("position"))
    };

    let (rigid_peak, _) = travel(None);
    assert!(rigid_peak < 0.55, "rigid limit overshot to {rigid_peak}");

    let (soft_peak, settled) = travel(Some(Spring::new(1.0, 0.5)));
    assert!(soft_peak > 0.6, "soft limit should give, peak {soft_peak}");
    // The spring pushes the carriage back inside
    assert!(settled < soft_peak - 0.1, "carriage stayed out at {settled}");
}

#[test]
fn test_rigid_position_motor_snaps_to_target() {
    let (mut world, _, hinge) = hinged_door(WorldConfig::default().with_gravity(Vec3::zeros()));
    {
        let joint = world.joint_mut(hinge).expect("hinge");
        joint.set_motor_spring(0.0, 0.0);
        joint.set_motor_target(TargetType::Position, 0.4);
    }

    run(&mut world, 10);
    assert_abs_diff_eq!(world.joint_angle(hinge).expect("angle"), 0.4, epsilon = 0.02);
}
