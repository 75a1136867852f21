use super::*;
use crate::config::BackendKind;
use crate::physics::collider::EnabledAxes;
use crate::foundation::math::Pose;
use approx::assert_relative_eq;

fn drop_ball(backend: BackendKind) {
    let config = WorldConfig::default()
        .with_gravity(Vec3::new(0.0, -9.8, 0.0))
        .with_backend(backend);
    let mut world = world(config);
    ground(&mut world);
    let ball = ball(&mut world, Vec3::new(0.0, 10.0, 0.0), 1.0);

    run(&mut world, 120);
    let rest = position(&world, ball);
    assert_relative_eq!(rest.y, 1.0, epsilon = 0.05);
    assert_relative_eq!(rest.x, 0.0, epsilon = 1e-3);
    assert_relative_eq!(rest.z, 0.0, epsilon = 1e-3);

    run(&mut world, 240);
    let body = world.collider(ball).expect("ball");
    assert!(!body.is_awake(), "resting ball should fall asleep");
    assert_relative_eq!(body.position().y, 1.0, epsilon = 0.05);
}

#[test]
fn test_ball_settles_on_ground_octree() {
    drop_ball(BackendKind::Octree);
}

#[test]
fn test_ball_settles_on_ground_sweep_and_prune() {
    drop_ball(BackendKind::SweepAndPrune);
}

#[test]
fn test_stack_of_boxes_stays_upright() {
    let mut world = world(WorldConfig::default());
    ground(&mut world);
    let half = Vec3::new(0.5, 0.5, 0.5);
    let boxes: Vec<_> = (0..3)
        .map(|i| crate_box(&mut world, Vec3::new(0.0, 0.5 + i as f32 * 1.0, 0.0), half))
        .collect();

    run(&mut world, 180);
    for (i, b) in boxes.iter().enumerate() {
        let p = position(&world, *b);
        assert_relative_eq!(p.y, 0.5 + i as f32, epsilon = 0.1);
        assert!(p.x.abs() < 0.1 && p.z.abs() < 0.1, "box {i} drifted to {p}");
    }
}

#[test]
fn test_restitution_bounces() {
    let mut world = world(WorldConfig::default().with_allow_sleep(false));
    let ground = ground(&mut world);
    let ball = ball(&mut world, Vec3::new(0.0, 3.0, 0.0), 0.5);
    world.collider_mut(ball).expect("ball").set_restitution(1.0);
    world.collider_mut(ground).expect("ground").set_restitution(1.0);

    let mut bounced = false;
    for _ in 0..120 {
        world.update(DT).expect("step");
        if world.collider(ball).expect("ball").linear_velocity().y > 3.0 {
            bounced = true;
            break;
        }
    }
    assert!(bounced, "elastic ball should rebound upwards");
}

#[test]
fn test_kinematic_and_sleeping_bodies_keep_their_pose() {
    let mut world = world(WorldConfig::default());
    let kinematic = crate_box(&mut world, Vec3::new(0.0, 5.0, 0.0), Vec3::new(1.0, 1.0, 1.0));
    world.set_body_kind(kinematic, BodyKind::Kinematic).expect("kind");

    // Two overlapping sleepers are left alone
    let a = ball(&mut world, Vec3::new(10.0, 5.0, 0.0), 1.0);
    let b = ball(&mut world, Vec3::new(11.0, 5.0, 0.0), 1.0);
    for c in [a, b] {
        world.collider_mut(c).expect("ball").set_awake(false);
    }
    let before: Vec<Pose> = [kinematic, a, b]
        .iter()
        .map(|c| world.collider(*c).expect("collider").pose())
        .collect();

    run(&mut world, 30);
    for (c, pose) in [kinematic, a, b].iter().zip(&before) {
        assert_eq!(world.collider(*c).expect("collider").pose(), *pose);
    }
    assert!(!world.collider(a).expect("a").is_awake());
}

#[test]
fn test_kinematic_body_moves_by_its_velocity_only() {
    let mut world = world(WorldConfig::default());
    let platform = crate_box(&mut world, Vec3::zeros(), Vec3::new(1.0, 0.1, 1.0));
    world.set_body_kind(platform, BodyKind::Kinematic).expect("kind");
    world
        .collider_mut(platform)
        .expect("platform")
        .set_linear_velocity(Vec3::new(1.0, 0.0, 0.0));

    run(&mut world, 60);
    let p = position(&world, platform);
    assert_relative_eq!(p.x, 1.0, epsilon = 1e-3);
    assert_relative_eq!(p.y, 0.0, epsilon = 1e-6);
}

#[test]
fn test_deterministic_worlds_replay_identically() {
    let build = || {
        let mut world = world(WorldConfig::default().with_deterministic(true));
        ground(&mut world);
        let bodies: Vec<_> = (0..6)
            .map(|i| {
                let x = (i % 3) as f32 * 0.9 - 0.9;
                crate_box(&mut world, Vec3::new(x, 1.0 + i as f32 * 1.1, 0.1 * i as f32), Vec3::new(0.4, 0.4, 0.4))
            })
            .collect();
        (world, bodies)
    };
    let (mut first, first_bodies) = build();
    let (mut second, second_bodies) = build();
    run(&mut first, 90);
    run(&mut second, 90);
    for (a, b) in first_bodies.into_iter().zip(second_bodies) {
        assert_eq!(
            first.collider(a).expect("body").pose(),
            second.collider(b).expect("body").pose()
        );
    }
}

#[test]
fn test_sleeping_box_wakes_on_impact() {
    let mut world = world(WorldConfig::default());
    ground(&mut world);
    let resting = crate_box(&mut world, Vec3::new(0.0, 0.5, 0.0), Vec3::new(0.5, 0.5, 0.5));
    run(&mut world, 90);
    assert!(!world.collider(resting).expect("box").is_awake());

    let falling = ball(&mut world, Vec3::new(0.0, 3.0, 0.0), 0.5);
    let mut woke = false;
    for _ in 0..60 {
        world.update(DT).expect("step");
        woke |= world.collider(resting).expect("box").is_awake();
    }
    assert!(woke, "the falling ball should wake the box it lands on");
    assert_relative_eq!(position(&world, falling).y, 1.5, epsilon = 0.05);
    assert_relative_eq!(position(&world, resting).y, 0.5, epsilon = 0.05);
}

#[test]
fn test_advance_runs_fixed_steps() {
    let mut world = world(WorldConfig::default());
    assert_eq!(world.advance(0.04).expect("advance"), 2);
    assert_eq!(world.step_count(), 2);
    // Backlog beyond the substep cap is dropped
    assert_eq!(world.advance(1.0).expect("advance"), 8);
    assert_eq!(world.advance(0.0).expect("advance"), 0);
}

#[test]
fn test_invalid_dt_runs_collision_without_motion() {
    let mut world = world(WorldConfig::default());
    ground(&mut world);
    let ball = ball(&mut world, Vec3::new(0.0, 0.9, 0.0), 1.0);
    world.update(f32::NAN).expect("step");
    world.update(-1.0).expect("step");
    assert_eq!(position(&world, ball), Vec3::new(0.0, 0.9, 0.0));
    assert_eq!(world.contacts().len(), 1);
}

#[test]
fn test_planar_body_stays_in_its_plane() {
    let mut world = world(WorldConfig::default().with_allow_sleep(false));
    ground(&mut world);
    let body = crate_box(&mut world, Vec3::new(0.0, 2.0, 0.0), Vec3::new(0.5, 0.5, 0.5));
    {
        let collider = world.collider_mut(body).expect("box");
        collider.set_enabled_axes(EnabledAxes::TRANSLATION_X | EnabledAxes::TRANSLATION_Y | EnabledAxes::ROTATION_Z);
        collider.apply_linear_impulse_at_position(Vec3::new(0.5, 0.0, 0.5), Vec3::new(0.0, 2.5, 0.5));
    }

    run(&mut world, 90);
    let collider = world.collider(body).expect("box");
    let p = collider.position();
    assert!(p.x > 0.1, "free axis should still move: {p}");
    assert_eq!(p.z, 0.0);
    assert!(p.y > 0.45 && p.y < 0.75, "box should rest on the ground: {p}");
    let w = collider.angular_velocity();
    assert_eq!((w.x, w.y), (0.0, 0.0));
    // Only spin about z is possible
    let tilt = collider.rotation() * Vec3::z();
    assert_relative_eq!(tilt, Vec3::z(), epsilon = 1e-4);
}

#[test]
fn test_locked_vertical_axis_ignores_gravity() {
    let mut world = world(WorldConfig::default());
    let hovering = ball(&mut world, Vec3::new(0.0, 3.0, 0.0), 0.5);
    world
        .collider_mut(hovering)
        .expect("ball")
        .set_enabled_axes(EnabledAxes::all() - EnabledAxes::TRANSLATION_Y);
    world.collider_mut(hovering).expect("ball").apply_force(Vec3::new(10.0, 10.0, 0.0));

    run(&mut world, 30);
    let p = position(&world, hovering);
    assert_eq!(p.y, 3.0);
    assert!(p.x > 0.0);
}

#[test]
fn test_solver_settings_are_validated() {
    let mut world = world(WorldConfig::default());
    assert_relative_eq!(world.tightness(), 0.2);
    assert_eq!(world.response_time(), 0.0);

    assert!(world.set_tightness(0.5).is_ok());
    assert!(world.set_tightness(1.5).is_err());
    assert!(world.set_response_time(-0.1).is_err());
    assert!(world.set_response_time(f32::NAN).is_err());
    assert!(world.set_response_time(0.002).is_ok());
    assert_eq!((world.tightness(), world.response_time()), (0.5, 0.002));

    // A softer world still holds a resting ball
    ground(&mut world);
    let resting = ball(&mut world, Vec3::new(0.0, 1.0, 0.0), 1.0);
    run(&mut world, 120);
    assert_relative_eq!(position(&world, resting).y, 1.0, epsilon = 0.05);
}
