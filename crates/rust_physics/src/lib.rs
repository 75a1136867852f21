//! # Rust Physics
//!
//! A rigid-body physics core: colliders built from primitive, convex, mesh
//! and terrain shapes, tag-based collision filtering, joints with limits and
//! motors, contact callbacks and spatial queries.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use rust_physics::prelude::*;
//!
//! fn main() -> Result<(), PhysicsError> {
//!     let mut world = World::new(WorldConfig::default())?;
//!
//!     let ground = world.create_collider(Vec3::new(0.0, -1.0, 0.0));
//!     world.add_shape(ground, Shape::cuboid(Vec3::new(50.0, 1.0, 50.0))?)?;
//!     world.set_body_kind(ground, BodyKind::Static)?;
//!
//!     let ball = world.create_collider(Vec3::new(0.0, 10.0, 0.0));
//!     world.add_shape(ball, Shape::sphere(1.0)?)?;
//!
//!     for _ in 0..120 {
//!         world.update(1.0 / 60.0)?;
//!     }
//!     if let Some(ball) = world.collider(ball) {
//!         println!("ball rests at {}", ball.position());
//!     }
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all, clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::similar_names, clippy::too_many_arguments)]

pub mod config;
pub mod error;
pub mod foundation;
pub mod physics;

pub use config::{BackendKind, ConfigError, SleepConfig, WorldConfig};
pub use error::{PhysicsError, PhysicsResult};
pub use foundation::collections::{ColliderHandle, JointHandle, ShapeHandle, WorldId};
pub use physics::World;

/// Common imports for physics users
pub mod prelude {
    pub use crate::{
        config::{BackendKind, WorldConfig},
        error::{PhysicsError, PhysicsResult},
        foundation::{
            bounds::AABB,
            collections::{ColliderHandle, JointHandle, ShapeHandle},
            math::{Pose, Quat, Vec3},
        },
        physics::{
            BodyKind, Collider, Contact, EnabledAxes, Joint, JointDesc, JointType, MassData, RaycastHit, Shape,
            ShapecastHit, Spring, TagMask, TargetType, World, WorldCallbacks,
        },
    };
}
