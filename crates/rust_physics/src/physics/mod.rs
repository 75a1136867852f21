//! Rigid-body simulation
//!
//! A [`World`] owns colliders, their shapes and the joints between them. Each
//! [`World::update`] runs broad phase, tag and user filtering, narrow phase,
//! the constraint solver and integration, then exposes the resulting
//! [`Contact`]s until the next step.

pub mod backend;
pub mod callbacks;
pub mod collider;
pub mod collision;
pub mod contact;
pub mod joint;
pub mod query;
pub mod shape;
pub(crate) mod solver;
pub mod step;
pub mod tags;
pub mod world;

#[cfg(test)]
mod tests;

pub use backend::{CollisionBackend, OctreeBackend, SweepAndPruneBackend};
pub use callbacks::{ContactCallback, EnterExitCallback, FilterCallback, WorldCallbacks};
pub use collider::{BodyKind, Collider, EnabledAxes};
pub use contact::{CollisionPair, Contact};
pub use joint::{AxisJoint, DistanceJoint, Joint, JointDesc, JointKind, JointType, Motor, Spring, TargetType};
pub use query::{RaycastHit, ShapecastHit};
pub use shape::{MassData, Shape, ShapeGeometry, ShapeType};
pub use tags::{TagMask, TagTable};
pub use world::World;
