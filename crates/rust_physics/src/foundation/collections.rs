//! Arena keys and world-scoped handles

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

pub use slotmap::{Key, SecondaryMap, SlotMap};

slotmap::new_key_type! {
    /// Arena key of a collider inside its world
    pub struct ColliderKey;
    /// Arena key of an attached shape inside its world
    pub struct ShapeKey;
    /// Arena key of a joint inside its world
    pub struct JointKey;
}

/// Process-unique identifier of a [`World`](crate::physics::World)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldId(u32);

impl WorldId {
    /// Allocate a fresh id; ids are never reused within a process
    pub(crate) fn next() -> Self {
        static NEXT_WORLD_ID: AtomicU32 = AtomicU32::new(1);
        Self(NEXT_WORLD_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Raw numeric value
    pub const fn raw(self) -> u32 {
        self.0
    }
}

impl fmt::Display for WorldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "world#{}", self.0)
    }
}

/// Typed handle: an arena key plus the id of the world that issued it
///
/// Handles are plain `Copy` values. A handle whose object has been destroyed,
/// or which belongs to another world, simply resolves to nothing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypedHandle<K: Key> {
    world: WorldId,
    key: K,
}

impl<K: Key> TypedHandle<K> {
    /// Create a new typed handle from a world id and key
    pub(crate) const fn new(world: WorldId, key: K) -> Self {
        Self { world, key }
    }

    /// World that issued this handle
    pub const fn world(&self) -> WorldId {
        self.world
    }

    /// Get the underlying key
    pub fn key(&self) -> K {
        self.key
    }
}

/// Handle to a collider
pub type ColliderHandle = TypedHandle<ColliderKey>;

/// Handle to a shape attached to a collider
pub type ShapeHandle = TypedHandle<ShapeKey>;

/// Handle to a joint
pub type JointHandle = TypedHandle<JointKey>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_world_ids_are_unique() {
        let a = WorldId::next();
        let b = WorldId::next();
        assert_ne!(a, b);
        assert!(b.raw() > a.raw());
    }

    #[test]
    fn test_handles_compare_by_world_and_key() {
        let mut arena: SlotMap<ColliderKey, ()> = SlotMap::with_key();
        let key = arena.insert(());
        let w1 = WorldId::next();
        let w2 = WorldId::next();
        let h1 = ColliderHandle::new(w1, key);
        let h2 = ColliderHandle::new(w2, key);
        assert_ne!(h1, h2);
        assert_eq!(h1.key(), h2.key());
        assert_eq!(h1.world(), w1);
    }
}
