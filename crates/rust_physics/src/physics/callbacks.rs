//! User callbacks invoked during a step
//!
//! All callbacks receive the world read-only. While they run, the world's
//! contact list is detached, so [`World::contacts`] returns nothing.

use crate::foundation::collections::ColliderHandle;
use crate::physics::contact::Contact;
use crate::physics::world::World;
use std::fmt;

/// Decides whether a candidate pair may collide; `false` drops the pair
pub type FilterCallback = Box<dyn FnMut(&World, ColliderHandle, ColliderHandle) -> bool + Send>;

/// Sees, and may modify, each contact before the solver runs
pub type ContactCallback = Box<dyn FnMut(&World, ColliderHandle, ColliderHandle, &mut Contact) + Send>;

/// Reports a pair starting or stopping to overlap
pub type EnterExitCallback = Box<dyn FnMut(&World, ColliderHandle, ColliderHandle) + Send>;

/// Callbacks registered on a world
#[derive(Default)]
pub struct WorldCallbacks {
    /// Pair filter, run after the tag matrix
    pub filter: Option<FilterCallback>,
    /// Per-contact hook
    pub contact: Option<ContactCallback>,
    /// Pair started overlapping this step
    pub enter: Option<EnterExitCallback>,
    /// Pair stopped overlapping this step
    pub exit: Option<EnterExitCallback>,
}

impl WorldCallbacks {
    /// No callbacks
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the pair filter
    #[must_use]
    pub fn with_filter<F>(mut self, filter: F) -> Self
    where
        F: FnMut(&World, ColliderHandle, ColliderHandle) -> bool + Send + 'static,
    {
        self.filter = Some(Box::new(filter));
        self
    }

    /// Set the contact hook
    #[must_use]
    pub fn with_contact<F>(mut self, contact: F) -> Self
    where
        F: FnMut(&World, ColliderHandle, ColliderHandle, &mut Contact) + Send + 'static,
    {
        self.contact = Some(Box::new(contact));
        self
    }

    /// Set the enter callback
    #[must_use]
    pub fn with_enter<F>(mut self, enter: F) -> Self
    where
        F: FnMut(&World, ColliderHandle, ColliderHandle) + Send + 'static,
    {
        self.enter = Some(Box::new(enter));
        self
    }

    /// Set the exit callback
    #[must_use]
    pub fn with_exit<F>(mut self, exit: F) -> Self
    where
        F: FnMut(&World, ColliderHandle, ColliderHandle) + Send + 'static,
    {
        self.exit = Some(Box::new(exit));
        self
    }

    /// Whether nothing is registered
    pub const fn is_empty(&self) -> bool {
        self.filter.is_none() && self.contact.is_none() && self.enter.is_none() && self.exit.is_none()
    }
}

impl fmt::Debug for WorldCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WorldCallbacks")
            .field("filter", &self.filter.is_some())
            .field("contact", &self.contact.is_some())
            .field("enter", &self.enter.is_some())
            .field("exit", &self.exit.is_some())
            .finish()
    }
}
