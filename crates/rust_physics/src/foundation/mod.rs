//! Foundation module - Core utilities and types
//!
//! This module provides fundamental utilities used throughout the crate:
//! - Math types and operations
//! - Bounding volumes
//! - Arena keys and world-scoped handles
//! - Logging utilities

pub mod bounds;
pub mod collections;
pub mod logging;
pub mod math;
