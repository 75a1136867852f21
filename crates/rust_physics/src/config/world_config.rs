//! World creation settings

use super::{Config, ConfigError};
use crate::foundation::math::Vec3;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Maximum number of named collision tags; the last bit is reserved for "untagged"
pub const MAX_TAGS: usize = 31;

/// Which collision backend a world is created with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum BackendKind {
    /// Loose octree broad phase
    #[default]
    Octree,
    /// Sort-and-sweep along the axis of greatest spread
    SweepAndPrune,
}

/// Thresholds that decide when a resting body falls asleep
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SleepConfig {
    /// Linear speed (m/s) below which a body counts as resting
    pub linear_threshold: f32,
    /// Angular speed (rad/s) below which a body counts as resting
    pub angular_threshold: f32,
    /// Seconds a body must rest before it sleeps
    pub time_to_sleep: f32,
}

impl Default for SleepConfig {
    fn default() -> Self {
        Self {
            linear_threshold: 0.05,
            angular_threshold: 0.05,
            time_to_sleep: 0.5,
        }
    }
}

/// World configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorldConfig {
    /// Global gravity (m/s^2)
    pub gravity: Vec3,
    /// Fixed steps per second used by [`World::advance`](crate::physics::World::advance)
    pub tick_rate: f32,
    /// Upper bound on fixed steps per `advance` call
    pub max_substeps: u32,
    /// Collision tag names, at most [`MAX_TAGS`]
    pub tags: Vec<String>,
    /// Whether bodies may fall asleep at all
    pub allow_sleep: bool,
    /// Velocity passes per step
    pub velocity_iterations: u32,
    /// Position-correction passes per step
    pub position_iterations: u32,
    /// Fraction of positional error removed per correction pass, in `[0, 1]`
    pub tightness: f32,
    /// Seconds of constraint compliance; zero keeps constraints rigid
    pub response_time: f32,
    /// Sort pairs and contacts by stable ids so identical inputs replay bit-identically
    pub deterministic: bool,
    /// Linear damping given to new colliders
    pub linear_damping: f32,
    /// Angular damping given to new colliders
    pub angular_damping: f32,
    /// Sleep thresholds
    pub sleep: SleepConfig,
    /// Collision backend
    pub backend: BackendKind,
}

impl Default for WorldConfig {
    fn default() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            tick_rate: 60.0,
            max_substeps: 8,
            tags: Vec::new(),
            allow_sleep: true,
            velocity_iterations: 10,
            position_iterations: 2,
            tightness: crate::physics::solver::BAUMGARTE,
            response_time: 0.0,
            deterministic: false,
            linear_damping: 0.05,
            angular_damping: 0.05,
            sleep: SleepConfig::default(),
            backend: BackendKind::default(),
        }
    }
}

impl Config for WorldConfig {}

impl WorldConfig {
    /// Set the gravity vector
    #[must_use]
    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    /// Set the collision tag names
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Select the collision backend
    #[must_use]
    pub const fn with_backend(mut self, backend: BackendKind) -> Self {
        self.backend = backend;
        self
    }

    /// Enable or disable sleeping
    #[must_use]
    pub const fn with_allow_sleep(mut self, allow_sleep: bool) -> Self {
        self.allow_sleep = allow_sleep;
        self
    }

    /// Enable or disable deterministic ordering
    #[must_use]
    pub const fn with_deterministic(mut self, deterministic: bool) -> Self {
        self.deterministic = deterministic;
        self
    }

    /// Length of one fixed step in seconds
    pub fn fixed_dt(&self) -> f32 {
        1.0 / self.tick_rate
    }

    /// Check every setting, returning the first problem found
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tags.len() > MAX_TAGS {
            return Err(ConfigError::TooManyTags {
                count: self.tags.len(),
                max: MAX_TAGS,
            });
        }

        let mut seen = HashSet::with_capacity(self.tags.len());
        for tag in &self.tags {
            if tag.is_empty() {
                return Err(ConfigError::EmptyTag);
            }
            if !seen.insert(tag.as_str()) {
                return Err(ConfigError::DuplicateTag(tag.clone()));
            }
        }

        if !self.tick_rate.is_finite() || self.tick_rate <= 0.0 {
            return Err(ConfigError::InvalidTickRate(self.tick_rate));
        }

        if self.velocity_iterations == 0 {
            return Err(ConfigError::InvalidIterations);
        }

        for (name, value) in [
            ("gravity.x", self.gravity.x),
            ("gravity.y", self.gravity.y),
            ("gravity.z", self.gravity.z),
        ] {
            if !value.is_finite() {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }

        for (name, value) in [
            ("linear_damping", self.linear_damping),
            ("angular_damping", self.angular_damping),
            ("sleep.linear_threshold", self.sleep.linear_threshold),
            ("sleep.angular_threshold", self.sleep.angular_threshold),
            ("sleep.time_to_sleep", self.sleep.time_to_sleep),
            ("response_time", self.response_time),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(ConfigError::InvalidParameter { name, value });
            }
        }

        if !(0.0..=1.0).contains(&self.tightness) {
            return Err(ConfigError::InvalidParameter {
                name: "tightness",
                value: self.tightness,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        assert!(WorldConfig::default().validate().is_ok());
    }

    #[test]
    fn test_tag_limit() {
        let ok = WorldConfig::default().with_tags((0..MAX_TAGS).map(|i| format!("tag{i}")));
        assert!(ok.validate().is_ok());

        let too_many = WorldConfig::default().with_tags((0..=MAX_TAGS).map(|i| format!("tag{i}")));
        assert!(matches!(
            too_many.validate(),
            Err(ConfigError::TooManyTags { count: 32, max: 31 })
        ));
    }

    #[test]
    fn test_bad_tick_rate() {
        for rate in [0.0, -60.0, f32::NAN, f32::INFINITY] {
            let config = WorldConfig {
                tick_rate: rate,
                ..WorldConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidTickRate(_))));
        }
    }

    #[test]
    fn test_duplicate_and_empty_tags() {
        let dup = WorldConfig::default().with_tags(["a", "b", "a"]);
        assert!(matches!(dup.validate(), Err(ConfigError::DuplicateTag(t)) if t == "a"));

        let empty = WorldConfig::default().with_tags(["a", ""]);
        assert!(matches!(empty.validate(), Err(ConfigError::EmptyTag)));
    }

    #[test]
    fn test_zero_velocity_iterations() {
        let config = WorldConfig {
            velocity_iterations: 0,
            ..WorldConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::InvalidIterations)));
    }

    #[test]
    fn test_solver_softness_ranges() {
        for (tightness, response_time) in [(1.5, 0.0), (f32::NAN, 0.0), (0.2, -0.1), (0.2, f32::INFINITY)] {
            let config = WorldConfig {
                tightness,
                response_time,
                ..WorldConfig::default()
            };
            assert!(matches!(config.validate(), Err(ConfigError::InvalidParameter { .. })));
        }

        let soft = WorldConfig {
            tightness: 0.8,
            response_time: 0.05,
            ..WorldConfig::default()
        };
        assert!(soft.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config: WorldConfig = toml::from_str("tick_rate = 120.0\ntags = [\"a\"]").expect("parse");
        assert_eq!(config.tick_rate, 120.0);
        assert_eq!(config.tags, vec!["a".to_string()]);
        assert_eq!(config.velocity_iterations, WorldConfig::default().velocity_iterations);
    }
}
