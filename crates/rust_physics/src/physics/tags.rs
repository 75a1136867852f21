//! Named collision tags and the pairwise filter matrix
//!
//! Each world carries up to [`MAX_TAGS`] named tags. A tag pair either
//! collides or not; the matrix is symmetric and starts fully enabled.
//! Colliders without a tag always collide with everything.

use crate::config::{ConfigError, MAX_TAGS};
use bitflags::bitflags;

bitflags! {
    /// Tag selection mask used by spatial queries
    ///
    /// Bit `i` selects tag `i`; [`TagMask::UNTAGGED`] selects colliders
    /// without a tag.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TagMask: u32 {
        /// Colliders with no tag
        const UNTAGGED = 1 << 31;
        /// Every collider
        const ALL = u32::MAX;
    }
}

impl TagMask {
    /// Mask selecting a single tag index
    pub const fn tag(index: usize) -> Self {
        if index < MAX_TAGS {
            Self::from_bits_retain(1 << index)
        } else {
            Self::empty()
        }
    }

    /// Mask bit for a collider's optional tag
    pub const fn for_tag(tag: Option<usize>) -> Self {
        match tag {
            Some(index) => Self::tag(index),
            None => Self::UNTAGGED,
        }
    }

    /// Whether this mask selects a collider with the given tag
    pub const fn selects(self, tag: Option<usize>) -> bool {
        self.intersects(Self::for_tag(tag))
    }
}

/// Tag names plus one enable bit per tag pair
#[derive(Debug, Clone)]
pub struct TagTable {
    names: Vec<String>,
    // rows[i] bit j set => tags i and j collide
    rows: Vec<u32>,
}

impl TagTable {
    /// Build a table with every pair enabled
    pub fn new(names: &[String]) -> Result<Self, ConfigError> {
        if names.len() > MAX_TAGS {
            return Err(ConfigError::TooManyTags {
                count: names.len(),
                max: MAX_TAGS,
            });
        }
        for (i, name) in names.iter().enumerate() {
            if name.is_empty() {
                return Err(ConfigError::EmptyTag);
            }
            if names[..i].contains(name) {
                return Err(ConfigError::DuplicateTag(name.clone()));
            }
        }
        let all = if names.is_empty() {
            0
        } else {
            u32::MAX >> (32 - names.len())
        };
        Ok(Self {
            names: names.to_vec(),
            rows: vec![all; names.len()],
        })
    }

    /// Number of named tags
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Whether no tags were configured
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Index of a tag name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|n| n == name)
    }

    /// Name of a tag index
    pub fn name(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Iterate tag names in index order
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }

    /// Allow tags `a` and `b` to collide; `false` if either name is unknown
    pub fn enable(&mut self, a: &str, b: &str) -> bool {
        self.set(a, b, true)
    }

    /// Stop tags `a` and `b` from colliding; `false` if either name is unknown
    pub fn disable(&mut self, a: &str, b: &str) -> bool {
        self.set(a, b, false)
    }

    /// Whether tags `a` and `b` collide; `None` if either name is unknown
    pub fn is_enabled(&self, a: &str, b: &str) -> Option<bool> {
        let i = self.index_of(a)?;
        let j = self.index_of(b)?;
        Some(self.rows[i] & (1 << j) != 0)
    }

    /// Pair test on tag indices; untagged always collides
    pub fn should_collide(&self, a: Option<usize>, b: Option<usize>) -> bool {
        match (a, b) {
            (Some(i), Some(j)) => self.rows.get(i).is_some_and(|row| row & (1 << j) != 0),
            _ => true,
        }
    }

    fn set(&mut self, a: &str, b: &str, enabled: bool) -> bool {
        let (Some(i), Some(j)) = (self.index_of(a), self.index_of(b)) else {
            return false;
        };
        if enabled {
            self.rows[i] |= 1 << j;
            self.rows[j] |= 1 << i;
        } else {
            self.rows[i] &= !(1 << j);
            self.rows[j] &= !(1 << i);
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(names: &[&str]) -> TagTable {
        let names: Vec<String> = names.iter().map(|s| (*s).to_string()).collect();
        TagTable::new(&names).expect("valid tags")
    }

    #[test]
    fn test_all_pairs_start_enabled() {
        let tags = table(&["a", "b", "c"]);
        assert_eq!(tags.is_enabled("a", "b"), Some(true));
        assert_eq!(tags.is_enabled("c", "c"), Some(true));
    }

    #[test]
    fn test_disable_is_symmetric() {
        let mut tags = table(&["a", "b"]);
        assert!(tags.disable("a", "b"));
        assert_eq!(tags.is_enabled("a", "b"), Some(false));
        assert_eq!(tags.is_enabled("b", "a"), Some(false));
        assert!(!tags.should_collide(Some(0), Some(1)));
        assert!(!tags.should_collide(Some(1), Some(0)));
        assert!(tags.should_collide(Some(0), Some(0)));

        assert!(tags.enable("b", "a"));
        assert_eq!(tags.is_enabled("a", "b"), Some(true));
    }

    #[test]
    fn test_unknown_names_are_sentinels() {
        let mut tags = table(&["a"]);
        assert!(!tags.disable("a", "missing"));
        assert!(!tags.enable("missing", "a"));
        assert_eq!(tags.is_enabled("a", "missing"), None);
    }

    #[test]
    fn test_untagged_collides_with_everything() {
        let mut tags = table(&["a"]);
        tags.disable("a", "a");
        assert!(tags.should_collide(None, Some(0)));
        assert!(tags.should_collide(Some(0), None));
        assert!(tags.should_collide(None, None));
    }

    #[test]
    fn test_full_table_uses_31_bits() {
        let names: Vec<String> = (0..MAX_TAGS).map(|i| format!("t{i}")).collect();
        let mut tags = TagTable::new(&names).expect("31 tags fit");
        assert!(tags.should_collide(Some(30), Some(0)));
        assert!(tags.disable("t30", "t0"));
        assert!(!tags.should_collide(Some(0), Some(30)));
    }

    #[test]
    fn test_mask_selection() {
        assert!(TagMask::ALL.selects(None));
        assert!(TagMask::ALL.selects(Some(4)));
        assert!(TagMask::tag(2).selects(Some(2)));
        assert!(!TagMask::tag(2).selects(Some(3)));
        assert!(!TagMask::tag(2).selects(None));
        assert!(TagMask::UNTAGGED.selects(None));
        assert!((TagMask::tag(0) | TagMask::tag(1)).selects(Some(1)));
    }
}
