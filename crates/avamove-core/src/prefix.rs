//! Path prefix classification and rewriting.
//!
//! A record belongs to the store whose prefix its `path` starts with.
//! Rewriting replaces only the leading legacy prefix, so a path like
//! `legacy/legacy/a.png` becomes `production/legacy/a.png` and a path
//! already under the production prefix is never touched.

use serde::{Deserialize, Serialize};

use crate::models::Location;

/// The pair of path prefixes that tie records to their stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrefixMap {
    legacy: String,
    production: String,
}

impl PrefixMap {
    pub fn new(legacy: impl Into<String>, production: impl Into<String>) -> Self {
        Self {
            legacy: legacy.into(),
            production: production.into(),
        }
    }

    pub fn legacy(&self) -> &str {
        &self.legacy
    }

    pub fn production(&self) -> &str {
        &self.production
    }

    pub fn for_location(&self, location: Location) -> &str {
        match location {
            Location::Legacy => &self.legacy,
            Location::Production => &self.production,
        }
    }

    /// Classify a record path by its leading prefix.
    ///
    /// Returns `None` for paths matching neither prefix. If one prefix is a
    /// prefix of the other, the longer match wins.
    pub fn classify(&self, path: &str) -> Option<Location> {
        let legacy = path.starts_with(&self.legacy);
        let production = path.starts_with(&self.production);
        match (legacy, production) {
            (true, true) => {
                if self.legacy.len() >= self.production.len() {
                    Some(Location::Legacy)
                } else {
                    Some(Location::Production)
                }
            }
            (true, false) => Some(Location::Legacy),
            (false, true) => Some(Location::Production),
            (false, false) => None,
        }
    }

    /// Rewrite a legacy path to its production counterpart.
    ///
    /// Returns `None` when the path does not classify as legacy, so paths
    /// that already point at production (or at neither store) pass through
    /// a migration untouched.
    pub fn to_production(&self, path: &str) -> Option<String> {
        if self.classify(path) != Some(Location::Legacy) {
            return None;
        }
        path.strip_prefix(&self.legacy)
            .map(|rest| format!("{}{}", self.production, rest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prefixes() -> PrefixMap {
        PrefixMap::new("legacy/", "production/")
    }

    #[test]
    fn classifies_by_leading_prefix() {
        let map = prefixes();
        assert_eq!(
            map.classify("legacy/avatars/42.png"),
            Some(Location::Legacy)
        );
        assert_eq!(
            map.classify("production/avatars/42.png"),
            Some(Location::Production)
        );
        assert_eq!(map.classify("avatars/42.png"), None);
    }

    #[test]
    fn rewrites_the_leading_prefix_only() {
        let map = prefixes();
        assert_eq!(
            map.to_production("legacy/avatars/42.png"),
            Some("production/avatars/42.png".to_string())
        );
        // An inner occurrence of the prefix text is data, not a prefix.
        assert_eq!(
            map.to_production("legacy/legacy/a.png"),
            Some("production/legacy/a.png".to_string())
        );
    }

    #[test]
    fn production_paths_are_not_rewritten() {
        let map = prefixes();
        assert_eq!(map.to_production("production/avatars/42.png"), None);
    }

    #[test]
    fn unprefixed_paths_are_not_rewritten() {
        let map = prefixes();
        assert_eq!(map.to_production("avatars/42.png"), None);
        assert_eq!(map.to_production(""), None);
    }

    #[test]
    fn rewrite_is_not_applicable_twice() {
        let map = prefixes();
        let moved = map.to_production("legacy/avatars/42.png").unwrap();
        assert_eq!(map.classify(&moved), Some(Location::Production));
        assert_eq!(map.to_production(&moved), None);
    }

    #[test]
    fn overlapping_prefixes_prefer_the_longest_match() {
        let map = PrefixMap::new("media/", "media/prod/");
        assert_eq!(map.classify("media/prod/a.png"), Some(Location::Production));
        assert_eq!(map.classify("media/a.png"), Some(Location::Legacy));
    }
}
