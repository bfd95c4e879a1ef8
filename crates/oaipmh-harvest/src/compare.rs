//! Two-source presence comparison over identifier streams.
//!
//! URNs from an "expected" stream and a "comparison" stream are folded
//! into a map from URN to a 2-bit presence state. Once both streams have
//! drained, the report partitions every URN into exactly one of three
//! categories. Reporting order follows map iteration and is unspecified.

use std::collections::HashMap;

/// Listener receiving one callback per URN when the report runs.
pub trait PresenceListener {
    /// The URN is present in both providers.
    fn urn_in_both(&mut self, urn: &str);

    /// The URN is in the expected provider but missing from the
    /// comparison provider.
    fn urn_missing(&mut self, urn: &str);

    /// The URN is in the comparison provider but not in the expected
    /// provider.
    fn urn_redundant(&mut self, urn: &str);
}

const IN_EXPECTED: u8 = 0b01;
const IN_COMPARISON: u8 = 0b10;
const IN_BOTH: u8 = IN_EXPECTED | IN_COMPARISON;

/// An in-memory presence map.
#[derive(Debug, Default)]
pub struct PresenceMap {
    urns: HashMap<String, u8>,
}

impl PresenceMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a URN seen in the expected provider.
    pub fn add_expected(&mut self, urn: &str) {
        *self.urns.entry(urn.to_string()).or_insert(0) |= IN_EXPECTED;
    }

    /// Record a URN seen in the comparison provider.
    pub fn add_comparison(&mut self, urn: &str) {
        *self.urns.entry(urn.to_string()).or_insert(0) |= IN_COMPARISON;
    }

    /// Number of distinct URNs seen.
    pub fn len(&self) -> usize {
        self.urns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.urns.is_empty()
    }

    /// Dispatch every URN to the listener category its bitmask selects.
    pub fn report(&self, listener: &mut dyn PresenceListener) {
        for (urn, bits) in &self.urns {
            match *bits {
                IN_BOTH => listener.urn_in_both(urn),
                IN_EXPECTED => listener.urn_missing(urn),
                IN_COMPARISON => listener.urn_redundant(urn),
                other => unreachable!("invalid presence bitmask {:#04b} for '{}'", other, urn),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[derive(Default)]
    struct Collecting {
        in_both: HashSet<String>,
        missing: HashSet<String>,
        redundant: HashSet<String>,
    }

    impl PresenceListener for Collecting {
        fn urn_in_both(&mut self, urn: &str) {
            self.in_both.insert(urn.to_string());
        }

        fn urn_missing(&mut self, urn: &str) {
            self.missing.insert(urn.to_string());
        }

        fn urn_redundant(&mut self, urn: &str) {
            self.redundant.insert(urn.to_string());
        }
    }

    fn set(urns: &[&str]) -> HashSet<String> {
        urns.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn partitions_urns_into_three_disjoint_sets() {
        let mut map = PresenceMap::new();
        for urn in ["a", "b", "c"] {
            map.add_expected(urn);
        }
        for urn in ["b", "c", "d"] {
            map.add_comparison(urn);
        }

        let mut listener = Collecting::default();
        map.report(&mut listener);

        assert_eq!(listener.in_both, set(&["b", "c"]));
        assert_eq!(listener.missing, set(&["a"]));
        assert_eq!(listener.redundant, set(&["d"]));
    }

    #[test]
    fn every_urn_lands_in_exactly_one_category() {
        let mut map = PresenceMap::new();
        let expected: Vec<String> = (0..50).map(|i| format!("urn:e{}", i % 30)).collect();
        let comparison: Vec<String> = (10..60).map(|i| format!("urn:e{}", i % 40)).collect();

        for urn in &expected {
            map.add_expected(urn);
        }
        for urn in &comparison {
            map.add_comparison(urn);
        }

        let mut listener = Collecting::default();
        map.report(&mut listener);

        let union: HashSet<String> = expected.iter().chain(comparison.iter()).cloned().collect();
        let total = listener.in_both.len() + listener.missing.len() + listener.redundant.len();
        assert_eq!(total, union.len());
        assert_eq!(total, map.len());

        assert!(listener.in_both.is_disjoint(&listener.missing));
        assert!(listener.in_both.is_disjoint(&listener.redundant));
        assert!(listener.missing.is_disjoint(&listener.redundant));
    }

    #[test]
    fn duplicate_additions_are_idempotent() {
        let mut map = PresenceMap::new();
        map.add_expected("a");
        map.add_expected("a");
        map.add_comparison("a");

        let mut listener = Collecting::default();
        map.report(&mut listener);

        assert_eq!(listener.in_both, set(&["a"]));
        assert!(listener.missing.is_empty());
    }
}
