//! Marker identifiers and deduplicated ID sets

use std::collections::BTreeSet;
use std::fmt;

/// Largest marker identifier accepted in a batch
pub const MAX_MARKER_ID: u16 = u16::MAX;

/// A single marker identifier in `0..=65535`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarkerId(pub u16);

impl MarkerId {
    /// Build an identifier from an arbitrary parsed value, clamping into range
    pub fn clamped(value: u64) -> Self {
        Self(value.min(u64::from(MAX_MARKER_ID)) as u16)
    }

    pub fn value(self) -> u16 {
        self.0
    }

    /// Number of decimal digits in this identifier
    pub fn digit_count(self) -> usize {
        self.0.to_string().len()
    }

    /// Zero-padded decimal form, e.g. `7` padded to width 2 is `07`
    pub fn padded(self, width: usize) -> String {
        format!("{:0width$}", self.0, width = width)
    }
}

impl fmt::Display for MarkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u16> for MarkerId {
    fn from(value: u16) -> Self {
        Self(value)
    }
}

/// The set of unique marker IDs processed in one batch
///
/// Iteration is in ascending order, but nothing downstream relies on it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MarkerIdSet {
    ids: BTreeSet<MarkerId>,
}

impl MarkerIdSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// All IDs in the inclusive range between two bounds, in either order
    pub fn from_range(a: MarkerId, b: MarkerId) -> Self {
        let (start, end) = if a <= b { (a, b) } else { (b, a) };
        (start.0..=end.0).map(MarkerId).collect()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn max(&self) -> Option<MarkerId> {
        self.ids.last().copied()
    }

    /// Padding width shared by every model name in the batch
    ///
    /// This is the digit count of the largest ID, so all names line up
    /// lexicographically. An empty set pads to width 1.
    pub fn padding_width(&self) -> usize {
        self.max().map(MarkerId::digit_count).unwrap_or(1)
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = MarkerId> + '_ {
        self.ids.iter().copied()
    }
}

impl FromIterator<MarkerId> for MarkerIdSet {
    fn from_iter<T: IntoIterator<Item = MarkerId>>(iter: T) -> Self {
        Self {
            ids: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a MarkerIdSet {
    type Item = MarkerId;
    type IntoIter = std::iter::Copied<std::collections::btree_set::Iter<'a, MarkerId>>;

    fn into_iter(self) -> Self::IntoIter {
        self.ids.iter().copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamped() {
        assert_eq!(MarkerId::clamped(70000), MarkerId(65535));
        assert_eq!(MarkerId::clamped(42), MarkerId(42));
    }

    #[test]
    fn test_padded() {
        assert_eq!(MarkerId(7).padded(2), "07");
        assert_eq!(MarkerId(123).padded(2), "123");
        assert_eq!(MarkerId(0).padded(1), "0");
    }

    #[test]
    fn test_range_either_order() {
        let forward = MarkerIdSet::from_range(MarkerId(1), MarkerId(5));
        let backward = MarkerIdSet::from_range(MarkerId(5), MarkerId(1));
        assert_eq!(forward, backward);
        assert_eq!(forward.len(), 5);
    }

    #[test]
    fn test_padding_width() {
        let ids: MarkerIdSet = [7, 10, 23].into_iter().map(MarkerId).collect();
        assert_eq!(ids.padding_width(), 2);

        let ids: MarkerIdSet = [0].into_iter().map(MarkerId).collect();
        assert_eq!(ids.padding_width(), 1);

        let ids: MarkerIdSet = [3, 65535].into_iter().map(MarkerId).collect();
        assert_eq!(ids.padding_width(), 5);
    }

    #[test]
    fn test_duplicates_collapse() {
        let ids: MarkerIdSet = [3, 3, 5].into_iter().map(MarkerId).collect();
        assert_eq!(ids.len(), 2);
    }
}
