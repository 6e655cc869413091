//! Snapshot versions.

use std::fmt;
use std::num::ParseIntError;
use std::str::FromStr;

/// Per-node snapshot version.
///
/// A counter that starts at [`SnapshotVersion::initial`] and only moves
/// forward. On the wire it is the decimal string in
/// `DiscoveryResponse.version_info`.
///
/// ```rust
/// use flowc_core::SnapshotVersion;
///
/// let v = SnapshotVersion::initial();
/// assert_eq!(v.to_string(), "1");
/// assert_eq!("2".parse::<SnapshotVersion>().unwrap(), v.next());
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SnapshotVersion(u64);

impl SnapshotVersion {
    /// Version of the first snapshot created for a node.
    #[must_use]
    pub const fn initial() -> Self {
        Self(1)
    }

    /// Version from a raw counter value.
    #[must_use]
    pub const fn from_u64(value: u64) -> Self {
        Self(value)
    }

    /// The following version.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0.saturating_add(1))
    }

    /// Raw counter value.
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for SnapshotVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SnapshotVersion {
    type Err = ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse().map(Self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn versions_are_ordered() {
        let v1 = SnapshotVersion::initial();
        let v2 = v1.next();
        let v3 = v2.next();
        assert!(v1 < v2 && v2 < v3);
        assert_eq!(v3.as_u64(), 3);
    }

    #[test]
    fn version_parse_round_trip() {
        let v = SnapshotVersion::from_u64(42);
        assert_eq!(v.to_string().parse::<SnapshotVersion>().unwrap(), v);
        assert!("abc".parse::<SnapshotVersion>().is_err());
    }

    #[test]
    fn next_saturates() {
        let max = SnapshotVersion::from_u64(u64::MAX);
        assert_eq!(max.next(), max);
    }
}
