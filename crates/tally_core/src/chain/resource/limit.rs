use std::fmt;

use serde::{Deserialize, Serialize};
use tally_serialization::{NumBytes, Read, ReadError, Write, WriteError};

/// A quantity that may be explicitly unlimited.
///
/// Used for configured weights, RAM quotas and computed entitlements. On disk
/// it is a one-byte tag followed by the value when bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Limit {
    #[default]
    Unbounded,
    Bounded(u64),
}

impl Limit {
    /// Maps the signed convention used by external callers, where any
    /// negative value means "no limit".
    pub fn from_signed(value: i64) -> Self {
        u64::try_from(value).map_or(Limit::Unbounded, Limit::Bounded)
    }

    pub fn bounded(&self) -> Option<u64> {
        match self {
            Limit::Unbounded => None,
            Limit::Bounded(value) => Some(*value),
        }
    }

    /// Contribution of this limit to a chain-wide total.
    pub fn weight(&self) -> u64 {
        self.bounded().unwrap_or(0)
    }

    /// Whether moving from `self` to `other` lowers the ceiling.
    pub fn is_decreased_by(&self, other: &Limit) -> bool {
        match (self, other) {
            (Limit::Unbounded, Limit::Bounded(_)) => true,
            (Limit::Bounded(old), Limit::Bounded(new)) => new < old,
            _ => false,
        }
    }
}

impl fmt::Display for Limit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Limit::Unbounded => f.write_str("unlimited"),
            Limit::Bounded(value) => write!(f, "{}", value),
        }
    }
}

impl NumBytes for Limit {
    fn num_bytes(&self) -> usize {
        self.bounded().num_bytes()
    }
}

impl Read for Limit {
    fn read(bytes: &[u8], pos: &mut usize) -> Result<Self, ReadError> {
        Ok(Option::<u64>::read(bytes, pos)?.map_or(Limit::Unbounded, Limit::Bounded))
    }
}

impl Write for Limit {
    fn write(&self, bytes: &mut [u8], pos: &mut usize) -> Result<(), WriteError> {
        self.bounded().write(bytes, pos)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signed_conversion() {
        assert_eq!(Limit::from_signed(-1), Limit::Unbounded);
        assert_eq!(Limit::from_signed(-500), Limit::Unbounded);
        assert_eq!(Limit::from_signed(0), Limit::Bounded(0));
        assert_eq!(Limit::from_signed(1213), Limit::Bounded(1213));
    }

    #[test]
    fn test_decrease_detection() {
        assert!(Limit::Unbounded.is_decreased_by(&Limit::Bounded(u64::MAX)));
        assert!(Limit::Bounded(10).is_decreased_by(&Limit::Bounded(9)));
        assert!(!Limit::Bounded(10).is_decreased_by(&Limit::Bounded(10)));
        assert!(!Limit::Bounded(10).is_decreased_by(&Limit::Unbounded));
        assert!(!Limit::Unbounded.is_decreased_by(&Limit::Unbounded));
    }

    #[test]
    fn test_codec() {
        assert_eq!(Limit::Unbounded.pack().unwrap(), vec![0]);
        let bounded = Limit::Bounded(1000);
        let packed = bounded.pack().unwrap();
        assert_eq!(packed.len(), 9);
        assert_eq!(Limit::unpack(&packed).unwrap(), bounded);
    }
}
