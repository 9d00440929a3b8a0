//! Resolved level of a shared 8-bit bus.

use std::fmt;

/// The level seen on a tri-state 8-bit bus after resolving all drivers.
///
/// `HighZ` is distinct from a driven zero: a reader sampling `HighZ` has
/// observed nothing, not the value 0.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Logic {
    /// Exactly one driver.
    Driven(u8),
    /// No driver.
    #[default]
    HighZ,
    /// More than one driver (fighting outputs).
    Conflict,
}

impl Logic {
    /// Resolve a set of optional drivers into a bus level.
    ///
    /// Two drivers agreeing on a value still count as a conflict: both
    /// outputs are enabled, which is never a legal bus state.
    #[must_use]
    pub fn resolve(drivers: &[Option<u8>]) -> Self {
        let mut level = Logic::HighZ;
        for value in drivers.iter().flatten() {
            level = match level {
                Logic::HighZ => Logic::Driven(*value),
                Logic::Driven(_) | Logic::Conflict => Logic::Conflict,
            };
        }
        level
    }

    /// The driven value, if the level is defined.
    #[must_use]
    pub fn value(self) -> Option<u8> {
        match self {
            Logic::Driven(v) => Some(v),
            Logic::HighZ | Logic::Conflict => None,
        }
    }

    /// True when at least one party drives the bus.
    #[must_use]
    pub fn is_driven(self) -> bool {
        !matches!(self, Logic::HighZ)
    }
}

impl fmt::Display for Logic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Logic::Driven(v) => write!(f, "{v:#04X}"),
            Logic::HighZ => write!(f, "zzzzzzzz"),
            Logic::Conflict => write!(f, "xxxxxxxx"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undriven_is_not_zero() {
        let level = Logic::resolve(&[None, None]);
        assert_eq!(level, Logic::HighZ);
        assert_ne!(level, Logic::Driven(0));
        assert_eq!(level.value(), None);
        assert!(!level.is_driven());
    }

    #[test]
    fn single_driver_wins() {
        assert_eq!(Logic::resolve(&[None, Some(0x55)]), Logic::Driven(0x55));
    }

    #[test]
    fn two_drivers_conflict() {
        assert_eq!(Logic::resolve(&[Some(1), Some(2)]), Logic::Conflict);
        // Agreeing outputs are still two enabled drivers
        assert_eq!(Logic::resolve(&[Some(7), Some(7)]), Logic::Conflict);
        assert!(Logic::Conflict.is_driven());
        assert_eq!(Logic::Conflict.value(), None);
    }

    #[test]
    fn display_matches_waveform_notation() {
        assert_eq!(Logic::Driven(0xFA).to_string(), "0xFA");
        assert_eq!(Logic::HighZ.to_string(), "zzzzzzzz");
    }
}
