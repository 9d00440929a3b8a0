//! Testbench error taxonomy.

use sim_core::Logic;
use thiserror::Error;

use crate::monitor::Direction;

/// Everything that can end a bus access, a round trip, or a scenario.
///
/// Nothing here is retried automatically. The only built-in retry is the
/// poller's bounded status loop, and its exhaustion is itself an error.
#[derive(Debug, Error)]
pub enum TbError {
    /// Read sampled an undefined level (undriven or fought over).
    #[error("bus contention reading {address:#04X}: sampled {observed}")]
    BusContention { address: u8, observed: Logic },

    /// Something drives the data bus when nothing should.
    #[error("bus not idle: data is {observed}")]
    BusNotIdle { observed: Logic },

    /// Nobody drove the data bus while the read strobe was held.
    #[error("bus timeout reading {address:#04X}: no driver within {cycles} cycles")]
    BusTimeout { address: u8, cycles: u64 },

    /// A transaction was requested while a strobe was still asserted.
    #[error("strobe conflict: {direction} of {address:#04X} requested with a strobe asserted")]
    StrobeConflict { address: u8, direction: Direction },

    /// A transaction was requested before the peripheral left reset.
    #[error("not ready: {direction} of {address:#04X} requested while held in reset")]
    NotReady { address: u8, direction: Direction },

    /// The peer's status byte never changed within the poll budget.
    #[error("round trip {round}: status still {status:#04X} after {attempts} polls")]
    PollTimeout { round: u32, attempts: u32, status: u8 },

    /// A bus-level failure inside a poller round trip.
    #[error("round trip {round}: {source}")]
    RoundTrip {
        round: u32,
        #[source]
        source: Box<TbError>,
    },

    /// Scenario-level check failed.
    #[error("{context}: expected {expected:#04X}, observed {observed:#04X}")]
    Mismatch {
        context: String,
        expected: u8,
        observed: u8,
    },

    /// A reset edge did not arrive before the deadline.
    #[error("reset {edge} edge not seen within {cycles} cycles")]
    ResetTimeout { edge: &'static str, cycles: u64 },

    /// Rail index outside the supply set.
    #[error("no power rail {rail} (rails are 0..{count})")]
    NoSuchRail { rail: usize, count: usize },

    /// Reset release attempted before all rails were up.
    #[error("power rail {rail} not stable at reset release")]
    PowerNotStable { rail: usize },

    #[error("invalid configuration: {0}")]
    Config(String),

    #[error("configuration parse error: {0}")]
    ConfigParse(#[from] serde_json::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type TbResult<T> = Result<T, TbError>;

impl TbError {
    /// Attach a round-trip number to bus-level errors. Errors that already
    /// carry their round, and scenario-level errors, pass through.
    #[must_use]
    pub fn in_round(self, round: u32) -> Self {
        match self {
            TbError::BusContention { .. }
            | TbError::BusTimeout { .. }
            | TbError::StrobeConflict { .. }
            | TbError::NotReady { .. } => TbError::RoundTrip {
                round,
                source: Box::new(self),
            },
            other => other,
        }
    }

    /// The innermost error, looking through round-trip wrapping.
    #[must_use]
    pub fn root(&self) -> &TbError {
        match self {
            TbError::RoundTrip { source, .. } => source.root(),
            other => other,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bus_errors_gain_round_context() {
        let err = TbError::BusTimeout {
            address: 0x82,
            cycles: 64,
        }
        .in_round(3);
        assert_eq!(
            err.to_string(),
            "round trip 3: bus timeout reading 0x82: no driver within 64 cycles"
        );
        assert!(matches!(err.root(), TbError::BusTimeout { address: 0x82, .. }));
    }

    #[test]
    fn poll_timeout_is_not_rewrapped() {
        let err = TbError::PollTimeout {
            round: 2,
            attempts: 20,
            status: 0xFA,
        }
        .in_round(2);
        assert!(matches!(err, TbError::PollTimeout { round: 2, .. }));
    }

    #[test]
    fn mismatch_reports_expected_and_observed() {
        let err = TbError::Mismatch {
            context: "round trip 1 response to 0x00".into(),
            expected: 0xFF,
            observed: 0x55,
        };
        assert_eq!(
            err.to_string(),
            "round trip 1 response to 0x00: expected 0xFF, observed 0x55"
        );
    }

    #[test]
    fn contention_shows_undriven_level() {
        let err = TbError::BusContention {
            address: 0x81,
            observed: Logic::HighZ,
        };
        assert_eq!(err.to_string(), "bus contention reading 0x81: sampled zzzzzzzz");
    }
}
