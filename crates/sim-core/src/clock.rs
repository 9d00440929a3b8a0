//! Reference clock and derived clock domains.

use crate::Ticks;

/// The fast reference clock driving the bus transactor.
///
/// Every other domain derives from this one by integer division.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MasterClock {
    /// Period in picoseconds (25 000 for the 40 MHz reference).
    pub period_ps: u64,
}

impl MasterClock {
    #[must_use]
    pub const fn new(period_ps: u64) -> Self {
        Self { period_ps }
    }

    /// Frequency in Hz (integer division).
    #[must_use]
    pub const fn frequency_hz(&self) -> u64 {
        1_000_000_000_000 / self.period_ps
    }

    /// Simulated time after `ticks` cycles, in nanoseconds. Saturates.
    #[must_use]
    pub const fn elapsed_ns(&self, ticks: Ticks) -> u64 {
        ticks.get().saturating_mul(self.period_ps) / 1000
    }

    /// Number of whole cycles that fit in `micros` microseconds. Deadlines
    /// too long to express in picoseconds saturate.
    #[must_use]
    pub const fn cycles_in_us(&self, micros: u64) -> Ticks {
        Ticks::new(micros.saturating_mul(1_000_000) / self.period_ps)
    }
}

/// Integer divider producing a slow clock enable from the fast clock.
///
/// `tick()` is called on every fast edge and returns `true` on the fast
/// edge that coincides with a slow rising edge.
#[derive(Debug, Clone)]
pub struct ClockDivider {
    divisor: u64,
    phase: u64,
    edges: u64,
}

impl ClockDivider {
    /// Divide by `divisor`. A divisor of zero is treated as one.
    #[must_use]
    pub fn new(divisor: u64) -> Self {
        Self {
            divisor: divisor.max(1),
            phase: 0,
            edges: 0,
        }
    }

    #[must_use]
    pub fn divisor(&self) -> u64 {
        self.divisor
    }

    /// Slow edges produced so far.
    #[must_use]
    pub fn edges(&self) -> u64 {
        self.edges
    }

    /// Advance by one fast edge. Returns `true` on a slow edge.
    pub fn tick(&mut self) -> bool {
        self.phase += 1;
        if self.phase == self.divisor {
            self.phase = 0;
            self.edges += 1;
            true
        } else {
            false
        }
    }

    /// Realign to phase zero. The next slow edge is a full period away.
    pub fn reset(&mut self) {
        self.phase = 0;
    }
}
