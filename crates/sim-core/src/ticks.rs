//! Cycle counts on the fast reference clock.

use std::fmt;

/// A count of fast-clock cycles.
///
/// All bus timing (setup, hold, turnaround, poll cadence) is expressed in
/// these. Slow-domain periods are converted with [`Ticks::scaled`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Ticks(pub u64);

impl Ticks {
    pub const ZERO: Self = Self(0);

    #[must_use]
    pub const fn new(count: u64) -> Self {
        Self(count)
    }

    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Multiply by a clock ratio (e.g. slow periods to fast cycles),
    /// saturating at `u64::MAX`.
    #[must_use]
    pub const fn scaled(self, factor: u64) -> Self {
        Self(self.0.saturating_mul(factor))
    }

    /// Cycles elapsed since `earlier`, saturating at zero.
    #[must_use]
    pub const fn since(self, earlier: Self) -> Self {
        Self(self.0.saturating_sub(earlier.0))
    }
}

impl core::ops::Add for Ticks {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }
}

impl core::ops::AddAssign for Ticks {
    fn add_assign(&mut self, rhs: Self) {
        self.0 = self.0.saturating_add(rhs.0);
    }
}

impl core::ops::Sub for Ticks {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }
}

impl fmt::Display for Ticks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} cycles", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaled_converts_slow_periods() {
        // 16 slow periods at 8:1, plus the off-alignment cycle
        assert_eq!(Ticks::new(16).scaled(8) + Ticks::new(1), Ticks::new(129));
    }

    #[test]
    fn addition_and_scaling_saturate() {
        let near_max = Ticks::new(u64::MAX - 1);
        assert_eq!(near_max + Ticks::new(5), Ticks::new(u64::MAX));
        let mut t = near_max;
        t += Ticks::new(2);
        assert_eq!(t, Ticks::new(u64::MAX));
        assert_eq!(Ticks::new(u64::MAX / 2).scaled(3), Ticks::new(u64::MAX));
    }

    #[test]
    fn subtraction_saturates() {
        assert_eq!(Ticks::new(3) - Ticks::new(5), Ticks::ZERO);
        assert_eq!(Ticks::new(10).since(Ticks::new(4)), Ticks::new(6));
    }
}
